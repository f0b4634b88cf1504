//! Highlight overlays
//!
//! A pure query surface over already-resolved highlight data: per item a
//! highlighted flag, color and group, plus optional secondary layers.
//! Queries about items of another container fail with `ForeignItem`.

mod set;

pub use set::{Color, HighlightSet, HighlightSetBuilder};

use crate::mapping::{ContainerId, MappingResult, Markable};

/// Read contract consumed by presentation and search layers
pub trait Highlight: Send + Sync {
    fn container(&self) -> ContainerId;

    fn is_highlighted(&self, item: &Markable) -> MappingResult<bool>;

    fn highlight_color(&self, item: &Markable) -> MappingResult<Option<Color>>;

    fn group_id(&self, item: &Markable) -> MappingResult<Option<u32>>;

    /// Number of secondary layers
    fn layer_count(&self) -> usize;

    fn is_highlighted_in(&self, item: &Markable, layer: usize) -> MappingResult<bool>;
}
