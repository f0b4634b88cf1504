//! # Cross-layer Mapping
//!
//! Correspondences between the markables of two containers.
//!
//! ## Rules
//! - A lookup never returns an item outside the other container
//! - Passing an item from the wrong container fails with `ForeignItem`
//! - Mappings hold containers weakly; once either side is unloaded,
//!   lookups fail with `Detached`
//! - For a bidirectional mapping `to_source(to_target(x)) == x`

mod container;
mod errors;
mod span;
mod table;

use std::sync::{Arc, Weak};

pub use container::{Container, ContainerId, ItemId, Markable};
pub use errors::{MappingError, MappingResult};
pub use span::SpanMapping;
pub use table::{MappingBuilder, TableMapping};

/// Read contract shared by every mapping kind
pub trait Mapping: Send + Sync {
    fn source_id(&self) -> ContainerId;

    fn target_id(&self) -> ContainerId;

    /// Source container, if still loaded
    fn source(&self) -> Option<Arc<Container>>;

    /// Target container, if still loaded
    fn target(&self) -> Option<Arc<Container>>;

    /// Whether `to_source` is meaningful on its own
    fn is_bidirectional(&self) -> bool;

    /// Every target item for a source item, in target container order.
    fn to_targets(&self, item: &Markable) -> MappingResult<Vec<Markable>>;

    /// Every source item for a target item, in source container order.
    fn to_sources(&self, item: &Markable) -> MappingResult<Vec<Markable>>;

    /// First corresponding target item, `None` if there is no correspondence.
    fn to_target(&self, item: &Markable) -> MappingResult<Option<Markable>> {
        Ok(self.to_targets(item)?.into_iter().next())
    }

    /// First corresponding source item, `None` if there is no correspondence.
    fn to_source(&self, item: &Markable) -> MappingResult<Option<Markable>> {
        Ok(self.to_sources(item)?.into_iter().next())
    }
}

pub(crate) fn check_membership(item: &Markable, expected: ContainerId) -> MappingResult<()> {
    if item.container() == expected {
        Ok(())
    } else {
        Err(MappingError::ForeignItem {
            item: item.id(),
            expected,
            actual: item.container(),
        })
    }
}

pub(crate) fn attached(container: &Weak<Container>, id: ContainerId) -> MappingResult<Arc<Container>> {
    container.upgrade().ok_or(MappingError::Detached(id))
}
