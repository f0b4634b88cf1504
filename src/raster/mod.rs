//! Fragment rasterization
//!
//! Discretizes markables and their annotation values into positions of a
//! fixed multi-axis space.
//!
//! # Invariants
//!
//! - A rasterizer has at least one axis and every axis has granularity > 0
//! - A position has exactly one coordinate per axis
//! - Positions are ordered by axis priority, never by magnitude across axes

mod axis;
mod character;
mod errors;
mod rasterizer;
mod timeline;
mod value;

pub use axis::{Axis, Position};
pub use character::CharacterRasterizer;
pub use errors::{RasterError, RasterResult};
pub use rasterizer::{compare_by_axes, Rasterizer};
pub use timeline::{TimelineRasterizer, LANE_AXIS, TIME_AXIS};
pub use value::{AnnotationValue, FragmentLayer, ValueKind};
