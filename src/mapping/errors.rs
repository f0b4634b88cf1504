//! # Mapping Errors

use thiserror::Error;

use super::container::{ContainerId, ItemId};

/// Result type for mapping and highlight queries
pub type MappingResult<T> = Result<T, MappingError>;

/// Cross-layer lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// The item does not belong to the container the call expects
    #[error("Foreign item: {item} belongs to container {actual}, expected {expected}")]
    ForeignItem {
        item: ItemId,
        expected: ContainerId,
        actual: ContainerId,
    },

    /// One of the connected containers has been unloaded
    #[error("Container {0} is no longer loaded")]
    Detached(ContainerId),

    /// Item ids must be unique within a container
    #[error("Duplicate item {item} in container {container}")]
    DuplicateItem { container: ContainerId, item: ItemId },

    /// Span lookups need items ordered by begin offset
    #[error("Container {0} is not ordered by span begin")]
    UnorderedContainer(ContainerId),

    /// Position past the end of the container
    #[error("Container {container} has no item at position {position}")]
    NoSuchPosition { container: ContainerId, position: usize },

    /// Secondary highlight layer index past the declared count
    #[error("Highlight layer {layer} out of range (count {count})")]
    LayerOutOfRange { layer: usize, count: usize },
}

impl MappingError {
    /// Whether the caller passed an item from the wrong container
    pub fn is_foreign(&self) -> bool {
        matches!(self, MappingError::ForeignItem { .. })
    }
}
