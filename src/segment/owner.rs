//! Owner and segment identities, and the owner capability contract

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of one loaded segment instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(Uuid);

impl SegmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one owner capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A party keeping a segment resident.
///
/// The registry only holds a weak handle; dropping the last strong
/// reference counts as having released.
pub trait CorpusOwner: Send + Sync {
    fn owner_id(&self) -> OwnerId;

    /// Try to disconnect from the segment.
    ///
    /// `true` means the owner let go and may be deregistered. `false` means
    /// "not yet". Must return promptly; it is invoked without any registry
    /// lock held and may call back into the registry.
    fn release(&self) -> bool;
}
