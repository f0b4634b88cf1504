//! Segment lifecycle state machine
//!
//! `Loading -> Loaded -> Releasing -> Closed`
//!
//! - Transitions are explicit and only move forward
//! - `Closed` is terminal; re-access needs a new segment instance
//! - Only `Loaded` segments accept new owners

use serde::{Deserialize, Serialize};

use super::errors::{SegmentError, SegmentResult};
use super::owner::SegmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentState {
    /// Data is being brought in; no owners yet
    Loading,
    /// Data available; owners may acquire
    Loaded,
    /// Unload requested; waiting for owners to release
    Releasing,
    /// Unloaded; resolvers dropped
    Closed,
}

impl SegmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentState::Loading => "loading",
            SegmentState::Loaded => "loaded",
            SegmentState::Releasing => "releasing",
            SegmentState::Closed => "closed",
        }
    }

    /// Whether `self -> next` is a legal edge
    pub fn can_transition_to(&self, next: SegmentState) -> bool {
        matches!(
            (self, next),
            (SegmentState::Loading, SegmentState::Loaded)
                | (SegmentState::Loaded, SegmentState::Releasing)
                | (SegmentState::Releasing, SegmentState::Closed)
        )
    }

    /// Checked transition
    pub fn transition(&self, segment: SegmentId, next: SegmentState) -> SegmentResult<SegmentState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SegmentError::illegal_state(
                segment,
                format!(
                    "segment {} cannot move from {} to {}",
                    segment,
                    self.as_str(),
                    next.as_str()
                ),
            ))
        }
    }

    pub fn accepts_owners(&self) -> bool {
        *self == SegmentState::Loaded
    }

    /// Whether built indices are still reachable
    pub fn serves_indices(&self) -> bool {
        matches!(self, SegmentState::Loaded | SegmentState::Releasing)
    }

    pub fn is_terminal(&self) -> bool {
        *self == SegmentState::Closed
    }
}
