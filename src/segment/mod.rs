//! Segment lifecycle subsystem for corpusdb
//!
//! A segment is an independently loadable slice of a corpus. Owners keep
//! it resident; the registry coordinates unloading.
//!
//! # Design Principles
//!
//! - One direction of ownership: the registry holds weak owner handles,
//!   owners hold only a `SegmentId`
//! - No forced close: a segment with live owners stays `Releasing`
//! - `release() == false` is a "not yet" signal, not an error
//!
//! # Invariants
//!
//! - `Closed` is reachable only with zero owners
//! - An owner is bound to at most one segment at a time
//! - `Closed` never transitions back to `Loaded`

mod errors;
mod owner;
mod registry;
mod state;

pub use errors::{SegmentError, SegmentErrorCode, SegmentResult, Severity};
pub use owner::{CorpusOwner, OwnerId, SegmentId};
pub use registry::{OwnershipRegistry, ReleaseOutcome, SegmentInfo};
pub use state::SegmentState;
