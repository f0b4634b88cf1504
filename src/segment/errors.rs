//! Segment lifecycle error types
//!
//! Error codes:
//! - CORPUS_SEGMENT_ILLEGAL_OWNERSHIP (ERROR)
//! - CORPUS_SEGMENT_UNAVAILABLE (ERROR)
//! - CORPUS_SEGMENT_ILLEGAL_STATE (ERROR)
//! - CORPUS_SEGMENT_UNKNOWN (ERROR)
//! - CORPUS_SEGMENT_INTERNAL (FATAL)
//!
//! Ownership errors are fatal to the offending call only; the registry
//! stays consistent and usable.

use std::fmt;

use super::owner::{OwnerId, SegmentId};

/// Severity levels for segment errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Segment-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentErrorCode {
    /// Owner registered against a second segment, or not registered at all
    IllegalOwnershipState,
    /// Segment not accepting owners or serving indices in its current state
    SegmentUnavailable,
    /// Requested lifecycle transition is not allowed
    IllegalSegmentState,
    /// No segment with this id
    UnknownSegment,
    /// Registry lock poisoned
    Internal,
}

impl SegmentErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            SegmentErrorCode::IllegalOwnershipState => "CORPUS_SEGMENT_ILLEGAL_OWNERSHIP",
            SegmentErrorCode::SegmentUnavailable => "CORPUS_SEGMENT_UNAVAILABLE",
            SegmentErrorCode::IllegalSegmentState => "CORPUS_SEGMENT_ILLEGAL_STATE",
            SegmentErrorCode::UnknownSegment => "CORPUS_SEGMENT_UNKNOWN",
            SegmentErrorCode::Internal => "CORPUS_SEGMENT_INTERNAL",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            SegmentErrorCode::Internal => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for SegmentErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Segment error with the ids involved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentError {
    code: SegmentErrorCode,
    message: String,
    segment: Option<SegmentId>,
    owner: Option<OwnerId>,
}

impl SegmentError {
    fn new(code: SegmentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            segment: None,
            owner: None,
        }
    }

    /// Owner already bound to `bound`, attempted to join `requested`
    pub fn owner_already_bound(owner: OwnerId, bound: SegmentId, requested: SegmentId) -> Self {
        let mut err = Self::new(
            SegmentErrorCode::IllegalOwnershipState,
            format!(
                "owner {} holds segment {} and cannot register against {}",
                owner, bound, requested
            ),
        );
        err.segment = Some(requested);
        err.owner = Some(owner);
        err
    }

    /// Owner is not registered against any segment
    pub fn owner_not_registered(owner: OwnerId) -> Self {
        let mut err = Self::new(
            SegmentErrorCode::IllegalOwnershipState,
            format!("owner {} is not registered", owner),
        );
        err.owner = Some(owner);
        err
    }

    pub fn unavailable(segment: SegmentId, reason: impl Into<String>) -> Self {
        let mut err = Self::new(SegmentErrorCode::SegmentUnavailable, reason);
        err.segment = Some(segment);
        err
    }

    pub fn illegal_state(segment: SegmentId, reason: impl Into<String>) -> Self {
        let mut err = Self::new(SegmentErrorCode::IllegalSegmentState, reason);
        err.segment = Some(segment);
        err
    }

    pub fn unknown(segment: SegmentId) -> Self {
        let mut err = Self::new(
            SegmentErrorCode::UnknownSegment,
            format!("segment {} does not exist", segment),
        );
        err.segment = Some(segment);
        err
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(SegmentErrorCode::Internal, message)
    }

    pub fn code(&self) -> SegmentErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn segment(&self) -> Option<SegmentId> {
        self.segment
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SegmentError {}

/// Result type for segment operations
pub type SegmentResult<T> = Result<T, SegmentError>;
