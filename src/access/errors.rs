//! # Access Errors

use thiserror::Error;

use super::policy::{AccessMode, Requirement};

/// Result type for access checks
pub type AccessResult<T> = Result<T, AccessError>;

/// Access control errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The caller's mode does not satisfy the operation's requirement
    #[error("Access denied: {interface}::{operation} requires {required}, caller supplied {supplied}")]
    AccessDenied {
        interface: &'static str,
        operation: String,
        required: Requirement,
        supplied: AccessMode,
    },

    /// The resolution cache lock was poisoned by a panicking thread
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccessError {
    /// Denials are final. Callers must not work around them.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Whether this is a policy decision rather than an internal failure
    pub fn is_denial(&self) -> bool {
        matches!(self, AccessError::AccessDenied { .. })
    }
}
