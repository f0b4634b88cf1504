//! Index error types
//!
//! Error codes:
//! - CORPUS_INDEX_OUT_OF_BOUNDS (ERROR)
//! - CORPUS_INDEX_MALFORMED_MANIFEST (ERROR)
//! - CORPUS_INDEX_CHUNK_READ_FAILED (ERROR)
//! - CORPUS_INDEX_INTERNAL (FATAL)

use std::fmt;
use std::io;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The call fails, the engine continues
    Error,
    /// The engine cannot continue building
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

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Chunk index negative or past the declared chunk count
    OutOfBounds,
    /// Manifest source unreachable, strategy unknown, or source content invalid
    MalformedManifest,
    /// Reading a resolved chunk from backing storage failed
    ChunkReadFailed,
    /// Build infrastructure failure (thread pool)
    Internal,
}

impl IndexErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::OutOfBounds => "CORPUS_INDEX_OUT_OF_BOUNDS",
            IndexErrorCode::MalformedManifest => "CORPUS_INDEX_MALFORMED_MANIFEST",
            IndexErrorCode::ChunkReadFailed => "CORPUS_INDEX_CHUNK_READ_FAILED",
            IndexErrorCode::Internal => "CORPUS_INDEX_INTERNAL",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            IndexErrorCode::Internal => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with context
#[derive(Debug)]
pub struct IndexError {
    code: IndexErrorCode,
    message: String,
    manifest_id: Option<String>,
    chunk_index: Option<i64>,
    source: Option<io::Error>,
}

impl IndexError {
    fn new(code: IndexErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            manifest_id: None,
            chunk_index: None,
            source: None,
        }
    }

    /// Chunk index outside `0..chunk_count`
    pub fn out_of_bounds(chunk_index: i64, chunk_count: u64) -> Self {
        let mut err = Self::new(
            IndexErrorCode::OutOfBounds,
            format!(
                "chunk index {} outside 0..{}",
                chunk_index, chunk_count
            ),
        );
        err.chunk_index = Some(chunk_index);
        err
    }

    /// Malformed manifest without an underlying I/O cause
    pub fn malformed_manifest(manifest_id: &str, reason: impl Into<String>) -> Self {
        let mut err = Self::new(IndexErrorCode::MalformedManifest, reason);
        err.manifest_id = Some(manifest_id.to_string());
        err
    }

    /// Malformed manifest whose source could not be read
    pub fn unreachable_source(manifest_id: &str, reason: impl Into<String>, source: io::Error) -> Self {
        let mut err = Self::malformed_manifest(manifest_id, reason);
        err.source = Some(source);
        err
    }

    /// Reading chunk bytes failed
    pub fn chunk_read_failed(message: impl Into<String>, source: io::Error) -> Self {
        let mut err = Self::new(IndexErrorCode::ChunkReadFailed, message);
        err.source = Some(source);
        err
    }

    /// Build infrastructure failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(IndexErrorCode::Internal, message)
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Manifest the error belongs to, if any
    pub fn manifest_id(&self) -> Option<&str> {
        self.manifest_id.as_deref()
    }

    /// Offending chunk index, if any
    pub fn chunk_index(&self) -> Option<i64> {
        self.chunk_index
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref id) = self.manifest_id {
            write!(f, " (manifest: {})", id)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(IndexErrorCode::OutOfBounds.code(), "CORPUS_INDEX_OUT_OF_BOUNDS");
        assert_eq!(
            IndexErrorCode::MalformedManifest.code(),
            "CORPUS_INDEX_MALFORMED_MANIFEST"
        );
    }

    #[test]
    fn test_only_internal_is_fatal() {
        assert!(!IndexError::out_of_bounds(-1, 3).is_fatal());
        assert!(!IndexError::malformed_manifest("m", "bad").is_fatal());
        assert!(IndexError::internal("pool").is_fatal());
    }

    #[test]
    fn test_out_of_bounds_display() {
        let err = IndexError::out_of_bounds(7, 3);
        assert_eq!(err.chunk_index(), Some(7));
        let display = err.to_string();
        assert!(display.contains("CORPUS_INDEX_OUT_OF_BOUNDS"));
        assert!(display.contains("0..3"));
    }

    #[test]
    fn test_unreachable_source_keeps_cause() {
        use std::error::Error;
        let err = IndexError::unreachable_source(
            "tokens",
            "cannot open",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.manifest_id(), Some("tokens"));
        assert!(err.source().is_some());
        assert!(err.to_string().contains("missing"));
    }
}
