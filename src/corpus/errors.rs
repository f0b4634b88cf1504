//! Corpus Error Types
//!
//! Wraps the subsystem errors a corpus operation can surface.

use std::io;

use thiserror::Error;

use crate::access::AccessError;
use crate::config::ConfigError;
use crate::index::IndexError;
use crate::segment::{SegmentError, SegmentId};

/// Corpus result type
pub type CorpusResult<T> = Result<T, CorpusError>;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The segment serves no index with this manifest id
    #[error("Segment {segment} has no index '{index}'")]
    UnknownIndex { segment: SegmentId, index: String },

    #[error("Cannot read corpus manifest {path}: {source}")]
    ManifestIo {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid corpus manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CorpusError {
    /// Stable code for reports
    pub fn code(&self) -> &'static str {
        match self {
            Self::Index(e) => e.code().code(),
            Self::Segment(e) => e.code().code(),
            Self::Access(AccessError::AccessDenied { .. }) => "CORPUS_ACCESS_DENIED",
            Self::Access(AccessError::Internal(_)) => "CORPUS_ACCESS_INTERNAL",
            Self::Config(_) => "CORPUS_CONFIG_INVALID",
            Self::UnknownIndex { .. } => "CORPUS_UNKNOWN_INDEX",
            Self::ManifestIo { .. } | Self::ManifestParse(_) => "CORPUS_MANIFEST_UNREADABLE",
            Self::Internal(_) => "CORPUS_INTERNAL",
        }
    }
}
