//! Corpus subsystem for corpusdb
//!
//! Binds a corpus manifest to the shared services of a `CorpusContext`:
//! index manifests are built into segments, chunks are resolved and read
//! through them, and consumers hold segments resident as owners.
//!
//! # Design Principles
//!
//! - Explicit context: services are constructed once and passed by `Arc`
//! - Manifest edits are access-checked; open segments never see them

mod context;
mod engine;
mod errors;
mod manifest;

pub use context::CorpusContext;
pub use engine::Corpus;
pub use errors::{CorpusError, CorpusResult};
pub use manifest::CorpusManifest;
