//! Chunk index subsystem for corpusdb
//!
//! Translates logical chunk indices into physical `(file, offset, length)`
//! locations, and builds those translations from declarative manifests.
//!
//! # Design Principles
//!
//! - Build once: a builder scans its source a single time
//! - Immutable: a built `Index` never changes and is shared freely across threads
//! - Fail-soft batches: one bad manifest never aborts its siblings
//!
//! # Invariants
//!
//! - Chunk indices are dense, zero-based, and bounded by the declared count
//! - `path(i)` is deterministic for the lifetime of the index
//! - Resolution is `O(1)` (fixed-size, offset tables) or `O(log n)` (key lookup)

mod builders;
mod errors;
mod factory;
mod manifest;
mod path;
mod reader;

pub use builders::{
    builtin_builders, encode_frame, BuildContext, FixedSizeBuilder, IndexBuilder, LineBuilder,
    SequentialOffsetBuilder, SortMergeBuilder, SortedKeyBuilder, FRAME_HEADER_LEN,
};
pub use errors::{IndexError, IndexErrorCode, IndexResult, Severity};
pub use factory::{IndexBuildReport, IndexFactory, ManifestFailure};
pub use manifest::{strategy, IndexManifest, SourceDescriptor};
pub use path::{
    ChunkPath, FixedSizeResolver, Index, KeyTableResolver, KeyedChunk, OffsetTableResolver,
    PathResolver,
};
pub use reader::ChunkReader;
