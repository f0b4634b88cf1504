//! Chunk locations and the resolvers that produce them
//!
//! A built index is immutable: the same chunk index resolves to the same
//! `ChunkPath` for the index's whole lifetime, and resolvers are shared
//! between threads without synchronization.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{IndexError, IndexResult};

/// Physical location of one chunk: `(file, offset, length)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPath {
    pub file: PathBuf,
    pub offset: u64,
    pub length: u64,
}

impl ChunkPath {
    pub fn new(file: impl Into<PathBuf>, offset: u64, length: u64) -> Self {
        Self {
            file: file.into(),
            offset,
            length,
        }
    }

    /// First byte past the chunk
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

impl fmt::Display for ChunkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}+{}", self.file.display(), self.offset, self.length)
    }
}

/// Translates dense zero-based chunk indices into locations.
pub trait PathResolver: Send + Sync + fmt::Debug {
    /// Declared number of chunks
    fn chunk_count(&self) -> u64;

    /// Location of a chunk, `None` past the end.
    fn locate(&self, chunk_index: u64) -> Option<ChunkPath>;

    /// Chunk index of a key, for key-ordered resolvers.
    fn find_key(&self, _key: &str) -> Option<u64> {
        None
    }

    /// Bounds-checked resolution.
    fn path(&self, chunk_index: i64) -> IndexResult<ChunkPath> {
        u64::try_from(chunk_index)
            .ok()
            .and_then(|i| self.locate(i))
            .ok_or_else(|| IndexError::out_of_bounds(chunk_index, self.chunk_count()))
    }
}

/// Equal-sized chunks over one file; the last chunk may be short.
#[derive(Debug)]
pub struct FixedSizeResolver {
    file: PathBuf,
    file_len: u64,
    chunk_size: u64,
}

impl FixedSizeResolver {
    pub fn new(file: PathBuf, file_len: u64, chunk_size: u64) -> Self {
        Self {
            file,
            file_len,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl PathResolver for FixedSizeResolver {
    fn chunk_count(&self) -> u64 {
        self.file_len.div_ceil(self.chunk_size)
    }

    fn locate(&self, chunk_index: u64) -> Option<ChunkPath> {
        let offset = chunk_index
            .checked_mul(self.chunk_size)
            .filter(|offset| *offset < self.file_len)?;
        let length = self.chunk_size.min(self.file_len - offset);
        Some(ChunkPath::new(self.file.clone(), offset, length))
    }
}

/// Explicit `(offset, length)` table over one file, built by a single scan.
#[derive(Debug)]
pub struct OffsetTableResolver {
    file: PathBuf,
    entries: Vec<(u64, u64)>,
}

impl OffsetTableResolver {
    pub fn new(file: PathBuf, entries: Vec<(u64, u64)>) -> Self {
        Self { file, entries }
    }
}

impl PathResolver for OffsetTableResolver {
    fn chunk_count(&self) -> u64 {
        self.entries.len() as u64
    }

    fn locate(&self, chunk_index: u64) -> Option<ChunkPath> {
        let &(offset, length) = self.entries.get(usize::try_from(chunk_index).ok()?)?;
        Some(ChunkPath::new(self.file.clone(), offset, length))
    }
}

/// One row of a key table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedChunk {
    pub key: String,
    pub path: ChunkPath,
}

/// Key-ordered chunk table; chunk `i` is the `i`-th key.
#[derive(Debug)]
pub struct KeyTableResolver {
    rows: Vec<KeyedChunk>,
}

impl KeyTableResolver {
    /// `rows` must already be strictly ascending by key.
    pub fn from_sorted(rows: Vec<KeyedChunk>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].key < w[1].key));
        Self { rows }
    }

    pub fn key_at(&self, chunk_index: u64) -> Option<&str> {
        self.rows.get(chunk_index as usize).map(|r| r.key.as_str())
    }
}

impl PathResolver for KeyTableResolver {
    fn chunk_count(&self) -> u64 {
        self.rows.len() as u64
    }

    fn locate(&self, chunk_index: u64) -> Option<ChunkPath> {
        let row = self.rows.get(usize::try_from(chunk_index).ok()?)?;
        Some(row.path.clone())
    }

    fn find_key(&self, key: &str) -> Option<u64> {
        self.rows
            .binary_search_by(|row| row.key.as_str().cmp(key))
            .ok()
            .map(|i| i as u64)
    }
}

/// A built index: manifest identity plus its immutable resolver
#[derive(Debug, Clone)]
pub struct Index {
    manifest_id: String,
    strategy: String,
    resolver: Arc<dyn PathResolver>,
}

impl Index {
    pub fn new(
        manifest_id: impl Into<String>,
        strategy: impl Into<String>,
        resolver: Arc<dyn PathResolver>,
    ) -> Self {
        Self {
            manifest_id: manifest_id.into(),
            strategy: strategy.into(),
            resolver,
        }
    }

    pub fn manifest_id(&self) -> &str {
        &self.manifest_id
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn resolver(&self) -> Arc<dyn PathResolver> {
        Arc::clone(&self.resolver)
    }

    pub fn chunk_count(&self) -> u64 {
        self.resolver.chunk_count()
    }

    pub fn path(&self, chunk_index: i64) -> IndexResult<ChunkPath> {
        self.resolver.path(chunk_index)
    }

    pub fn find_key(&self, key: &str) -> Option<u64> {
        self.resolver.find_key(key)
    }
}
