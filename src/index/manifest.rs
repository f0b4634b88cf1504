//! Declarative index manifests supplied by drivers
//!
//! A manifest names an indexing strategy and the source it indexes. The
//! source payload is opaque to this layer apart from the file list and the
//! strategy options each builder reads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{IndexError, IndexResult};
use crate::access::{
    AccessDeclaration, AccessError, AccessGate, AccessMode, AccessPolicy, AccessRestriction,
    AccessResult, Guarded,
};

/// Strategy identifiers understood by the built-in builders
pub mod strategy {
    pub const FIXED_SIZE: &str = "fixed-size";
    pub const SEQUENTIAL_OFFSET: &str = "sequential-offset";
    pub const LINE: &str = "line";
    pub const SORTED_KEY: &str = "sorted-key";
    pub const SORT_MERGE: &str = "sort-merge";
}

/// Where an index reads its backing data from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

impl SourceDescriptor {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            files: vec![path.into()],
            options: BTreeMap::new(),
        }
    }

    pub fn files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: paths.into_iter().map(Into::into).collect(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// Declarative description of one index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    id: String,
    strategy: String,
    source: SourceDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_chunks: Option<u64>,
}

impl Guarded for IndexManifest {
    fn access_declaration() -> AccessDeclaration {
        AccessDeclaration::new("IndexManifest", AccessPolicy::AllowRead)
            .restrict("set_source", AccessRestriction::write())
            .restrict("set_expected_chunks", AccessRestriction::write())
    }
}

impl IndexManifest {
    pub fn new(id: impl Into<String>, strategy: impl Into<String>, source: SourceDescriptor) -> Self {
        Self {
            id: id.into(),
            strategy: strategy.into(),
            source,
            expected_chunks: None,
        }
    }

    pub fn with_expected_chunks(mut self, count: u64) -> Self {
        self.expected_chunks = Some(count);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    pub fn expected_chunks(&self) -> Option<u64> {
        self.expected_chunks
    }

    /// Guarded read of the whole manifest as JSON.
    pub fn describe(&self, gate: &AccessGate, mode: AccessMode) -> AccessResult<Value> {
        gate.guard::<Self, _, _>("describe", mode, || {
            serde_json::to_value(self).map_err(|e| {
                AccessError::Internal(format!("cannot describe manifest '{}': {}", self.id, e))
            })
        })?
    }

    /// Guarded replacement of the source descriptor.
    pub fn set_source(
        &mut self,
        gate: &AccessGate,
        mode: AccessMode,
        source: SourceDescriptor,
    ) -> AccessResult<()> {
        gate.check::<Self>("set_source", mode)?;
        self.source = source;
        Ok(())
    }

    /// Guarded change of the declared chunk count.
    pub fn set_expected_chunks(
        &mut self,
        gate: &AccessGate,
        mode: AccessMode,
        count: Option<u64>,
    ) -> AccessResult<()> {
        gate.check::<Self>("set_expected_chunks", mode)?;
        self.expected_chunks = count;
        Ok(())
    }

    /// The only source file, for single-file strategies.
    pub(crate) fn single_file(&self, base_dir: Option<&Path>) -> IndexResult<PathBuf> {
        match self.source.files.as_slice() {
            [file] => Ok(resolve_path(base_dir, file)),
            files => Err(IndexError::malformed_manifest(
                &self.id,
                format!(
                    "strategy '{}' needs exactly one source file, got {}",
                    self.strategy,
                    files.len()
                ),
            )),
        }
    }

    /// All source files, at least one.
    pub(crate) fn all_files(&self, base_dir: Option<&Path>) -> IndexResult<Vec<PathBuf>> {
        if self.source.files.is_empty() {
            return Err(IndexError::malformed_manifest(
                &self.id,
                format!("strategy '{}' needs at least one source file", self.strategy),
            ));
        }
        Ok(self
            .source
            .files
            .iter()
            .map(|f| resolve_path(base_dir, f))
            .collect())
    }

    /// A positive integer option, if present.
    pub(crate) fn positive_option(&self, key: &str) -> IndexResult<Option<u64>> {
        match self.source.options.get(key) {
            None => Ok(None),
            Some(value) => match value.as_u64() {
                Some(n) if n > 0 => Ok(Some(n)),
                _ => Err(IndexError::malformed_manifest(
                    &self.id,
                    format!("option '{}' must be a positive integer, got {}", key, value),
                )),
            },
        }
    }
}

/// Join relative paths onto the base directory.
pub(crate) fn resolve_path(base_dir: Option<&Path>, path: &Path) -> PathBuf {
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}
