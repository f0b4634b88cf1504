//! Corpus manifest: the corpus name and its index manifests

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{CorpusError, CorpusResult};
use crate::access::{
    AccessDeclaration, AccessGate, AccessMode, AccessPolicy, AccessRestriction, AccessResult,
    Guarded,
};
use crate::index::IndexManifest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusManifest {
    name: String,
    #[serde(default)]
    indices: Vec<IndexManifest>,
}

impl Guarded for CorpusManifest {
    fn access_declaration() -> AccessDeclaration {
        AccessDeclaration::new("CorpusManifest", AccessPolicy::AllowRead)
            .restrict("rename", AccessRestriction::write())
            .restrict("add_index", AccessRestriction::write())
            .restrict("remove_index", AccessRestriction::write())
    }
}

impl CorpusManifest {
    pub fn new(name: impl Into<String>, indices: Vec<IndexManifest>) -> Self {
        Self {
            name: name.into(),
            indices,
        }
    }

    /// Read a manifest file: either a full `{name, indices}` object or a
    /// bare array of index manifests named after the file stem.
    pub fn load(path: &Path) -> CorpusResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| CorpusError::ManifestIo {
            path: path.display().to_string(),
            source: e,
        })?;

        let value: serde_json::Value = serde_json::from_str(&content)?;
        if value.is_array() {
            let indices: Vec<IndexManifest> = serde_json::from_value(value)?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "corpus".to_string());
            return Ok(Self::new(name, indices));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indices(&self) -> &[IndexManifest] {
        &self.indices
    }

    pub fn index(&self, id: &str) -> Option<&IndexManifest> {
        self.indices.iter().find(|m| m.id() == id)
    }

    /// Guarded read of the index manifests.
    pub fn list_indices(&self, gate: &AccessGate, mode: AccessMode) -> AccessResult<Vec<String>> {
        gate.guard::<Self, _, _>("list_indices", mode, || {
            self.indices.iter().map(|m| m.id().to_string()).collect()
        })
    }

    pub fn rename(
        &mut self,
        gate: &AccessGate,
        mode: AccessMode,
        name: impl Into<String>,
    ) -> AccessResult<()> {
        gate.check::<Self>("rename", mode)?;
        self.name = name.into();
        Ok(())
    }

    /// Append an index manifest, replacing one with the same id.
    pub fn add_index(
        &mut self,
        gate: &AccessGate,
        mode: AccessMode,
        manifest: IndexManifest,
    ) -> AccessResult<()> {
        gate.check::<Self>("add_index", mode)?;
        match self.indices.iter_mut().find(|m| m.id() == manifest.id()) {
            Some(existing) => *existing = manifest,
            None => self.indices.push(manifest),
        }
        Ok(())
    }

    /// Remove an index manifest; returns whether one was removed.
    pub fn remove_index(
        &mut self,
        gate: &AccessGate,
        mode: AccessMode,
        id: &str,
    ) -> AccessResult<bool> {
        gate.check::<Self>("remove_index", mode)?;
        let before = self.indices.len();
        self.indices.retain(|m| m.id() != id);
        Ok(self.indices.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{strategy, SourceDescriptor};
    use crate::observability::MetricsRegistry;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn gate() -> AccessGate {
        AccessGate::new(Arc::new(MetricsRegistry::new()))
    }

    #[test]
    fn test_load_bare_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brown.json");
        fs::write(
            &path,
            r#"[{"id": "tokens", "strategy": "line", "source": {"files": ["tokens.txt"]}}]"#,
        )
        .unwrap();

        let manifest = CorpusManifest::load(&path).unwrap();
        assert_eq!(manifest.name(), "brown");
        assert_eq!(manifest.indices().len(), 1);
        assert!(manifest.index("tokens").is_some());
    }

    #[test]
    fn test_load_object_and_reject_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.json");
        fs::write(&path, r#"{"name": "news"}"#).unwrap();
        assert_eq!(CorpusManifest::load(&path).unwrap().name(), "news");

        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            CorpusManifest::load(&path),
            Err(CorpusError::ManifestParse(_))
        ));
    }

    #[test]
    fn test_mutations_need_write() {
        let gate = gate();
        let mut manifest = CorpusManifest::new("c", Vec::new());
        let index = IndexManifest::new("t", strategy::LINE, SourceDescriptor::file("t.txt"));

        assert!(manifest.add_index(&gate, AccessMode::Read, index.clone()).is_err());
        manifest.add_index(&gate, AccessMode::Write, index.clone()).unwrap();
        manifest.add_index(&gate, AccessMode::Write, index).unwrap();
        assert_eq!(manifest.list_indices(&gate, AccessMode::Read).unwrap(), vec!["t"]);

        assert!(manifest.rename(&gate, AccessMode::Read, "x").is_err());
        assert!(manifest.remove_index(&gate, AccessMode::Write, "t").unwrap());
    }
}
