//! Corpus: a named collection of indices served through segments

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use super::context::CorpusContext;
use super::errors::{CorpusError, CorpusResult};
use super::manifest::CorpusManifest;
use crate::access::AccessMode;
use crate::index::{ChunkPath, ChunkReader, Index, IndexBuildReport, IndexManifest};
use crate::segment::{CorpusOwner, OwnerId, ReleaseOutcome, SegmentId, SegmentInfo, SegmentState};

#[derive(Debug)]
pub struct Corpus {
    context: Arc<CorpusContext>,
    manifest: RwLock<CorpusManifest>,
    segments: Mutex<Vec<SegmentId>>,
}

impl Corpus {
    pub fn open(context: Arc<CorpusContext>, manifest: CorpusManifest) -> Self {
        Self {
            context,
            manifest: RwLock::new(manifest),
            segments: Mutex::new(Vec::new()),
        }
    }

    pub fn context(&self) -> &Arc<CorpusContext> {
        &self.context
    }

    fn owned(&self) -> CorpusResult<MutexGuard<'_, Vec<SegmentId>>> {
        self.segments
            .lock()
            .map_err(|_| CorpusError::Internal("Lock poisoned".to_string()))
    }

    /// Build `manifests` and publish the successful indices as a new
    /// `Loaded` segment. Failed manifests are reported, not fatal.
    pub fn open_segment(
        &self,
        label: &str,
        manifests: &[IndexManifest],
    ) -> CorpusResult<(SegmentId, IndexBuildReport)> {
        let report = self.context.factory().create_indices(manifests);
        let registry = self.context.registry();
        let segment = registry.create_segment(label, report.indices.clone())?;
        registry.mark_loaded(segment)?;
        self.owned()?.push(segment);
        Ok((segment, report))
    }

    /// Open one segment serving every index in the corpus manifest.
    pub fn open_all(&self, label: &str) -> CorpusResult<(SegmentId, IndexBuildReport)> {
        let manifests = self.manifest()?.indices().to_vec();
        self.open_segment(label, &manifests)
    }

    pub fn index(&self, segment: SegmentId, index_id: &str) -> CorpusResult<Index> {
        self.context
            .registry()
            .index(segment, index_id)?
            .ok_or_else(|| CorpusError::UnknownIndex {
                segment,
                index: index_id.to_string(),
            })
    }

    /// Physical location of chunk `chunk` of `index_id` in `segment`.
    pub fn resolve(&self, segment: SegmentId, index_id: &str, chunk: i64) -> CorpusResult<ChunkPath> {
        let path = self.index(segment, index_id)?.path(chunk)?;
        self.context.metrics().increment_paths_resolved();
        Ok(path)
    }

    /// Chunk index stored under `key`, for keyed indices.
    pub fn find_key(&self, segment: SegmentId, index_id: &str, key: &str) -> CorpusResult<Option<u64>> {
        Ok(self.index(segment, index_id)?.find_key(key))
    }

    /// Resolve and read a chunk into `reader`'s buffer.
    pub fn read_chunk<'r>(
        &self,
        segment: SegmentId,
        index_id: &str,
        chunk: i64,
        reader: &'r mut ChunkReader,
    ) -> CorpusResult<&'r [u8]> {
        let path = self.resolve(segment, index_id, chunk)?;
        Ok(reader.read(&path)?)
    }

    pub fn acquire(&self, owner: &Arc<dyn CorpusOwner>, segment: SegmentId) -> CorpusResult<()> {
        Ok(self.context.registry().acquire(owner, segment)?)
    }

    /// Returns whether the deregistration closed the owner's segment.
    pub fn deregister(&self, owner: OwnerId) -> CorpusResult<bool> {
        Ok(self.context.registry().deregister(owner)?)
    }

    /// Ask owners to let go, retrying with the configured backoff.
    pub fn release_segment(&self, segment: SegmentId) -> CorpusResult<ReleaseOutcome> {
        let policy = &self.context.config().release;
        Ok(self.context.registry().release_with_backoff(segment, policy)?)
    }

    /// Drop closed segments from this corpus and from the registry.
    pub fn forget_closed(&self) -> CorpusResult<Vec<SegmentId>> {
        let registry = self.context.registry();
        let mut owned = self.owned()?;
        let mut forgotten = Vec::new();
        for id in owned.iter().copied() {
            if registry.state(id)? == SegmentState::Closed {
                registry.forget(id)?;
                forgotten.push(id);
            }
        }
        owned.retain(|id| !forgotten.contains(id));
        Ok(forgotten)
    }

    /// Segments opened through this corpus, in opening order.
    pub fn segments(&self) -> CorpusResult<Vec<SegmentInfo>> {
        let ids = self.owned()?.clone();
        let registry = self.context.registry();
        let mut infos = Vec::with_capacity(ids.len());
        for id in ids {
            infos.push(registry.segment_info(id)?);
        }
        Ok(infos)
    }

    /// Snapshot of the current manifest.
    pub fn manifest(&self) -> CorpusResult<CorpusManifest> {
        self.manifest
            .read()
            .map(|m| m.clone())
            .map_err(|_| CorpusError::Internal("Lock poisoned".to_string()))
    }

    pub fn name(&self) -> CorpusResult<String> {
        Ok(self.manifest()?.name().to_string())
    }

    pub fn list_indices(&self, mode: AccessMode) -> CorpusResult<Vec<String>> {
        Ok(self.manifest()?.list_indices(self.context.gate(), mode)?)
    }

    /// Apply a guarded mutation to the manifest under the write lock.
    fn edit_manifest<R>(
        &self,
        f: impl FnOnce(&mut CorpusManifest) -> crate::access::AccessResult<R>,
    ) -> CorpusResult<R> {
        let mut manifest = self
            .manifest
            .write()
            .map_err(|_| CorpusError::Internal("Lock poisoned".to_string()))?;
        Ok(f(&mut manifest)?)
    }

    pub fn rename(&self, mode: AccessMode, name: &str) -> CorpusResult<()> {
        let gate = self.context.gate();
        self.edit_manifest(|m| m.rename(gate, mode, name))
    }

    /// Add or replace an index manifest. Open segments are unaffected.
    pub fn add_index(&self, mode: AccessMode, manifest: IndexManifest) -> CorpusResult<()> {
        let gate = self.context.gate();
        self.edit_manifest(|m| m.add_index(gate, mode, manifest))
    }

    pub fn remove_index(&self, mode: AccessMode, id: &str) -> CorpusResult<bool> {
        let gate = self.context.gate();
        self.edit_manifest(|m| m.remove_index(gate, mode, id))
    }
}
