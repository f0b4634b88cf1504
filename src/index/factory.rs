//! # Index Factory
//!
//! Turns an ordered batch of manifests into built indices.
//!
//! - Dispatch is by strategy identifier; unknown strategies fail the
//!   manifest, not the batch.
//! - Every manifest is attempted. Failures are collected with their batch
//!   position and returned next to the indices that did build.
//! - Builds may run on the rayon pool; the report is assembled only after
//!   all of them have finished, in manifest order.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use super::builders::{builtin_builders, BuildContext, IndexBuilder};
use super::errors::{IndexError, IndexResult};
use super::manifest::IndexManifest;
use super::path::Index;
use crate::config::IndexConfig;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};

/// One manifest that did not produce an index
#[derive(Debug)]
pub struct ManifestFailure {
    /// Zero-based position of the manifest in the batch
    pub position: usize,
    pub manifest_id: String,
    pub error: IndexError,
}

/// Outcome of `IndexFactory::create_indices`
#[derive(Debug, Default)]
pub struct IndexBuildReport {
    /// Built indices, in manifest order
    pub indices: Vec<Index>,
    pub failures: Vec<ManifestFailure>,
}

impl IndexBuildReport {
    /// True when every manifest built
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn index(&self, manifest_id: &str) -> Option<&Index> {
        self.indices.iter().find(|i| i.manifest_id() == manifest_id)
    }

    pub fn failure(&self, manifest_id: &str) -> Option<&ManifestFailure> {
        self.failures.iter().find(|f| f.manifest_id == manifest_id)
    }

    /// Split into indices and failures
    pub fn into_parts(self) -> (Vec<Index>, Vec<ManifestFailure>) {
        (self.indices, self.failures)
    }
}

/// Strategy dispatcher and batch builder
pub struct IndexFactory {
    builders: HashMap<String, Arc<dyn IndexBuilder>>,
    context: BuildContext,
    parallel: bool,
    pool: Option<rayon::ThreadPool>,
    metrics: Arc<MetricsRegistry>,
}

impl std::fmt::Debug for IndexFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexFactory")
            .field("strategies", &self.strategies())
            .field("context", &self.context)
            .field("parallel", &self.parallel)
            .finish()
    }
}

impl IndexFactory {
    /// Factory with every built-in strategy registered.
    pub fn new(config: &IndexConfig, metrics: Arc<MetricsRegistry>) -> IndexResult<Self> {
        let pool = match config.build_threads {
            Some(threads) if config.parallel_build => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("corpusdb-index-{}", i))
                    .build()
                    .map_err(|e| IndexError::internal(format!("index build pool: {}", e)))?,
            ),
            _ => None,
        };

        let mut factory = Self {
            builders: HashMap::new(),
            context: BuildContext {
                base_dir: None,
                default_chunk_size: config.chunk_size_bytes,
            },
            parallel: config.parallel_build,
            pool,
            metrics,
        };
        for builder in builtin_builders() {
            factory.register(builder);
        }
        Ok(factory)
    }

    /// Resolve relative manifest paths against `dir`.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.context.base_dir = Some(dir.into());
        self
    }

    /// Add a builder, replacing any registered under the same identifier.
    /// Returns whether one was replaced.
    pub fn register(&mut self, builder: Box<dyn IndexBuilder>) -> bool {
        let strategy = builder.strategy().to_string();
        self.builders.insert(strategy, Arc::from(builder)).is_some()
    }

    /// Registered strategy identifiers, sorted
    pub fn strategies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a single manifest.
    pub fn create_index(&self, manifest: &IndexManifest) -> IndexResult<Index> {
        log_event_with_fields(
            Event::IndexBuildStart,
            &[("manifest", manifest.id()), ("strategy", manifest.strategy())],
        );

        let builder = self.builders.get(manifest.strategy()).ok_or_else(|| {
            IndexError::malformed_manifest(
                manifest.id(),
                format!("unknown strategy '{}'", manifest.strategy()),
            )
        })?;

        let resolver = builder.build(manifest, &self.context)?;

        if let Some(expected) = manifest.expected_chunks() {
            let built = resolver.chunk_count();
            if built != expected {
                return Err(IndexError::malformed_manifest(
                    manifest.id(),
                    format!("declared {} chunks, source has {}", expected, built),
                ));
            }
        }

        Ok(Index::new(manifest.id(), manifest.strategy(), resolver))
    }

    fn build_all(&self, manifests: &[IndexManifest]) -> Vec<IndexResult<Index>> {
        if !self.parallel {
            return manifests.iter().map(|m| self.create_index(m)).collect();
        }
        let run = || -> Vec<IndexResult<Index>> {
            manifests.par_iter().map(|m| self.create_index(m)).collect()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    /// Build every manifest; never aborts on a single failure.
    pub fn create_indices(&self, manifests: &[IndexManifest]) -> IndexBuildReport {
        let batch_size = manifests.len().to_string();
        let scope = ObservationScope::with_fields("INDEX_BATCH", &[("manifests", batch_size.as_str())]);

        let mut report = IndexBuildReport::default();
        for (position, (manifest, result)) in manifests.iter().zip(self.build_all(manifests)).enumerate() {
            match result {
                Ok(index) => {
                    self.metrics.increment_indices_built();
                    let chunks = index.chunk_count().to_string();
                    log_event_with_fields(
                        Event::IndexBuildComplete,
                        &[("manifest", manifest.id()), ("chunks", chunks.as_str())],
                    );
                    report.indices.push(index);
                }
                Err(error) => {
                    self.metrics.increment_manifest_failures();
                    let position_text = position.to_string();
                    log_event_with_fields(
                        Event::IndexBuildFailed,
                        &[
                            ("manifest", manifest.id()),
                            ("position", position_text.as_str()),
                            ("code", error.code().code()),
                            ("reason", error.message()),
                        ],
                    );
                    report.failures.push(ManifestFailure {
                        position,
                        manifest_id: manifest.id().to_string(),
                        error,
                    });
                }
            }
        }

        let built = report.indices.len().to_string();
        let failed = report.failures.len().to_string();
        scope.complete_with_fields(&[("built", built.as_str()), ("failed", failed.as_str())]);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::errors::IndexErrorCode;
    use crate::index::manifest::{strategy, SourceDescriptor};
    use crate::index::path::{ChunkPath, OffsetTableResolver, PathResolver};
    use std::fs;
    use tempfile::TempDir;

    fn factory(dir: &TempDir, parallel: bool) -> (IndexFactory, Arc<MetricsRegistry>) {
        let metrics = Arc::new(MetricsRegistry::new());
        let config = IndexConfig {
            parallel_build: parallel,
            build_threads: Some(2),
            chunk_size_bytes: 4,
        };
        let factory = IndexFactory::new(&config, Arc::clone(&metrics))
            .unwrap()
            .with_base_dir(dir.path());
        (factory, metrics)
    }

    fn corpus_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tokens.bin"), b"0123456789ab").unwrap();
        fs::write(dir.path().join("lines.txt"), b"a\nb\n").unwrap();
        dir
    }

    #[test]
    fn test_builtin_strategies_registered() {
        let dir = corpus_dir();
        let (factory, _) = factory(&dir, true);
        assert_eq!(
            factory.strategies(),
            vec!["fixed-size", "line", "sequential-offset", "sort-merge", "sorted-key"]
        );
    }

    #[test]
    fn test_unknown_strategy_fails_soft() {
        let dir = corpus_dir();
        let (factory, metrics) = factory(&dir, true);
        let manifests = vec![
            IndexManifest::new("tokens", strategy::FIXED_SIZE, SourceDescriptor::file("tokens.bin")),
            IndexManifest::new("bogus", "b-tree", SourceDescriptor::file("tokens.bin")),
            IndexManifest::new("lines", strategy::LINE, SourceDescriptor::file("lines.txt")),
        ];

        let report = factory.create_indices(&manifests);
        assert_eq!(report.indices.len(), 2);
        assert_eq!(report.indices[0].manifest_id(), "tokens");
        assert_eq!(report.indices[1].manifest_id(), "lines");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].position, 1);
        assert_eq!(report.failures[0].error.code(), IndexErrorCode::MalformedManifest);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.indices_built, 2);
        assert_eq!(snapshot.manifest_failures, 1);
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let dir = corpus_dir();
        let manifests = vec![
            IndexManifest::new("tokens", strategy::FIXED_SIZE, SourceDescriptor::file("tokens.bin")),
            IndexManifest::new("lines", strategy::LINE, SourceDescriptor::file("lines.txt")),
        ];
        let (parallel, _) = factory(&dir, true);
        let (sequential, _) = factory(&dir, false);

        let a = parallel.create_indices(&manifests);
        let b = sequential.create_indices(&manifests);
        for (x, y) in a.indices.iter().zip(&b.indices) {
            assert_eq!(x.manifest_id(), y.manifest_id());
            assert_eq!(x.chunk_count(), y.chunk_count());
            assert_eq!(x.path(0).unwrap(), y.path(0).unwrap());
        }
    }

    #[test]
    fn test_expected_chunks_mismatch() {
        let dir = corpus_dir();
        let (factory, _) = factory(&dir, false);
        let ok = IndexManifest::new("t", strategy::FIXED_SIZE, SourceDescriptor::file("tokens.bin"))
            .with_expected_chunks(3);
        let bad = IndexManifest::new("l", strategy::LINE, SourceDescriptor::file("lines.txt"))
            .with_expected_chunks(5);

        assert_eq!(factory.create_index(&ok).unwrap().chunk_count(), 3);
        let err = factory.create_index(&bad).unwrap_err();
        assert!(err.message().contains("declared 5"));
    }

    #[derive(Debug)]
    struct SingleChunk;

    impl IndexBuilder for SingleChunk {
        fn strategy(&self) -> &str {
            "single"
        }

        fn build(
            &self,
            manifest: &IndexManifest,
            _ctx: &BuildContext,
        ) -> IndexResult<Arc<dyn PathResolver>> {
            let file = manifest.source().files.first().cloned().unwrap_or_default();
            Ok(Arc::new(OffsetTableResolver::new(file, vec![(0, 1)])))
        }
    }

    #[test]
    fn test_register_custom_builder() {
        let dir = corpus_dir();
        let (mut factory, _) = factory(&dir, false);
        assert!(!factory.register(Box::new(SingleChunk)));
        assert!(factory.register(Box::new(SingleChunk)));

        let index = factory
            .create_index(&IndexManifest::new("s", "single", SourceDescriptor::file("x")))
            .unwrap();
        assert_eq!(index.path(0).unwrap(), ChunkPath::new("x", 0, 1));
    }
}
