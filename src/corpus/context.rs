//! Corpus Context
//!
//! The explicitly constructed object owning the registry, index factory,
//! access gate and metrics. Passed down by `Arc`; nothing here is a
//! process-wide static.

use std::path::PathBuf;
use std::sync::Arc;

use super::errors::CorpusResult;
use crate::access::AccessGate;
use crate::config::EngineConfig;
use crate::index::IndexFactory;
use crate::observability::MetricsRegistry;
use crate::segment::OwnershipRegistry;

#[derive(Debug)]
pub struct CorpusContext {
    config: EngineConfig,
    metrics: Arc<MetricsRegistry>,
    gate: AccessGate,
    factory: IndexFactory,
    registry: OwnershipRegistry,
}

impl CorpusContext {
    /// Validate `config` and build every shared service from it.
    pub fn new(config: EngineConfig) -> CorpusResult<Arc<Self>> {
        Self::build(config, None)
    }

    /// Like `new`, resolving relative manifest paths against `base_dir`.
    pub fn with_base_dir(
        config: EngineConfig,
        base_dir: impl Into<PathBuf>,
    ) -> CorpusResult<Arc<Self>> {
        Self::build(config, Some(base_dir.into()))
    }

    fn build(config: EngineConfig, base_dir: Option<PathBuf>) -> CorpusResult<Arc<Self>> {
        config.validate()?;

        let metrics = Arc::new(MetricsRegistry::new());
        let mut factory = IndexFactory::new(&config.index, Arc::clone(&metrics))?;
        if let Some(dir) = base_dir {
            factory = factory.with_base_dir(dir);
        }

        Ok(Arc::new(Self {
            gate: AccessGate::new(Arc::clone(&metrics)),
            registry: OwnershipRegistry::new(Arc::clone(&metrics)),
            factory,
            metrics,
            config,
        }))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn factory(&self) -> &IndexFactory {
        &self.factory
    }

    pub fn registry(&self) -> &OwnershipRegistry {
        &self.registry
    }
}
