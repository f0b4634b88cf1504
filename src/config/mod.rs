//! Engine configuration
//!
//! Loaded once from a JSON file; every field has a default so an empty
//! object is a valid configuration. Immutable after load.

mod errors;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Logger, Severity};

pub use errors::{ConfigError, ConfigResult};

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub index: IndexConfig,
    pub release: ReleaseConfig,
    pub logging: LoggingConfig,
}

/// Index building settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Build manifests on the rayon pool
    pub parallel_build: bool,
    /// Dedicated pool size; `None` uses the global pool
    pub build_threads: Option<usize>,
    /// Chunk size for `fixed-size` manifests that do not name one
    pub chunk_size_bytes: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            parallel_build: true,
            build_threads: None,
            chunk_size_bytes: 64 * 1024,
        }
    }
}

/// Bounded retry policy for segment release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: u32,
    pub max_backoff_ms: u64,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 10,
            backoff_multiplier: 2,
            max_backoff_ms: 1_000,
        }
    }
}

impl ReleaseConfig {
    /// Backoff to sleep before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_multiplier).saturating_pow(attempt.saturating_sub(1));
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Logger settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub min_severity: Severity,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_severity: Severity::Info,
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a JSON file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let config = Self::from_json(&content)?;
        let path_text = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", path_text.as_str())]);
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.index.chunk_size_bytes == 0 {
            return Err(ConfigError::invalid("index.chunk_size_bytes", "must be > 0"));
        }
        if self.index.build_threads == Some(0) {
            return Err(ConfigError::invalid("index.build_threads", "must be > 0 when set"));
        }
        if self.release.max_attempts == 0 {
            return Err(ConfigError::invalid("release.max_attempts", "must be >= 1"));
        }
        if self.release.backoff_multiplier == 0 {
            return Err(ConfigError::invalid("release.backoff_multiplier", "must be >= 1"));
        }
        if self.release.max_backoff_ms < self.release.initial_backoff_ms {
            return Err(ConfigError::invalid(
                "release.max_backoff_ms",
                format!(
                    "{} is below initial_backoff_ms {}",
                    self.release.max_backoff_ms, self.release.initial_backoff_ms
                ),
            ));
        }
        Ok(())
    }

    /// Push the logging section into the process logger.
    pub fn apply_logging(&self) {
        Logger::configure(self.logging.enabled, self.logging.min_severity);
    }
}
