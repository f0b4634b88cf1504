//! Engine counters
//!
//! - Counters only, monotonic
//! - Relaxed atomics, metrics never order anything

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics registry containing all engine counters.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    indices_built: AtomicU64,
    manifest_failures: AtomicU64,
    paths_resolved: AtomicU64,
    segments_loaded: AtomicU64,
    segments_closed: AtomicU64,
    release_calls: AtomicU64,
    release_refusals: AtomicU64,
    access_granted: AtomicU64,
    access_denied: AtomicU64,
    policy_cache_hits: AtomicU64,
    policy_cache_misses: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully built index
    pub fn increment_indices_built(&self) {
        self.indices_built.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a manifest that failed to build
    pub fn increment_manifest_failures(&self) {
        self.manifest_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chunk index resolved to a path
    pub fn increment_paths_resolved(&self) {
        self.paths_resolved.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a segment reaching LOADED
    pub fn increment_segments_loaded(&self) {
        self.segments_loaded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a segment reaching CLOSED
    pub fn increment_segments_closed(&self) {
        self.segments_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one `release()` call-out
    pub fn increment_release_calls(&self) {
        self.release_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one `release()` call-out that returned false
    pub fn increment_release_refusals(&self) {
        self.release_refusals.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a permitted manifest operation
    pub fn increment_access_granted(&self) {
        self.access_granted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected manifest operation
    pub fn increment_access_denied(&self) {
        self.access_denied.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a policy lookup served from the cache
    pub fn increment_policy_cache_hits(&self) {
        self.policy_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a policy lookup that had to resolve the declaration
    pub fn increment_policy_cache_misses(&self) {
        self.policy_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            indices_built: self.indices_built.load(Ordering::Relaxed),
            manifest_failures: self.manifest_failures.load(Ordering::Relaxed),
            paths_resolved: self.paths_resolved.load(Ordering::Relaxed),
            segments_loaded: self.segments_loaded.load(Ordering::Relaxed),
            segments_closed: self.segments_closed.load(Ordering::Relaxed),
            release_calls: self.release_calls.load(Ordering::Relaxed),
            release_refusals: self.release_refusals.load(Ordering::Relaxed),
            access_granted: self.access_granted.load(Ordering::Relaxed),
            access_denied: self.access_denied.load(Ordering::Relaxed),
            policy_cache_hits: self.policy_cache_hits.load(Ordering::Relaxed),
            policy_cache_misses: self.policy_cache_misses.load(Ordering::Relaxed),
        }
    }

    /// Current counters as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub indices_built: u64,
    pub manifest_failures: u64,
    pub paths_resolved: u64,
    pub segments_loaded: u64,
    pub segments_closed: u64,
    pub release_calls: u64,
    pub release_refusals: u64,
    pub access_granted: u64,
    pub access_denied: u64,
    pub policy_cache_hits: u64,
    pub policy_cache_misses: u64,
}
