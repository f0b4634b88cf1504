//! # Access Gate
//!
//! Every guarded manifest call passes through `AccessGate::check` first.
//! Declarations are resolved at most once per interface type and cached;
//! the cache is the gate's only mutable state.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::errors::{AccessError, AccessResult};
use super::policy::{AccessMode, Guarded, ResolvedPolicy};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// Capability gate for manifest operations
#[derive(Debug)]
pub struct AccessGate {
    cache: RwLock<HashMap<TypeId, Arc<ResolvedPolicy>>>,
    metrics: Arc<MetricsRegistry>,
}

impl AccessGate {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            metrics,
        }
    }

    /// Resolved policy table of `T`, computed on first use.
    ///
    /// Concurrent first lookups may each resolve; the last insert wins,
    /// which is harmless since every resolver reads the same declaration.
    pub fn policy<T: Guarded>(&self) -> AccessResult<Arc<ResolvedPolicy>> {
        let key = TypeId::of::<T>();
        {
            let cache = self
                .cache
                .read()
                .map_err(|_| AccessError::Internal("Lock poisoned".into()))?;
            if let Some(resolved) = cache.get(&key) {
                self.metrics.increment_policy_cache_hits();
                return Ok(Arc::clone(resolved));
            }
        }

        self.metrics.increment_policy_cache_misses();
        let resolved = Arc::new(T::access_declaration().resolve());

        let mut cache = self
            .cache
            .write()
            .map_err(|_| AccessError::Internal("Lock poisoned".into()))?;
        cache.insert(key, Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Permit or reject `operation` on `T` for a caller in `mode`.
    pub fn check<T: Guarded>(&self, operation: &str, mode: AccessMode) -> AccessResult<()> {
        let policy = self.policy::<T>()?;
        let required = policy.requirement(operation);

        if required.permits(mode) {
            self.metrics.increment_access_granted();
            return Ok(());
        }

        self.metrics.increment_access_denied();
        let required_text = required.to_string();
        log_event_with_fields(
            Event::AccessDenied,
            &[
                ("interface", policy.interface()),
                ("operation", operation),
                ("required", required_text.as_str()),
                ("supplied", mode.as_str()),
            ],
        );
        Err(AccessError::AccessDenied {
            interface: policy.interface(),
            operation: operation.to_string(),
            required,
            supplied: mode,
        })
    }

    /// Like `check`, but answers with a plain flag.
    pub fn is_allowed<T: Guarded>(&self, operation: &str, mode: AccessMode) -> bool {
        self.policy::<T>()
            .map(|policy| policy.permits(operation, mode))
            .unwrap_or(false)
    }

    /// Run `f` only if the call is permitted.
    pub fn guard<T, R, F>(&self, operation: &str, mode: AccessMode, f: F) -> AccessResult<R>
    where
        T: Guarded,
        F: FnOnce() -> R,
    {
        self.check::<T>(operation, mode)?;
        Ok(f())
    }

    /// Number of interface types resolved so far
    pub fn cached_types(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }
}
