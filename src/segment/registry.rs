//! # Ownership Registry
//!
//! Tracks which owners keep each segment resident and drives the
//! release/close protocol.
//!
//! ## Rules
//! - An owner is bound to at most one segment at a time
//! - A segment closes only when its owner set is empty
//! - `release()` call-outs run with no registry lock held
//! - A closed segment drops its indices and never reopens
//! - Owners dropped without deregistering are pruned on the next touch

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::{SegmentError, SegmentResult};
use super::owner::{CorpusOwner, OwnerId, SegmentId};
use super::state::SegmentState;
use crate::config::ReleaseConfig;
use crate::index::Index;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// Result of one release round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// Owner set empty; segment is `Closed`
    Closed,
    /// Some owners refused; segment stays `Releasing`
    Pending { remaining: usize },
}

impl ReleaseOutcome {
    pub fn is_closed(&self) -> bool {
        matches!(self, ReleaseOutcome::Closed)
    }
}

/// Point-in-time view of one segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentInfo {
    pub id: SegmentId,
    pub label: String,
    pub state: SegmentState,
    pub owner_count: usize,
    pub index_count: usize,
    pub created_at: DateTime<Utc>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

struct SegmentEntry {
    label: String,
    state: SegmentState,
    indices: Vec<Index>,
    /// Registration order is kept so call-outs are deterministic
    owners: Vec<(OwnerId, Weak<dyn CorpusOwner>)>,
    created_at: DateTime<Utc>,
    loaded_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
}

impl SegmentEntry {
    fn live_owners(&self) -> usize {
        self.owners.iter().filter(|(_, w)| w.strong_count() > 0).count()
    }

    fn info(&self, id: SegmentId) -> SegmentInfo {
        SegmentInfo {
            id,
            label: self.label.clone(),
            state: self.state,
            owner_count: self.live_owners(),
            index_count: self.indices.len(),
            created_at: self.created_at,
            loaded_at: self.loaded_at,
            closed_at: self.closed_at,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    segments: HashMap<SegmentId, SegmentEntry>,
    bindings: HashMap<OwnerId, SegmentId>,
}

impl RegistryState {
    fn entry(&self, id: SegmentId) -> SegmentResult<&SegmentEntry> {
        self.segments.get(&id).ok_or_else(|| SegmentError::unknown(id))
    }

    fn entry_mut(&mut self, id: SegmentId) -> SegmentResult<&mut SegmentEntry> {
        self.segments.get_mut(&id).ok_or_else(|| SegmentError::unknown(id))
    }

    /// Forget owners of `segment` whose handle no longer upgrades.
    fn prune_dropped(&mut self, segment: SegmentId) -> SegmentResult<()> {
        let dropped: Vec<OwnerId> = {
            let entry = self.entry_mut(segment)?;
            let dropped = entry
                .owners
                .iter()
                .filter(|(_, w)| w.strong_count() == 0)
                .map(|(id, _)| *id)
                .collect();
            entry.owners.retain(|(_, w)| w.strong_count() > 0);
            dropped
        };
        for owner in dropped {
            self.unbind(segment, owner);
        }
        Ok(())
    }

    /// Drop the owner from its segment and its binding.
    fn unbind(&mut self, segment: SegmentId, owner: OwnerId) {
        if let Some(entry) = self.segments.get_mut(&segment) {
            entry.owners.retain(|(id, _)| *id != owner);
        }
        if self.bindings.get(&owner) == Some(&segment) {
            self.bindings.remove(&owner);
        }
    }
}

/// Segment registry shared by every consumer of a corpus
pub struct OwnershipRegistry {
    state: Mutex<RegistryState>,
    metrics: Arc<MetricsRegistry>,
}

impl std::fmt::Debug for OwnershipRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let segments = self.lock().map(|s| s.segments.len()).unwrap_or(0);
        f.debug_struct("OwnershipRegistry")
            .field("segments", &segments)
            .finish()
    }
}

impl OwnershipRegistry {
    pub fn new(metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            metrics,
        }
    }

    fn lock(&self) -> SegmentResult<MutexGuard<'_, RegistryState>> {
        self.state
            .lock()
            .map_err(|_| SegmentError::internal("Lock poisoned"))
    }

    /// Register a new segment in `Loading` that will serve `indices`.
    pub fn create_segment(&self, label: impl Into<String>, indices: Vec<Index>) -> SegmentResult<SegmentId> {
        let id = SegmentId::new();
        let label = label.into();
        let index_count = indices.len().to_string();

        self.lock()?.segments.insert(
            id,
            SegmentEntry {
                label: label.clone(),
                state: SegmentState::Loading,
                indices,
                owners: Vec::new(),
                created_at: Utc::now(),
                loaded_at: None,
                closed_at: None,
            },
        );

        let id_text = id.to_string();
        log_event_with_fields(
            Event::SegmentCreated,
            &[
                ("segment", id_text.as_str()),
                ("label", label.as_str()),
                ("indices", index_count.as_str()),
            ],
        );
        Ok(id)
    }

    /// `Loading -> Loaded`
    pub fn mark_loaded(&self, segment: SegmentId) -> SegmentResult<()> {
        {
            let mut state = self.lock()?;
            let entry = state.entry_mut(segment)?;
            entry.state = entry.state.transition(segment, SegmentState::Loaded)?;
            entry.loaded_at = Some(Utc::now());
        }

        self.metrics.increment_segments_loaded();
        let id_text = segment.to_string();
        log_event_with_fields(Event::SegmentLoaded, &[("segment", id_text.as_str())]);
        Ok(())
    }

    /// Bind `owner` to `segment`.
    ///
    /// Re-registering on the same segment is a no-op. Registering while
    /// bound to a different segment fails with `IllegalOwnershipState`.
    pub fn acquire(&self, owner: &Arc<dyn CorpusOwner>, segment: SegmentId) -> SegmentResult<()> {
        let owner_id = owner.owner_id();
        {
            let mut state = self.lock()?;

            if let Some(&bound) = state.bindings.get(&owner_id) {
                if bound == segment {
                    return Ok(());
                }
                return Err(SegmentError::owner_already_bound(owner_id, bound, segment));
            }

            state.prune_dropped(segment)?;
            let entry = state.entry_mut(segment)?;
            if !entry.state.accepts_owners() {
                return Err(SegmentError::unavailable(
                    segment,
                    format!("segment {} is {}, not accepting owners", segment, entry.state.as_str()),
                ));
            }
            entry.owners.push((owner_id, Arc::downgrade(owner)));
            state.bindings.insert(owner_id, segment);
        }

        let segment_text = segment.to_string();
        let owner_text = owner_id.to_string();
        log_event_with_fields(
            Event::OwnerRegistered,
            &[("segment", segment_text.as_str()), ("owner", owner_text.as_str())],
        );
        Ok(())
    }

    /// Voluntary release by the owner itself.
    ///
    /// Returns whether this closed a `Releasing` segment.
    pub fn deregister(&self, owner: OwnerId) -> SegmentResult<bool> {
        let (segment, closed) = {
            let mut state = self.lock()?;
            let segment = state
                .bindings
                .get(&owner)
                .copied()
                .ok_or_else(|| SegmentError::owner_not_registered(owner))?;
            state.unbind(segment, owner);
            let closed = self.close_if_drained(&mut state, segment)?;
            (segment, closed)
        };

        let segment_text = segment.to_string();
        let owner_text = owner.to_string();
        log_event_with_fields(
            Event::OwnerDeregistered,
            &[("segment", segment_text.as_str()), ("owner", owner_text.as_str())],
        );
        if closed {
            self.on_closed(segment);
        }
        Ok(closed)
    }

    /// Begin unloading `segment` and run one round of release call-outs.
    ///
    /// A `Closed` segment answers `Closed`; a `Loading` one cannot be
    /// released.
    pub fn request_close(&self, segment: SegmentId) -> SegmentResult<ReleaseOutcome> {
        {
            let mut state = self.lock()?;
            let entry = state.entry_mut(segment)?;
            match entry.state {
                SegmentState::Closed => return Ok(ReleaseOutcome::Closed),
                SegmentState::Releasing => {}
                current => {
                    entry.state = current.transition(segment, SegmentState::Releasing)?;
                }
            }
        }

        let segment_text = segment.to_string();
        log_event_with_fields(Event::SegmentReleaseRequested, &[("segment", segment_text.as_str())]);
        self.release_round(segment)
    }

    /// Repeat the call-outs for a segment already `Releasing`.
    pub fn retry_release(&self, segment: SegmentId) -> SegmentResult<ReleaseOutcome> {
        {
            let state = self.lock()?;
            match state.entry(segment)?.state {
                SegmentState::Closed => return Ok(ReleaseOutcome::Closed),
                SegmentState::Releasing => {}
                other => {
                    return Err(SegmentError::illegal_state(
                        segment,
                        format!("segment {} is {}, not releasing", segment, other.as_str()),
                    ))
                }
            }
        }
        self.release_round(segment)
    }

    /// Request close, then retry with exponential backoff until the segment
    /// closes or `policy.max_attempts` rounds have run.
    pub fn release_with_backoff(
        &self,
        segment: SegmentId,
        policy: &ReleaseConfig,
    ) -> SegmentResult<ReleaseOutcome> {
        let mut outcome = self.request_close(segment)?;
        let mut attempt = 1;
        while !outcome.is_closed() && attempt < policy.max_attempts {
            thread::sleep(policy.backoff_for(attempt));
            outcome = self.retry_release(segment)?;
            attempt += 1;
        }
        Ok(outcome)
    }

    fn release_round(&self, segment: SegmentId) -> SegmentResult<ReleaseOutcome> {
        let owners: Vec<(OwnerId, Weak<dyn CorpusOwner>)> = self.lock()?.entry(segment)?.owners.clone();

        // Call-outs run unlocked; owners may re-enter the registry.
        let mut released = Vec::new();
        for (owner_id, handle) in owners {
            let Some(owner) = handle.upgrade() else {
                released.push(owner_id);
                continue;
            };
            self.metrics.increment_release_calls();
            if owner.release() {
                released.push(owner_id);
            } else {
                self.metrics.increment_release_refusals();
            }
        }

        let (outcome, closed_now) = {
            let mut state = self.lock()?;
            if state.entry(segment)?.state.is_terminal() {
                (ReleaseOutcome::Closed, false)
            } else {
                for owner_id in released {
                    state.unbind(segment, owner_id);
                }
                if self.close_if_drained(&mut state, segment)? {
                    (ReleaseOutcome::Closed, true)
                } else {
                    let remaining = state.entry(segment)?.owners.len();
                    (ReleaseOutcome::Pending { remaining }, false)
                }
            }
        };

        match outcome {
            ReleaseOutcome::Closed if closed_now => self.on_closed(segment),
            ReleaseOutcome::Pending { remaining } => {
                let segment_text = segment.to_string();
                let remaining_text = remaining.to_string();
                log_event_with_fields(
                    Event::SegmentReleasePending,
                    &[("segment", segment_text.as_str()), ("remaining", remaining_text.as_str())],
                );
            }
            ReleaseOutcome::Closed => {}
        }
        Ok(outcome)
    }

    /// Close a `Releasing` segment whose owner set is empty.
    fn close_if_drained(&self, state: &mut RegistryState, segment: SegmentId) -> SegmentResult<bool> {
        state.prune_dropped(segment)?;

        let entry = state.entry_mut(segment)?;
        if entry.state != SegmentState::Releasing || !entry.owners.is_empty() {
            return Ok(false);
        }

        entry.state = entry.state.transition(segment, SegmentState::Closed)?;
        entry.closed_at = Some(Utc::now());
        entry.indices.clear();
        Ok(true)
    }

    fn on_closed(&self, segment: SegmentId) {
        self.metrics.increment_segments_closed();
        let segment_text = segment.to_string();
        log_event_with_fields(Event::SegmentClosed, &[("segment", segment_text.as_str())]);
    }

    /// Remove a `Closed` segment. Its id is unknown from then on.
    pub fn forget(&self, segment: SegmentId) -> SegmentResult<()> {
        {
            let mut state = self.lock()?;
            let current = state.entry(segment)?.state;
            if current != SegmentState::Closed {
                return Err(SegmentError::illegal_state(
                    segment,
                    format!(
                        "segment {} is {}, only closed segments can be forgotten",
                        segment,
                        current.as_str()
                    ),
                ));
            }
            state.segments.remove(&segment);
            state.bindings.retain(|_, bound| *bound != segment);
        }

        let segment_text = segment.to_string();
        log_event_with_fields(Event::SegmentForgotten, &[("segment", segment_text.as_str())]);
        Ok(())
    }

    /// Remove every `Closed` segment, returning their ids.
    pub fn forget_closed(&self) -> SegmentResult<Vec<SegmentId>> {
        let closed: Vec<SegmentId> = self
            .lock()?
            .segments
            .iter()
            .filter(|(_, entry)| entry.state == SegmentState::Closed)
            .map(|(id, _)| *id)
            .collect();
        for id in &closed {
            self.forget(*id)?;
        }
        Ok(closed)
    }

    pub fn segment_info(&self, segment: SegmentId) -> SegmentResult<SegmentInfo> {
        let mut state = self.lock()?;
        state.prune_dropped(segment)?;
        Ok(state.entry(segment)?.info(segment))
    }

    /// Number of segments currently tracked, closed ones included
    pub fn segment_count(&self) -> SegmentResult<usize> {
        Ok(self.lock()?.segments.len())
    }

    /// Number of owners currently bound to some segment
    pub fn binding_count(&self) -> SegmentResult<usize> {
        Ok(self.lock()?.bindings.len())
    }

    /// All segments, oldest first
    pub fn segments(&self) -> SegmentResult<Vec<SegmentInfo>> {
        let mut state = self.lock()?;
        let ids: Vec<SegmentId> = state.segments.keys().copied().collect();
        for id in ids {
            state.prune_dropped(id)?;
        }
        let mut infos: Vec<SegmentInfo> = state
            .segments
            .iter()
            .map(|(id, entry)| entry.info(*id))
            .collect();
        infos.sort_by_key(|info| info.created_at);
        Ok(infos)
    }

    pub fn state(&self, segment: SegmentId) -> SegmentResult<SegmentState> {
        Ok(self.lock()?.entry(segment)?.state)
    }

    /// Built index `index_id` of a `Loaded` or `Releasing` segment.
    pub fn index(&self, segment: SegmentId, index_id: &str) -> SegmentResult<Option<Index>> {
        let state = self.lock()?;
        let entry = state.entry(segment)?;
        if !entry.state.serves_indices() {
            return Err(SegmentError::unavailable(
                segment,
                format!("segment {} is {}, indices unavailable", segment, entry.state.as_str()),
            ));
        }
        Ok(entry
            .indices
            .iter()
            .find(|index| index.manifest_id() == index_id)
            .cloned())
    }

    /// Segment `owner` is currently bound to
    pub fn owner_segment(&self, owner: OwnerId) -> Option<SegmentId> {
        self.lock().ok()?.bindings.get(&owner).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FixedSizeResolver, Index};
    use crate::segment::errors::SegmentErrorCode;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Owner {
        id: OwnerId,
        refusals: AtomicUsize,
    }

    impl Owner {
        fn new(refusals: usize) -> Arc<dyn CorpusOwner> {
            Arc::new(Self {
                id: OwnerId::new(),
                refusals: AtomicUsize::new(refusals),
            })
        }
    }

    impl CorpusOwner for Owner {
        fn owner_id(&self) -> OwnerId {
            self.id
        }

        fn release(&self) -> bool {
            self.refusals
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_err()
        }
    }

    fn index(id: &str) -> Index {
        Index::new(
            id,
            "fixed-size",
            Arc::new(FixedSizeResolver::new(PathBuf::from("f"), 10, 5)),
        )
    }

    fn loaded(registry: &OwnershipRegistry) -> SegmentId {
        let id = registry.create_segment("s", vec![index("tokens")]).unwrap();
        registry.mark_loaded(id).unwrap();
        id
    }

    fn registry() -> OwnershipRegistry {
        OwnershipRegistry::new(Arc::new(MetricsRegistry::new()))
    }

    #[test]
    fn test_loading_rejects_owners() {
        let registry = registry();
        let id = registry.create_segment("s", Vec::new()).unwrap();
        let err = registry.acquire(&Owner::new(0), id).unwrap_err();
        assert_eq!(err.code(), SegmentErrorCode::SegmentUnavailable);
        assert!(registry.mark_loaded(id).is_ok());
        assert_eq!(
            registry.mark_loaded(id).unwrap_err().code(),
            SegmentErrorCode::IllegalSegmentState
        );
    }

    #[test]
    fn test_second_segment_is_illegal() {
        let registry = registry();
        let a = loaded(&registry);
        let b = loaded(&registry);
        let owner = Owner::new(0);

        registry.acquire(&owner, a).unwrap();
        registry.acquire(&owner, a).unwrap();
        assert_eq!(registry.segment_info(a).unwrap().owner_count, 1);

        let err = registry.acquire(&owner, b).unwrap_err();
        assert_eq!(err.code(), SegmentErrorCode::IllegalOwnershipState);
        assert_eq!(registry.owner_segment(owner.owner_id()), Some(a));

        registry.deregister(owner.owner_id()).unwrap();
        registry.acquire(&owner, b).unwrap();
        assert_eq!(registry.owner_segment(owner.owner_id()), Some(b));
    }

    #[test]
    fn test_close_without_owners() {
        let registry = registry();
        let id = loaded(&registry);
        assert_eq!(registry.request_close(id).unwrap(), ReleaseOutcome::Closed);

        let info = registry.segment_info(id).unwrap();
        assert_eq!(info.state, SegmentState::Closed);
        assert_eq!(info.index_count, 0);
        assert!(info.closed_at.is_some());
        assert_eq!(
            registry.index(id, "tokens").unwrap_err().code(),
            SegmentErrorCode::SegmentUnavailable
        );
    }

    #[test]
    fn test_refusing_owner_keeps_segment_releasing() {
        let registry = registry();
        let id = loaded(&registry);
        let a = Owner::new(0);
        let b = Owner::new(1);
        registry.acquire(&a, id).unwrap();
        registry.acquire(&b, id).unwrap();

        assert_eq!(
            registry.request_close(id).unwrap(),
            ReleaseOutcome::Pending { remaining: 1 }
        );
        assert_eq!(registry.state(id).unwrap(), SegmentState::Releasing);
        assert!(registry.index(id, "tokens").unwrap().is_some());
        assert_eq!(registry.owner_segment(a.owner_id()), None);

        assert_eq!(registry.retry_release(id).unwrap(), ReleaseOutcome::Closed);
        assert_eq!(registry.state(id).unwrap(), SegmentState::Closed);
    }

    #[test]
    fn test_releasing_rejects_new_owners() {
        let registry = registry();
        let id = loaded(&registry);
        let holder = Owner::new(5);
        registry.acquire(&holder, id).unwrap();
        registry.request_close(id).unwrap();

        let err = registry.acquire(&Owner::new(0), id).unwrap_err();
        assert_eq!(err.code(), SegmentErrorCode::SegmentUnavailable);
    }

    #[test]
    fn test_voluntary_deregister_closes_releasing() {
        let registry = registry();
        let id = loaded(&registry);
        let owner = Owner::new(10);
        registry.acquire(&owner, id).unwrap();

        assert!(!registry.request_close(id).unwrap().is_closed());
        assert!(registry.deregister(owner.owner_id()).unwrap());
        assert_eq!(registry.state(id).unwrap(), SegmentState::Closed);
    }

    #[test]
    fn test_deregister_on_loaded_does_not_close() {
        let registry = registry();
        let id = loaded(&registry);
        let owner = Owner::new(0);
        registry.acquire(&owner, id).unwrap();
        assert!(!registry.deregister(owner.owner_id()).unwrap());
        assert_eq!(registry.state(id).unwrap(), SegmentState::Loaded);

        let err = registry.deregister(owner.owner_id()).unwrap_err();
        assert_eq!(err.code(), SegmentErrorCode::IllegalOwnershipState);
    }

    #[test]
    fn test_dropped_owner_counts_as_released() {
        let registry = registry();
        let id = loaded(&registry);
        let owner = Owner::new(100);
        registry.acquire(&owner, id).unwrap();
        drop(owner);

        assert_eq!(registry.segment_info(id).unwrap().owner_count, 0);
        assert_eq!(registry.request_close(id).unwrap(), ReleaseOutcome::Closed);
    }

    #[test]
    fn test_backoff_gives_up_after_max_attempts() {
        let registry = registry();
        let id = loaded(&registry);
        let owner = Owner::new(100);
        registry.acquire(&owner, id).unwrap();

        let policy = ReleaseConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
            backoff_multiplier: 2,
            max_backoff_ms: 2,
        };
        assert_eq!(
            registry.release_with_backoff(id, &policy).unwrap(),
            ReleaseOutcome::Pending { remaining: 1 }
        );
        assert_eq!(registry.state(id).unwrap(), SegmentState::Releasing);
    }

    #[test]
    fn test_dropped_owner_pruned_while_loaded() {
        let registry = registry();
        let id = loaded(&registry);
        for _ in 0..3 {
            let owner = Owner::new(0);
            registry.acquire(&owner, id).unwrap();
        }
        assert_eq!(registry.binding_count().unwrap(), 3);

        assert_eq!(registry.segment_info(id).unwrap().owner_count, 0);
        assert_eq!(registry.binding_count().unwrap(), 0);
        assert_eq!(registry.state(id).unwrap(), SegmentState::Loaded);

        let kept = Owner::new(0);
        registry.acquire(&kept, id).unwrap();
        let dropped = Owner::new(0);
        registry.acquire(&dropped, id).unwrap();
        drop(dropped);
        registry.acquire(&Owner::new(0), id).unwrap();
        assert_eq!(registry.binding_count().unwrap(), 2);
        assert_eq!(registry.owner_segment(kept.owner_id()), Some(id));
    }

    #[test]
    fn test_forget_only_closed() {
        let registry = registry();
        let id = loaded(&registry);
        let err = registry.forget(id).unwrap_err();
        assert_eq!(err.code(), SegmentErrorCode::IllegalSegmentState);

        registry.request_close(id).unwrap();
        let other = loaded(&registry);
        assert_eq!(registry.segment_count().unwrap(), 2);

        registry.forget(id).unwrap();
        assert_eq!(registry.segment_count().unwrap(), 1);
        assert_eq!(
            registry.state(id).unwrap_err().code(),
            SegmentErrorCode::UnknownSegment
        );
        assert_eq!(
            registry.forget(id).unwrap_err().code(),
            SegmentErrorCode::UnknownSegment
        );
        assert_eq!(registry.state(other).unwrap(), SegmentState::Loaded);
    }

    #[test]
    fn test_unknown_segment() {
        let registry = registry();
        let err = registry.segment_info(SegmentId::new()).unwrap_err();
        assert_eq!(err.code(), SegmentErrorCode::UnknownSegment);
    }
}
