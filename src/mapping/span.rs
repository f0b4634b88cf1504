//! Span containment mapping between a fine and a coarse container

use std::sync::{Arc, Weak};

use super::container::{Container, ContainerId, Markable};
use super::errors::{MappingError, MappingResult};
use super::{attached, check_membership, Mapping};

/// Maps fine items (tokens) to the coarse item (sentence) enclosing them.
///
/// `to_target` yields the enclosing coarse item; `to_sources` yields every
/// fine item inside a coarse one, so the mapping is never bidirectional.
#[derive(Debug)]
pub struct SpanMapping {
    fine: Weak<Container>,
    coarse: Weak<Container>,
    fine_id: ContainerId,
    coarse_id: ContainerId,
}

impl SpanMapping {
    /// Both containers must be ordered by `begin`; coarse items must not overlap.
    pub fn new(fine: &Arc<Container>, coarse: &Arc<Container>) -> MappingResult<Self> {
        if !fine.is_span_ordered() {
            return Err(MappingError::UnorderedContainer(fine.id()));
        }
        let coarse_disjoint = coarse.items().windows(2).all(|w| w[0].end <= w[1].begin);
        if !coarse.is_span_ordered() || !coarse_disjoint {
            return Err(MappingError::UnorderedContainer(coarse.id()));
        }

        Ok(Self {
            fine: Arc::downgrade(fine),
            coarse: Arc::downgrade(coarse),
            fine_id: fine.id(),
            coarse_id: coarse.id(),
        })
    }
}

impl Mapping for SpanMapping {
    fn source_id(&self) -> ContainerId {
        self.fine_id
    }

    fn target_id(&self) -> ContainerId {
        self.coarse_id
    }

    fn source(&self) -> Option<Arc<Container>> {
        self.fine.upgrade()
    }

    fn target(&self) -> Option<Arc<Container>> {
        self.coarse.upgrade()
    }

    fn is_bidirectional(&self) -> bool {
        false
    }

    fn to_targets(&self, item: &Markable) -> MappingResult<Vec<Markable>> {
        check_membership(item, self.fine_id)?;
        attached(&self.fine, self.fine_id)?.position_of(item)?;
        let coarse = attached(&self.coarse, self.coarse_id)?;

        let after = coarse.items().partition_point(|c| c.begin <= item.begin);
        Ok(after
            .checked_sub(1)
            .map(|i| coarse.items()[i])
            .filter(|candidate| candidate.encloses(item))
            .into_iter()
            .collect())
    }

    fn to_sources(&self, item: &Markable) -> MappingResult<Vec<Markable>> {
        check_membership(item, self.coarse_id)?;
        attached(&self.coarse, self.coarse_id)?.position_of(item)?;
        let fine = attached(&self.fine, self.fine_id)?;

        let start = fine.items().partition_point(|f| f.begin < item.begin);
        Ok(fine.items()[start..]
            .iter()
            .take_while(|f| f.begin <= item.end)
            .filter(|f| item.encloses(f))
            .copied()
            .collect())
    }
}
