//! Explicit pair-table mapping

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use super::container::{Container, ContainerId, ItemId, Markable};
use super::errors::{MappingError, MappingResult};
use super::{attached, check_membership, Mapping};

/// Correspondence given as explicit `(source, target)` pairs.
///
/// Bidirectional exactly when the pairs form a one-to-one relation.
#[derive(Debug)]
pub struct TableMapping {
    source: Weak<Container>,
    target: Weak<Container>,
    source_id: ContainerId,
    target_id: ContainerId,
    forward: HashMap<ItemId, Vec<ItemId>>,
    backward: HashMap<ItemId, Vec<ItemId>>,
    bidirectional: bool,
}

impl TableMapping {
    pub fn builder(source: &Arc<Container>, target: &Arc<Container>) -> MappingBuilder {
        MappingBuilder {
            source: Arc::clone(source),
            target: Arc::clone(target),
            pairs: Vec::new(),
        }
    }

    /// Number of distinct pairs
    pub fn pair_count(&self) -> usize {
        self.forward.values().map(Vec::len).sum()
    }

    fn resolve(
        &self,
        item: &Markable,
        from: (&Weak<Container>, ContainerId),
        to: (&Weak<Container>, ContainerId),
        table: &HashMap<ItemId, Vec<ItemId>>,
    ) -> MappingResult<Vec<Markable>> {
        check_membership(item, from.1)?;
        attached(from.0, from.1)?.position_of(item)?;
        let other = attached(to.0, to.1)?;

        Ok(table
            .get(&item.id())
            .map(|ids| ids.iter().filter_map(|id| other.item(*id).copied()).collect())
            .unwrap_or_default())
    }
}

impl Mapping for TableMapping {
    fn source_id(&self) -> ContainerId {
        self.source_id
    }

    fn target_id(&self) -> ContainerId {
        self.target_id
    }

    fn source(&self) -> Option<Arc<Container>> {
        self.source.upgrade()
    }

    fn target(&self) -> Option<Arc<Container>> {
        self.target.upgrade()
    }

    fn is_bidirectional(&self) -> bool {
        self.bidirectional
    }

    fn to_targets(&self, item: &Markable) -> MappingResult<Vec<Markable>> {
        self.resolve(
            item,
            (&self.source, self.source_id),
            (&self.target, self.target_id),
            &self.forward,
        )
    }

    fn to_sources(&self, item: &Markable) -> MappingResult<Vec<Markable>> {
        self.resolve(
            item,
            (&self.target, self.target_id),
            (&self.source, self.source_id),
            &self.backward,
        )
    }
}

/// Collects validated pairs for a `TableMapping`
#[derive(Debug)]
pub struct MappingBuilder {
    source: Arc<Container>,
    target: Arc<Container>,
    pairs: Vec<(usize, usize)>,
}

impl MappingBuilder {
    /// Add one correspondence; both items must belong to their containers.
    pub fn pair(mut self, source: &Markable, target: &Markable) -> MappingResult<Self> {
        let s = self.source.position_of(source)?;
        let t = self.target.position_of(target)?;
        self.pairs.push((s, t));
        Ok(self)
    }

    /// Add every `(source, target)` pair from positions in each container.
    pub fn pair_positions<I>(mut self, pairs: I) -> MappingResult<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        for (s, t) in pairs {
            let source = *self
                .source
                .item_at(s)
                .ok_or(MappingError::NoSuchPosition {
                    container: self.source.id(),
                    position: s,
                })?;
            let target = *self
                .target
                .item_at(t)
                .ok_or(MappingError::NoSuchPosition {
                    container: self.target.id(),
                    position: t,
                })?;
            self = self.pair(&source, &target)?;
        }
        Ok(self)
    }

    pub fn build(mut self) -> TableMapping {
        self.pairs.sort_unstable();
        self.pairs.dedup();

        let mut forward: HashMap<ItemId, Vec<ItemId>> = HashMap::new();
        let mut backward: HashMap<ItemId, Vec<(usize, ItemId)>> = HashMap::new();
        for &(s, t) in &self.pairs {
            let source = self.source.items()[s].id();
            let target = self.target.items()[t].id();
            forward.entry(source).or_default().push(target);
            backward.entry(target).or_default().push((s, source));
        }
        let backward: HashMap<ItemId, Vec<ItemId>> = backward
            .into_iter()
            .map(|(k, mut v)| {
                v.sort_unstable_by_key(|(pos, _)| *pos);
                (k, v.into_iter().map(|(_, id)| id).collect())
            })
            .collect();

        let bidirectional =
            forward.values().all(|v| v.len() == 1) && backward.values().all(|v| v.len() == 1);

        TableMapping {
            source: Arc::downgrade(&self.source),
            target: Arc::downgrade(&self.target),
            source_id: self.source.id(),
            target_id: self.target.id(),
            forward,
            backward,
            bidirectional,
        }
    }
}
