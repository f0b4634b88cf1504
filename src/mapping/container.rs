//! Containers and the markables they hold

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{MappingError, MappingResult};

/// Identity of one loaded container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(Uuid);

impl ContainerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item identity, unique within its container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Structural unit spanning `[begin, end)` of its container's base layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Markable {
    container: ContainerId,
    id: ItemId,
    pub begin: u64,
    pub end: u64,
}

impl Markable {
    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn span_len(&self) -> u64 {
        self.end.saturating_sub(self.begin)
    }

    /// Whether `other`'s span lies inside this one
    pub fn encloses(&self, other: &Markable) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }
}

/// Ordered sequence of markables
#[derive(Debug, Clone)]
pub struct Container {
    id: ContainerId,
    name: String,
    items: Vec<Markable>,
    positions: HashMap<ItemId, usize>,
}

impl Container {
    /// Build from `(id, begin, end)` triples, kept in the given order.
    pub fn build<I>(name: impl Into<String>, items: I) -> MappingResult<Self>
    where
        I: IntoIterator<Item = (u64, u64, u64)>,
    {
        let id = ContainerId::new();
        let mut container = Self {
            id,
            name: name.into(),
            items: Vec::new(),
            positions: HashMap::new(),
        };
        for (item, begin, end) in items {
            let item = ItemId(item);
            if container.positions.insert(item, container.items.len()).is_some() {
                return Err(MappingError::DuplicateItem { container: id, item });
            }
            container.items.push(Markable {
                container: id,
                id: item,
                begin,
                end,
            });
        }
        Ok(container)
    }

    /// Build from spans; item ids are the span positions.
    pub fn from_spans<I>(name: impl Into<String>, spans: I) -> Self
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        let id = ContainerId::new();
        let items: Vec<Markable> = spans
            .into_iter()
            .enumerate()
            .map(|(i, (begin, end))| Markable {
                container: id,
                id: ItemId(i as u64),
                begin,
                end,
            })
            .collect();
        let positions = items.iter().enumerate().map(|(i, m)| (m.id, i)).collect();
        Self {
            id,
            name: name.into(),
            items,
            positions,
        }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Markable] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&Markable> {
        self.positions.get(&id).map(|&i| &self.items[i])
    }

    pub fn item_at(&self, position: usize) -> Option<&Markable> {
        self.items.get(position)
    }

    pub fn contains(&self, item: &Markable) -> bool {
        item.container == self.id && self.positions.contains_key(&item.id)
    }

    /// Position of `item`, or `ForeignItem` if it lives elsewhere.
    pub fn position_of(&self, item: &Markable) -> MappingResult<usize> {
        match self.positions.get(&item.id) {
            Some(&i) if item.container == self.id => Ok(i),
            _ => Err(MappingError::ForeignItem {
                item: item.id,
                expected: self.id,
                actual: item.container,
            }),
        }
    }

    /// Whether items are sorted by `begin`
    pub fn is_span_ordered(&self) -> bool {
        self.items.windows(2).all(|w| w[0].begin <= w[1].begin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_rejects_duplicate_ids() {
        let err = Container::build("tokens", vec![(1, 0, 3), (1, 4, 6)]).unwrap_err();
        assert!(matches!(err, MappingError::DuplicateItem { item: ItemId(1), .. }));
    }

    #[test]
    fn test_membership_is_per_container() {
        let a = Container::from_spans("a", vec![(0, 2), (2, 4)]);
        let b = Container::from_spans("b", vec![(0, 2), (2, 4)]);

        let item = a.items()[1];
        assert!(a.contains(&item));
        assert!(!b.contains(&item));
        assert_eq!(a.position_of(&item).unwrap(), 1);
        assert!(b.position_of(&item).unwrap_err().is_foreign());
    }

    #[test]
    fn test_lookup_by_id() {
        let c = Container::build("c", vec![(10, 0, 1), (20, 1, 5)]).unwrap();
        assert_eq!(c.item(ItemId(20)).unwrap().span_len(), 4);
        assert!(c.item(ItemId(30)).is_none());
        assert!(c.is_span_ordered());
    }
}
