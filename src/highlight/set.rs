//! Immutable highlight overlay over one container

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Highlight;
use crate::mapping::{
    check_membership, Container, ContainerId, ItemId, MappingError, MappingResult, Markable,
};

/// RGBA highlight color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Default)]
struct Entry {
    primary: bool,
    color: Option<Color>,
    group: Option<u32>,
    layers: BTreeSet<usize>,
}

/// Resolved highlight state for the items of one container
#[derive(Debug, Clone)]
pub struct HighlightSet {
    container: ContainerId,
    layer_count: usize,
    entries: HashMap<ItemId, Entry>,
}

impl HighlightSet {
    /// Start a set over `container` with `layer_count` secondary layers.
    pub fn builder(container: &Container, layer_count: usize) -> HighlightSetBuilder {
        HighlightSetBuilder {
            set: HighlightSet {
                container: container.id(),
                layer_count,
                entries: HashMap::new(),
            },
        }
    }

    /// Number of items highlighted in the primary layer
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.primary).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, item: &Markable) -> MappingResult<Option<&Entry>> {
        check_membership(item, self.container)?;
        Ok(self.entries.get(&item.id()))
    }

    fn check_layer(&self, layer: usize) -> MappingResult<()> {
        if layer < self.layer_count {
            Ok(())
        } else {
            Err(MappingError::LayerOutOfRange {
                layer,
                count: self.layer_count,
            })
        }
    }
}

impl Highlight for HighlightSet {
    fn container(&self) -> ContainerId {
        self.container
    }

    fn is_highlighted(&self, item: &Markable) -> MappingResult<bool> {
        Ok(self.entry(item)?.is_some_and(|e| e.primary))
    }

    fn highlight_color(&self, item: &Markable) -> MappingResult<Option<Color>> {
        Ok(self.entry(item)?.and_then(|e| e.color))
    }

    fn group_id(&self, item: &Markable) -> MappingResult<Option<u32>> {
        Ok(self.entry(item)?.and_then(|e| e.group))
    }

    fn layer_count(&self) -> usize {
        self.layer_count
    }

    fn is_highlighted_in(&self, item: &Markable, layer: usize) -> MappingResult<bool> {
        self.check_layer(layer)?;
        Ok(self.entry(item)?.is_some_and(|e| e.layers.contains(&layer)))
    }
}

/// Accumulates highlights; every item is checked against the container.
#[derive(Debug)]
pub struct HighlightSetBuilder {
    set: HighlightSet,
}

impl HighlightSetBuilder {
    /// Highlight `item` in the primary layer.
    pub fn highlight(
        mut self,
        item: &Markable,
        color: Option<Color>,
        group: Option<u32>,
    ) -> MappingResult<Self> {
        check_membership(item, self.set.container)?;
        let entry = self.set.entries.entry(item.id()).or_default();
        entry.primary = true;
        entry.color = color;
        entry.group = group;
        Ok(self)
    }

    /// Mark `item` in secondary layer `layer`.
    pub fn in_layer(mut self, item: &Markable, layer: usize) -> MappingResult<Self> {
        check_membership(item, self.set.container)?;
        self.set.check_layer(layer)?;
        self.set.entries.entry(item.id()).or_default().layers.insert(layer);
        Ok(self)
    }

    pub fn build(self) -> HighlightSet {
        self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(0xff, 0, 0);

    fn tokens() -> Container {
        Container::from_spans("tokens", vec![(0, 3), (4, 7), (8, 11)])
    }

    #[test]
    fn test_primary_highlight_queries() {
        let tokens = tokens();
        let set = HighlightSet::builder(&tokens, 0)
            .highlight(&tokens.items()[1], Some(RED), Some(7))
            .unwrap()
            .build();

        let hit = &tokens.items()[1];
        let miss = &tokens.items()[0];
        assert!(set.is_highlighted(hit).unwrap());
        assert!(!set.is_highlighted(miss).unwrap());
        assert_eq!(set.highlight_color(hit).unwrap(), Some(RED));
        assert_eq!(set.group_id(hit).unwrap(), Some(7));
        assert_eq!(set.group_id(miss).unwrap(), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_secondary_layers() {
        let tokens = tokens();
        let set = HighlightSet::builder(&tokens, 2)
            .in_layer(&tokens.items()[2], 1)
            .unwrap()
            .build();

        let item = &tokens.items()[2];
        assert!(!set.is_highlighted(item).unwrap());
        assert!(set.is_highlighted_in(item, 1).unwrap());
        assert!(!set.is_highlighted_in(item, 0).unwrap());
        assert_eq!(
            set.is_highlighted_in(item, 2).unwrap_err(),
            MappingError::LayerOutOfRange { layer: 2, count: 2 }
        );
    }

    #[test]
    fn test_foreign_items_rejected() {
        let tokens = tokens();
        let other = Container::from_spans("other", vec![(0, 3)]);
        let set = HighlightSet::builder(&tokens, 1).build();

        assert!(set.is_highlighted(&other.items()[0]).unwrap_err().is_foreign());
        assert!(HighlightSet::builder(&tokens, 1)
            .highlight(&other.items()[0], None, None)
            .is_err());
    }

    #[test]
    fn test_color_display() {
        assert_eq!(RED.to_string(), "#ff0000ff");
    }
}
