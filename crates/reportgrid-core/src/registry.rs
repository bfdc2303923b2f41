//! Canvas registry: where every element of a design currently lives.

use crate::model::{ElementId, ElementKind};
use std::collections::HashMap;

/// Position of a component placed directly inside an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasContext {
    pub group_id: ElementId,
    pub group_index: usize,
    pub item_id: ElementId,
    pub item_index: usize,
}

/// Lookup record for a single element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Position within the parent's ordered children.
    pub index: usize,
    pub kind: ElementKind,
    /// Owning element, `None` for groups (owned by the design).
    pub parent: Option<ElementId>,
    pub context: Option<CanvasContext>,
}

/// Flat map from element id to its structural position.
///
/// Entries are non-owning; the element data lives in the design's tables.
#[derive(Debug, Clone, Default)]
pub struct CanvasRegistry {
    entries: HashMap<ElementId, RegistryEntry>,
}

impl CanvasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an element.
    pub fn register(
        &mut self,
        id: ElementId,
        index: usize,
        kind: ElementKind,
        parent: Option<ElementId>,
        context: Option<CanvasContext>,
    ) {
        self.entries.insert(
            id,
            RegistryEntry {
                index,
                kind,
                parent,
                context,
            },
        );
    }

    pub fn get(&self, id: ElementId) -> Option<&RegistryEntry> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn kind_of(&self, id: ElementId) -> Option<ElementKind> {
        self.entries.get(&id).map(|entry| entry.kind)
    }

    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.entries.get(&id).and_then(|entry| entry.parent)
    }

    pub fn unregister(&mut self, id: ElementId) -> Option<RegistryEntry> {
        self.entries.remove(&id)
    }

    /// Rewrite indices so each sibling's index equals its position.
    /// Returns how many entries changed.
    pub fn reindex_siblings(&mut self, siblings: &[ElementId]) -> usize {
        let mut changed = 0;
        for (index, id) in siblings.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(id) {
                if entry.index != index {
                    entry.index = index;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Move an entry under a new parent.
    pub fn set_parent(&mut self, id: ElementId, parent: Option<ElementId>) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.parent = parent;
        }
    }

    pub fn set_context(&mut self, id: ElementId, context: Option<CanvasContext>) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.context = context;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of every registered element of `kind`.
    pub fn ids_of_kind(&self, kind: ElementKind) -> Vec<ElementId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(&id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_missing_entry_is_none() {
        let registry = CanvasRegistry::new();
        assert!(registry.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = CanvasRegistry::new();
        let group = Uuid::new_v4();
        let item = Uuid::new_v4();
        registry.register(group, 0, ElementKind::Group, None, None);
        registry.register(item, 3, ElementKind::Item, Some(group), None);

        let entry = registry.get(item).unwrap();
        assert_eq!(entry.index, 3);
        assert_eq!(entry.kind, ElementKind::Item);
        assert_eq!(registry.parent_of(item), Some(group));
        assert_eq!(registry.parent_of(group), None);
    }

    #[test]
    fn test_reindex_after_removal() {
        let mut registry = CanvasRegistry::new();
        let ids: Vec<_> = (0..4).map(|_| Uuid::new_v4()).collect();
        for (i, &id) in ids.iter().enumerate() {
            registry.register(id, i, ElementKind::Component, None, None);
        }

        registry.unregister(ids[1]);
        let remaining = [ids[0], ids[2], ids[3]];
        assert_eq!(registry.reindex_siblings(&remaining), 2);

        assert_eq!(registry.get(ids[2]).unwrap().index, 1);
        assert_eq!(registry.get(ids[3]).unwrap().index, 2);
        assert_eq!(registry.reindex_siblings(&remaining), 0);
    }

    #[test]
    fn test_ids_of_kind() {
        let mut registry = CanvasRegistry::new();
        let group = Uuid::new_v4();
        registry.register(group, 0, ElementKind::Group, None, None);
        registry.register(Uuid::new_v4(), 0, ElementKind::Item, Some(group), None);
        assert_eq!(registry.ids_of_kind(ElementKind::Group), vec![group]);
    }
}
