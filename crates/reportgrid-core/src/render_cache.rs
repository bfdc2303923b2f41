//! Session-owned cache of rendered component content.

use crate::model::ElementId;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Content produced by the rendering collaborator for one component.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRender {
    /// Props the content was rendered from.
    pub props: Value,
    pub content: String,
}

/// Rendered content keyed by component type and element id.
///
/// Entries are only dropped through explicit invalidation.
#[derive(Debug, Clone, Default)]
pub struct RenderCache {
    entries: HashMap<(String, ElementId), CachedRender>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, component_type: &str, id: ElementId) -> Option<&CachedRender> {
        self.entries.get(&(component_type.to_string(), id))
    }

    pub fn insert(
        &mut self,
        component_type: impl Into<String>,
        id: ElementId,
        props: Value,
        content: impl Into<String>,
    ) {
        self.entries.insert(
            (component_type.into(), id),
            CachedRender {
                props,
                content: content.into(),
            },
        );
    }

    /// Return cached content for `props`, rendering and storing it on a miss
    /// or when the entry was rendered from different props.
    pub fn get_or_render<F>(
        &mut self,
        component_type: &str,
        id: ElementId,
        props: &Value,
        render: F,
    ) -> &str
    where
        F: FnOnce(&Value) -> String,
    {
        let fresh = CachedRender {
            props: props.clone(),
            content: String::new(),
        };
        let entry = match self.entries.entry((component_type.to_string(), id)) {
            Entry::Occupied(occupied) if occupied.get().props == *props => {
                return &occupied.into_mut().content;
            }
            Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                *entry = fresh;
                entry
            }
            Entry::Vacant(vacant) => vacant.insert(fresh),
        };
        entry.content = render(props);
        &entry.content
    }

    /// Drop every entry for `id`, whatever its type. Returns whether any existed.
    pub fn invalidate(&mut self, id: ElementId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(_, entry_id), _| *entry_id != id);
        let removed = before != self.entries.len();
        if removed {
            log::trace!("Invalidated render cache for {}", id);
        }
        removed
    }

    /// Invalidate several ids; returns how many had entries.
    pub fn invalidate_many<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = ElementId>,
    {
        ids.into_iter().filter(|id| self.invalidate(*id)).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
