//! The design root and its arena tables.

use super::{
    Component, DesignId, ElementId, ElementKind, Fragment, FragmentInstance, Group, Item,
    LayoutMode,
};
use crate::config::EditorConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::grid::{ColumnSpan, HighlightedArea};
use crate::registry::{CanvasContext, CanvasRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Canvas dimensions of a design.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSettings {
    pub base_width: f64,
    pub number_of_cols: usize,
    pub row_height: f64,
    pub default_number_of_rows: usize,
}

impl Default for DesignSettings {
    fn default() -> Self {
        EditorConfig::default().design_settings()
    }
}

/// Root of an edited document.
///
/// All structural mutation goes through `pub(crate)` methods used by the
/// editor actions; rendering code gets read-only accessors.
#[derive(Debug, Clone)]
pub struct Design {
    pub(crate) id: DesignId,
    pub base_width: f64,
    pub number_of_cols: usize,
    pub row_height: f64,
    pub default_number_of_rows: usize,
    pub(crate) groups: Vec<ElementId>,
    pub(crate) group_table: HashMap<ElementId, Group>,
    pub(crate) items: HashMap<ElementId, Item>,
    pub(crate) components: HashMap<ElementId, Component>,
    pub(crate) fragments: HashMap<ElementId, Fragment>,
    pub(crate) instances: HashMap<ElementId, FragmentInstance>,
    pub(crate) selection: Option<Vec<ElementId>>,
    pub(crate) highlighted_area: Option<HighlightedArea>,
    pub(crate) current_drop_highlight: Option<ElementId>,
    pub(crate) is_resizing: bool,
    pub(crate) registry: CanvasRegistry,
}

impl Design {
    /// Create a design without any rows.
    pub fn new(settings: DesignSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            base_width: settings.base_width,
            number_of_cols: settings.number_of_cols.max(1),
            row_height: settings.row_height,
            default_number_of_rows: settings.default_number_of_rows.max(1),
            groups: Vec::new(),
            group_table: HashMap::new(),
            items: HashMap::new(),
            components: HashMap::new(),
            fragments: HashMap::new(),
            instances: HashMap::new(),
            selection: None,
            highlighted_area: None,
            current_drop_highlight: None,
            is_resizing: false,
            registry: CanvasRegistry::new(),
        }
    }

    /// Create a blank design with `default_number_of_rows` rows, the last
    /// one being the placeholder.
    pub fn with_rows(settings: DesignSettings, layout_mode: LayoutMode) -> Self {
        let mut design = Self::new(settings);
        for i in 0..design.default_number_of_rows {
            let group = if i + 1 == design.default_number_of_rows {
                Group::placeholder(layout_mode)
            } else {
                Group::new(layout_mode)
            };
            design.push_group(group);
        }
        design
    }

    pub fn id(&self) -> DesignId {
        self.id
    }

    pub fn settings(&self) -> DesignSettings {
        DesignSettings {
            base_width: self.base_width,
            number_of_cols: self.number_of_cols,
            row_height: self.row_height,
            default_number_of_rows: self.default_number_of_rows,
        }
    }

    /// Width of one grid column in pixels.
    pub fn col_width(&self) -> f64 {
        self.base_width / self.number_of_cols as f64
    }

    pub fn last_col(&self) -> usize {
        self.number_of_cols.saturating_sub(1)
    }

    // --- read-only views ---

    pub fn group_ids(&self) -> &[ElementId] {
        &self.groups
    }

    /// Groups in row order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter().filter_map(|id| self.group_table.get(id))
    }

    pub fn group(&self, id: ElementId) -> Option<&Group> {
        self.group_table.get(&id)
    }

    pub fn item(&self, id: ElementId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Items of a group in positional order.
    pub fn items_in(&self, group_id: ElementId) -> impl Iterator<Item = &Item> {
        self.group_table
            .get(&group_id)
            .into_iter()
            .flat_map(|group| group.items.iter())
            .filter_map(|id| self.items.get(id))
    }

    pub fn component(&self, id: ElementId) -> Option<&Component> {
        self.components.get(&id)
    }

    pub fn fragment(&self, id: ElementId) -> Option<&Fragment> {
        self.fragments.get(&id)
    }

    pub fn instance(&self, id: ElementId) -> Option<&FragmentInstance> {
        self.instances.get(&id)
    }

    pub fn selection(&self) -> Option<&[ElementId]> {
        self.selection.as_deref()
    }

    pub fn highlighted_area(&self) -> Option<&HighlightedArea> {
        self.highlighted_area.as_ref()
    }

    pub fn current_drop_highlight(&self) -> Option<ElementId> {
        self.current_drop_highlight
    }

    pub fn is_resizing(&self) -> bool {
        self.is_resizing
    }

    pub fn registry(&self) -> &CanvasRegistry {
        &self.registry
    }

    /// Check that `id` is registered as `kind`.
    pub(crate) fn expect_kind(&self, id: ElementId, kind: ElementKind) -> CanvasResult<()> {
        match self.registry.kind_of(id) {
            Some(found) if found == kind => Ok(()),
            Some(_) => Err(CanvasError::WrongElementKind { id, expected: kind }),
            None if kind == ElementKind::Group => Err(CanvasError::GroupNotFound(id)),
            None => Err(CanvasError::ElementNotFound(id)),
        }
    }

    pub(crate) fn require_group(&self, id: ElementId) -> CanvasResult<&Group> {
        self.expect_kind(id, ElementKind::Group)?;
        self.group_table.get(&id).ok_or(CanvasError::GroupNotFound(id))
    }

    pub(crate) fn require_item(&self, id: ElementId) -> CanvasResult<&Item> {
        self.expect_kind(id, ElementKind::Item)?;
        self.items.get(&id).ok_or(CanvasError::ElementNotFound(id))
    }

    pub(crate) fn require_component(&self, id: ElementId) -> CanvasResult<&Component> {
        self.expect_kind(id, ElementKind::Component)?;
        self.components.get(&id).ok_or(CanvasError::ElementNotFound(id))
    }

    pub(crate) fn require_fragment(&self, id: ElementId) -> CanvasResult<&Fragment> {
        self.expect_kind(id, ElementKind::Fragment)?;
        self.fragments.get(&id).ok_or(CanvasError::ElementNotFound(id))
    }

    pub(crate) fn require_instance(&self, id: ElementId) -> CanvasResult<&FragmentInstance> {
        self.expect_kind(id, ElementKind::FragmentInstance)?;
        self.instances.get(&id).ok_or(CanvasError::ElementNotFound(id))
    }

    // --- rows ---

    /// Append a group and register it.
    pub(crate) fn push_group(&mut self, group: Group) -> ElementId {
        let id = group.id;
        self.registry
            .register(id, self.groups.len(), ElementKind::Group, None, None);
        self.groups.push(id);
        self.group_table.insert(id, group);
        id
    }

    /// Keep exactly one empty placeholder row at the end.
    ///
    /// A placeholder that received content becomes a regular row and a new
    /// placeholder is appended after it.
    pub(crate) fn ensure_trailing_placeholder(&mut self, layout_mode: LayoutMode) {
        let last = self.groups.last().and_then(|id| self.group_table.get_mut(id));
        match last {
            Some(group) if group.placeholder && group.items.is_empty() => return,
            Some(group) => group.placeholder = false,
            None => {}
        }
        let id = self.push_group(Group::placeholder(layout_mode));
        log::debug!("Appended placeholder row {}", id);
    }

    // --- items ---

    /// Insert an item into its group and register it.
    ///
    /// Grid items are placed by start column; fixed items are appended.
    pub(crate) fn insert_item(&mut self, item: Item) -> CanvasResult<ElementId> {
        let id = item.id;
        let group_id = item.group;
        let group = self
            .group_table
            .get_mut(&group_id)
            .ok_or(CanvasError::GroupNotFound(group_id))?;

        let position = if group.is_grid() {
            group
                .items
                .iter()
                .position(|other| self.items.get(other).is_some_and(|o| o.start > item.start))
                .unwrap_or(group.items.len())
        } else {
            group.items.len()
        };

        group.items.insert(position, id);
        self.registry
            .register(id, position, ElementKind::Item, Some(group_id), None);
        self.items.insert(id, item);
        self.recompute_left_spaces(group_id);
        self.reindex(Some(group_id));
        Ok(id)
    }

    /// Remove an item together with every component it holds.
    /// Returns the removed element ids.
    pub(crate) fn remove_item(&mut self, item_id: ElementId) -> Vec<ElementId> {
        let Some(item) = self.items.get(&item_id) else {
            return Vec::new();
        };
        let group_id = item.group;
        let mut removed = Vec::new();
        for component_id in item.components.clone() {
            removed.extend(self.remove_component_tree(component_id));
        }

        self.items.remove(&item_id);
        self.registry.unregister(item_id);
        if let Some(group) = self.group_table.get_mut(&group_id) {
            group.items.retain(|&id| id != item_id);
        }
        self.recompute_left_spaces(group_id);
        self.reindex(Some(group_id));
        removed.push(item_id);
        removed
    }

    /// Apply a new column range to a grid item, keeping the group sorted.
    pub(crate) fn update_item_span(
        &mut self,
        item_id: ElementId,
        span: ColumnSpan,
    ) -> CanvasResult<()> {
        let item = self
            .items
            .get_mut(&item_id)
            .ok_or(CanvasError::ElementNotFound(item_id))?;
        item.set_span(span);
        let group_id = item.group;

        if let Some(group) = self.group_table.get_mut(&group_id) {
            let items = &self.items;
            group
                .items
                .sort_by_key(|id| items.get(id).map(|item| item.start).unwrap_or(usize::MAX));
        }
        self.recompute_left_spaces(group_id);
        self.reindex(Some(group_id));
        Ok(())
    }

    /// Derive each grid item's `left_space` from the gap before it.
    pub(crate) fn recompute_left_spaces(&mut self, group_id: ElementId) {
        let Some(group) = self.group_table.get(&group_id) else {
            return;
        };
        if !group.is_grid() {
            return;
        }
        let mut next_free = 0;
        for id in &group.items {
            if let Some(item) = self.items.get_mut(id) {
                item.left_space = item.start.saturating_sub(next_free);
                next_free = item.end + 1;
            }
        }
    }

    // --- components ---

    /// Insert a component into its parent (item or fragment instance).
    /// `position` defaults to the end.
    pub(crate) fn insert_component(
        &mut self,
        component: Component,
        position: Option<usize>,
    ) -> CanvasResult<ElementId> {
        let id = component.id;
        let parent = component.parent;
        let siblings = self.component_list_mut(parent)?;
        let position = position.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(position, id);

        self.registry
            .register(id, position, ElementKind::Component, Some(parent), None);
        self.components.insert(id, component);
        self.reindex(Some(parent));
        Ok(id)
    }

    /// Take a component out of its parent without dropping its subtree.
    /// Returns the former parent and position.
    pub(crate) fn detach_component(&mut self, id: ElementId) -> CanvasResult<(ElementId, usize)> {
        let parent = self.require_component(id)?.parent;
        let siblings = self.component_list_mut(parent)?;
        let position = siblings
            .iter()
            .position(|&sibling| sibling == id)
            .ok_or(CanvasError::ElementNotFound(id))?;
        siblings.remove(position);
        self.reindex(Some(parent));
        Ok((parent, position))
    }

    /// Put a detached component under `parent`.
    pub(crate) fn attach_component(
        &mut self,
        id: ElementId,
        parent: ElementId,
        position: Option<usize>,
    ) -> CanvasResult<()> {
        let siblings = self.component_list_mut(parent)?;
        let position = position.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(position, id);

        if let Some(component) = self.components.get_mut(&id) {
            component.parent = parent;
        }
        self.registry.set_parent(id, Some(parent));
        self.reindex(Some(parent));
        Ok(())
    }

    /// Remove a component and everything nested in it.
    /// Returns the removed component and fragment instance ids.
    pub(crate) fn remove_component_tree(&mut self, id: ElementId) -> Vec<ElementId> {
        let Some(component) = self.components.get(&id) else {
            return Vec::new();
        };
        let parent = component.parent;
        let fragment_ids: Vec<_> = component.fragments.values().copied().collect();

        let mut removed = Vec::new();
        for fragment_id in fragment_ids {
            let instance_ids = self
                .fragments
                .get(&fragment_id)
                .map(|fragment| fragment.instances.clone())
                .unwrap_or_default();
            for instance_id in instance_ids {
                removed.extend(self.remove_instance_tree(instance_id));
            }
            self.fragments.remove(&fragment_id);
            self.registry.unregister(fragment_id);
        }

        if let Ok(siblings) = self.component_list_mut(parent) {
            siblings.retain(|&sibling| sibling != id);
            self.reindex(Some(parent));
        }
        self.components.remove(&id);
        self.registry.unregister(id);
        removed.push(id);
        removed
    }

    // --- fragments ---

    /// Register a fragment on a component under its name.
    pub(crate) fn add_fragment(&mut self, fragment: Fragment) -> CanvasResult<ElementId> {
        let id = fragment.id;
        let component_id = fragment.component;
        let component = self
            .components
            .get_mut(&component_id)
            .ok_or(CanvasError::ElementNotFound(component_id))?;
        component.fragments.insert(fragment.name.clone(), id);

        self.registry
            .register(id, 0, ElementKind::Fragment, Some(component_id), None);
        self.fragments.insert(id, fragment);
        self.reindex(Some(component_id));
        Ok(id)
    }

    /// Append an instance to its fragment.
    pub(crate) fn add_instance(&mut self, instance: FragmentInstance) -> CanvasResult<ElementId> {
        let id = instance.id;
        let fragment_id = instance.fragment;
        let fragment = self
            .fragments
            .get_mut(&fragment_id)
            .ok_or(CanvasError::ElementNotFound(fragment_id))?;
        fragment.instances.push(id);
        let index = fragment.instances.len() - 1;

        self.registry.register(
            id,
            index,
            ElementKind::FragmentInstance,
            Some(fragment_id),
            None,
        );
        self.instances.insert(id, instance);
        Ok(id)
    }

    /// Remove an instance and its nested components.
    pub(crate) fn remove_instance_tree(&mut self, id: ElementId) -> Vec<ElementId> {
        let Some(instance) = self.instances.get(&id) else {
            return Vec::new();
        };
        let fragment_id = instance.fragment;
        let mut removed = Vec::new();
        for component_id in instance.components.clone() {
            removed.extend(self.remove_component_tree(component_id));
        }

        self.instances.remove(&id);
        self.registry.unregister(id);
        if let Some(fragment) = self.fragments.get_mut(&fragment_id) {
            fragment.instances.retain(|&instance| instance != id);
        }
        self.reindex(Some(fragment_id));
        removed.push(id);
        removed
    }

    fn component_list_mut(&mut self, parent: ElementId) -> CanvasResult<&mut Vec<ElementId>> {
        match self.registry.kind_of(parent) {
            Some(ElementKind::Item) => self
                .items
                .get_mut(&parent)
                .map(|item| &mut item.components)
                .ok_or(CanvasError::ElementNotFound(parent)),
            Some(ElementKind::FragmentInstance) => self
                .instances
                .get_mut(&parent)
                .map(|instance| &mut instance.components)
                .ok_or(CanvasError::ElementNotFound(parent)),
            Some(_) => Err(CanvasError::WrongElementKind {
                id: parent,
                expected: ElementKind::Item,
            }),
            None => Err(CanvasError::ElementNotFound(parent)),
        }
    }

    // --- registry maintenance ---

    /// Ordered children of `parent` (`None` = the design's rows).
    pub fn children_of(&self, parent: Option<ElementId>) -> Vec<ElementId> {
        let Some(parent) = parent else {
            return self.groups.clone();
        };
        match self.registry.kind_of(parent) {
            Some(ElementKind::Group) => self
                .group_table
                .get(&parent)
                .map(|group| group.items.clone())
                .unwrap_or_default(),
            Some(ElementKind::Item) => self
                .items
                .get(&parent)
                .map(|item| item.components.clone())
                .unwrap_or_default(),
            Some(ElementKind::Component) => self
                .components
                .get(&parent)
                .map(|component| component.fragments.values().copied().collect())
                .unwrap_or_default(),
            Some(ElementKind::Fragment) => self
                .fragments
                .get(&parent)
                .map(|fragment| fragment.instances.clone())
                .unwrap_or_default(),
            Some(ElementKind::FragmentInstance) => self
                .instances
                .get(&parent)
                .map(|instance| instance.components.clone())
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Rewrite registry indices for the children of `parent` and refresh
    /// the component contexts that depend on them.
    pub fn reindex(&mut self, parent: Option<ElementId>) {
        let children = self.children_of(parent);
        let changed = self.registry.reindex_siblings(&children);
        if changed > 0 {
            log::debug!("Reindexed {} children of {:?}", changed, parent);
        }

        match parent.and_then(|id| self.registry.kind_of(id).map(|kind| (id, kind))) {
            None => {
                for group_id in self.groups.clone() {
                    self.refresh_contexts(group_id);
                }
            }
            Some((group_id, ElementKind::Group)) => self.refresh_contexts(group_id),
            Some((item_id, ElementKind::Item)) => {
                if let Some(group_id) = self.items.get(&item_id).map(|item| item.group) {
                    self.refresh_contexts(group_id);
                }
            }
            Some(_) => {}
        }
    }

    /// Rewrite the canvas context of every component placed in a group's items.
    fn refresh_contexts(&mut self, group_id: ElementId) {
        let Some(group_index) = self.groups.iter().position(|&id| id == group_id) else {
            return;
        };
        let Some(group) = self.group_table.get(&group_id) else {
            return;
        };
        for (item_index, item_id) in group.items.iter().enumerate() {
            let Some(item) = self.items.get(item_id) else {
                continue;
            };
            let context = CanvasContext {
                group_id,
                group_index,
                item_id: *item_id,
                item_index,
            };
            for component_id in &item.components {
                self.registry.set_context(*component_id, Some(context));
            }
        }
    }

    // --- selection and highlight ---

    /// Selectable ancestors of `id` from the outermost row down to `id`.
    ///
    /// Rows, items, components and inline fragments take part; fragment
    /// instances and block fragments are skipped.
    pub fn selection_chain(&self, id: ElementId) -> CanvasResult<Vec<ElementId>> {
        if !self.registry.contains(id) {
            return Err(CanvasError::ElementNotFound(id));
        }
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(element) = current {
            let selectable = match self.registry.kind_of(element) {
                Some(ElementKind::Group | ElementKind::Item | ElementKind::Component) => true,
                Some(ElementKind::Fragment) => {
                    self.fragments.get(&element).is_some_and(Fragment::is_inline)
                }
                Some(ElementKind::FragmentInstance) | None => false,
            };
            if selectable {
                chain.push(element);
            }
            current = self.registry.parent_of(element);
        }
        chain.reverse();
        Ok(chain)
    }

    pub(crate) fn set_selected_flag(&mut self, id: ElementId, selected: bool) {
        match self.registry.kind_of(id) {
            Some(ElementKind::Group) => {
                if let Some(group) = self.group_table.get_mut(&id) {
                    group.selected = selected;
                }
            }
            Some(ElementKind::Item) => {
                if let Some(item) = self.items.get_mut(&id) {
                    item.selected = selected;
                }
            }
            Some(ElementKind::Component) => {
                if let Some(component) = self.components.get_mut(&id) {
                    component.selected = selected;
                }
            }
            Some(ElementKind::Fragment) => {
                if let Some(fragment) = self.fragments.get_mut(&id) {
                    fragment.selected = selected;
                }
            }
            Some(ElementKind::FragmentInstance) | None => {}
        }
    }

    fn set_drop_highlight_flag(&mut self, id: ElementId, highlighted: bool) {
        if let Some(group) = self.group_table.get_mut(&id) {
            group.drop_highlight = highlighted;
        } else if let Some(fragment) = self.fragments.get_mut(&id) {
            fragment.drop_highlight = highlighted;
        }
    }

    /// Move the drop highlight to `id`, clearing the previous element.
    pub(crate) fn set_drop_highlight(&mut self, id: Option<ElementId>) {
        if let Some(previous) = self.current_drop_highlight.take() {
            self.set_drop_highlight_flag(previous, false);
        }
        if let Some(next) = id {
            self.set_drop_highlight_flag(next, true);
        }
        self.current_drop_highlight = id;
    }

    /// Drop the highlighted area and the drop highlight.
    pub(crate) fn clear_highlight(&mut self) -> bool {
        let had_area = self.highlighted_area.take().is_some();
        let had_drop = self.current_drop_highlight.is_some();
        self.set_drop_highlight(None);
        had_area || had_drop
    }

    // --- invariants ---

    /// Grid rows hold sorted, non-overlapping, in-bounds items and exactly
    /// one placeholder row sits at the end.
    pub fn is_consistent(&self) -> bool {
        let last_col = self.last_col();
        for group in self.groups() {
            if !group.is_grid() {
                continue;
            }
            let mut previous_end: Option<usize> = None;
            for item in self.items_in(group.id) {
                if item.start > item.end || item.end > last_col {
                    return false;
                }
                if previous_end.is_some_and(|end| item.start <= end) {
                    return false;
                }
                previous_end = Some(item.end);
            }
        }

        let placeholders: Vec<_> = self
            .groups
            .iter()
            .enumerate()
            .filter(|(_, id)| self.group_table.get(id).is_some_and(|g| g.placeholder))
            .map(|(index, _)| index)
            .collect();
        placeholders.len() <= 1
            && placeholders
                .first()
                .is_none_or(|&index| index + 1 == self.groups.len())
    }
}
