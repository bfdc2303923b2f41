//! Editor session: the only place designs are mutated.
//!
//! Each method is one atomic action. Actions that reference a design or
//! element that no longer exists return a not-found error and leave the
//! design untouched; actions that would not change anything return
//! [`Outcome::Unchanged`].

mod drag;
mod events;

pub use drag::{
    ComponentBehind, DragPayload, DragSource, DraggedElement, DropTarget, ItemTarget, TargetArea,
};
pub use events::{EditorEvent, EditorEventKind};

use crate::config::EditorConfig;
use crate::definition::{ComponentDefinition, DesignDefinition, FragmentDefinition};
use crate::error::{CanvasError, CanvasResult, Outcome};
use crate::fragment::{StaleInstance, reconcile};
use crate::grid::HighlightedArea;
use crate::model::{Design, DesignId, DesignSettings, ElementId, FragmentInstance, Item, LayoutMode};
use crate::render_cache::RenderCache;
use crate::resize::{self, ResizeLimits, ResizeStart};
use crate::storage::DesignStore;
use events::{DeferredAction, DeferredQueue, DeferredTask};
use kurbo::Point;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Identity of a component created by an add or move action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddedComponent {
    pub id: ElementId,
}

/// Partial update of a component. `None` leaves a field as is; for the
/// optional fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentChanges {
    pub props: Option<Value>,
    pub bindings: Option<Option<Value>>,
    pub expressions: Option<Option<Value>>,
    pub template: Option<Option<String>>,
}

/// Editing session holding every open design.
#[derive(Debug, Default)]
pub struct Editor {
    config: EditorConfig,
    designs: HashMap<DesignId, Design>,
    render_cache: RenderCache,
    /// Default props by component type, used when a new component has none.
    component_types: HashMap<String, Value>,
    events: Vec<EditorEvent>,
    deferred: DeferredQueue,
}

fn lookup(designs: &mut HashMap<DesignId, Design>, id: DesignId) -> CanvasResult<&mut Design> {
    designs.get_mut(&id).ok_or_else(|| {
        log::warn!("Design {} not found", id);
        CanvasError::DesignNotFound(id)
    })
}

/// Log actions rejected because of a stale id.
fn stale<T>(action: &str, result: CanvasResult<T>) -> CanvasResult<T> {
    result.inspect_err(|err| {
        if err.is_not_found() {
            log::warn!("{} rejected: {}", action, err);
        }
    })
}

fn fill_default_props(types: &HashMap<String, Value>, definition: &mut ComponentDefinition) {
    if definition.props.is_null() {
        if let Some(defaults) = types.get(&definition.component_type) {
            definition.props = defaults.clone();
        }
    }
    for fragment in definition.fragments.values_mut() {
        for instance in &mut fragment.instances {
            for component in &mut instance.components {
                fill_default_props(types, component);
            }
        }
    }
}

fn select(design: &mut Design, element: ElementId) -> CanvasResult<Outcome> {
    let chain = design.selection_chain(element)?;
    if design.selection.as_deref() == Some(chain.as_slice()) {
        return Ok(Outcome::Unchanged);
    }
    deselect(design);
    for id in &chain {
        design.set_selected_flag(*id, true);
    }
    design.selection = Some(chain);
    Ok(Outcome::Applied)
}

fn deselect(design: &mut Design) -> Outcome {
    let Some(selection) = design.selection.take() else {
        return Outcome::Unchanged;
    };
    for id in selection {
        design.set_selected_flag(id, false);
    }
    Outcome::Applied
}

/// Resolve a target area into a container and insert position, creating
/// the item for column targets.
fn prepare_container(
    design: &mut Design,
    target: TargetArea,
) -> CanvasResult<(ElementId, Option<usize>)> {
    match target {
        TargetArea::Columns {
            group_id,
            span,
            min_space,
        } => {
            let group = design.require_group(group_id)?;
            let item = match group.layout_mode {
                LayoutMode::Grid => {
                    let overlaps = design
                        .items_in(group_id)
                        .any(|item| item.span().overlaps(&span));
                    if overlaps || span.end > design.last_col() {
                        return Err(CanvasError::Conflict {
                            group: group_id,
                            start: span.start,
                            end: span.end,
                        });
                    }
                    Item::new(group_id, span, min_space)
                }
                LayoutMode::Fixed => {
                    let col_width = design.col_width();
                    Item::fixed(
                        group_id,
                        (span.start as f64 * col_width).round() as usize,
                        (span.len() as f64 * col_width).round() as usize,
                        min_space,
                    )
                }
            };
            let item_id = design.insert_item(item)?;
            design.ensure_trailing_placeholder(LayoutMode::Grid);
            Ok((item_id, None))
        }
        TargetArea::Item { item_id, mark } => {
            design.require_item(item_id)?;
            Ok((item_id, drag::insert_position(design, item_id, mark.as_ref())))
        }
        TargetArea::FragmentInstance { instance_id, mark } => {
            design.require_instance(instance_id)?;
            Ok((instance_id, drag::insert_position(design, instance_id, mark.as_ref())))
        }
    }
}

/// Drop `item_id` when it no longer holds any component.
fn remove_if_empty(design: &mut Design, item_id: ElementId) -> Vec<ElementId> {
    if design.item(item_id).is_some_and(|item| item.components().is_empty()) {
        log::debug!("Removing emptied item {}", item_id);
        design.remove_item(item_id)
    } else {
        Vec::new()
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Register default props for a component type.
    pub fn register_component_type(
        &mut self,
        component_type: impl Into<String>,
        default_props: Value,
    ) {
        self.component_types.insert(component_type.into(), default_props);
    }

    // --- designs ---

    /// Create a design, blank or from a stored definition.
    ///
    /// Values in `definition` win over `settings`, which win over the
    /// editor configuration.
    pub fn add_design(
        &mut self,
        settings: Option<DesignSettings>,
        definition: Option<&DesignDefinition>,
    ) -> CanvasResult<DesignId> {
        let settings = settings.unwrap_or_else(|| self.config.design_settings());
        let design = match definition {
            Some(definition) => Design::from_definition(settings, definition)?,
            None => Design::with_rows(settings, self.config.default_layout_mode),
        };
        let id = design.id();
        log::debug!("Added design {} ({} rows)", id, design.group_ids().len());
        self.designs.insert(id, design);
        self.emit(id, EditorEventKind::DesignAdded);
        Ok(id)
    }

    pub fn remove_design(&mut self, id: DesignId) -> Option<Design> {
        let design = self.designs.remove(&id)?;
        self.deferred.cancel(id, DeferredAction::ClearResizing);
        self.render_cache
            .invalidate_many(design.components.keys().copied());
        self.emit(id, EditorEventKind::DesignRemoved);
        Some(design)
    }

    pub fn design(&self, id: DesignId) -> Option<&Design> {
        self.designs.get(&id)
    }

    pub fn design_ids(&self) -> impl Iterator<Item = DesignId> + '_ {
        self.designs.keys().copied()
    }

    /// Export a design in its persisted shape.
    pub fn export_design(&self, id: DesignId) -> CanvasResult<DesignDefinition> {
        self.designs
            .get(&id)
            .map(Design::to_definition)
            .ok_or(CanvasError::DesignNotFound(id))
    }

    /// Persist a design under `key`.
    pub fn save_design(
        &self,
        store: &dyn DesignStore,
        key: &str,
        id: DesignId,
    ) -> CanvasResult<()> {
        let definition = self.export_design(id)?;
        store.save(key, &definition)?;
        log::debug!("Saved design {} as {}", id, key);
        Ok(())
    }

    /// Load the definition stored under `key` into a new design.
    pub fn open_design(&mut self, store: &dyn DesignStore, key: &str) -> CanvasResult<DesignId> {
        let definition = store.load(key)?;
        self.add_design(None, Some(&definition))
    }

    // --- selection ---

    /// Select `element_id` together with its selectable ancestors.
    pub fn set_selection(
        &mut self,
        design_id: DesignId,
        element_id: ElementId,
    ) -> CanvasResult<Outcome> {
        let design = lookup(&mut self.designs, design_id)?;
        let outcome = stale("set_selection", select(design, element_id))?;
        if outcome.is_applied() {
            self.emit(design_id, EditorEventKind::SelectionChanged);
        }
        Ok(outcome)
    }

    pub fn clear_selection(&mut self, design_id: DesignId) -> CanvasResult<Outcome> {
        let design = lookup(&mut self.designs, design_id)?;
        let outcome = deselect(design);
        if outcome.is_applied() {
            self.emit(design_id, EditorEventKind::SelectionChanged);
        }
        Ok(outcome)
    }

    // --- highlight ---

    pub fn highlight_area(
        &mut self,
        design_id: DesignId,
        area: HighlightedArea,
    ) -> CanvasResult<Outcome> {
        let design = lookup(&mut self.designs, design_id)?;
        design.highlighted_area = Some(area);
        self.emit(design_id, EditorEventKind::HighlightChanged);
        Ok(Outcome::Applied)
    }

    /// Recompute the drop feedback for a drag sample.
    pub fn highlight_area_from_drag(
        &mut self,
        design_id: DesignId,
        payload: &DragPayload,
    ) -> CanvasResult<Outcome> {
        let design = lookup(&mut self.designs, design_id)?;
        let feedback = stale("highlight_area_from_drag", drag::drag_feedback(design, payload))?;

        let target_moved = design.current_drop_highlight != Some(feedback.drop_highlight);
        if target_moved {
            design.set_drop_highlight(Some(feedback.drop_highlight));
        }
        if !target_moved && design.highlighted_area.as_ref() == Some(&feedback.area) {
            return Ok(Outcome::Unchanged);
        }
        design.highlighted_area = Some(feedback.area);
        self.emit(design_id, EditorEventKind::HighlightChanged);
        Ok(Outcome::Applied)
    }

    pub fn clear_highlight_area(&mut self, design_id: DesignId) -> CanvasResult<Outcome> {
        let design = lookup(&mut self.designs, design_id)?;
        if !design.clear_highlight() {
            return Ok(Outcome::Unchanged);
        }
        self.emit(design_id, EditorEventKind::HighlightChanged);
        Ok(Outcome::Applied)
    }

    // --- components ---

    /// Create a component from `definition` at `target`.
    pub fn add_component(
        &mut self,
        design_id: DesignId,
        definition: &ComponentDefinition,
        target: TargetArea,
    ) -> CanvasResult<AddedComponent> {
        let mut definition = definition.clone();
        fill_default_props(&self.component_types, &mut definition);

        let design = lookup(&mut self.designs, design_id)?;
        let (container, position) = stale("add_component", prepare_container(design, target))?;
        let id = design.build_component(container, &definition, position)?;

        log::debug!("Added {} component {} to {}", definition.component_type, id, container);
        self.emit(design_id, EditorEventKind::ComponentAdded { id });
        Ok(AddedComponent { id })
    }

    /// Remove a component and its subtree. An item left empty is removed
    /// too. With `select`, the previous sibling (else the next) is selected.
    pub fn remove_component(
        &mut self,
        design_id: DesignId,
        component_id: ElementId,
        select_sibling: bool,
    ) -> CanvasResult<Outcome> {
        let design = lookup(&mut self.designs, design_id)?;
        let parent = stale("remove_component", design.require_component(component_id))?.parent();
        let siblings = design.children_of(Some(parent));
        let index = siblings
            .iter()
            .position(|&id| id == component_id)
            .ok_or(CanvasError::ElementNotFound(component_id))?;
        let previous = index.checked_sub(1).and_then(|i| siblings.get(i).copied());
        let next = siblings.get(index + 1).copied();
        let parent_resizing = design.item(parent).is_some_and(Item::is_resizing);

        let mut removed = design.remove_component_tree(component_id);
        removed.extend(remove_if_empty(design, parent));
        let resize_dropped = parent_resizing && design.item(parent).is_none();
        if resize_dropped {
            design.clear_highlight();
        }

        let mut selection_changed = false;
        if design
            .selection
            .as_ref()
            .is_some_and(|selection| selection.iter().any(|id| removed.contains(id)))
        {
            selection_changed |= deselect(design).is_applied();
        }
        if select_sibling {
            if let Some(sibling) = previous.or(next) {
                selection_changed |= select(design, sibling)?.is_applied();
            }
        }

        log::debug!("Removed component {} ({} elements)", component_id, removed.len());
        self.render_cache.invalidate_many(removed);
        if resize_dropped {
            self.schedule_clear_resizing(design_id);
        }
        self.emit(design_id, EditorEventKind::ComponentRemoved { id: component_id });
        if selection_changed {
            self.emit(design_id, EditorEventKind::SelectionChanged);
        }
        Ok(Outcome::Applied)
    }

    /// Drop the dragged element at the target of `payload`.
    ///
    /// Existing components keep their id and subtree. Returns `None` when the
    /// drop lands on the dragged component itself or inside its own subtree.
    pub fn move_component_from_drag(
        &mut self,
        design_id: DesignId,
        payload: &DragPayload,
        select_dropped: bool,
    ) -> CanvasResult<Option<AddedComponent>> {
        let mut palette = match &payload.source {
            DragSource::Palette { component } => Some(component.clone()),
            DragSource::Component { .. } => None,
        };
        if let Some(definition) = palette.as_mut() {
            fill_default_props(&self.component_types, definition);
        }

        let design = lookup(&mut self.designs, design_id)?;
        let feedback = stale("move_component_from_drag", drag::drag_feedback(design, payload))?;
        let target = drag::target_area(payload, &feedback)?;

        let (id, event) = match (payload.origin_component(), palette) {
            (Some(component_id), _) => {
                let dropped_on_self = match payload.target {
                    DropTarget::Group {
                        item: Some(_),
                        component_behind,
                        ..
                    }
                    | DropTarget::Fragment {
                        component_behind, ..
                    } => component_behind.is_some_and(|behind| behind.id == component_id),
                    DropTarget::Group { .. } => false,
                };
                let into_own_subtree = match target {
                    TargetArea::FragmentInstance { instance_id, .. } => {
                        drag::is_within(design, instance_id, component_id)
                    }
                    _ => false,
                };
                if dropped_on_self || into_own_subtree {
                    log::debug!("Ignoring drop of {} onto itself", component_id);
                    design.clear_highlight();
                    return Ok(None);
                }

                let (source, _) = design.detach_component(component_id)?;
                let container = match target {
                    TargetArea::Columns { .. } => {
                        remove_if_empty(design, source);
                        let (container, _) = prepare_container(design, target)?;
                        design.attach_component(component_id, container, None)?;
                        container
                    }
                    TargetArea::Item { item_id: container, mark }
                    | TargetArea::FragmentInstance {
                        instance_id: container,
                        mark,
                    } => {
                        let position = drag::insert_position(design, container, mark.as_ref());
                        design.attach_component(component_id, container, position)?;
                        if source != container {
                            remove_if_empty(design, source);
                        }
                        container
                    }
                };
                log::debug!("Moved component {} to {}", component_id, container);
                (component_id, EditorEventKind::ComponentMoved { id: component_id })
            }
            (None, Some(definition)) => {
                let (container, position) = prepare_container(design, target)?;
                let id = design.build_component(container, &definition, position)?;
                log::debug!("Dropped new {} component {}", definition.component_type, id);
                (id, EditorEventKind::ComponentAdded { id })
            }
            (None, None) => return Ok(None),
        };

        design.clear_highlight();
        let selected = if select_dropped {
            select(design, id)?.is_applied()
        } else {
            false
        };

        self.emit(design_id, event);
        if selected {
            self.emit(design_id, EditorEventKind::SelectionChanged);
        }
        Ok(Some(AddedComponent { id }))
    }

    /// Apply `changes` to a component, invalidating its cached render when
    /// the template appears or disappears, or bindings or props change.
    pub fn update_component(
        &mut self,
        design_id: DesignId,
        component_id: ElementId,
        changes: ComponentChanges,
    ) -> CanvasResult<Outcome> {
        let design = lookup(&mut self.designs, design_id)?;
        stale("update_component", design.require_component(component_id))?;
        let Some(component) = design.components.get_mut(&component_id) else {
            return Err(CanvasError::ElementNotFound(component_id));
        };

        let mut changed = false;
        let mut invalidate = false;
        if let Some(template) = changes.template {
            if template != component.template {
                invalidate |= template.is_some() != component.template.is_some();
                component.template = template;
                changed = true;
            }
        }
        if let Some(bindings) = changes.bindings {
            if bindings != component.bindings {
                component.bindings = bindings;
                changed = true;
                invalidate = true;
            }
        }
        if let Some(expressions) = changes.expressions {
            if expressions != component.expressions {
                component.expressions = expressions;
                changed = true;
            }
        }
        if let Some(props) = changes.props {
            if props != component.props {
                component.props = props;
                changed = true;
                invalidate = true;
            }
        }

        if !changed {
            return Ok(Outcome::Unchanged);
        }
        if invalidate {
            self.render_cache.invalidate(component_id);
        }
        log::debug!("Updated component {} (cache invalidated: {})", component_id, invalidate);
        self.emit(
            design_id,
            EditorEventKind::ComponentUpdated {
                id: component_id,
                cache_invalidated: invalidate,
            },
        );
        Ok(Outcome::Applied)
    }

    /// Bring fragments in line with freshly rendered definitions, keyed by
    /// fragment name. Returns the instances that must be remounted.
    pub fn reconcile_fragments(
        &mut self,
        design_id: DesignId,
        fragment_ids: &[ElementId],
        incoming: &BTreeMap<String, FragmentDefinition>,
    ) -> CanvasResult<Vec<StaleInstance>> {
        let design = lookup(&mut self.designs, design_id)?;
        let mut stale_instances = Vec::new();
        let mut invalidated = Vec::new();

        for &fragment_id in fragment_ids {
            let Some(fragment) = design.fragment(fragment_id).cloned() else {
                log::warn!("Skipping unknown fragment {}", fragment_id);
                continue;
            };
            let existing: Vec<FragmentInstance> = fragment
                .instances()
                .iter()
                .filter_map(|id| design.instance(*id).cloned())
                .collect();
            let mut definitions = incoming
                .get(&fragment.name)
                .map(|definition| definition.instances.clone())
                .unwrap_or_default();
            for definition in &mut definitions {
                for component in &mut definition.components {
                    fill_default_props(&self.component_types, component);
                }
            }

            let result = reconcile(&fragment, &existing, &definitions);

            for updated in &result.updated {
                if let Some(instance) = design.instances.get_mut(&updated.id()) {
                    instance.tag = updated.tag.clone();
                    instance.sketch = updated.sketch.clone();
                    instance.style = updated.style.clone();
                    instance.template = updated.template.clone();
                }
            }
            for removed in &result.removed {
                invalidated.extend(design.remove_instance_tree(removed.id));
            }
            for (instance, definition) in result.added_with_definitions(&definitions) {
                design.build_instance(instance.clone(), &definition.components)?;
            }

            invalidated.extend(result.stale.iter().map(|instance| instance.id));
            if result.full_removal {
                invalidated.push(fragment.component());
            }
            log::debug!(
                "Reconciled fragment {} ({} updated, {} removed, {} added, {} stale)",
                fragment.name,
                result.updated.len(),
                result.removed.len(),
                result.added.len(),
                result.stale.len()
            );
            stale_instances.extend(result.stale);
        }

        self.render_cache.invalidate_many(invalidated);
        self.emit(
            design_id,
            EditorEventKind::FragmentsReconciled {
                stale: stale_instances.clone(),
            },
        );
        Ok(stale_instances)
    }

    // --- resize ---

    pub fn start_resize(
        &mut self,
        design_id: DesignId,
        item_id: ElementId,
        request: ResizeStart,
    ) -> CanvasResult<ResizeLimits> {
        let design = lookup(&mut self.designs, design_id)?;
        let limits = stale("start_resize", resize::start(design, item_id, request))?;
        // a clear queued by an earlier resize must not hide this one
        self.deferred.cancel(design_id, DeferredAction::ClearResizing);
        Ok(limits)
    }

    /// Apply a pointer sample along the direction the resize started with.
    pub fn resize(
        &mut self,
        design_id: DesignId,
        item_id: ElementId,
        pointer: Point,
    ) -> CanvasResult<Outcome> {
        let design = lookup(&mut self.designs, design_id)?;
        let outcome = stale("resize", resize::update(design, item_id, pointer))?;
        if outcome.is_applied() {
            self.emit(design_id, EditorEventKind::HighlightChanged);
        }
        Ok(outcome)
    }

    /// Finish a resize. `is_resizing` is cleared by a deferred task once
    /// the configured settle delay has passed.
    pub fn end_resize(&mut self, design_id: DesignId, item_id: ElementId) -> CanvasResult<Outcome> {
        let design = lookup(&mut self.designs, design_id)?;
        let result = resize::end(design, item_id);
        if result.as_ref().is_err_and(CanvasError::is_not_found) {
            // the item went away mid-resize; its preview is stale
            design.clear_highlight();
        }
        self.schedule_clear_resizing(design_id);

        let outcome = stale("end_resize", result)?;
        if outcome.is_applied() {
            self.emit(design_id, EditorEventKind::ItemResized { id: item_id });
        }
        Ok(outcome)
    }

    fn schedule_clear_resizing(&mut self, design_id: DesignId) {
        let due = Instant::now() + self.config.resize_settle_delay();
        self.deferred
            .schedule(design_id, DeferredAction::ClearResizing, due);
    }

    // --- session ---

    /// Run deferred tasks due at `now`. Returns how many ran.
    pub fn run_deferred(&mut self, now: Instant) -> usize {
        let tasks = self.deferred.take_due(now);
        let count = tasks.len();
        for task in tasks {
            self.run_task(task);
        }
        count
    }

    /// Run every deferred task regardless of its due time.
    pub fn flush_deferred(&mut self) -> usize {
        let tasks = self.deferred.take_all();
        let count = tasks.len();
        for task in tasks {
            self.run_task(task);
        }
        count
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    fn run_task(&mut self, task: DeferredTask) {
        let Some(design) = self.designs.get_mut(&task.design) else {
            return;
        };
        match task.action {
            DeferredAction::ClearResizing => {
                let active = design.items.values().any(Item::is_resizing);
                if design.is_resizing && !active {
                    design.is_resizing = false;
                    self.emit(task.design, EditorEventKind::ResizeSettled);
                }
            }
        }
    }

    /// Drain the events emitted since the last call.
    pub fn poll_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn render_cache(&self) -> &RenderCache {
        &self.render_cache
    }

    pub fn render_cache_mut(&mut self) -> &mut RenderCache {
        &mut self.render_cache
    }

    fn emit(&mut self, design: DesignId, kind: EditorEventKind) {
        self.events.push(EditorEvent { design, kind });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::FragmentInstanceDefinition;
    use crate::grid::ColumnSpan;
    use crate::model::FragmentMode;
    use crate::resize::ResizeDirection;
    use crate::storage::{MemoryStorage, StorageError};
    use kurbo::{Rect, Size};
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;

    // 12 columns of 50px, 4 rows (last one the placeholder)
    fn editor() -> (Editor, DesignId) {
        let config = EditorConfig {
            default_base_width: 600.0,
            default_number_of_rows: 4,
            ..EditorConfig::default()
        };
        let mut editor = Editor::new(config);
        let design = editor.add_design(None, None).unwrap();
        editor.poll_events();
        (editor, design)
    }

    fn text(value: &str) -> ComponentDefinition {
        ComponentDefinition {
            component_type: "text".to_string(),
            props: json!({ "text": value }),
            ..ComponentDefinition::default()
        }
    }

    fn row(editor: &Editor, design: DesignId, index: usize) -> ElementId {
        editor.design(design).unwrap().group_ids()[index]
    }

    fn add_text(
        editor: &mut Editor,
        design: DesignId,
        group: ElementId,
        span: ColumnSpan,
    ) -> ElementId {
        let target = TargetArea::Columns {
            group_id: group,
            span,
            min_space: 1,
        };
        editor.add_component(design, &text("x"), target).unwrap().id
    }

    fn row_box(index: usize) -> Rect {
        Rect::from_origin_size((0.0, index as f64 * 78.0), (600.0, 78.0))
    }

    fn drag(source: DragSource, target: DropTarget, cursor: Point, cols: usize) -> DragPayload {
        DragPayload {
            source,
            dragged: DraggedElement {
                consumed_cols: cols,
                pointer_preview_position: Some(Point::new(5.0, 5.0)),
                size: Size::new(cols as f64 * 50.0, 40.0),
            },
            target,
            initial_client_offset: Point::ZERO,
            initial_source_client_offset: Point::ZERO,
            client_offset: cursor,
        }
    }

    #[test]
    fn test_add_design_uses_config() {
        let (editor, design) = editor();
        let design = editor.design(design).unwrap();
        assert_eq!(design.group_ids().len(), 4);
        assert_eq!(design.number_of_cols, 12);
        assert!(design.groups().last().unwrap().placeholder);
    }

    #[test]
    fn test_selection_chain() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let component = add_text(&mut editor, design, group, ColumnSpan::new(0, 2));
        let item = editor.design(design).unwrap().component(component).unwrap().parent();

        assert_eq!(editor.set_selection(design, component).unwrap(), Outcome::Applied);
        let view = editor.design(design).unwrap();
        assert_eq!(view.selection().unwrap(), &[group, item, component]);
        assert!(view.group(group).unwrap().selected);
        assert!(view.component(component).unwrap().selected);

        assert_eq!(editor.set_selection(design, component).unwrap(), Outcome::Unchanged);
        assert_eq!(editor.clear_selection(design).unwrap(), Outcome::Applied);
        let view = editor.design(design).unwrap();
        assert!(view.selection().is_none());
        assert!(!view.item(item).unwrap().selected);
        assert_eq!(editor.clear_selection(design).unwrap(), Outcome::Unchanged);
    }

    #[test]
    fn test_stale_ids_are_errors_without_mutation() {
        let (mut editor, design) = editor();
        let missing = Uuid::new_v4();

        let err = editor.set_selection(missing, missing).unwrap_err();
        assert_eq!(err, CanvasError::DesignNotFound(missing));
        let err = editor.set_selection(design, missing).unwrap_err();
        assert!(err.is_not_found());
        assert!(editor.remove_component(design, missing, true).unwrap_err().is_not_found());
        assert!(editor.design(design).unwrap().selection().is_none());
        assert!(editor.poll_events().is_empty());
    }

    #[test]
    fn test_add_to_placeholder_appends_new_placeholder() {
        let (mut editor, design) = editor();
        let placeholder = row(&editor, design, 3);
        add_text(&mut editor, design, placeholder, ColumnSpan::new(0, 3));

        let view = editor.design(design).unwrap();
        assert_eq!(view.group_ids().len(), 5);
        assert!(!view.group(placeholder).unwrap().placeholder);
        assert!(view.groups().last().unwrap().placeholder);
        assert!(view.is_consistent());
    }

    #[test]
    fn test_add_into_conflicting_columns_fails() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        add_text(&mut editor, design, group, ColumnSpan::new(2, 5));

        let target = TargetArea::Columns {
            group_id: group,
            span: ColumnSpan::new(5, 6),
            min_space: 1,
        };
        let err = editor.add_component(design, &text("y"), target).unwrap_err();
        assert!(matches!(err, CanvasError::Conflict { start: 5, end: 6, .. }));
        assert_eq!(editor.design(design).unwrap().group(group).unwrap().items().len(), 1);
    }

    #[test]
    fn test_default_props_from_component_type() {
        let (mut editor, design) = editor();
        editor.register_component_type("image", json!({ "src": "" }));
        let group = row(&editor, design, 0);
        let definition = ComponentDefinition {
            component_type: "image".to_string(),
            ..ComponentDefinition::default()
        };
        let target = TargetArea::Columns {
            group_id: group,
            span: ColumnSpan::new(0, 0),
            min_space: 1,
        };
        let id = editor.add_component(design, &definition, target).unwrap().id;
        let props = &editor.design(design).unwrap().component(id).unwrap().props;
        assert_eq!(*props, json!({ "src": "" }));
    }

    #[test]
    fn test_remove_component_selects_previous_and_drops_empty_item() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let first = add_text(&mut editor, design, group, ColumnSpan::new(0, 1));
        let item = editor.design(design).unwrap().component(first).unwrap().parent();
        let second = editor
            .add_component(design, &text("b"), TargetArea::Item { item_id: item, mark: None })
            .unwrap()
            .id;
        let lone = add_text(&mut editor, design, group, ColumnSpan::new(4, 5));
        let lone_item = editor.design(design).unwrap().component(lone).unwrap().parent();
        let right = add_text(&mut editor, design, group, ColumnSpan::new(8, 9));
        let right_item = editor.design(design).unwrap().component(right).unwrap().parent();
        editor.render_cache_mut().insert("text", second, json!({}), "<p>b</p>");

        editor.set_selection(design, second).unwrap();
        editor.remove_component(design, second, true).unwrap();
        let view = editor.design(design).unwrap();
        assert_eq!(view.selection().unwrap(), &[group, item, first]);
        assert!(editor.render_cache().is_empty());

        editor.remove_component(design, lone, false).unwrap();
        let view = editor.design(design).unwrap();
        assert!(view.item(lone_item).is_none());
        assert_eq!(view.group(group).unwrap().items(), &[item, right_item]);
        // freed columns 2..=7 now precede the right item
        assert_eq!(view.item(right_item).unwrap().left_space, 6);
        assert_eq!(view.registry().get(right_item).unwrap().index, 1);
    }

    #[test]
    fn test_drag_highlight_sets_drop_highlight() {
        let (mut editor, design) = editor();
        let first = row(&editor, design, 0);
        let second = row(&editor, design, 1);
        let palette = DragSource::Palette { component: text("new") };
        let target = |group_id, index| DropTarget::Group {
            group_id,
            group_box: row_box(index),
            item: None,
            component_behind: None,
        };

        let sample = drag(palette.clone(), target(first, 0), Point::new(130.0, 30.0), 2);
        assert_eq!(editor.highlight_area_from_drag(design, &sample).unwrap(), Outcome::Applied);
        assert_eq!(editor.highlight_area_from_drag(design, &sample).unwrap(), Outcome::Unchanged);
        let view = editor.design(design).unwrap();
        assert_eq!(view.highlighted_area().unwrap().span, Some(ColumnSpan::new(2, 3)));
        assert!(view.group(first).unwrap().drop_highlight);

        let sample = drag(palette, target(second, 1), Point::new(130.0, 100.0), 2);
        editor.highlight_area_from_drag(design, &sample).unwrap();
        let view = editor.design(design).unwrap();
        assert!(!view.group(first).unwrap().drop_highlight);
        assert_eq!(view.current_drop_highlight(), Some(second));

        assert_eq!(editor.clear_highlight_area(design).unwrap(), Outcome::Applied);
        let view = editor.design(design).unwrap();
        assert!(view.highlighted_area().is_none());
        assert!(!view.group(second).unwrap().drop_highlight);
        assert_eq!(editor.clear_highlight_area(design).unwrap(), Outcome::Unchanged);
    }

    #[test]
    fn test_moving_drop_highlight_alone_is_reported() {
        let (mut editor, design) = editor();
        let first = row(&editor, design, 0);
        let second = row(&editor, design, 1);
        let palette = DragSource::Palette { component: text("new") };
        // both rows report the same box, so the projected area is identical
        let target = |group_id| DropTarget::Group {
            group_id,
            group_box: row_box(0),
            item: None,
            component_behind: None,
        };

        let cursor = Point::new(130.0, 30.0);
        editor
            .highlight_area_from_drag(design, &drag(palette.clone(), target(first), cursor, 2))
            .unwrap();
        editor.poll_events();

        let sample = drag(palette, target(second), cursor, 2);
        assert_eq!(editor.highlight_area_from_drag(design, &sample).unwrap(), Outcome::Applied);
        assert_eq!(editor.design(design).unwrap().current_drop_highlight(), Some(second));
        let events = editor.poll_events();
        assert!(events.iter().any(|e| e.kind == EditorEventKind::HighlightChanged));
    }

    #[test]
    fn test_drop_palette_component_into_row() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 1);
        let sample = drag(
            DragSource::Palette { component: text("new") },
            DropTarget::Group {
                group_id: group,
                group_box: row_box(1),
                item: None,
                component_behind: None,
            },
            Point::new(230.0, 100.0),
            3,
        );

        let added = editor.move_component_from_drag(design, &sample, true).unwrap().unwrap();
        let view = editor.design(design).unwrap();
        let item = view.component(added.id).unwrap().parent();
        assert_eq!(view.item(item).unwrap().span(), ColumnSpan::new(4, 6));
        assert_eq!(view.item(item).unwrap().min_space, 1);
        assert_eq!(view.selection().unwrap().last(), Some(&added.id));
        assert!(view.highlighted_area().is_none());

        let events = editor.poll_events();
        assert!(events.iter().any(|e| e.kind == EditorEventKind::ComponentAdded { id: added.id }));
        assert!(editor.poll_events().is_empty());
    }

    #[test]
    fn test_move_component_to_other_row_keeps_identity() {
        let (mut editor, design) = editor();
        let source_row = row(&editor, design, 0);
        let target_row = row(&editor, design, 2);
        let component = add_text(&mut editor, design, source_row, ColumnSpan::new(0, 1));
        let source_item = editor.design(design).unwrap().component(component).unwrap().parent();

        let sample = drag(
            DragSource::Component { component_id: component },
            DropTarget::Group {
                group_id: target_row,
                group_box: row_box(2),
                item: None,
                component_behind: None,
            },
            Point::new(310.0, 170.0),
            2,
        );
        let moved = editor.move_component_from_drag(design, &sample, false).unwrap().unwrap();
        assert_eq!(moved.id, component);

        let view = editor.design(design).unwrap();
        assert!(view.item(source_item).is_none());
        assert!(view.group(source_row).unwrap().is_empty());
        let item = view.component(component).unwrap().parent();
        assert_eq!(view.item(item).unwrap().group(), target_row);
        assert_eq!(view.item(item).unwrap().span(), ColumnSpan::new(6, 7));
        let context = view.registry().get(component).unwrap().context.unwrap();
        assert_eq!(context.group_index, 2);
        assert!(view.is_consistent());
    }

    #[test]
    fn test_move_within_own_row_single_component() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let component = add_text(&mut editor, design, group, ColumnSpan::new(2, 4));

        // overlaps the origin item, which is exempt
        let sample = drag(
            DragSource::Component { component_id: component },
            DropTarget::Group {
                group_id: group,
                group_box: row_box(0),
                item: None,
                component_behind: None,
            },
            Point::new(155.0, 30.0),
            3,
        );
        editor.move_component_from_drag(design, &sample, false).unwrap();

        let view = editor.design(design).unwrap();
        assert_eq!(view.group(group).unwrap().items().len(), 1);
        let item = view.component(component).unwrap().parent();
        assert_eq!(view.item(item).unwrap().span(), ColumnSpan::new(3, 5));
        assert!(view.is_consistent());
    }

    #[test]
    fn test_move_next_to_component_in_other_item() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let moving = add_text(&mut editor, design, group, ColumnSpan::new(0, 1));
        let anchor = add_text(&mut editor, design, group, ColumnSpan::new(4, 7));
        let anchor_item = editor.design(design).unwrap().component(anchor).unwrap().parent();

        let sample = drag(
            DragSource::Component { component_id: moving },
            DropTarget::Group {
                group_id: group,
                group_box: row_box(0),
                item: Some(ItemTarget {
                    item_id: anchor_item,
                    item_box: Rect::new(200.0, 0.0, 400.0, 78.0),
                }),
                component_behind: Some(ComponentBehind {
                    id: anchor,
                    dimensions: Rect::new(200.0, 10.0, 300.0, 40.0),
                }),
            },
            Point::new(290.0, 30.0),
            2,
        );
        editor.move_component_from_drag(design, &sample, false).unwrap();

        let view = editor.design(design).unwrap();
        assert_eq!(view.item(anchor_item).unwrap().components(), &[anchor, moving]);
        assert_eq!(view.group(group).unwrap().items(), &[anchor_item]);
        assert_eq!(view.registry().get(moving).unwrap().index, 1);
    }

    #[test]
    fn test_drop_onto_itself_is_ignored() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let component = add_text(&mut editor, design, group, ColumnSpan::new(0, 3));
        let item = editor.design(design).unwrap().component(component).unwrap().parent();

        let sample = drag(
            DragSource::Component { component_id: component },
            DropTarget::Group {
                group_id: group,
                group_box: row_box(0),
                item: Some(ItemTarget {
                    item_id: item,
                    item_box: Rect::new(0.0, 0.0, 200.0, 78.0),
                }),
                component_behind: Some(ComponentBehind {
                    id: component,
                    dimensions: Rect::new(0.0, 10.0, 200.0, 40.0),
                }),
            },
            Point::new(50.0, 30.0),
            4,
        );
        assert!(editor.move_component_from_drag(design, &sample, false).unwrap().is_none());
        assert_eq!(editor.design(design).unwrap().item(item).unwrap().components(), &[component]);
    }

    #[test]
    fn test_update_component_cache_rules() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let component = add_text(&mut editor, design, group, ColumnSpan::new(0, 3));
        editor.render_cache_mut().insert("text", component, json!({}), "cached");

        let changes = ComponentChanges {
            expressions: Some(Some(json!({ "a": "1 + 1" }))),
            ..ComponentChanges::default()
        };
        let first = editor.update_component(design, component, changes.clone()).unwrap();
        assert_eq!(first, Outcome::Applied);
        assert_eq!(editor.render_cache().len(), 1);
        let second = editor.update_component(design, component, changes).unwrap();
        assert_eq!(second, Outcome::Unchanged);

        let changes = ComponentChanges {
            props: Some(json!({ "text": "changed" })),
            ..ComponentChanges::default()
        };
        editor.update_component(design, component, changes).unwrap();
        assert!(editor.render_cache().is_empty());
        assert_eq!(
            editor.design(design).unwrap().component(component).unwrap().props,
            json!({ "text": "changed" })
        );
    }

    fn list_with_rows(tags: &[&str]) -> ComponentDefinition {
        ComponentDefinition {
            component_type: "list".to_string(),
            fragments: BTreeMap::from([("rows".to_string(), rows(tags))]),
            ..ComponentDefinition::default()
        }
    }

    fn rows(tags: &[&str]) -> FragmentDefinition {
        FragmentDefinition {
            fragment_type: "row".to_string(),
            mode: FragmentMode::Block,
            instances: tags
                .iter()
                .map(|tag| FragmentInstanceDefinition {
                    tag: tag.to_string(),
                    components: vec![text("cell")],
                    ..FragmentInstanceDefinition::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_reconcile_fragments_applies_changes() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let target = TargetArea::Columns {
            group_id: group,
            span: ColumnSpan::new(0, 5),
            min_space: 1,
        };
        let definition = list_with_rows(&["div", "div"]);
        let list = editor.add_component(design, &definition, target).unwrap().id;
        let view = editor.design(design).unwrap();
        let fragment = view.component(list).unwrap().fragment_id("rows").unwrap();
        let instances = view.fragment(fragment).unwrap().instances().to_vec();
        editor.render_cache_mut().insert("row", instances[0], json!({}), "old");

        let incoming = BTreeMap::from([("rows".to_string(), rows(&["section", "div", "div"]))]);
        let stale = editor
            .reconcile_fragments(design, &[fragment, Uuid::new_v4()], &incoming)
            .unwrap();

        let expected = StaleInstance {
            fragment_type: "row".to_string(),
            id: instances[0],
        };
        assert_eq!(stale, vec![expected]);
        assert!(editor.render_cache().is_empty());
        let view = editor.design(design).unwrap();
        let current = view.fragment(fragment).unwrap().instances();
        assert_eq!(current.len(), 3);
        assert_eq!(&current[..2], instances.as_slice());
        assert_eq!(view.instance(instances[0]).unwrap().tag, "section");
        assert_eq!(view.instance(current[2]).unwrap().components().len(), 1);
        assert!(view.registry().contains(current[2]));
    }

    #[test]
    fn test_reconcile_fragments_full_removal() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let target = TargetArea::Columns {
            group_id: group,
            span: ColumnSpan::new(0, 5),
            min_space: 1,
        };
        let definition = list_with_rows(&["div", "div"]);
        let list = editor.add_component(design, &definition, target).unwrap().id;
        let view = editor.design(design).unwrap();
        let fragment = view.component(list).unwrap().fragment_id("rows").unwrap();
        let instances = view.fragment(fragment).unwrap().instances().to_vec();
        let nested = editor.design(design).unwrap().instance(instances[0]).unwrap().components()[0];
        editor.render_cache_mut().insert("list", list, json!({}), "whole list");

        let stale = editor.reconcile_fragments(design, &[fragment], &BTreeMap::new()).unwrap();
        assert_eq!(stale.len(), 2);
        assert!(editor.render_cache().is_empty());
        let view = editor.design(design).unwrap();
        assert!(view.fragment(fragment).unwrap().instances().is_empty());
        assert!(!view.registry().contains(nested));
    }

    fn resize_request(direction: ResizeDirection, span: ColumnSpan) -> ResizeStart {
        let (x0, x1) = (span.start as f64 * 50.0, (span.end + 1) as f64 * 50.0);
        let element_box = Rect::new(x0, 0.0, x1, 78.0);
        let x = match direction {
            ResizeDirection::Left => element_box.x0,
            ResizeDirection::Right => element_box.x1,
        };
        ResizeStart {
            direction,
            pointer: Point::new(x, 30.0),
            container_box: row_box(0),
            element_box,
        }
    }

    #[test]
    fn test_resize_flow_settles_after_delay() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let component = add_text(&mut editor, design, group, ColumnSpan::new(2, 3));
        let item = editor.design(design).unwrap().component(component).unwrap().parent();

        editor
            .start_resize(
                design,
                item,
                resize_request(ResizeDirection::Right, ColumnSpan::new(2, 3)),
            )
            .unwrap();
        editor.resize(design, item, Point::new(300.0, 30.0)).unwrap();
        assert_eq!(editor.end_resize(design, item).unwrap(), Outcome::Applied);

        let view = editor.design(design).unwrap();
        assert_eq!(view.item(item).unwrap().span(), ColumnSpan::new(2, 5));
        assert!(view.is_resizing());
        assert!(editor.has_deferred());

        assert_eq!(editor.run_deferred(Instant::now()), 0);
        assert_eq!(editor.run_deferred(Instant::now() + Duration::from_secs(1)), 1);
        assert!(!editor.design(design).unwrap().is_resizing());
        let events = editor.poll_events();
        assert!(events.iter().any(|e| e.kind == EditorEventKind::ItemResized { id: item }));
        assert!(events.iter().any(|e| e.kind == EditorEventKind::ResizeSettled));
    }

    #[test]
    fn test_new_resize_cancels_pending_clear() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let component = add_text(&mut editor, design, group, ColumnSpan::new(2, 3));
        let item = editor.design(design).unwrap().component(component).unwrap().parent();
        let request = resize_request(ResizeDirection::Right, ColumnSpan::new(2, 3));

        editor.start_resize(design, item, request).unwrap();
        editor.end_resize(design, item).unwrap();
        editor.start_resize(design, item, request).unwrap();
        assert_eq!(editor.flush_deferred(), 0);
        assert!(editor.design(design).unwrap().is_resizing());
    }

    #[test]
    fn test_removing_item_under_resize_still_settles() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        let component = add_text(&mut editor, design, group, ColumnSpan::new(2, 3));
        let item = editor.design(design).unwrap().component(component).unwrap().parent();

        editor
            .start_resize(
                design,
                item,
                resize_request(ResizeDirection::Right, ColumnSpan::new(2, 3)),
            )
            .unwrap();
        editor.resize(design, item, Point::new(300.0, 30.0)).unwrap();
        editor.remove_component(design, component, false).unwrap();
        assert!(editor.design(design).unwrap().item(item).is_none());
        assert!(editor.design(design).unwrap().highlighted_area().is_none());

        let ended = editor.end_resize(design, item);
        assert!(matches!(ended, Err(CanvasError::ElementNotFound(id)) if id == item));
        assert!(editor.flush_deferred() >= 1);
        let view = editor.design(design).unwrap();
        assert!(!view.is_resizing());
        assert!(view.highlighted_area().is_none());
    }

    #[test]
    fn test_left_resize_into_neighbour_is_discarded() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        add_text(&mut editor, design, group, ColumnSpan::new(0, 1));
        let component = add_text(&mut editor, design, group, ColumnSpan::new(4, 7));
        let item = editor.design(design).unwrap().component(component).unwrap().parent();

        let limits = editor
            .start_resize(
                design,
                item,
                resize_request(ResizeDirection::Left, ColumnSpan::new(4, 7)),
            )
            .unwrap();
        assert_eq!(limits.max_left, 200.0);
        editor.resize(design, item, Point::new(-400.0, 30.0)).unwrap();
        assert!(editor.design(design).unwrap().highlighted_area().unwrap().conflict);

        assert_eq!(editor.end_resize(design, item).unwrap(), Outcome::Unchanged);
        assert_eq!(editor.flush_deferred(), 1);
        let view = editor.design(design).unwrap();
        assert_eq!(view.item(item).unwrap().span(), ColumnSpan::new(4, 7));
        assert!(!view.is_resizing());
    }

    #[test]
    fn test_export_round_trips_through_add_design() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 1);
        add_text(&mut editor, design, group, ColumnSpan::new(3, 5));

        let exported = editor.export_design(design).unwrap();
        assert_eq!(exported.groups.len(), 1);
        assert_eq!(exported.groups[0].top_space, 1);
        assert_eq!(exported.groups[0].items[0].left_space, 3);

        let copy = editor.add_design(None, Some(&exported)).unwrap();
        assert_eq!(editor.export_design(copy).unwrap(), exported);
        assert!(editor.remove_design(copy).is_some());
        assert!(editor.export_design(copy).unwrap_err().is_not_found());
    }

    #[test]
    fn test_save_and_open_through_store() {
        let (mut editor, design) = editor();
        let group = row(&editor, design, 0);
        add_text(&mut editor, design, group, ColumnSpan::new(0, 5));
        let store = MemoryStorage::new();

        editor.save_design(&store, "report", design).unwrap();
        let opened = editor.open_design(&store, "report").unwrap();
        assert_ne!(opened, design);
        assert_eq!(editor.export_design(opened).unwrap(), editor.export_design(design).unwrap());

        let err = editor.open_design(&store, "missing").unwrap_err();
        assert!(matches!(err, CanvasError::Storage(StorageError::NotFound(_))));
    }
}
