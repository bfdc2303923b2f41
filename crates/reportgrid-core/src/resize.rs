//! Live resize of items.
//!
//! An item goes `idle -> active -> (active | invalid)* -> idle`. While
//! resizing it carries a [`ResizeState`]; the committed model only changes
//! when the resize ends in a valid, different position.

use crate::error::{CanvasError, CanvasResult, Outcome};
use crate::grid::{
    HighlightedArea, TargetColInfo, project_filled_area, project_filled_area_while_resizing,
};
use crate::model::{Design, ElementId, Item, LayoutMode};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Edge being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeDirection {
    Left,
    Right,
}

/// Whether the current resize position could be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeStatus {
    #[default]
    Active,
    Invalid,
}

/// Pixel bounds for the resize position.
///
/// `max_*` is the distance to the container edge; `min_*` is how far the item
/// may shrink before reaching its minimum space, always non-positive.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResizeLimits {
    pub min_left: f64,
    pub min_right: f64,
    pub max_left: f64,
    pub max_right: f64,
}

impl ResizeLimits {
    pub fn compute(
        item: &Item,
        layout_mode: LayoutMode,
        col_width: f64,
        container: Rect,
        element: Rect,
    ) -> Self {
        let min = if item.space != item.min_space {
            let mut min = item.space.abs_diff(item.min_space) as f64;
            if layout_mode == LayoutMode::Grid {
                min *= col_width;
            }
            (-min.round()).min(0.0)
        } else {
            0.0
        };

        Self {
            min_left: min,
            min_right: min,
            max_left: (element.x0 - container.x0).round(),
            max_right: (container.x1 - element.x1).round(),
        }
    }

    /// Clamp a signed position to the limits of `direction`.
    pub fn clamp(&self, direction: ResizeDirection, position: f64) -> f64 {
        let (min, max) = match direction {
            ResizeDirection::Left => (self.min_left, self.max_left),
            ResizeDirection::Right => (self.min_right, self.max_right),
        };
        let mut position = position;
        if position <= 0.0 && (min == 0.0 || position <= min) {
            position = min;
        }
        if position > max {
            position = max;
        }
        position
    }
}

/// Geometry supplied by the host when a resize starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeStart {
    pub direction: ResizeDirection,
    pub pointer: Point,
    /// Box of the row holding the item.
    pub container_box: Rect,
    /// Box of the item itself.
    pub element_box: Rect,
}

/// Transient state of an item under resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeState {
    pub direction: ResizeDirection,
    pub original_coord: Point,
    /// Last applied signed position, in pixels.
    pub position: f64,
    pub limits: ResizeLimits,
    pub base_highlighted_area: HighlightedArea,
    pub highlighted_area: HighlightedArea,
    pub status: ResizeStatus,
}

impl ResizeState {
    /// Signed pointer delta along the resize direction; growing is positive.
    pub fn raw_position(&self, direction: ResizeDirection, pointer: Point) -> f64 {
        match direction {
            ResizeDirection::Left => self.original_coord.x - pointer.x,
            ResizeDirection::Right => pointer.x - self.original_coord.x,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.status == ResizeStatus::Invalid
    }

    /// Whether the current projection differs from where the resize began.
    fn changes_layout(&self, layout_mode: LayoutMode) -> bool {
        match layout_mode {
            LayoutMode::Grid => self.base_highlighted_area.span != self.highlighted_area.span,
            LayoutMode::Fixed => {
                self.base_highlighted_area.width() != self.highlighted_area.width()
            }
        }
    }
}

/// Area an item fills right now, used as the resize baseline.
fn baseline_area(
    design: &Design,
    item: &Item,
    layout_mode: LayoutMode,
    element: Rect,
) -> CanvasResult<HighlightedArea> {
    match layout_mode {
        LayoutMode::Grid => {
            let col_info = TargetColInfo {
                index: item.start,
                left: element.x0,
                top: element.y0,
                height: element.height(),
                ..TargetColInfo::default()
            };
            let mut area = project_filled_area(
                design,
                item.group(),
                &col_info,
                item.consumed_cols(),
                Some(item.id()),
            )?;
            area.conflict = false;
            Ok(area)
        }
        LayoutMode::Fixed => Ok(HighlightedArea {
            filled: true,
            span: Some(item.span()),
            area_box: Some(element),
            ..HighlightedArea::default()
        }),
    }
}

/// Begin resizing `item_id`. Returns the computed limits.
pub(crate) fn start(
    design: &mut Design,
    item_id: ElementId,
    request: ResizeStart,
) -> CanvasResult<ResizeLimits> {
    let item = design.require_item(item_id)?;
    let layout_mode = design.require_group(item.group())?.layout_mode;
    let limits = ResizeLimits::compute(
        item,
        layout_mode,
        design.col_width(),
        request.container_box,
        request.element_box,
    );
    let base = baseline_area(design, item, layout_mode, request.element_box)?;

    let state = ResizeState {
        direction: request.direction,
        original_coord: request.pointer,
        position: 0.0,
        limits,
        base_highlighted_area: base.clone(),
        highlighted_area: base.clone(),
        status: ResizeStatus::Active,
    };

    design.highlighted_area = Some(base);
    design.is_resizing = true;
    if let Some(item) = design.items.get_mut(&item_id) {
        item.resizing = Some(state);
    }
    log::debug!("Resize started on item {} ({:?})", item_id, request.direction);
    Ok(limits)
}

/// Apply a pointer sample to an ongoing resize, along the direction it
/// started with.
///
/// Repeating the previous position, raw or clamped, is a no-op. A projection that
/// degenerates keeps the previous status instead of resetting it.
pub(crate) fn update(
    design: &mut Design,
    item_id: ElementId,
    pointer: Point,
) -> CanvasResult<Outcome> {
    let item = design.require_item(item_id)?;
    let state = item.resizing.as_ref().ok_or(CanvasError::NotResizing(item_id))?;
    let direction = state.direction;

    let raw = state.raw_position(direction, pointer);
    if raw == state.position {
        return Ok(Outcome::Unchanged);
    }
    let position = state.limits.clamp(direction, raw);
    if position == state.position {
        // pinned at a limit
        return Ok(Outcome::Unchanged);
    }
    let projection = project_filled_area_while_resizing(design, item_id, position);

    design.is_resizing = true;
    let Some(state) = design
        .items
        .get_mut(&item_id)
        .and_then(|item| item.resizing.as_mut())
    else {
        return Err(CanvasError::NotResizing(item_id));
    };
    state.position = position;

    let Some(area) = projection else {
        log::trace!("Resize of {} degenerated at {}", item_id, position);
        return Ok(Outcome::Applied);
    };

    state.status = if area.conflict {
        ResizeStatus::Invalid
    } else {
        ResizeStatus::Active
    };
    state.highlighted_area = area.clone();
    design.highlighted_area = Some(area);
    Ok(Outcome::Applied)
}

/// Finish a resize, committing the new size when it is valid and different.
///
/// Transient state is always cleared. `is_resizing` is left for the caller
/// to settle once pointer events have drained.
pub(crate) fn end(design: &mut Design, item_id: ElementId) -> CanvasResult<Outcome> {
    let item = design.require_item(item_id)?;
    let state = item
        .resizing
        .clone()
        .ok_or(CanvasError::NotResizing(item_id))?;
    let layout_mode = design.require_group(item.group())?.layout_mode;

    let discard = state.is_invalid()
        || state.highlighted_area.conflict
        || !state.changes_layout(layout_mode);

    let outcome = if discard {
        Outcome::Unchanged
    } else {
        commit(design, item_id, layout_mode, &state)?;
        Outcome::Applied
    };

    if let Some(item) = design.items.get_mut(&item_id) {
        item.resizing = None;
    }
    design.clear_highlight();
    log::debug!("Resize ended on item {} ({:?})", item_id, outcome);
    Ok(outcome)
}

fn commit(
    design: &mut Design,
    item_id: ElementId,
    layout_mode: LayoutMode,
    state: &ResizeState,
) -> CanvasResult<()> {
    match layout_mode {
        LayoutMode::Grid => {
            let Some(span) = state.highlighted_area.span else {
                return Ok(());
            };
            design.update_item_span(item_id, span)
        }
        LayoutMode::Fixed => {
            let item = design
                .items
                .get_mut(&item_id)
                .ok_or(CanvasError::ElementNotFound(item_id))?;
            let delta = state.position.round() as i64;
            let space = (item.space as i64 + delta).max(item.min_space as i64).max(1);
            if state.direction == ResizeDirection::Left {
                let grown = space - item.space as i64;
                item.left_space = (item.left_space as i64 - grown).max(0) as usize;
            }
            item.space = space as usize;
            Ok(())
        }
    }
}
