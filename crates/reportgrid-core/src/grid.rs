//! Grid projection: which columns a drag or resize would fill.
//!
//! Conflict decisions are made on column indices only. The pixel boxes are
//! derived afterwards for the overlay and never feed back into a decision.

use crate::error::{CanvasError, CanvasResult};
use crate::marked_area::MarkedArea;
use crate::model::{Design, ElementId, LayoutMode};
use crate::resize::ResizeDirection;
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// Inclusive range of grid columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSpan {
    pub start: usize,
    pub end: usize,
}

impl ColumnSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of columns covered.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn overlaps(&self, other: &ColumnSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, col: usize) -> bool {
        self.start <= col && col <= self.end
    }
}

/// Anchor column and row geometry for a projection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TargetColInfo {
    /// First column of the candidate range (already clamped into the grid).
    pub index: usize,
    /// Columns of the dragged element hanging past the left edge.
    pub start_offset: usize,
    /// Column under the cursor, when known.
    pub cursor_index: Option<usize>,
    /// Pixel left of `index`.
    pub left: f64,
    pub top: f64,
    pub height: f64,
}

/// Transient overlay describing whether a drag or resize target is usable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HighlightedArea {
    pub filled: bool,
    pub conflict: bool,
    /// Projected columns; `None` for fragment targets.
    pub span: Option<ColumnSpan>,
    /// Pixel box of the projected columns.
    pub area_box: Option<Rect>,
    /// Pixel box of the container the drop lands in.
    pub context_box: Option<Rect>,
    pub mark: Option<MarkedArea>,
}

impl HighlightedArea {
    /// Area covering a whole container, used for fragment targets.
    pub fn context(context_box: Rect) -> Self {
        Self {
            filled: true,
            conflict: false,
            context_box: Some(context_box),
            ..Self::default()
        }
    }

    pub fn width(&self) -> Option<f64> {
        self.area_box.map(|area| area.width())
    }
}

/// First item in `group_id` (other than `exempt`) whose columns intersect `span`.
fn find_conflict(
    design: &Design,
    group_id: ElementId,
    span: ColumnSpan,
    exempt: Option<ElementId>,
) -> Option<ElementId> {
    design
        .items_in(group_id)
        .filter(|item| Some(item.id()) != exempt)
        .find(|item| item.span().overlaps(&span))
        .map(|item| item.id())
}

/// Project `cols_to_consume` columns anchored at `col_info.index` into a group.
///
/// The range is clamped into `[0, number_of_cols - 1]`. It conflicts when it
/// intersects any item of a grid group other than `exempt`, which lets an
/// item be dragged inside its own row without colliding with itself.
pub fn project_filled_area(
    design: &Design,
    group_id: ElementId,
    col_info: &TargetColInfo,
    cols_to_consume: usize,
    exempt: Option<ElementId>,
) -> CanvasResult<HighlightedArea> {
    let group = design
        .group(group_id)
        .ok_or(CanvasError::GroupNotFound(group_id))?;
    let last = design.last_col();
    let start = col_info.index.min(last);
    let end = (start + cols_to_consume.max(1) - 1)
        .saturating_sub(col_info.start_offset)
        .max(start)
        .min(last);
    let span = ColumnSpan::new(start, end);

    let conflict = group.layout_mode == LayoutMode::Grid
        && find_conflict(design, group_id, span, exempt).is_some();

    let area_box = Rect::from_origin_size(
        (col_info.left, col_info.top),
        (span.len() as f64 * design.col_width(), col_info.height),
    );

    log::trace!(
        "Projected {}..={} in group {} (conflict: {})",
        span.start,
        span.end,
        group_id,
        conflict
    );

    Ok(HighlightedArea {
        filled: true,
        conflict,
        span: Some(span),
        area_box: Some(area_box),
        context_box: None,
        mark: None,
    })
}

/// Project the area an item would fill if resized to `new_position` pixels.
///
/// The edge opposite to the resize direction stays fixed. Returns `None`
/// when the item is not resizing or the projection degenerates (no columns
/// left, or no positive width in fixed mode).
pub fn project_filled_area_while_resizing(
    design: &Design,
    item_id: ElementId,
    new_position: f64,
) -> Option<HighlightedArea> {
    let item = design.item(item_id)?;
    let resizing = item.resizing.as_ref()?;
    let group = design.group(item.group())?;
    let base = resizing.base_highlighted_area.area_box?;

    match group.layout_mode {
        LayoutMode::Grid => {
            let col_width = design.col_width();
            if col_width <= 0.0 {
                return None;
            }
            let delta = (new_position / col_width).round() as i64;
            let (start, end) = (item.start as i64, item.end as i64);
            let (start, end) = match resizing.direction {
                ResizeDirection::Left => (start - delta, end),
                ResizeDirection::Right => (start, end + delta),
            };
            let start = start.max(0);
            let end = end.min(design.last_col() as i64);
            if end < start {
                return None;
            }
            let span = ColumnSpan::new(start as usize, end as usize);
            let conflict = find_conflict(design, group.id(), span, Some(item_id)).is_some();
            let left = base.x0 + (span.start as f64 - item.start as f64) * col_width;
            let area_box = Rect::from_origin_size(
                (left, base.y0),
                (span.len() as f64 * col_width, base.height()),
            );

            Some(HighlightedArea {
                filled: true,
                conflict,
                span: Some(span),
                area_box: Some(area_box),
                context_box: None,
                mark: None,
            })
        }
        LayoutMode::Fixed => {
            let width = base.width() + new_position;
            if width <= 0.0 {
                return None;
            }
            let left = match resizing.direction {
                ResizeDirection::Left => base.x1 - width,
                ResizeDirection::Right => base.x0,
            };
            Some(HighlightedArea {
                filled: true,
                conflict: false,
                span: Some(item.span()),
                area_box: Some(Rect::from_origin_size((left, base.y0), (width, base.height()))),
                context_box: None,
                mark: None,
            })
        }
    }
}
