//! Drag payloads and the drop feedback derived from them.

use crate::definition::ComponentDefinition;
use crate::error::{CanvasError, CanvasResult};
use crate::grid::{ColumnSpan, HighlightedArea, TargetColInfo, project_filled_area};
use crate::marked_area::{
    Axis, MarkPosition, MarkRequest, MarkTargetType, MarkedArea, find_marked_area,
};
use crate::model::{Design, ElementId};
use kurbo::{Point, Rect, Size};

/// What is being dragged.
#[derive(Debug, Clone, PartialEq)]
pub enum DragSource {
    /// A component already on the canvas.
    Component { component_id: ElementId },
    /// A new component from the palette.
    Palette { component: ComponentDefinition },
}

/// Geometry of the dragged element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DraggedElement {
    pub consumed_cols: usize,
    /// Where the pointer sits inside the drag preview, when the preview
    /// reports it.
    pub pointer_preview_position: Option<Point>,
    pub size: Size,
}

/// Component under the cursor inside the drop container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentBehind {
    pub id: ElementId,
    pub dimensions: Rect,
}

/// Item under the cursor inside a target row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemTarget {
    pub item_id: ElementId,
    pub item_box: Rect,
}

/// Container the cursor is over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropTarget {
    Group {
        group_id: ElementId,
        group_box: Rect,
        item: Option<ItemTarget>,
        component_behind: Option<ComponentBehind>,
    },
    Fragment {
        fragment_id: ElementId,
        instance_id: ElementId,
        instance_box: Rect,
        component_behind: Option<ComponentBehind>,
    },
}

/// One drag sample as reported by the host's drag-and-drop layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPayload {
    pub source: DragSource,
    pub dragged: DraggedElement,
    pub target: DropTarget,
    /// Pointer position when the drag began.
    pub initial_client_offset: Point,
    /// Top-left of the dragged element when the drag began.
    pub initial_source_client_offset: Point,
    /// Current pointer position.
    pub client_offset: Point,
}

impl DragPayload {
    pub(crate) fn origin_component(&self) -> Option<ElementId> {
        match &self.source {
            DragSource::Component { component_id } => Some(*component_id),
            DragSource::Palette { .. } => None,
        }
    }
}

/// Where a new or moved component lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetArea {
    /// Free columns of a row; a new item is created for the component.
    Columns {
        group_id: ElementId,
        span: ColumnSpan,
        min_space: usize,
    },
    /// Next to another component inside an existing item.
    Item {
        item_id: ElementId,
        mark: Option<MarkedArea>,
    },
    /// Inside a fragment instance.
    FragmentInstance {
        instance_id: ElementId,
        mark: Option<MarkedArea>,
    },
}

/// Highlight for a drag sample plus the element to flag as drop target.
pub(crate) struct DragFeedback {
    pub area: HighlightedArea,
    pub drop_highlight: ElementId,
}

/// Derive the highlighted area for a drag sample without touching the design.
pub(crate) fn drag_feedback(design: &Design, payload: &DragPayload) -> CanvasResult<DragFeedback> {
    let origin = payload.origin_component();
    if let Some(component_id) = origin {
        design.require_component(component_id)?;
    }

    match payload.target {
        DropTarget::Fragment {
            fragment_id,
            instance_id,
            instance_box,
            component_behind,
        } => {
            let fragment = design.require_fragment(fragment_id)?;
            design.require_instance(instance_id)?;

            let axis = if fragment.is_inline() {
                Axis::Horizontal
            } else {
                Axis::Vertical
            };
            let (target_id, dimensions, is_block) = match component_behind {
                Some(behind) => (behind.id, behind.dimensions, false),
                None => (instance_id, instance_box, true),
            };

            let mut area = HighlightedArea::context(instance_box);
            area.mark = find_marked_area(&MarkRequest {
                reference_point: payload.client_offset,
                origin_element_id: origin,
                target_dimensions: dimensions,
                target_is_block: is_block,
                target_type: MarkTargetType::Fragment,
                target_id,
                axis,
            });

            Ok(DragFeedback {
                area,
                drop_highlight: fragment_id,
            })
        }
        DropTarget::Group {
            group_id,
            group_box,
            item,
            component_behind,
        } => {
            design.require_group(group_id)?;
            let col_info = target_col_info(design, payload, group_box);
            let exempt = match origin {
                Some(component_id) => exempt_item(design, component_id, group_id),
                None => None,
            };

            let mut area = project_filled_area(
                design,
                group_id,
                &col_info,
                payload.dragged.consumed_cols,
                exempt,
            )?;

            if let Some(target) = item {
                let target_item = design.require_item(target.item_id)?;
                let col_width = design.col_width();
                let row = area.area_box.unwrap_or(group_box);
                area.context_box = Some(Rect::from_origin_size(
                    (group_box.x0 + target_item.start as f64 * col_width, row.y0),
                    (target_item.consumed_cols() as f64 * col_width, row.height()),
                ));

                let (target_id, dimensions, is_block) = match component_behind {
                    Some(behind) => (behind.id, behind.dimensions, false),
                    None => (target.item_id, target.item_box, true),
                };
                area.mark = find_marked_area(&MarkRequest {
                    reference_point: payload.client_offset,
                    origin_element_id: origin,
                    target_dimensions: dimensions,
                    target_is_block: is_block,
                    target_type: MarkTargetType::Component,
                    target_id,
                    axis: Axis::Horizontal,
                });
                // only the item context is shown when hovering an item
                area.area_box = None;
            } else {
                area.context_box = None;
            }

            Ok(DragFeedback {
                area,
                drop_highlight: group_id,
            })
        }
    }
}

/// Anchor column for a drag over a row.
///
/// One-column drags anchor at the cursor; wider drags anchor at the left
/// edge of the dragged element.
fn target_col_info(design: &Design, payload: &DragPayload, group_box: Rect) -> TargetColInfo {
    let cursor_x = payload.client_offset.x;
    let left = group_box.x0;
    let col_width = design.col_width();
    let last = design.last_col() as i64;

    let origin_px = if payload.dragged.consumed_cols == 1 {
        cursor_x - left
    } else if let Some(preview) = payload.dragged.pointer_preview_position {
        cursor_x - preview.x - left
    } else {
        let grab = payload.initial_client_offset.x - payload.initial_source_client_offset.x;
        cursor_x - grab - left
    };
    let origin = (origin_px / col_width).floor() as i64;
    let cursor_col = (((cursor_x - left) / col_width).floor() as i64).clamp(0, last);

    let (index, start_offset) = if origin < 0 {
        (0, origin.unsigned_abs() as usize)
    } else {
        (origin.min(last) as usize, 0)
    };

    TargetColInfo {
        index,
        start_offset,
        cursor_index: Some(cursor_col as usize),
        left: left + index as f64 * col_width,
        top: group_box.y0,
        height: group_box.height(),
    }
}

/// The origin item may overlap its own projection only when dragged within
/// its row and it holds a single component; a multi-component item still
/// occupies its columns after the drag.
fn exempt_item(design: &Design, component_id: ElementId, group_id: ElementId) -> Option<ElementId> {
    let parent = design.component(component_id)?.parent();
    let item = design.item(parent)?;
    (item.group() == group_id && item.components().len() <= 1).then_some(item.id())
}

/// Turn the feedback for a drop into the area the component is placed in.
pub(crate) fn target_area(
    payload: &DragPayload,
    feedback: &DragFeedback,
) -> CanvasResult<TargetArea> {
    match payload.target {
        DropTarget::Fragment { instance_id, .. } => Ok(TargetArea::FragmentInstance {
            instance_id,
            mark: feedback.area.mark,
        }),
        DropTarget::Group {
            item: Some(target), ..
        } => Ok(TargetArea::Item {
            item_id: target.item_id,
            mark: feedback.area.mark,
        }),
        DropTarget::Group { group_id, .. } => {
            let span = feedback
                .area
                .span
                .ok_or(CanvasError::GroupNotFound(group_id))?;
            if feedback.area.conflict {
                return Err(CanvasError::Conflict {
                    group: group_id,
                    start: span.start,
                    end: span.end,
                });
            }
            Ok(TargetArea::Columns {
                group_id,
                span,
                min_space: 1,
            })
        }
    }
}

/// Index to insert at inside `container` for `mark`; `None` appends.
pub(crate) fn insert_position(
    design: &Design,
    container: ElementId,
    mark: Option<&MarkedArea>,
) -> Option<usize> {
    let mark = mark?;
    let siblings = design.children_of(Some(container));
    let index = siblings.iter().position(|&id| id == mark.target_id)?;
    Some(match mark.position {
        MarkPosition::Before => index,
        MarkPosition::After => index + 1,
    })
}

/// Whether `ancestor` is `id` or one of its ancestors.
pub(crate) fn is_within(design: &Design, id: ElementId, ancestor: ElementId) -> bool {
    let mut current = Some(id);
    while let Some(element) = current {
        if element == ancestor {
            return true;
        }
        current = design.registry().parent_of(element);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, DesignSettings, Item, LayoutMode};
    use serde_json::json;

    fn design() -> Design {
        let settings = DesignSettings {
            base_width: 600.0,
            number_of_cols: 12,
            row_height: 78.0,
            default_number_of_rows: 3,
        };
        Design::with_rows(settings, LayoutMode::Grid)
    }

    fn payload(group_id: ElementId, cursor_x: f64, cols: usize) -> DragPayload {
        DragPayload {
            source: DragSource::Palette {
                component: ComponentDefinition::default(),
            },
            dragged: DraggedElement {
                consumed_cols: cols,
                pointer_preview_position: None,
                size: Size::new(cols as f64 * 50.0, 40.0),
            },
            target: DropTarget::Group {
                group_id,
                group_box: Rect::new(0.0, 100.0, 600.0, 178.0),
                item: None,
                component_behind: None,
            },
            initial_client_offset: Point::new(30.0, 20.0),
            initial_source_client_offset: Point::new(10.0, 10.0),
            client_offset: Point::new(cursor_x, 120.0),
        }
    }

    #[test]
    fn test_single_column_anchors_at_cursor() {
        let design = design();
        let group = design.group_ids()[0];
        let feedback = drag_feedback(&design, &payload(group, 175.0, 1)).unwrap();
        assert_eq!(feedback.area.span, Some(ColumnSpan::new(3, 3)));
        assert_eq!(feedback.drop_highlight, group);
        assert!(feedback.area.context_box.is_none());
    }

    #[test]
    fn test_wide_drag_anchors_at_grab_offset() {
        let design = design();
        let group = design.group_ids()[0];
        // grabbed 20px in from the left edge
        let feedback = drag_feedback(&design, &payload(group, 175.0, 3)).unwrap();
        assert_eq!(feedback.area.span, Some(ColumnSpan::new(3, 5)));

        let mut with_preview = payload(group, 175.0, 3);
        with_preview.dragged.pointer_preview_position = Some(Point::new(80.0, 5.0));
        let feedback = drag_feedback(&design, &with_preview).unwrap();
        assert_eq!(feedback.area.span, Some(ColumnSpan::new(1, 3)));
    }

    #[test]
    fn test_negative_origin_uses_start_offset() {
        let design = design();
        let group = design.group_ids()[0];
        let mut sample = payload(group, 20.0, 4);
        sample.dragged.pointer_preview_position = Some(Point::new(120.0, 5.0));
        let feedback = drag_feedback(&design, &sample).unwrap();
        // origin column -2: two columns hang off the left edge
        assert_eq!(feedback.area.span, Some(ColumnSpan::new(0, 1)));
    }

    #[test]
    fn test_same_row_exemption_needs_single_component() {
        let mut design = design();
        let group = design.group_ids()[0];
        let item = design.insert_item(Item::new(group, ColumnSpan::new(2, 4), 1)).unwrap();
        let first = design
            .insert_component(Component::new(item, "text", json!({})), None)
            .unwrap();

        let mut sample = payload(group, 175.0, 3);
        sample.source = DragSource::Component { component_id: first };
        assert!(!drag_feedback(&design, &sample).unwrap().area.conflict);

        design
            .insert_component(Component::new(item, "text", json!({})), None)
            .unwrap();
        assert!(drag_feedback(&design, &sample).unwrap().area.conflict);
    }

    #[test]
    fn test_item_target_resolves_mark_and_context() {
        let mut design = design();
        let group = design.group_ids()[0];
        let item = design.insert_item(Item::new(group, ColumnSpan::new(2, 4), 1)).unwrap();
        let existing = design
            .insert_component(Component::new(item, "text", json!({})), None)
            .unwrap();

        let mut sample = payload(group, 110.0, 1);
        sample.target = DropTarget::Group {
            group_id: group,
            group_box: Rect::new(0.0, 100.0, 600.0, 178.0),
            item: Some(ItemTarget {
                item_id: item,
                item_box: Rect::new(100.0, 100.0, 250.0, 178.0),
            }),
            component_behind: Some(ComponentBehind {
                id: existing,
                dimensions: Rect::new(100.0, 100.0, 160.0, 140.0),
            }),
        };

        let feedback = drag_feedback(&design, &sample).unwrap();
        let mark = feedback.area.mark.unwrap();
        assert_eq!(mark.target_id, existing);
        assert_eq!(mark.position, MarkPosition::Before);
        assert!(feedback.area.area_box.is_none());
        assert_eq!(feedback.area.context_box, Some(Rect::new(100.0, 100.0, 250.0, 178.0)));

        let target = target_area(&sample, &feedback).unwrap();
        assert_eq!(target, TargetArea::Item { item_id: item, mark: Some(mark) });
        assert_eq!(insert_position(&design, item, Some(&mark)), Some(0));
    }

    #[test]
    fn test_conflicting_columns_refuse_drop() {
        let mut design = design();
        let group = design.group_ids()[0];
        design.insert_item(Item::new(group, ColumnSpan::new(2, 4), 1)).unwrap();

        let sample = payload(group, 175.0, 1);
        let feedback = drag_feedback(&design, &sample).unwrap();
        assert!(feedback.area.conflict);
        assert!(matches!(
            target_area(&sample, &feedback),
            Err(CanvasError::Conflict { start: 3, end: 3, .. })
        ));
    }
}
