//! Before/after insertion markers for drops.

use crate::model::ElementId;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Where a dropped element lands relative to the mark target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkPosition {
    Before,
    After,
}

/// What kind of container the mark lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkTargetType {
    Component,
    Fragment,
}

/// Axis along which siblings flow in the target container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    #[default]
    Horizontal,
    Vertical,
}

/// Insertion descriptor shown while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedArea {
    pub target_type: MarkTargetType,
    pub target_id: ElementId,
    pub position: MarkPosition,
}

/// Input to [`find_marked_area`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkRequest {
    /// Cursor position.
    pub reference_point: Point,
    /// Element being dragged, if it already exists on the canvas.
    pub origin_element_id: Option<ElementId>,
    /// Box of the element the mark is relative to.
    pub target_dimensions: Rect,
    /// The target is a container with no concrete sibling to compare to.
    pub target_is_block: bool,
    pub target_type: MarkTargetType,
    pub target_id: ElementId,
    pub axis: Axis,
}

/// Decide whether a drop goes before or after `target_id`.
///
/// Block targets always resolve to `After`. Otherwise the cursor is compared
/// with the midpoint of the target box along `axis`: strictly before the
/// midpoint gives `Before`, anything else `After`. Comparing an element to
/// itself yields no mark.
pub fn find_marked_area(request: &MarkRequest) -> Option<MarkedArea> {
    if request.origin_element_id == Some(request.target_id) {
        return None;
    }

    let position = if request.target_is_block {
        MarkPosition::After
    } else {
        let (cursor, midpoint) = match request.axis {
            Axis::Horizontal => (request.reference_point.x, request.target_dimensions.center().x),
            Axis::Vertical => (request.reference_point.y, request.target_dimensions.center().y),
        };
        if cursor < midpoint {
            MarkPosition::Before
        } else {
            MarkPosition::After
        }
    };

    Some(MarkedArea {
        target_type: request.target_type,
        target_id: request.target_id,
        position,
    })
}
