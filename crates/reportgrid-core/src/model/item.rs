//! Slots inside a row.

use super::ElementId;
use crate::grid::ColumnSpan;
use crate::resize::ResizeState;
use uuid::Uuid;

/// A column-space-consuming slot within a group.
///
/// In grid mode `start`/`end` are inclusive column indices and `left_space`,
/// `space`, `min_space` count columns. In fixed mode the spaces are pixels
/// and the column range is not used.
#[derive(Debug, Clone)]
pub struct Item {
    pub(crate) id: ElementId,
    pub(crate) group: ElementId,
    pub start: usize,
    pub end: usize,
    pub left_space: usize,
    pub space: usize,
    pub min_space: usize,
    pub(crate) components: Vec<ElementId>,
    /// Transient state while the item is being resized.
    pub resizing: Option<ResizeState>,
    pub selected: bool,
}

impl Item {
    /// Create a grid item covering `span`.
    pub fn new(group: ElementId, span: ColumnSpan, min_space: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            group,
            start: span.start,
            end: span.end,
            left_space: 0,
            space: span.len(),
            min_space: min_space.max(1),
            components: Vec::new(),
            resizing: None,
            selected: false,
        }
    }

    /// Create a fixed-mode item `space` pixels wide.
    pub fn fixed(group: ElementId, left_space: usize, space: usize, min_space: usize) -> Self {
        Self {
            left_space,
            space,
            min_space,
            ..Self::new(group, ColumnSpan::new(0, 0), 1)
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The group that owns this item.
    pub fn group(&self) -> ElementId {
        self.group
    }

    pub fn components(&self) -> &[ElementId] {
        &self.components
    }

    pub fn span(&self) -> ColumnSpan {
        ColumnSpan::new(self.start, self.end)
    }

    /// Number of columns consumed in grid mode.
    pub fn consumed_cols(&self) -> usize {
        self.span().len()
    }

    pub fn is_resizing(&self) -> bool {
        self.resizing.is_some()
    }

    pub(crate) fn set_span(&mut self, span: ColumnSpan) {
        self.start = span.start;
        self.end = span.end;
        self.space = span.len();
    }
}
