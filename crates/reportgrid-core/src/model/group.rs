//! Rows of the canvas.

use super::ElementId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How items inside a group are positioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Items occupy inclusive column ranges.
    #[default]
    Grid,
    /// Items are sized and offset in pixels.
    Fixed,
}

/// A row containing items.
#[derive(Debug, Clone)]
pub struct Group {
    pub(crate) id: ElementId,
    pub layout_mode: LayoutMode,
    /// Items in this row, sorted by start column in grid mode.
    pub(crate) items: Vec<ElementId>,
    /// Marks the trailing empty row that accepts new content.
    pub placeholder: bool,
    pub drop_highlight: bool,
    pub selected: bool,
}

impl Group {
    pub fn new(layout_mode: LayoutMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            layout_mode,
            items: Vec::new(),
            placeholder: false,
            drop_highlight: false,
            selected: false,
        }
    }

    /// Create the trailing placeholder row.
    pub fn placeholder(layout_mode: LayoutMode) -> Self {
        Self {
            placeholder: true,
            ..Self::new(layout_mode)
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn items(&self) -> &[ElementId] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_grid(&self) -> bool {
        self.layout_mode == LayoutMode::Grid
    }
}
