//! Named template slots and their occurrences.

use super::ElementId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Whether a fragment renders inline with text or as a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentMode {
    #[default]
    Inline,
    Block,
}

/// A named, repeatable sub-region of a component.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub(crate) id: ElementId,
    pub(crate) component: ElementId,
    pub name: String,
    pub fragment_type: String,
    pub mode: FragmentMode,
    pub(crate) instances: Vec<ElementId>,
    pub selected: bool,
    pub drop_highlight: bool,
}

impl Fragment {
    pub fn new(
        component: ElementId,
        name: impl Into<String>,
        fragment_type: impl Into<String>,
        mode: FragmentMode,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            component,
            name: name.into(),
            fragment_type: fragment_type.into(),
            mode,
            instances: Vec::new(),
            selected: false,
            drop_highlight: false,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The component hosting this fragment.
    pub fn component(&self) -> ElementId {
        self.component
    }

    pub fn instances(&self) -> &[ElementId] {
        &self.instances
    }

    pub fn is_inline(&self) -> bool {
        self.mode == FragmentMode::Inline
    }
}

/// A concrete occurrence of a fragment.
///
/// The id survives in-place updates of tag, style and template so the
/// rendering side can keep the mounted instance.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentInstance {
    pub(crate) id: ElementId,
    pub(crate) fragment: ElementId,
    pub tag: String,
    pub sketch: Option<String>,
    pub style: Option<Value>,
    pub template: Option<String>,
    pub(crate) components: Vec<ElementId>,
}

impl FragmentInstance {
    pub fn new(fragment: ElementId, tag: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fragment,
            tag: tag.into(),
            sketch: None,
            style: None,
            template: None,
            components: Vec::new(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The fragment this instance belongs to.
    pub fn fragment(&self) -> ElementId {
        self.fragment
    }

    pub fn components(&self) -> &[ElementId] {
        &self.components
    }
}
