//! Content nodes.

use super::ElementId;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Leaf content rendered from a type and optional template.
///
/// A component belongs to exactly one item or fragment instance.
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) id: ElementId,
    pub(crate) parent: ElementId,
    pub component_type: String,
    pub props: Value,
    pub bindings: Option<Value>,
    pub expressions: Option<Value>,
    pub template: Option<String>,
    /// Fragment ids keyed by fragment name.
    pub(crate) fragments: BTreeMap<String, ElementId>,
    pub selected: bool,
}

impl Component {
    pub fn new(parent: ElementId, component_type: impl Into<String>, props: Value) -> Self {
        Self::with_id(Uuid::new_v4(), parent, component_type, props)
    }

    pub fn with_id(
        id: ElementId,
        parent: ElementId,
        component_type: impl Into<String>,
        props: Value,
    ) -> Self {
        Self {
            id,
            parent,
            component_type: component_type.into(),
            props,
            bindings: None,
            expressions: None,
            template: None,
            fragments: BTreeMap::new(),
            selected: false,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The item or fragment instance holding this component.
    pub fn parent(&self) -> ElementId {
        self.parent
    }

    pub fn fragments(&self) -> &BTreeMap<String, ElementId> {
        &self.fragments
    }

    pub fn fragment_id(&self, name: &str) -> Option<ElementId> {
        self.fragments.get(name).copied()
    }
}
