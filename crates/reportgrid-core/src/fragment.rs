//! Fragment instance reconciliation.
//!
//! Existing instances are paired with incoming definitions strictly by
//! index. The result describes what the caller has to apply; nothing here
//! touches the design.

use crate::definition::FragmentInstanceDefinition;
use crate::model::{ElementId, Fragment, FragmentInstance};
use serde::{Deserialize, Serialize};

/// An instance whose rendered content can no longer be reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleInstance {
    #[serde(rename = "type")]
    pub fragment_type: String,
    pub id: ElementId,
}

/// Outcome of diffing a fragment's instances against incoming definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Paired instances with their new attributes; ids are preserved.
    pub updated: Vec<FragmentInstance>,
    /// Instances past the end of the incoming list.
    pub removed: Vec<StaleInstance>,
    /// New instances for incoming definitions past the existing ones.
    pub added: Vec<FragmentInstance>,
    /// Instances that must be remounted and have their cache invalidated.
    pub stale: Vec<StaleInstance>,
    /// Every existing instance was removed.
    pub full_removal: bool,
}

impl Reconciliation {
    /// Pair each added instance with the definition it was created from.
    pub fn added_with_definitions<'a>(
        &'a self,
        incoming: &'a [FragmentInstanceDefinition],
    ) -> impl Iterator<Item = (&'a FragmentInstance, &'a FragmentInstanceDefinition)> {
        let skip = incoming.len().saturating_sub(self.added.len());
        self.added.iter().zip(incoming.iter().skip(skip))
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty() && self.added.is_empty()
    }
}

/// Diff `existing` instances of `fragment` against `incoming`.
pub fn reconcile(
    fragment: &Fragment,
    existing: &[FragmentInstance],
    incoming: &[FragmentInstanceDefinition],
) -> Reconciliation {
    let mut result = Reconciliation::default();
    let stale = |instance: &FragmentInstance| StaleInstance {
        fragment_type: fragment.fragment_type.clone(),
        id: instance.id(),
    };

    for (current, next) in existing.iter().zip(incoming) {
        let mut instance = current.clone();
        instance.tag = next.tag.clone();
        instance.style = next.style.clone();

        if fragment.is_inline() {
            instance.sketch = next.sketch.clone();
            if current.tag != next.tag || current.sketch != next.sketch {
                instance.template = next.template.clone();
            }
        }

        if current.tag != next.tag {
            result.stale.push(stale(current));
        }
        result.updated.push(instance);
    }

    if existing.len() > incoming.len() {
        result.removed = existing[incoming.len()..].iter().map(stale).collect();
        if incoming.is_empty() {
            result.full_removal = true;
            result.stale = result.removed.clone();
        }
    }

    for next in incoming.iter().skip(existing.len()) {
        let mut instance = FragmentInstance::new(fragment.id(), next.tag.clone());
        instance.sketch = next.sketch.clone();
        instance.style = next.style.clone();
        instance.template = next.template.clone();
        result.added.push(instance);
    }

    result
}
