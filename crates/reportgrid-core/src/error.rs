//! Error taxonomy for canvas actions.

use crate::model::{DesignId, ElementId, ElementKind};
use crate::storage::StorageError;
use thiserror::Error;

/// Errors returned by canvas actions.
///
/// Live interaction feedback (a conflicting drop preview, an invalid resize)
/// is carried in the derived state instead and never shows up here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    #[error("Design not found: {0}")]
    DesignNotFound(DesignId),
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),
    #[error("Group not found: {0}")]
    GroupNotFound(ElementId),
    #[error("Element {id} is not of kind {expected}")]
    WrongElementKind { id: ElementId, expected: ElementKind },
    #[error("Columns {start}..={end} of group {group} overlap an existing item")]
    Conflict {
        group: ElementId,
        start: usize,
        end: usize,
    },
    #[error("Item {0} is not being resized")]
    NotResizing(ElementId),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CanvasError {
    /// True for the "stale input" family: the action referenced something
    /// that no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CanvasError::DesignNotFound(_)
                | CanvasError::ElementNotFound(_)
                | CanvasError::GroupNotFound(_)
        )
    }
}

impl From<serde_json::Error> for CanvasError {
    fn from(err: serde_json::Error) -> Self {
        CanvasError::Serialization(err.to_string())
    }
}

/// Result type for canvas actions.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// What an action did to the committed model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome {
    /// The action committed a transition.
    Applied,
    /// Nothing changed (duplicate tick, same position, empty selection...).
    Unchanged,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}
