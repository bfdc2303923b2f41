//! Change notifications and deferred work for the editor session.

use crate::fragment::StaleInstance;
use crate::model::{DesignId, ElementId};
use std::time::Instant;

/// A committed change, drained by the host with `Editor::poll_events`.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorEvent {
    pub design: DesignId,
    pub kind: EditorEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEventKind {
    DesignAdded,
    DesignRemoved,
    SelectionChanged,
    HighlightChanged,
    ComponentAdded { id: ElementId },
    ComponentRemoved { id: ElementId },
    ComponentMoved { id: ElementId },
    ComponentUpdated { id: ElementId, cache_invalidated: bool },
    ItemResized { id: ElementId },
    /// `is_resizing` went back to false.
    ResizeSettled,
    FragmentsReconciled { stale: Vec<StaleInstance> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeferredAction {
    ClearResizing,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct DeferredTask {
    pub due: Instant,
    pub design: DesignId,
    pub action: DeferredAction,
}

/// Tasks scheduled to run after an action completes.
#[derive(Debug, Default)]
pub(crate) struct DeferredQueue {
    tasks: Vec<DeferredTask>,
}

impl DeferredQueue {
    pub fn schedule(&mut self, design: DesignId, action: DeferredAction, due: Instant) {
        self.tasks.push(DeferredTask { due, design, action });
    }

    /// Drop queued tasks of `action` for `design`. Returns how many were dropped.
    pub fn cancel(&mut self, design: DesignId, action: DeferredAction) -> usize {
        let before = self.tasks.len();
        self.tasks
            .retain(|task| !(task.design == design && task.action == action));
        before - self.tasks.len()
    }

    /// Remove and return every task due at `now`, oldest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<DeferredTask> {
        let (due, pending): (Vec<_>, Vec<_>) =
            self.tasks.drain(..).partition(|task| task.due <= now);
        self.tasks = pending;
        due
    }

    pub fn take_all(&mut self) -> Vec<DeferredTask> {
        std::mem::take(&mut self.tasks)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
