//! ReportGrid Core Library
//!
//! Platform-agnostic canvas state for the ReportGrid layout editor: the
//! row/slot/component tree, its registry, and the spatial algorithms that
//! drive drag, drop and resize feedback.

pub mod config;
pub mod definition;
pub mod editor;
pub mod error;
pub mod fragment;
pub mod grid;
pub mod marked_area;
pub mod model;
pub mod registry;
pub mod render_cache;
pub mod resize;
pub mod storage;

pub use config::EditorConfig;
pub use definition::{
    ComponentDefinition, DesignDefinition, FragmentDefinition, FragmentInstanceDefinition,
    GroupDefinition, ItemDefinition,
};
pub use editor::{
    AddedComponent, ComponentBehind, ComponentChanges, DragPayload, DragSource, DraggedElement,
    DropTarget, Editor, EditorEvent, EditorEventKind, ItemTarget, TargetArea,
};
pub use error::{CanvasError, CanvasResult, Outcome};
pub use fragment::{Reconciliation, StaleInstance, reconcile};
pub use grid::{
    ColumnSpan, HighlightedArea, TargetColInfo, project_filled_area,
    project_filled_area_while_resizing,
};
pub use marked_area::{
    Axis, MarkPosition, MarkRequest, MarkTargetType, MarkedArea, find_marked_area,
};
pub use model::{
    Component, Design, DesignId, DesignSettings, ElementId, ElementKind, Fragment, FragmentInstance,
    FragmentMode, Group, Item, LayoutMode,
};
pub use registry::{CanvasContext, CanvasRegistry, RegistryEntry};
pub use render_cache::{CachedRender, RenderCache};
pub use resize::{ResizeDirection, ResizeLimits, ResizeStart, ResizeState, ResizeStatus};
pub use storage::{DesignStore, FileStorage, MemoryStorage, StorageError, StorageResult};
