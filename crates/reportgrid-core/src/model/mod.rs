//! Spatial model for designs.
//!
//! A [`Design`] owns flat tables of groups, items, components, fragments and
//! fragment instances keyed by [`ElementId`]. Parent links are plain ids, so
//! the tree carries no ownership cycles while still supporting upward walks
//! (selection chains) and downward walks (subtree removal, export).

mod component;
mod design;
mod fragment;
mod group;
mod item;

pub use component::Component;
pub use design::{Design, DesignSettings};
pub use fragment::{Fragment, FragmentInstance, FragmentMode};
pub use group::{Group, LayoutMode};
pub use item::Item;

use std::fmt;
use uuid::Uuid;

/// Unique identifier for any element on the canvas.
pub type ElementId = Uuid;

/// Unique identifier for a design.
pub type DesignId = Uuid;

/// Kind of node an [`ElementId`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Group,
    Item,
    Component,
    Fragment,
    FragmentInstance,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Group => "group",
            ElementKind::Item => "item",
            ElementKind::Component => "component",
            ElementKind::Fragment => "fragment",
            ElementKind::FragmentInstance => "fragment instance",
        };
        f.write_str(name)
    }
}
