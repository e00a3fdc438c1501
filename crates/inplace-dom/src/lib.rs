//! inplace DOM - Document Object Model
//!
//! Arena-based DOM tree the translation observer runs against.
//! Attributes are nodes in the arena, so text and attribute values can be
//! addressed through the same `NodeId` handle.

mod document;
mod error;
mod geometry;
mod node;
mod observer;
mod tree;
mod tree_walker;

pub use document::Document;
pub use error::DomError;
pub use geometry::DOMRect;
pub use node::{AttrData, ElementData, Node, NodeData, NodeType};
pub use observer::{MutationObserver, MutationObserverInit, MutationRecord, MutationType};
pub use tree::{Children, Descendants, DocumentPosition, DomTree};
pub use tree_walker::{FilterResult, TreeWalker, WhatToShow};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check whether this ID points at a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn option(self) -> Option<NodeId> {
        self.is_valid().then_some(self)
    }
}
