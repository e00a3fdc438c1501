//! TreeWalker
//!
//! Filtered pre-order traversal below a root node. `Reject` prunes the whole
//! subtree of a node, `Skip` hides the node but still visits its children.

use crate::{DomTree, NodeId, NodeType};

/// What types of nodes to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhatToShow(u32);

impl WhatToShow {
    pub const ALL: WhatToShow = WhatToShow(0xFFFFFFFF);
    pub const ELEMENT: WhatToShow = WhatToShow(0x1);
    pub const ATTRIBUTE: WhatToShow = WhatToShow(0x2);
    pub const TEXT: WhatToShow = WhatToShow(0x4);
    pub const COMMENT: WhatToShow = WhatToShow(0x80);
    pub const DOCUMENT: WhatToShow = WhatToShow(0x100);

    /// Check if a node type is shown
    pub fn includes(self, node_type: NodeType) -> bool {
        let flag = match node_type {
            NodeType::Element => Self::ELEMENT.0,
            NodeType::Attribute => Self::ATTRIBUTE.0,
            NodeType::Text => Self::TEXT.0,
            NodeType::Comment => Self::COMMENT.0,
            NodeType::Document => Self::DOCUMENT.0,
        };
        (self.0 & flag) != 0
    }

    /// Union of two WhatToShow filters
    pub fn or(self, other: WhatToShow) -> WhatToShow {
        WhatToShow(self.0 | other.0)
    }
}

impl Default for WhatToShow {
    fn default() -> Self {
        Self::ALL
    }
}

/// Node filter result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    /// Accept the node
    Accept,
    /// Reject the node and everything below it
    Reject,
    /// Skip this node but process its children
    Skip,
}

type NodeFilter<'f> = Box<dyn Fn(&DomTree, NodeId) -> FilterResult + 'f>;

/// TreeWalker over the descendants of `root`
pub struct TreeWalker<'f> {
    /// The root node of the traversal (never yielded)
    pub root: NodeId,
    /// What types of nodes to show
    pub what_to_show: WhatToShow,
    current: NodeId,
    filter: Option<NodeFilter<'f>>,
}

impl<'f> TreeWalker<'f> {
    /// Create a new TreeWalker
    pub fn new(root: NodeId, what_to_show: WhatToShow) -> Self {
        Self {
            root,
            what_to_show,
            current: root,
            filter: None,
        }
    }

    /// Create with a custom filter
    pub fn with_filter(
        root: NodeId,
        what_to_show: WhatToShow,
        filter: impl Fn(&DomTree, NodeId) -> FilterResult + 'f,
    ) -> Self {
        Self {
            root,
            what_to_show,
            current: root,
            filter: Some(Box::new(filter)),
        }
    }

    /// Get the current node
    pub fn current_node(&self) -> NodeId {
        self.current
    }

    fn judge(&self, tree: &DomTree, node: NodeId) -> FilterResult {
        // a rejected subtree is pruned even if its root type is hidden
        if let Some(filter) = &self.filter {
            let verdict = filter(tree, node);
            if verdict == FilterResult::Reject {
                return verdict;
            }
            let shown = tree.node_type(node).is_some_and(|t| self.what_to_show.includes(t));
            return if shown { verdict } else { FilterResult::Skip };
        }
        match tree.node_type(node) {
            Some(t) if self.what_to_show.includes(t) => FilterResult::Accept,
            _ => FilterResult::Skip,
        }
    }

    /// Advance to the next accepted node in tree order
    pub fn next_node(&mut self, tree: &DomTree) -> Option<NodeId> {
        let mut candidate = tree.following(self.current, self.root);
        while candidate.is_valid() {
            match self.judge(tree, candidate) {
                FilterResult::Accept => {
                    self.current = candidate;
                    return Some(candidate);
                }
                FilterResult::Skip => {
                    candidate = tree.following(candidate, self.root);
                }
                FilterResult::Reject => {
                    candidate = tree.following_skipping_children(candidate, self.root);
                }
            }
        }
        None
    }

    /// Drain the walker into a list
    pub fn collect(mut self, tree: &DomTree) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        while let Some(node) = self.next_node(tree) {
            nodes.push(node);
        }
        nodes
    }
}
