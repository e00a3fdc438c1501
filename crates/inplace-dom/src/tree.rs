//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed: a removed subtree stays in the arena, detached,
//! so handles held by observers keep resolving after removal.

use std::cmp::Ordering;
use std::ops::BitOr;

use crate::node::{AttrData, ElementData, Node, NodeData, NodeType};
use crate::observer::{MutationObserver, MutationObserverInit, MutationRecord, ObserverList};
use crate::{DOMRect, DomError, NodeId};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    observers: ObserverList,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
            observers: ObserverList::default(),
        }
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.get(id).ok_or(DomError::InvalidNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.index()).ok_or(DomError::InvalidNode(id))
    }

    /// Number of nodes in the arena, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// The document node always exists
    pub fn is_empty(&self) -> bool {
        false
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag_name)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(NodeData::Text(content.to_string()))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(NodeData::Comment(content.to_string()))
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(Node::node_type)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_text)
    }

    pub fn is_attribute(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_attribute)
    }

    /// Lowercase tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.tag_name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent()
    }

    /// Parent, if it is an element (attributes have none)
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.is_element(p))
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.first_child()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.next_sibling()
    }

    /// Iterate over direct children
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Iterate over descendants in tree order, excluding `root`
    pub fn descendants(&self, root: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root,
            next: self.get(root).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Tree-order successor of `node` without leaving `root`
    pub(crate) fn following(&self, node: NodeId, root: NodeId) -> NodeId {
        let Some(n) = self.get(node) else {
            return NodeId::NONE;
        };
        if n.first_child.is_valid() {
            return n.first_child;
        }
        self.following_skipping_children(node, root)
    }

    /// Tree-order successor of `node`, skipping its subtree
    pub(crate) fn following_skipping_children(&self, node: NodeId, root: NodeId) -> NodeId {
        let mut current = node;
        while current != root {
            let Some(n) = self.get(current) else {
                break;
            };
            if n.next_sibling.is_valid() {
                return n.next_sibling;
            }
            current = n.parent;
            if !current.is_valid() {
                break;
            }
        }
        NodeId::NONE
    }

    /// Element an attribute belongs to
    pub fn owner_element(&self, attr: NodeId) -> Option<NodeId> {
        self.get(attr)?.as_attribute()?.owner()
    }

    /// Where a node sits in the tree: attributes sit at their owner
    fn anchor(&self, id: NodeId) -> NodeId {
        self.owner_element(id).unwrap_or(id)
    }

    /// Inclusive ancestors, nearest first
    pub fn inclusive_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        if self.is_attribute(id) {
            result.push(id);
            current = self.anchor(id);
            if current == id {
                return result;
            }
        }
        while current.is_valid() && self.get(current).is_some() {
            result.push(current);
            current = self.nodes[current.index()].parent;
        }
        result
    }

    /// Inclusive containment; attributes count as inside their owner
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if ancestor == node {
            return true;
        }
        let mut current = self.anchor(node);
        while current.is_valid() {
            if current == ancestor {
                return true;
            }
            current = match self.get(current) {
                Some(n) => n.parent,
                None => return false,
            };
        }
        false
    }

    /// Top-most ancestor
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = self.anchor(id);
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Attached to the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.get(id).is_some() && self.root_of(id) == NodeId::ROOT
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Attribute nodes of an element
    pub fn attributes(&self, element: NodeId) -> &[NodeId] {
        self.get(element)
            .and_then(Node::as_element)
            .map_or(&[], |e| e.attrs.as_slice())
    }

    /// Attribute node by name
    pub fn attribute_node(&self, element: NodeId, name: &str) -> Option<NodeId> {
        self.attributes(element).iter().copied().find(|&attr| {
            self.get(attr)
                .and_then(Node::as_attribute)
                .is_some_and(|a| a.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        let attr = self.attribute_node(element, name)?;
        self.node_value(attr)
    }

    pub fn has_attribute(&self, element: NodeId, name: &str) -> bool {
        self.attribute_node(element, name).is_some()
    }

    /// Attribute name of an attribute node
    pub fn attribute_name(&self, attr: NodeId) -> Option<&str> {
        self.get(attr)?.as_attribute().map(|a| a.name.as_str())
    }

    /// Set an attribute, creating its node on first use
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> Result<NodeId, DomError> {
        if !self.node(element)?.is_element() {
            return Err(DomError::NotAnElement(element));
        }

        if let Some(attr) = self.attribute_node(element, name) {
            self.set_node_value(attr, value)?;
            return Ok(attr);
        }

        let name = name.to_ascii_lowercase();
        let attr = self.push(NodeData::Attribute(AttrData {
            name: name.clone(),
            value: value.to_string(),
            owner: element,
        }));
        if let Some(elem) = self.node_mut(element)?.as_element_mut() {
            elem.attrs.push(attr);
        }
        self.queue(MutationRecord::attributes(element, &name, None, None));
        Ok(attr)
    }

    /// Remove an attribute; the detached attribute node is returned
    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> Result<Option<NodeId>, DomError> {
        if !self.node(element)?.is_element() {
            return Err(DomError::NotAnElement(element));
        }
        let Some(attr) = self.attribute_node(element, name) else {
            return Ok(None);
        };

        if let Some(elem) = self.node_mut(element)?.as_element_mut() {
            elem.attrs.retain(|&a| a != attr);
        }
        let (name, old_value) = match &mut self.node_mut(attr)?.data {
            NodeData::Attribute(a) => {
                a.owner = NodeId::NONE;
                (a.name.clone(), a.value.clone())
            }
            _ => return Ok(None),
        };
        self.queue(MutationRecord::attributes(element, &name, Some(old_value), Some(attr)));
        Ok(Some(attr))
    }

    // ------------------------------------------------------------------
    // Character data
    // ------------------------------------------------------------------

    /// Value of a text, comment or attribute node
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Text(s) | NodeData::Comment(s) => Some(s),
            NodeData::Attribute(a) => Some(&a.value),
            _ => None,
        }
    }

    /// Replace the value of a text, comment or attribute node
    pub fn set_node_value(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        let record = match &mut self.node_mut(id)?.data {
            NodeData::Text(s) | NodeData::Comment(s) => {
                let old = std::mem::replace(s, value.to_string());
                Some(MutationRecord::character_data(id, old))
            }
            NodeData::Attribute(a) => {
                let old = std::mem::replace(&mut a.value, value.to_string());
                a.owner
                    .option()
                    .map(|owner| MutationRecord::attributes(owner, &a.name, Some(old), None))
            }
            _ => return Err(DomError::NoValue(id)),
        };
        if let Some(record) = record {
            self.queue(record);
        }
        Ok(())
    }

    /// Concatenated text of a node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        match self.get(id).map(|n| &n.data) {
            Some(NodeData::Text(s)) | Some(NodeData::Comment(s)) => s.clone(),
            Some(NodeData::Attribute(a)) => a.value.clone(),
            Some(_) => self
                .descendants(id)
                .filter_map(|d| self.get(d).and_then(Node::as_text))
                .collect(),
            None => String::new(),
        }
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Append `child` as last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (append when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let parent_node = self.node(parent)?;
        if !matches!(parent_node.data, NodeData::Element(_) | NodeData::Document) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        let child_node = self.node(child)?;
        if matches!(child_node.data, NodeData::Attribute(_) | NodeData::Document) || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        let mut reference = reference;
        if let Some(r) = reference {
            if self.node(r)?.parent != parent {
                return Err(DomError::NotFound { parent, child: r });
            }
            if r == child {
                reference = self.next_sibling(child);
            }
        }

        self.detach(child);

        let prev = match reference {
            Some(r) => self.nodes[r.index()].prev_sibling,
            None => self.nodes[parent.index()].last_child,
        };
        let next = reference.unwrap_or(NodeId::NONE);

        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = child;
        } else {
            self.nodes[parent.index()].last_child = child;
        }

        self.queue(MutationRecord::child_list(
            parent,
            vec![child],
            Vec::new(),
            prev.option(),
            next.option(),
        ));
        Ok(())
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.node(child)?.parent != parent {
            return Err(DomError::NotFound { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Detach a node from its parent, if it has one
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.node(node)?;
        self.detach(node);
        Ok(())
    }

    /// Remove every child of `parent` in one mutation record
    pub fn clear_children(&mut self, parent: NodeId) -> Result<Vec<NodeId>, DomError> {
        self.node(parent)?;
        let removed: Vec<NodeId> = self.children(parent).collect();
        if removed.is_empty() {
            return Ok(removed);
        }
        for &child in &removed {
            let node = &mut self.nodes[child.index()];
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
        let node = &mut self.nodes[parent.index()];
        node.first_child = NodeId::NONE;
        node.last_child = NodeId::NONE;

        self.queue(MutationRecord::child_list(parent, Vec::new(), removed.clone(), None, None));
        Ok(removed)
    }

    fn detach(&mut self, child: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[child.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return;
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }
        let node = &mut self.nodes[child.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;

        self.queue(MutationRecord::child_list(
            parent,
            Vec::new(),
            vec![child],
            prev.option(),
            next.option(),
        ));
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    /// Assign the layout box of an element
    pub fn set_bounding_rect(&mut self, element: NodeId, rect: DOMRect) -> Result<(), DomError> {
        let elem = self
            .node_mut(element)?
            .as_element_mut()
            .ok_or(DomError::NotAnElement(element))?;
        elem.rect = Some(rect);
        Ok(())
    }

    /// Layout box of an element; empty when never laid out
    pub fn bounding_client_rect(&self, element: NodeId) -> DOMRect {
        self.get(element)
            .and_then(Node::as_element)
            .and_then(|e| e.rect)
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Ordering
    // ------------------------------------------------------------------

    /// Position of `other` relative to `reference`.
    ///
    /// Nodes in different trees get `DISCONNECTED | IMPLEMENTATION_SPECIFIC`
    /// plus a direction derived from their root ids, so the result is
    /// consistent across calls.
    pub fn compare_document_position(&self, reference: NodeId, other: NodeId) -> DocumentPosition {
        if reference == other {
            return DocumentPosition::EMPTY;
        }

        let ref_anchor = self.anchor(reference);
        let other_anchor = self.anchor(other);
        if ref_anchor == other_anchor {
            let ordinal = |id: NodeId| {
                self.attributes(ref_anchor)
                    .iter()
                    .position(|&a| a == id)
                    .map_or(0, |p| p + 1)
            };
            let direction = if ordinal(other) > ordinal(reference) {
                DocumentPosition::FOLLOWING
            } else {
                DocumentPosition::PRECEDING
            };
            return DocumentPosition::IMPLEMENTATION_SPECIFIC | direction;
        }

        let ref_path = self.path_from_root(ref_anchor);
        let other_path = self.path_from_root(other_anchor);
        if ref_path.first() != other_path.first() {
            let direction = match ref_path.first().cmp(&other_path.first()) {
                Ordering::Less => DocumentPosition::FOLLOWING,
                _ => DocumentPosition::PRECEDING,
            };
            return DocumentPosition::DISCONNECTED | DocumentPosition::IMPLEMENTATION_SPECIFIC | direction;
        }

        let common = ref_path
            .iter()
            .zip(&other_path)
            .take_while(|(a, b)| a == b)
            .count();
        if common == other_path.len() {
            return DocumentPosition::CONTAINS | DocumentPosition::PRECEDING;
        }
        if common == ref_path.len() {
            return DocumentPosition::CONTAINED_BY | DocumentPosition::FOLLOWING;
        }

        let ref_branch = ref_path[common];
        let other_branch = other_path[common];
        let mut sibling = self.next_sibling(ref_branch);
        while let Some(s) = sibling {
            if s == other_branch {
                return DocumentPosition::FOLLOWING;
            }
            sibling = self.next_sibling(s);
        }
        DocumentPosition::PRECEDING
    }

    /// Tree-order comparison built on `compare_document_position`
    pub fn document_order(&self, a: NodeId, b: NodeId) -> Ordering {
        let position = self.compare_document_position(a, b);
        if position.contains(DocumentPosition::FOLLOWING) {
            Ordering::Less
        } else if position.contains(DocumentPosition::PRECEDING) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    fn path_from_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = id;
        while current.is_valid() {
            path.push(current);
            current = self.get(current).map_or(NodeId::NONE, |n| n.parent);
        }
        path.reverse();
        path
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Register a mutation observer on `target`
    pub fn observe(&mut self, target: NodeId, options: MutationObserverInit) -> Result<MutationObserver, DomError> {
        self.node(target)?;
        if !options.is_valid() {
            return Err(DomError::InvalidObserverOptions);
        }
        tracing::trace!("Observing {:?}", target);
        Ok(self.observers.register(target, options))
    }

    fn queue(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let ancestors = self.inclusive_ancestors(record.target);
        self.observers.notify(&record, &ancestors);
    }
}

/// Children iterator
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next.option()?;
        self.next = self.tree.get(current).map_or(NodeId::NONE, |n| n.next_sibling);
        Some(current)
    }
}

/// Pre-order descendants iterator
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: NodeId,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next.option()?;
        self.next = self.tree.following(current, self.root);
        Some(current)
    }
}

/// `compareDocumentPosition` bit set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentPosition(u16);

impl DocumentPosition {
    pub const EMPTY: DocumentPosition = DocumentPosition(0);
    pub const DISCONNECTED: DocumentPosition = DocumentPosition(0x01);
    pub const PRECEDING: DocumentPosition = DocumentPosition(0x02);
    pub const FOLLOWING: DocumentPosition = DocumentPosition(0x04);
    pub const CONTAINS: DocumentPosition = DocumentPosition(0x08);
    pub const CONTAINED_BY: DocumentPosition = DocumentPosition(0x10);
    pub const IMPLEMENTATION_SPECIFIC: DocumentPosition = DocumentPosition(0x20);

    /// Check whether every bit of `flag` is set
    pub fn contains(self, flag: DocumentPosition) -> bool {
        flag.0 != 0 && (self.0 & flag.0) == flag.0
    }

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl BitOr for DocumentPosition {
    type Output = DocumentPosition;

    fn bitor(self, rhs: DocumentPosition) -> DocumentPosition {
        DocumentPosition(self.0 | rhs.0)
    }
}
