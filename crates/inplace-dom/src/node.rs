//! DOM Node - Compact representation
//!
//! Nodes link to each other through `NodeId` handles instead of pointers.
//! Link fields are crate-private: every structural change has to go through
//! `DomTree` so mutation records are queued.

use crate::{DOMRect, NodeId};

/// DOM Node - Core structure
#[derive(Debug, Clone)]
pub struct Node {
    /// Parent node (NONE if detached or root)
    pub(crate) parent: NodeId,
    /// First child
    pub(crate) first_child: NodeId,
    /// Last child (for O(1) append)
    pub(crate) last_child: NodeId,
    /// Previous sibling
    pub(crate) prev_sibling: NodeId,
    /// Next sibling
    pub(crate) next_sibling: NodeId,
    /// Node-specific data
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    /// Node-specific data
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Parent node, if attached
    pub fn parent(&self) -> Option<NodeId> {
        self.parent.option()
    }

    /// First child, if any
    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child.option()
    }

    /// Last child, if any
    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child.option()
    }

    /// Next sibling, if any
    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling.option()
    }

    /// Previous sibling, if any
    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling.option()
    }

    /// Node type
    pub fn node_type(&self) -> NodeType {
        match &self.data {
            NodeData::Document => NodeType::Document,
            NodeData::Element(_) => NodeType::Element,
            NodeData::Attribute(_) => NodeType::Attribute,
            NodeData::Text(_) => NodeType::Text,
            NodeData::Comment(_) => NodeType::Comment,
        }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Check if this is an attribute
    #[inline]
    pub fn is_attribute(&self) -> bool {
        matches!(self.data, NodeData::Attribute(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get attribute data if this is an attribute
    #[inline]
    pub fn as_attribute(&self) -> Option<&AttrData> {
        match &self.data {
            NodeData::Attribute(a) => Some(a),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Attribute, owned by an element
    Attribute(AttrData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag_name: String,
    /// Attribute nodes in insertion order
    pub(crate) attrs: Vec<NodeId>,
    /// Layout box, assigned by whoever lays the page out
    pub(crate) rect: Option<DOMRect>,
}

impl ElementData {
    pub fn new(tag_name: &str) -> Self {
        Self {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs: Vec::new(),
            rect: None,
        }
    }

    /// Attribute node handles
    pub fn attrs(&self) -> &[NodeId] {
        &self.attrs
    }
}

/// Attribute data
#[derive(Debug, Clone)]
pub struct AttrData {
    /// Lowercase attribute name
    pub name: String,
    pub value: String,
    /// Owning element (NONE once removed)
    pub(crate) owner: NodeId,
}

impl AttrData {
    /// Owning element, if still attached
    pub fn owner(&self) -> Option<NodeId> {
        self.owner.option()
    }
}

/// Node type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Element,
    Attribute,
    Text,
    Comment,
    Document,
}

impl NodeType {
    /// DOM `nodeType` constant
    pub fn to_u32(self) -> u32 {
        match self {
            NodeType::Element => 1,
            NodeType::Attribute => 2,
            NodeType::Text => 3,
            NodeType::Comment => 8,
            NodeType::Document => 9,
        }
    }
}
