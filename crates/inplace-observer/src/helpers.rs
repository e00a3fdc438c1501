//! DOM helpers shared by the handler, registry and observer

use std::rc::Rc;

use inplace_dom::{DomTree, NodeId};

use crate::error::ObserverError;
use crate::options::ObserverOptions;
use crate::{DEFAULT_NAMESPACE, RESTRICT_ATTRIBUTE};

/// Key plus optional namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyDescriptor {
    pub key: String,
    pub ns: Option<String>,
}

impl KeyDescriptor {
    pub fn new(key: impl Into<String>, ns: Option<&str>) -> Self {
        Self {
            key: key.into(),
            ns: ns.map(String::from),
        }
    }

    /// Namespace with the absent case folded to the default namespace
    pub fn namespace(&self) -> &str {
        self.ns.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }
}

/// Descriptor equality with namespace fallback
pub fn compare_descriptors(a: &KeyDescriptor, b: &KeyDescriptor) -> bool {
    a.key == b.key && a.namespace() == b.namespace()
}

/// Character data of a text node or value of an attribute node
pub fn get_node_text(tree: &DomTree, node: NodeId) -> Option<&str> {
    if tree.is_text(node) || tree.is_attribute(node) {
        tree.node_value(node)
    } else {
        None
    }
}

pub fn set_node_text(tree: &mut DomTree, node: NodeId, text: &str) -> Result<(), ObserverError> {
    Ok(tree.set_node_value(node, text)?)
}

/// Configuration-aware DOM queries
#[derive(Debug, Clone)]
pub struct DomHelper {
    options: Rc<ObserverOptions>,
}

impl DomHelper {
    pub fn new(options: Rc<ObserverOptions>) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }

    /// Element a text or attribute node registers under
    ///
    /// Attributes anchor at their owner, everything else at its parent
    /// element; elements matched by `pass_to_parent` hand over to their
    /// own parent element.
    pub fn get_suitable_parent(&self, tree: &DomTree, node: NodeId) -> Result<NodeId, ObserverError> {
        let mut candidate = if tree.is_attribute(node) {
            tree.owner_element(node)
        } else {
            tree.parent_element(node)
        }
        .ok_or(ObserverError::NoSuitableParent(node))?;

        while self.options.pass_to_parent.matches(tree, candidate) {
            candidate = tree
                .parent_element(candidate)
                .ok_or(ObserverError::NoSuitableParent(node))?;
        }
        Ok(candidate)
    }

    /// Inside a restricted element (by tag or marker attribute)
    pub fn is_restricted(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.inclusive_ancestors(node)
            .into_iter()
            .any(|ancestor| self.is_restricted_element(tree, ancestor))
    }

    /// The element itself is restricted; ancestors are not consulted
    pub fn is_restricted_element(&self, tree: &DomTree, element: NodeId) -> bool {
        match tree.tag_name(element) {
            Some(tag) => self.options.is_restricted_tag(tag) || tree.has_attribute(element, RESTRICT_ATTRIBUTE),
            None => false,
        }
    }
}
