//! Element Store
//!
//! Owning element → metadata of every node it shows, with a node → owner
//! map and a reverse index from (key, namespace) to registered nodes. The
//! three maps are only ever changed together.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use inplace_dom::NodeId;

use crate::wrapper::WrappedKey;
use crate::DEFAULT_NAMESPACE;

/// What one text or attribute node showed when it was last scanned
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeMeta {
    /// Raw text before decoding
    pub old_text_content: String,
    /// Plain text written back into the node
    pub new_text_content: String,
    pub keys: Vec<WrappedKey>,
    /// Registered through the key-only marker attribute
    pub key_attribute_only: bool,
}

/// Everything known about one owning element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMeta {
    pub element: NodeId,
    pub nodes: BTreeMap<NodeId, NodeMeta>,
    pub(crate) highlights: BTreeSet<u64>,
    pub(crate) hovered: bool,
}

impl ElementMeta {
    fn new(element: NodeId) -> Self {
        Self {
            element,
            nodes: BTreeMap::new(),
            highlights: BTreeSet::new(),
            hovered: false,
        }
    }

    /// Highlighted explicitly or by hover
    pub fn is_highlighted(&self) -> bool {
        self.hovered || !self.highlights.is_empty()
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Keys of every owned node, in node order, without repeats
    pub fn keys(&self) -> Vec<&WrappedKey> {
        let mut keys: Vec<&WrappedKey> = Vec::new();
        for key in self.nodes.values().flat_map(|meta| &meta.keys) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

type IndexKey = (String, String);

fn index_key(key: &str, ns: Option<&str>) -> IndexKey {
    (key.to_string(), ns.unwrap_or(DEFAULT_NAMESPACE).to_string())
}

/// Registered elements of one observer
#[derive(Debug, Default)]
pub struct ElementStore {
    elements: HashMap<NodeId, ElementMeta>,
    owners: HashMap<NodeId, NodeId>,
    key_index: HashMap<IndexKey, BTreeSet<NodeId>>,
    next_token: u64,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `node` under `element`, replacing whatever it had before
    pub fn register(&mut self, element: NodeId, node: NodeId, meta: NodeMeta) {
        match self.owners.get(&node).copied() {
            Some(owner) if owner != element => {
                self.remove_node(node);
            }
            Some(_) => {
                let previous = self
                    .elements
                    .get(&element)
                    .and_then(|e| e.nodes.get(&node))
                    .map(|m| m.keys.clone())
                    .unwrap_or_default();
                self.unindex(node, &previous);
            }
            None => {}
        }

        for key in &meta.keys {
            self.key_index
                .entry(index_key(&key.key, key.ns.as_deref()))
                .or_default()
                .insert(node);
        }
        self.owners.insert(node, element);
        self.elements
            .entry(element)
            .or_insert_with(|| ElementMeta::new(element))
            .nodes
            .insert(node, meta);
    }

    fn unindex(&mut self, node: NodeId, keys: &[WrappedKey]) {
        for key in keys {
            let index = index_key(&key.key, key.ns.as_deref());
            if let Some(nodes) = self.key_index.get_mut(&index) {
                nodes.remove(&node);
                if nodes.is_empty() {
                    self.key_index.remove(&index);
                }
            }
        }
    }

    /// Forget one node; its element goes with it once empty
    pub fn remove_node(&mut self, node: NodeId) -> Option<NodeMeta> {
        let element = self.owners.remove(&node)?;
        let entry = self.elements.get_mut(&element)?;
        let meta = entry.nodes.remove(&node)?;
        if entry.nodes.is_empty() {
            self.elements.remove(&element);
        }
        self.unindex(node, &meta.keys);
        Some(meta)
    }

    /// Forget an element and every node it owns
    pub fn remove_element(&mut self, element: NodeId) -> Option<ElementMeta> {
        let meta = self.elements.remove(&element)?;
        for (&node, node_meta) in &meta.nodes {
            self.owners.remove(&node);
            self.unindex(node, &node_meta.keys);
        }
        Some(meta)
    }

    pub fn get(&self, element: NodeId) -> Option<&ElementMeta> {
        self.elements.get(&element)
    }

    pub(crate) fn get_mut(&mut self, element: NodeId) -> Option<&mut ElementMeta> {
        self.elements.get_mut(&element)
    }

    pub fn owner_of(&self, node: NodeId) -> Option<NodeId> {
        self.owners.get(&node).copied()
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.owners.contains_key(&node)
    }

    pub fn contains_element(&self, element: NodeId) -> bool {
        self.elements.contains_key(&element)
    }

    pub fn node_meta(&self, node: NodeId) -> Option<&NodeMeta> {
        let element = self.owners.get(&node)?;
        self.elements.get(element)?.nodes.get(&node)
    }

    /// Registered nodes, in handle order
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.owners.keys().copied().collect();
        nodes.sort_unstable();
        nodes
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements showing `key` (in `ns`), or every element without a key
    ///
    /// Sorted by element handle.
    pub fn find_all(&self, key: Option<&str>, ns: Option<&str>) -> Vec<&ElementMeta> {
        let mut found: Vec<&ElementMeta> = match key {
            None => self.elements.values().collect(),
            Some(key) => {
                let owners: BTreeSet<NodeId> = self
                    .key_index
                    .get(&index_key(key, ns))
                    .into_iter()
                    .flatten()
                    .filter_map(|node| self.owners.get(node).copied())
                    .collect();
                owners.iter().filter_map(|e| self.elements.get(e)).collect()
            }
        };
        found.sort_unstable_by_key(|meta| meta.element);
        found
    }

    pub(crate) fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    pub(crate) fn clear_hover(&mut self) {
        for meta in self.elements.values_mut() {
            meta.hovered = false;
        }
    }
}
