//! Document - High-level document API

use crate::{DomTree, NodeId};

/// HTML Document
#[derive(Debug)]
pub struct Document {
    /// The DOM tree
    tree: DomTree,
    /// Document URL
    url: String,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <head> element
    head_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
}

impl Document {
    /// Create a document with an html/head/body skeleton
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        let root = tree.root();
        for (parent, child) in [(root, html), (html, head), (html, body)] {
            let linked = tree.append_child(parent, child);
            debug_assert!(linked.is_ok(), "fresh nodes always link");
        }

        Self {
            tree,
            url: url.to_string(),
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    /// Create an empty document (no structure)
    pub fn empty(url: &str) -> Self {
        Self {
            tree: DomTree::new(),
            url: url.to_string(),
            html_element: NodeId::NONE,
            head_element: NodeId::NONE,
            body_element: NodeId::NONE,
        }
    }

    /// Locate html/head/body after the tree was filled in by a parser
    pub fn finalize(&mut self) {
        let find = |tree: &DomTree, tag: &str| {
            tree.descendants(tree.root())
                .find(|&id| tree.tag_name(id) == Some(tag))
                .unwrap_or(NodeId::NONE)
        };
        self.html_element = find(&self.tree, "html");
        self.head_element = find(&self.tree, "head");
        self.body_element = find(&self.tree, "body");
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get <html> element
    pub fn document_element(&self) -> Option<NodeId> {
        self.html_element.option()
    }

    /// Get <head> element
    pub fn head(&self) -> Option<NodeId> {
        self.head_element.option()
    }

    /// Get <body> element
    pub fn body(&self) -> Option<NodeId> {
        self.body_element.option()
    }

    /// Get element by ID
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let tree = &self.tree;
        tree.descendants(tree.root())
            .find(|&node| tree.is_element(node) && tree.get_attribute(node, "id") == Some(id))
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton() {
        let doc = Document::default();
        let body = doc.body().unwrap();
        assert_eq!(doc.tree().tag_name(body), Some("body"));
        assert_eq!(doc.tree().parent(body), doc.document_element());
        assert_eq!(doc.url(), "about:blank");
    }

    #[test]
    fn test_empty_and_finalize() {
        let mut doc = Document::empty("about:blank");
        assert_eq!(doc.body(), None);

        let tree = doc.tree_mut();
        let html = tree.create_element("html");
        let body = tree.create_element("body");
        tree.append_child(tree.root(), html).unwrap();
        tree.append_child(html, body).unwrap();
        doc.finalize();
        assert_eq!(doc.body(), Some(body));
        assert_eq!(doc.head(), None);
    }

    #[test]
    fn test_get_element_by_id() {
        let mut doc = Document::default();
        let body = doc.body().unwrap();
        let tree = doc.tree_mut();
        let div = tree.create_element("div");
        tree.set_attribute(div, "id", "main").unwrap();
        tree.append_child(body, div).unwrap();
        assert_eq!(doc.get_element_by_id("main"), Some(div));
        assert_eq!(doc.get_element_by_id("missing"), None);
    }
}
