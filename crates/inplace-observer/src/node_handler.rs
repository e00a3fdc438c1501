//! Node Handler
//!
//! Turns a mutation target into the text and attribute nodes worth
//! decoding. A node is a candidate when the wrapper thinks it may hold a
//! reference, or when the store already tracks it (so a registered node
//! whose reference disappeared still gets re-scanned and dropped).

use std::cell::RefCell;
use std::rc::Rc;

use inplace_dom::{DomTree, FilterResult, NodeId, TreeWalker, WhatToShow};

use crate::element_store::ElementStore;
use crate::helpers::{get_node_text, DomHelper};
use crate::wrapper::Wrapper;
use crate::KEY_ONLY_ATTRIBUTE;

pub struct NodeHandler {
    helper: DomHelper,
    wrapper: Rc<dyn Wrapper>,
    store: Rc<RefCell<ElementStore>>,
}

impl NodeHandler {
    pub fn new(helper: DomHelper, wrapper: Rc<dyn Wrapper>, store: Rc<RefCell<ElementStore>>) -> Self {
        Self { helper, wrapper, store }
    }

    fn is_candidate(&self, tree: &DomTree, node: NodeId) -> bool {
        match get_node_text(tree, node) {
            Some(text) => self.wrapper.test_text(text) || self.store.borrow().contains_node(node),
            None => false,
        }
    }

    /// A changed text node
    pub fn handle_text(&self, tree: &DomTree, node: NodeId) -> Vec<NodeId> {
        if tree.is_text(node) && !self.helper.is_restricted(tree, node) && self.is_candidate(tree, node) {
            vec![node]
        } else {
            Vec::new()
        }
    }

    /// Scanned attributes of one element
    pub fn handle_attributes(&self, tree: &DomTree, element: NodeId) -> Vec<NodeId> {
        if self.helper.is_restricted(tree, element) {
            return Vec::new();
        }
        let mut nodes = Vec::new();
        self.collect_attributes(tree, element, &mut nodes);
        nodes
    }

    fn collect_attributes(&self, tree: &DomTree, element: NodeId, out: &mut Vec<NodeId>) {
        let Some(tag) = tree.tag_name(element) else {
            return;
        };
        let options = self.helper.options();
        for &attr in tree.attributes(element) {
            let allowed = tree
                .attribute_name(attr)
                .is_some_and(|name| options.is_allowed_attribute(tag, name));
            if allowed && self.is_candidate(tree, attr) {
                out.push(attr);
            }
        }
    }

    fn walker(&self, root: NodeId, what: WhatToShow) -> TreeWalker<'_> {
        let helper = &self.helper;
        TreeWalker::with_filter(root, what, move |tree, node| {
            if helper.is_restricted_element(tree, node) {
                FilterResult::Reject
            } else {
                FilterResult::Accept
            }
        })
    }

    /// Every text node and scanned attribute in a subtree, the root included
    pub fn handle_child_list(&self, tree: &DomTree, root: NodeId) -> Vec<NodeId> {
        if self.helper.is_restricted(tree, root) {
            return Vec::new();
        }
        if tree.is_text(root) {
            return self.handle_text(tree, root);
        }

        let mut nodes = Vec::new();
        self.collect_attributes(tree, root, &mut nodes);
        let mut walker = self.walker(root, WhatToShow::ELEMENT.or(WhatToShow::TEXT));
        while let Some(node) = walker.next_node(tree) {
            if tree.is_text(node) {
                if self.is_candidate(tree, node) {
                    nodes.push(node);
                }
            } else {
                self.collect_attributes(tree, node, &mut nodes);
            }
        }
        nodes
    }

    /// Key-only marker attributes on the root and every element below it
    pub fn handle_key_attribute(&self, tree: &DomTree, root: NodeId) -> Vec<NodeId> {
        if self.helper.is_restricted(tree, root) {
            return Vec::new();
        }
        std::iter::once(root)
            .chain(self.walker(root, WhatToShow::ELEMENT).collect(tree))
            .filter_map(|element| tree.attribute_node(element, KEY_ONLY_ATTRIBUTE))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ObserverOptions;
    use crate::wrapper::{InvisibleWrapper, WrapProps};
    use crate::ElementStore;

    fn handler() -> NodeHandler {
        NodeHandler::new(
            DomHelper::new(Rc::new(ObserverOptions::default())),
            Rc::new(InvisibleWrapper::new()),
            Rc::new(RefCell::new(ElementStore::new())),
        )
    }

    fn wrapped(key: &str, text: &str) -> String {
        InvisibleWrapper::new().wrap(&WrapProps::new(key).translation(text))
    }

    #[test]
    fn test_child_list_collects_texts_and_attributes() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let plain = tree.create_text("plain");
        let text = tree.create_text(&wrapped("a", "A"));
        let input = tree.create_element("input");
        tree.append_child(NodeId::ROOT, div).unwrap();
        tree.append_child(div, plain).unwrap();
        tree.append_child(div, text).unwrap();
        tree.append_child(div, input).unwrap();
        let title = tree.set_attribute(div, "title", &wrapped("t", "T")).unwrap();
        let placeholder = tree.set_attribute(input, "placeholder", &wrapped("p", "P")).unwrap();
        tree.set_attribute(input, "class", &wrapped("c", "C")).unwrap();

        let nodes = handler().handle_child_list(&tree, div);
        assert_eq!(nodes, vec![title, text, placeholder]);
    }

    #[test]
    fn test_restricted_subtrees_are_skipped() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let script = tree.create_element("script");
        let code = tree.create_text(&wrapped("s", "S"));
        tree.append_child(NodeId::ROOT, div).unwrap();
        tree.append_child(div, script).unwrap();
        tree.append_child(script, code).unwrap();

        let handler = handler();
        assert!(handler.handle_child_list(&tree, div).is_empty());
        assert!(handler.handle_text(&tree, code).is_empty());
        assert!(handler.handle_child_list(&tree, script).is_empty());
    }

    #[test]
    fn test_handle_text_and_attributes() {
        let mut tree = DomTree::new();
        let img = tree.create_element("img");
        let text = tree.create_text(&wrapped("a", "A"));
        tree.append_child(NodeId::ROOT, img).unwrap();
        let alt = tree.set_attribute(img, "alt", &wrapped("alt", "Alt")).unwrap();
        tree.set_attribute(img, "src", &wrapped("src", "x.png")).unwrap();

        let handler = handler();
        assert_eq!(handler.handle_attributes(&tree, img), vec![alt]);
        // detached text is still a text node
        assert_eq!(handler.handle_text(&tree, text), vec![text]);
        assert!(handler.handle_text(&tree, img).is_empty());
    }

    #[test]
    fn test_key_attribute_includes_root() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let span = tree.create_element("span");
        tree.append_child(NodeId::ROOT, div).unwrap();
        tree.append_child(div, span).unwrap();
        let own = tree.set_attribute(div, KEY_ONLY_ATTRIBUTE, "k1").unwrap();
        let nested = tree.set_attribute(span, KEY_ONLY_ATTRIBUTE, "k2").unwrap();

        assert_eq!(handler().handle_key_attribute(&tree, div), vec![own, nested]);
    }
}
