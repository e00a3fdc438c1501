//! Element Registry
//!
//! Front of the element store. Refuses restricted elements, purges removed
//! nodes and drives the mouse highlight: hover and click while the highlight
//! modifiers are held.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use inplace_dom::{DomTree, NodeId};

use crate::element_store::{ElementMeta, ElementStore, NodeMeta};
use crate::helpers::DomHelper;
use crate::options::ModifierKey;
use crate::wrapper::WrappedKey;

/// Payload of a click on a registered element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationClick {
    pub element: NodeId,
    pub keys: Vec<WrappedKey>,
}

pub type ClickCallback = Rc<dyn Fn(&TranslationClick)>;

/// Input events the host forwards while the mouse highlight is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    KeyDown(ModifierKey),
    KeyUp(ModifierKey),
    /// Pointer entered a node
    Over(NodeId),
    /// Pointer left a node
    Out(NodeId),
    Click(NodeId),
}

pub struct ElementRegistry {
    store: Rc<RefCell<ElementStore>>,
    helper: DomHelper,
    on_click: Option<ClickCallback>,
    running: bool,
    mouse_highlight: bool,
    held: HashSet<ModifierKey>,
    pointer: Option<NodeId>,
    hovered: Option<NodeId>,
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("running", &self.running)
            .field("mouse_highlight", &self.mouse_highlight)
            .field("hovered", &self.hovered)
            .finish_non_exhaustive()
    }
}

impl ElementRegistry {
    pub fn new(store: Rc<RefCell<ElementStore>>, helper: DomHelper, on_click: Option<ClickCallback>) -> Self {
        Self {
            store,
            helper,
            on_click,
            running: false,
            mouse_highlight: false,
            held: HashSet::new(),
            pointer: None,
            hovered: None,
        }
    }

    pub fn run(&mut self, mouse_highlight: bool) {
        tracing::debug!("Element registry running (mouse highlight: {})", mouse_highlight);
        self.running = true;
        self.mouse_highlight = mouse_highlight;
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.mouse_highlight = false;
        self.held.clear();
        self.pointer = None;
        self.hovered = None;
        self.store.borrow_mut().clear_hover();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Record `node` under `element`; restricted elements are refused
    pub fn register(&self, tree: &DomTree, element: NodeId, node: NodeId, meta: NodeMeta) -> bool {
        if self.helper.is_restricted(tree, element) {
            tracing::debug!("Refusing restricted element {:?}", element);
            return false;
        }
        tracing::trace!("Registering {:?} under {:?} ({} keys)", node, element, meta.keys.len());
        self.store.borrow_mut().register(element, node, meta);
        true
    }

    /// Purge every removed node, and every removed element with all it owns
    pub fn cleanup_removed_nodes(&mut self, removed: &HashSet<NodeId>) {
        let mut store = self.store.borrow_mut();
        for &node in removed {
            store.remove_node(node);
            store.remove_element(node);
        }
        if self.hovered.is_some_and(|el| removed.contains(&el)) {
            self.hovered = None;
        }
    }

    /// Drop a node whose text no longer decodes, unless it is our own write
    pub fn forget_stale(&self, node: NodeId, text: &str) -> bool {
        let mut store = self.store.borrow_mut();
        let stale = store
            .node_meta(node)
            .is_some_and(|meta| !meta.key_attribute_only && meta.new_text_content != text);
        if stale {
            tracing::trace!("Node {:?} lost its keys", node);
            store.remove_node(node);
        }
        stale
    }

    /// Move a registered node that was re-inserted elsewhere to its new owner
    pub fn reanchor(&self, tree: &DomTree, node: NodeId) {
        let owner = self.store.borrow().owner_of(node);
        let Some(owner) = owner else {
            return;
        };
        match self.helper.get_suitable_parent(tree, node) {
            Ok(parent) if parent == owner => {}
            Ok(parent) => {
                let meta = self.store.borrow_mut().remove_node(node);
                if let Some(meta) = meta {
                    self.register(tree, parent, node, meta);
                }
            }
            Err(_) => {
                self.store.borrow_mut().remove_node(node);
            }
        }
    }

    /// Forget everything that is no longer inside `target`
    pub fn retain_connected(&self, tree: &DomTree, target: NodeId) {
        let mut store = self.store.borrow_mut();
        for node in store.nodes() {
            if !tree.contains(target, node) {
                store.remove_node(node);
            }
        }
    }

    pub fn unregister(&self, node: NodeId) -> bool {
        self.store.borrow_mut().remove_node(node).is_some()
    }

    pub fn for_each_element(&self, mut callback: impl FnMut(&ElementMeta)) {
        for meta in self.store.borrow().find_all(None, None) {
            callback(meta);
        }
    }

    /// Snapshot of matching elements
    pub fn find_all(&self, key: Option<&str>, ns: Option<&str>) -> Vec<ElementMeta> {
        self.store.borrow().find_all(key, ns).into_iter().cloned().collect()
    }

    /// Tag every matching element with a fresh token
    pub fn highlight(&self, key: Option<&str>, ns: Option<&str>) -> (u64, Vec<NodeId>) {
        let mut store = self.store.borrow_mut();
        let token = store.next_token();
        let elements: Vec<NodeId> = store.find_all(key, ns).iter().map(|meta| meta.element).collect();
        for &element in &elements {
            if let Some(meta) = store.get_mut(element) {
                meta.highlights.insert(token);
            }
        }
        (token, elements)
    }

    fn armed(&self) -> bool {
        self.running
            && self.mouse_highlight
            && self.helper.options().highlight_keys.iter().all(|k| self.held.contains(k))
    }

    /// Nearest registered inclusive ancestor
    fn registered_ancestor(&self, tree: &DomTree, node: NodeId) -> Option<NodeId> {
        let store = self.store.borrow();
        tree.inclusive_ancestors(node)
            .into_iter()
            .find(|&n| store.contains_element(n))
    }

    fn refresh_hover(&mut self, tree: &DomTree) {
        let target = if self.armed() {
            self.pointer.and_then(|node| self.registered_ancestor(tree, node))
        } else {
            None
        };
        if target == self.hovered {
            return;
        }

        let mut store = self.store.borrow_mut();
        if let Some(meta) = self.hovered.and_then(|el| store.get_mut(el)) {
            meta.hovered = false;
        }
        if let Some(meta) = target.and_then(|el| store.get_mut(el)) {
            meta.hovered = true;
        }
        self.hovered = target;
    }

    /// Feed one input event; `true` when the event was consumed
    pub fn handle_pointer_event(&mut self, tree: &DomTree, event: PointerEvent) -> bool {
        if !self.running || !self.mouse_highlight {
            return false;
        }

        match event {
            PointerEvent::KeyDown(key) => {
                self.held.insert(key);
            }
            PointerEvent::KeyUp(key) => {
                self.held.remove(&key);
            }
            PointerEvent::Over(node) => self.pointer = Some(node),
            PointerEvent::Out(node) => {
                if self.pointer == Some(node) {
                    self.pointer = None;
                }
            }
            PointerEvent::Click(node) => return self.click(tree, node),
        }
        self.refresh_hover(tree);
        false
    }

    fn click(&self, tree: &DomTree, node: NodeId) -> bool {
        if !self.armed() {
            return false;
        }
        let Some(element) = self.registered_ancestor(tree, node) else {
            return false;
        };
        let Some(callback) = &self.on_click else {
            return false;
        };

        let keys = match self.store.borrow().get(element) {
            Some(meta) => meta.keys().into_iter().cloned().collect(),
            None => return false,
        };
        callback(&TranslationClick { element, keys });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ObserverOptions;
    use crate::RESTRICT_ATTRIBUTE;

    struct Fixture {
        tree: DomTree,
        div: NodeId,
        span: NodeId,
        text: NodeId,
        store: Rc<RefCell<ElementStore>>,
    }

    fn fixture() -> Fixture {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let span = tree.create_element("span");
        let text = tree.create_text("Hello");
        tree.append_child(NodeId::ROOT, div).unwrap();
        tree.append_child(div, span).unwrap();
        tree.append_child(span, text).unwrap();
        Fixture {
            tree,
            div,
            span,
            text,
            store: Rc::new(RefCell::new(ElementStore::new())),
        }
    }

    fn registry(f: &Fixture, on_click: Option<ClickCallback>) -> ElementRegistry {
        let helper = DomHelper::new(Rc::new(ObserverOptions::default()));
        ElementRegistry::new(f.store.clone(), helper, on_click)
    }

    fn meta(key: &str, written: &str) -> NodeMeta {
        NodeMeta {
            old_text_content: String::new(),
            new_text_content: written.to_string(),
            keys: vec![WrappedKey::new(key)],
            key_attribute_only: false,
        }
    }

    #[test]
    fn test_register_refuses_restricted() {
        let mut f = fixture();
        f.tree.set_attribute(f.div, RESTRICT_ATTRIBUTE, "").unwrap();
        let registry = registry(&f, None);
        assert!(!registry.register(&f.tree, f.span, f.text, meta("a", "Hello")));
        assert!(f.store.borrow().is_empty());
    }

    #[test]
    fn test_cleanup_and_stale() {
        let f = fixture();
        let mut registry = registry(&f, None);
        assert!(registry.register(&f.tree, f.span, f.text, meta("a", "Hello")));

        // our own write-back is not stale
        assert!(!registry.forget_stale(f.text, "Hello"));
        assert!(registry.forget_stale(f.text, "Replaced"));
        assert!(registry.find_all(None, None).is_empty());

        registry.register(&f.tree, f.span, f.text, meta("a", "Hello"));
        registry.cleanup_removed_nodes(&HashSet::from([f.span, f.text]));
        assert!(f.store.borrow().is_empty());
    }

    #[test]
    fn test_highlight_tokens() {
        let f = fixture();
        let registry = registry(&f, None);
        registry.register(&f.tree, f.span, f.text, meta("a", "Hello"));

        let (first, elements) = registry.highlight(Some("a"), None);
        let (second, _) = registry.highlight(None, None);
        assert_ne!(first, second);
        assert_eq!(elements, vec![f.span]);
        assert_eq!(f.store.borrow().get(f.span).unwrap().highlights.len(), 2);
    }

    #[test]
    fn test_hover_needs_modifier() {
        let f = fixture();
        let mut registry = registry(&f, None);
        registry.register(&f.tree, f.span, f.text, meta("a", "Hello"));
        registry.run(true);

        registry.handle_pointer_event(&f.tree, PointerEvent::Over(f.text));
        assert!(!f.store.borrow().get(f.span).unwrap().is_hovered());

        registry.handle_pointer_event(&f.tree, PointerEvent::KeyDown(ModifierKey::Alt));
        assert!(f.store.borrow().get(f.span).unwrap().is_hovered());

        registry.handle_pointer_event(&f.tree, PointerEvent::KeyUp(ModifierKey::Alt));
        assert!(!f.store.borrow().get(f.span).unwrap().is_highlighted());
    }

    #[test]
    fn test_click_reports_keys() {
        let f = fixture();
        let clicks: Rc<RefCell<Vec<TranslationClick>>> = Rc::default();
        let sink = clicks.clone();
        let callback: ClickCallback = Rc::new(move |click| sink.borrow_mut().push(click.clone()));
        let mut registry = registry(&f, Some(callback));
        registry.register(&f.tree, f.span, f.text, meta("a", "Hello"));

        // idle registry ignores everything
        assert!(!registry.handle_pointer_event(&f.tree, PointerEvent::Click(f.text)));

        registry.run(true);
        assert!(!registry.handle_pointer_event(&f.tree, PointerEvent::Click(f.text)));
        registry.handle_pointer_event(&f.tree, PointerEvent::KeyDown(ModifierKey::Alt));
        assert!(registry.handle_pointer_event(&f.tree, PointerEvent::Click(f.text)));
        assert!(!registry.handle_pointer_event(&f.tree, PointerEvent::Click(f.div)));

        let clicks = clicks.borrow();
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].element, f.span);
        assert_eq!(clicks[0].keys, vec![WrappedKey::new("a")]);
    }

    #[test]
    fn test_stop_clears_hover() {
        let f = fixture();
        let mut registry = registry(&f, None);
        registry.register(&f.tree, f.span, f.text, meta("a", "Hello"));
        registry.run(true);
        registry.handle_pointer_event(&f.tree, PointerEvent::KeyDown(ModifierKey::Alt));
        registry.handle_pointer_event(&f.tree, PointerEvent::Over(f.span));
        assert!(f.store.borrow().get(f.span).unwrap().is_hovered());

        registry.stop();
        assert!(!registry.is_running());
        assert!(!f.store.borrow().get(f.span).unwrap().is_hovered());
        assert!(!registry.handle_pointer_event(&f.tree, PointerEvent::Click(f.span)));
    }

    #[test]
    fn test_retain_connected() {
        let mut f = fixture();
        let registry = registry(&f, None);
        registry.register(&f.tree, f.span, f.text, meta("a", "Hello"));
        let loose = f.tree.create_text("loose");
        registry.register(&f.tree, f.div, loose, meta("b", "loose"));

        registry.retain_connected(&f.tree, f.div);
        assert_eq!(f.store.borrow().nodes(), vec![f.text]);

        f.tree.remove(f.span).unwrap();
        registry.retain_connected(&f.tree, f.div);
        assert!(f.store.borrow().is_empty());
    }
}
