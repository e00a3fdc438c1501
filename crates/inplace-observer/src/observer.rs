//! General Observer
//!
//! Scans the target subtree once, then keeps the element store in sync with
//! every mutation batch the host flushes. A batch is applied in two phases:
//! first every removed node (with its whole subtree and attributes) is
//! purged, then the touched text and attribute nodes are decoded and
//! registered again.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use inplace_dom::{
    DOMRect, Document, DomTree, MutationObserver, MutationObserverInit, MutationRecord, MutationType, NodeId,
};

use crate::element_registry::{ClickCallback, ElementRegistry, PointerEvent};
use crate::element_store::{ElementMeta, ElementStore, NodeMeta};
use crate::error::ObserverError;
use crate::helpers::{compare_descriptors, get_node_text, set_node_text, DomHelper, KeyDescriptor};
use crate::node_handler::NodeHandler;
use crate::options::ObserverOptions;
use crate::wrapper::{Unwrapped, WrapProps, WrappedKey, Wrapper};
use crate::{DEFAULT_NAMESPACE, KEY_ONLY_ATTRIBUTE};

/// Arguments of [`Observer::run`]
#[derive(Default)]
pub struct RunProps {
    /// Enable hover/click inspection
    pub mouse_highlight: bool,
    pub options: ObserverOptions,
    /// Overrides `options.wrapper`
    pub wrapper: Option<Box<dyn Wrapper>>,
    pub on_click: Option<ClickCallback>,
}

impl fmt::Debug for RunProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunProps")
            .field("mouse_highlight", &self.mouse_highlight)
            .field("options", &self.options)
            .field("wrapper", &self.wrapper.is_some())
            .field("on_click", &self.on_click.is_some())
            .finish()
    }
}

/// Where a key is rendered
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPosition {
    pub position: DOMRect,
    pub key_name: String,
    /// Empty for the default namespace
    pub key_namespace: String,
}

/// Records taken from the watch, stamped with the run that produced them
#[derive(Debug, Clone)]
pub struct MutationBatch {
    pub generation: u64,
    pub records: Vec<MutationRecord>,
}

/// Handle to one `highlight` call
#[derive(Debug)]
#[must_use = "dropping the handle leaves the elements highlighted"]
pub struct Highlight {
    store: Weak<RefCell<ElementStore>>,
    token: u64,
    elements: Vec<NodeId>,
}

impl Highlight {
    /// Elements this call highlighted
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    /// Undo exactly this highlight; others stay in place
    pub fn unhighlight(self) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let mut store = store.borrow_mut();
        for element in &self.elements {
            if let Some(meta) = store.get_mut(*element) {
                meta.highlights.remove(&self.token);
            }
        }
    }
}

/// Scanning state of a run against a document
struct Session {
    target: NodeId,
    helper: DomHelper,
    handler: NodeHandler,
    registry: ElementRegistry,
    wrapper: Rc<dyn Wrapper>,
}

impl Session {
    /// Decode nodes and register the ones holding keys
    fn handle_nodes(&self, tree: &mut DomTree, nodes: &[NodeId]) {
        for &node in nodes {
            let Some(text) = get_node_text(tree, node).map(str::to_string) else {
                continue;
            };
            let Some(Unwrapped { text: plain, keys }) = self.wrapper.unwrap(&text) else {
                self.registry.forget_stale(node, &text);
                continue;
            };

            let parent = match self.helper.get_suitable_parent(tree, node) {
                Ok(parent) => parent,
                Err(err) => {
                    tracing::error!("Skipping {:?}: {}", node, err);
                    continue;
                }
            };
            if plain != text {
                if let Err(err) = set_node_text(tree, node, &plain) {
                    tracing::error!("Cannot write decoded text to {:?}: {}", node, err);
                    continue;
                }
            }
            let meta = NodeMeta {
                old_text_content: text,
                new_text_content: plain,
                keys,
                key_attribute_only: false,
            };
            self.registry.register(tree, parent, node, meta);
        }
    }

    /// Register key-only marker attributes; an empty value unregisters
    fn handle_key_attributes(&self, tree: &DomTree, attrs: &[NodeId]) {
        for &attr in attrs {
            let key = get_node_text(tree, attr).unwrap_or_default();
            if key.is_empty() {
                self.registry.unregister(attr);
                continue;
            }
            let parent = match self.helper.get_suitable_parent(tree, attr) {
                Ok(parent) => parent,
                Err(err) => {
                    tracing::error!("Skipping {:?}: {}", attr, err);
                    continue;
                }
            };
            let meta = NodeMeta {
                old_text_content: String::new(),
                new_text_content: String::new(),
                keys: vec![WrappedKey::new(key)],
                key_attribute_only: true,
            };
            self.registry.register(tree, parent, attr, meta);
        }
    }

    fn scan(&self, tree: &mut DomTree) {
        let key_attrs = self.handler.handle_key_attribute(tree, self.target);
        self.handle_key_attributes(tree, &key_attrs);
        let nodes = self.handler.handle_child_list(tree, self.target);
        self.handle_nodes(tree, &nodes);
    }

    fn process(&mut self, tree: &mut DomTree, records: &[MutationRecord]) {
        let removed = removed_closure(tree, records);
        if !removed.is_empty() {
            // nodes re-inserted within the same batch stay registered
            let (moved, gone): (HashSet<NodeId>, HashSet<NodeId>) =
                removed.into_iter().partition(|&node| tree.contains(self.target, node));
            self.registry.cleanup_removed_nodes(&gone);
            for node in moved {
                self.registry.reanchor(tree, node);
            }
        }
        // detached from an already removed subtree before the flush: no record
        self.registry.retain_connected(tree, self.target);

        let mut key_attrs = Vec::new();
        let mut nodes = Vec::new();
        for record in records {
            match record.mutation_type {
                MutationType::CharacterData => {
                    nodes.extend(self.handler.handle_text(tree, record.target));
                }
                MutationType::ChildList => {
                    key_attrs.extend(self.handler.handle_key_attribute(tree, record.target));
                    nodes.extend(self.handler.handle_child_list(tree, record.target));
                }
                MutationType::Attributes => {
                    if record.attribute_name.as_deref() == Some(KEY_ONLY_ATTRIBUTE) {
                        key_attrs.extend(tree.attribute_node(record.target, KEY_ONLY_ATTRIBUTE));
                    }
                    nodes.extend(self.handler.handle_attributes(tree, record.target));
                }
            }
        }

        let live = |list: Vec<NodeId>| -> Vec<NodeId> {
            let mut seen = HashSet::new();
            list.into_iter()
                .filter(|&node| tree.contains(self.target, node) && seen.insert(node))
                .collect()
        };
        let key_attrs = live(key_attrs);
        let nodes = live(nodes);
        tracing::debug!(
            "Batch of {} records: {} nodes, {} key attributes",
            records.len(),
            nodes.len(),
            key_attrs.len()
        );

        self.handle_key_attributes(tree, &key_attrs);
        self.handle_nodes(tree, &nodes);
    }
}

/// Every removed node, everything below it and all their attributes
fn removed_closure(tree: &DomTree, records: &[MutationRecord]) -> HashSet<NodeId> {
    let mut removed = HashSet::new();
    let roots = records
        .iter()
        .filter(|r| matches!(r.mutation_type, MutationType::ChildList | MutationType::Attributes))
        .flat_map(|r| r.removed_nodes.iter().copied());

    for root in roots {
        for node in std::iter::once(root).chain(tree.descendants(root)) {
            removed.insert(node);
            removed.extend(tree.attributes(node).iter().copied());
        }
    }
    removed
}

struct Watch {
    observer: MutationObserver,
    session: Session,
}

struct RunningInstance {
    generation: u64,
    wrapper: Rc<dyn Wrapper>,
    /// `None` for a run without a document
    watch: Option<Watch>,
}

/// Observer over one document
///
/// Owns its element store exclusively; highlight handles only keep a weak
/// reference to it.
pub struct Observer {
    store: Rc<RefCell<ElementStore>>,
    generation: u64,
    observing: bool,
    instance: Option<RunningInstance>,
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("generation", &self.generation)
            .field("observing", &self.observing)
            .field("running", &self.instance.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer {
    pub fn new() -> Self {
        Self {
            store: Rc::new(RefCell::new(ElementStore::new())),
            generation: 0,
            observing: false,
            instance: None,
        }
    }

    /// Start observing
    ///
    /// A previous run is stopped first. Without a document the observer only
    /// offers the codec.
    pub fn run(&mut self, document: Option<&mut Document>, props: RunProps) -> Result<(), ObserverError> {
        self.stop();
        self.generation += 1;

        let RunProps {
            mouse_highlight,
            options,
            wrapper,
            on_click,
        } = props;
        let wrapper: Rc<dyn Wrapper> = Rc::from(wrapper.unwrap_or_else(|| options.wrapper.build()));

        let Some(document) = document else {
            tracing::debug!("No document, observer runs inert");
            self.instance = Some(RunningInstance {
                generation: self.generation,
                wrapper,
                watch: None,
            });
            return Ok(());
        };

        let target = options
            .target_element
            .or_else(|| document.body())
            .or_else(|| document.document_element())
            .unwrap_or_else(|| document.tree().root());
        if !document.tree().is_element(target) {
            return Err(ObserverError::InvalidTarget(target));
        }

        let options = Rc::new(options);
        let helper = DomHelper::new(options);
        let handler = NodeHandler::new(helper.clone(), wrapper.clone(), self.store.clone());
        let mut registry = ElementRegistry::new(self.store.clone(), helper.clone(), on_click);
        registry.retain_connected(document.tree(), target);
        registry.run(mouse_highlight);

        let session = Session {
            target,
            helper,
            handler,
            registry,
            wrapper: wrapper.clone(),
        };
        let tree = document.tree_mut();
        session.scan(tree);
        let observer = tree.observe(target, MutationObserverInit::all())?;

        tracing::debug!(
            "Observing {:?} (generation {}), {} elements after initial scan",
            target,
            self.generation,
            self.store.borrow().len()
        );
        self.observing = true;
        self.instance = Some(RunningInstance {
            generation: self.generation,
            wrapper,
            watch: Some(Watch { observer, session }),
        });
        Ok(())
    }

    /// Stop observing; safe to call repeatedly
    pub fn stop(&mut self) {
        self.observing = false;
        if let Some(instance) = self.instance.take() {
            if let Some(mut watch) = instance.watch {
                watch.observer.disconnect();
                watch.session.registry.stop();
            }
            tracing::debug!("Observer stopped (generation {})", instance.generation);
        }
    }

    pub fn is_running(&self) -> bool {
        self.instance.is_some()
    }

    /// Take the records queued since the last call
    pub fn take_batch(&self) -> Option<MutationBatch> {
        let instance = self.instance.as_ref()?;
        let records = instance.watch.as_ref()?.observer.take_records();
        if records.is_empty() {
            return None;
        }
        Some(MutationBatch {
            generation: instance.generation,
            records,
        })
    }

    /// Apply a batch; batches from a stopped or replaced run are ignored
    pub fn process(&mut self, document: &mut Document, batch: MutationBatch) {
        if !self.observing {
            tracing::warn!("Ignoring batch of {} records: not observing", batch.records.len());
            return;
        }
        let Some(instance) = self.instance.as_mut() else {
            return;
        };
        if instance.generation != batch.generation {
            tracing::warn!(
                "Ignoring batch from generation {} (current {})",
                batch.generation,
                instance.generation
            );
            return;
        }
        if let Some(watch) = instance.watch.as_mut() {
            watch.session.process(document.tree_mut(), &batch.records);
        }
    }

    /// Take and apply pending records; returns how many were applied
    pub fn flush(&mut self, document: &mut Document) -> usize {
        let Some(batch) = self.take_batch() else {
            return 0;
        };
        let count = batch.records.len();
        self.process(document, batch);
        count
    }

    fn registry(&self) -> Option<&ElementRegistry> {
        Some(&self.instance.as_ref()?.watch.as_ref()?.session.registry)
    }

    pub fn for_each_element(&self, callback: impl FnMut(&ElementMeta)) {
        if let Some(registry) = self.registry() {
            registry.for_each_element(callback);
        }
    }

    /// Matching registered elements, by element handle
    pub fn find_all(&self, key: Option<&str>, ns: Option<&str>) -> Vec<ElementMeta> {
        self.registry()
            .map(|registry| registry.find_all(key, ns))
            .unwrap_or_default()
    }

    /// Highlight every element showing `key`, or all of them
    pub fn highlight(&self, key: Option<&str>, ns: Option<&str>) -> Highlight {
        let (token, elements) = match self.registry() {
            Some(registry) => registry.highlight(key, ns),
            None => (0, Vec::new()),
        };
        Highlight {
            store: Rc::downgrade(&self.store),
            token,
            elements,
        }
    }

    /// Boxes of the elements showing `key`, in document order
    ///
    /// Without a key this lists every key of every element, not nothing.
    pub fn find_positions(&self, document: &Document, key: Option<&str>, ns: Option<&str>) -> Vec<KeyPosition> {
        let tree = document.tree();
        let mut elements = self.find_all(key, ns);
        elements.sort_by(|a, b| tree.document_order(a.element, b.element));

        let wanted = key.map(|key| KeyDescriptor::new(key, ns));
        let mut positions = Vec::new();
        for meta in &elements {
            let position = tree.bounding_client_rect(meta.element);
            for found in meta.nodes.values().flat_map(|node| &node.keys) {
                let matches = wanted
                    .as_ref()
                    .is_none_or(|wanted| compare_descriptors(wanted, &found.descriptor()));
                if matches {
                    positions.push(KeyPosition {
                        position,
                        key_name: found.key.clone(),
                        key_namespace: found.ns.clone().unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
                    });
                }
            }
        }
        positions
    }

    /// Key rendered at a point: the last registered element in document
    /// order whose box contains it
    pub fn key_at_point(&self, document: &Document, x: f64, y: f64) -> Option<KeyPosition> {
        let tree = document.tree();
        let meta = self
            .find_all(None, None)
            .into_iter()
            .filter(|meta| tree.bounding_client_rect(meta.element).contains_point(x, y))
            .max_by(|a, b| tree.document_order(a.element, b.element))?;

        let key = meta.keys().first().copied().cloned()?;
        Some(KeyPosition {
            position: tree.bounding_client_rect(meta.element),
            key_name: key.key,
            key_namespace: key.ns.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        })
    }

    /// Forward an input event to the mouse highlight
    pub fn handle_pointer_event(&mut self, document: &Document, event: PointerEvent) -> bool {
        let Some(watch) = self.instance.as_mut().and_then(|i| i.watch.as_mut()) else {
            return false;
        };
        watch.session.registry.handle_pointer_event(document.tree(), event)
    }

    /// Encode with the active wrapper; plain translation when not running
    pub fn wrap(&self, props: &WrapProps) -> String {
        match &self.instance {
            Some(instance) => instance.wrapper.wrap(props),
            None => props.translation.clone().unwrap_or_default(),
        }
    }

    /// Decode with the active wrapper; the input with no keys when not
    /// running or when nothing decodes
    pub fn unwrap(&self, text: &str) -> Unwrapped {
        self.instance
            .as_ref()
            .and_then(|instance| instance.wrapper.unwrap(text))
            .unwrap_or_else(|| Unwrapped {
                text: text.to_string(),
                keys: Vec::new(),
            })
    }
}
