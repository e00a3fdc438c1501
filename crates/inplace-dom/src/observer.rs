//! Mutation Observer API
//!
//! Tree operations queue `MutationRecord`s on every interested observer.
//! Nothing is delivered eagerly: the host drains an observer with
//! `take_records`, which plays the role of the microtask checkpoint.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::NodeId;

/// Mutation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    /// Parent for childList, element for attributes, the node for characterData
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    /// Detached children for childList; the detached attribute node when an
    /// attribute is removed
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub(crate) fn child_list(
        target: NodeId,
        added_nodes: Vec<NodeId>,
        removed_nodes: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            attribute_name: None,
            old_value: None,
        }
    }

    pub(crate) fn attributes(
        target: NodeId,
        name: &str,
        old_value: Option<String>,
        removed: Option<NodeId>,
    ) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: removed.into_iter().collect(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    pub(crate) fn character_data(target: NodeId, old_value: String) -> Self {
        Self {
            mutation_type: MutationType::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            old_value: Some(old_value),
        }
    }
}

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    /// Everything below the target, without old values
    pub fn all() -> Self {
        Self {
            child_list: true,
            attributes: true,
            character_data: true,
            subtree: true,
            ..Default::default()
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.child_list || self.attributes || self.character_data
    }
}

#[derive(Debug)]
struct Registration {
    id: u64,
    target: NodeId,
    options: MutationObserverInit,
    records: Vec<MutationRecord>,
    connected: bool,
}

impl Registration {
    fn accepts(&self, record: &MutationRecord, ancestors: &[NodeId]) -> bool {
        let matches_target = record.target == self.target
            || (self.options.subtree && ancestors.contains(&self.target));
        if !matches_target {
            return false;
        }

        match record.mutation_type {
            MutationType::ChildList => self.options.child_list,
            MutationType::CharacterData => self.options.character_data,
            MutationType::Attributes => {
                if !self.options.attributes {
                    return false;
                }
                match (&self.options.attribute_filter, &record.attribute_name) {
                    (Some(filter), Some(name)) => filter.iter().any(|f| f.eq_ignore_ascii_case(name)),
                    _ => true,
                }
            }
        }
    }

    fn push(&mut self, record: &MutationRecord) {
        let mut record = record.clone();
        let keep_old = match record.mutation_type {
            MutationType::Attributes => self.options.attribute_old_value,
            MutationType::CharacterData => self.options.character_data_old_value,
            MutationType::ChildList => false,
        };
        if !keep_old {
            record.old_value = None;
        }
        self.records.push(record);
    }
}

/// Mutation observer handle
///
/// Cloning shares the registration. Once every handle is dropped the tree
/// forgets the observer.
#[derive(Debug, Clone)]
pub struct MutationObserver {
    registration: Rc<RefCell<Registration>>,
}

impl MutationObserver {
    pub fn id(&self) -> u64 {
        self.registration.borrow().id
    }

    /// Observed root
    pub fn target(&self) -> NodeId {
        self.registration.borrow().target
    }

    /// Take pending records
    pub fn take_records(&self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.registration.borrow_mut().records)
    }

    /// Has pending records
    pub fn has_pending(&self) -> bool {
        !self.registration.borrow().records.is_empty()
    }

    /// Stop observing; pending records are dropped
    pub fn disconnect(&self) {
        let mut registration = self.registration.borrow_mut();
        registration.connected = false;
        registration.records.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.registration.borrow().connected
    }
}

/// Observers registered on a tree
#[derive(Debug, Default)]
pub(crate) struct ObserverList {
    next_id: u64,
    registrations: Vec<Weak<RefCell<Registration>>>,
}

impl ObserverList {
    pub(crate) fn register(&mut self, target: NodeId, options: MutationObserverInit) -> MutationObserver {
        self.next_id += 1;
        let registration = Rc::new(RefCell::new(Registration {
            id: self.next_id,
            target,
            options,
            records: Vec::new(),
            connected: true,
        }));
        self.registrations.push(Rc::downgrade(&registration));
        MutationObserver { registration }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Queue a record on every observer interested in it.
    ///
    /// `ancestors` are the inclusive ancestors of the record target.
    pub(crate) fn notify(&mut self, record: &MutationRecord, ancestors: &[NodeId]) {
        self.registrations.retain(|weak| {
            weak.upgrade()
                .is_some_and(|registration| registration.borrow().connected)
        });

        for weak in &self.registrations {
            if let Some(registration) = weak.upgrade() {
                let mut registration = registration.borrow_mut();
                if registration.accepts(record, ancestors) {
                    registration.push(record);
                }
            }
        }
    }
}
