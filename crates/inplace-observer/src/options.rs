//! Observer configuration

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use inplace_dom::{DomTree, NodeId};
use serde::{Deserialize, Deserializer};

use crate::error::ObserverError;
use crate::wrapper::{InvisibleWrapper, TextWrapper, Wrapper};

/// Keyboard modifier that arms the mouse highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ModifierKey {
    Alt,
    Control,
    Shift,
    Meta,
}

/// Which codec the observer decodes with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapperKind {
    /// Zero-width characters appended to the translation
    #[default]
    Invisible,
    /// Readable `%-%fos:...%-%` references
    Text,
}

impl WrapperKind {
    pub fn build(self) -> Box<dyn Wrapper> {
        match self {
            WrapperKind::Invisible => Box::new(InvisibleWrapper::new()),
            WrapperKind::Text => Box::new(TextWrapper::new()),
        }
    }
}

type ParentPredicate = Rc<dyn Fn(&DomTree, NodeId) -> bool>;

/// Elements that hand their registration up to their parent element
#[derive(Clone)]
pub enum PassToParent {
    /// Tag names, compared case-insensitively
    Tags(Vec<String>),
    /// Custom test on the candidate element
    Predicate(ParentPredicate),
}

impl PassToParent {
    pub fn predicate(f: impl Fn(&DomTree, NodeId) -> bool + 'static) -> Self {
        PassToParent::Predicate(Rc::new(f))
    }

    pub fn matches(&self, tree: &DomTree, element: NodeId) -> bool {
        match self {
            PassToParent::Tags(tags) => tree
                .tag_name(element)
                .is_some_and(|tag| tags.iter().any(|t| t.eq_ignore_ascii_case(tag))),
            PassToParent::Predicate(f) => f(tree, element),
        }
    }
}

impl Default for PassToParent {
    fn default() -> Self {
        PassToParent::Tags(vec!["option".to_string(), "optgroup".to_string()])
    }
}

impl fmt::Debug for PassToParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassToParent::Tags(tags) => f.debug_tuple("Tags").field(tags).finish(),
            PassToParent::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for PassToParent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<String>::deserialize(deserializer).map(PassToParent::Tags)
    }
}

/// Observer configuration
///
/// Every field is optional in JSON; missing ones take the defaults below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObserverOptions {
    /// Root of the watch (default: body, else the document element)
    #[serde(skip)]
    pub target_element: Option<NodeId>,

    /// Tags whose subtree is never scanned
    pub restricted_elements: Vec<String>,

    /// Attributes scanned per tag; `*` applies to every element
    pub tag_attributes: HashMap<String, Vec<String>>,

    pub pass_to_parent: PassToParent,

    /// Modifiers that must all be held for the mouse highlight
    pub highlight_keys: Vec<ModifierKey>,

    pub wrapper: WrapperKind,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        let tag_attributes = [
            ("textarea", vec!["placeholder"]),
            ("input", vec!["value", "placeholder"]),
            ("img", vec!["alt"]),
            ("*", vec!["aria-label", "title"]),
        ]
        .into_iter()
        .map(|(tag, attrs)| (tag.to_string(), attrs.into_iter().map(String::from).collect()))
        .collect();

        Self {
            target_element: None,
            restricted_elements: vec!["script".to_string(), "style".to_string()],
            tag_attributes,
            pass_to_parent: PassToParent::default(),
            highlight_keys: vec![ModifierKey::Alt],
            wrapper: WrapperKind::default(),
        }
    }
}

impl ObserverOptions {
    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, ObserverError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target_element = Some(target);
        self
    }

    pub fn is_restricted_tag(&self, tag: &str) -> bool {
        self.restricted_elements.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Whether `attribute` on a `tag` element is scanned
    pub fn is_allowed_attribute(&self, tag: &str, attribute: &str) -> bool {
        self.tag_attributes
            .iter()
            .filter(|(t, _)| t.as_str() == "*" || t.eq_ignore_ascii_case(tag))
            .flat_map(|(_, attrs)| attrs)
            .any(|a| a.eq_ignore_ascii_case(attribute))
    }
}
