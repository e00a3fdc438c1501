//! Translation wrappers
//!
//! A wrapper embeds the key a translation came from into the rendered
//! string, and recovers it again once the string shows up in the DOM.
//! Decoding never fails: anything that does not parse as a reference is
//! left in the text as written.

mod invisible;
mod text;

pub use invisible::InvisibleWrapper;
pub use text::TextWrapper;

use crate::helpers::KeyDescriptor;

/// One key reference recovered from a wrapped string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WrappedKey {
    pub key: String,
    pub ns: Option<String>,
    /// Untranslated text the key was rendered with, if any
    pub default_value: Option<String>,
}

impl WrappedKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ns: None,
            default_value: None,
        }
    }

    pub fn with_ns(mut self, ns: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self
    }

    /// Key and namespace only
    pub fn descriptor(&self) -> KeyDescriptor {
        KeyDescriptor {
            key: self.key.clone(),
            ns: self.ns.clone(),
        }
    }
}

/// Decoded string: plain text plus every reference found, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unwrapped {
    pub text: String,
    pub keys: Vec<WrappedKey>,
}

/// Input of [`Wrapper::wrap`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrapProps {
    pub key: String,
    pub ns: Option<String>,
    pub default_value: Option<String>,
    pub translation: Option<String>,
}

impl WrapProps {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn ns(mut self, ns: impl Into<String>) -> Self {
        self.ns = Some(ns.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = Some(translation.into());
        self
    }

    pub(crate) fn to_key(&self) -> WrappedKey {
        WrappedKey {
            key: self.key.clone(),
            ns: self.ns.clone().filter(|ns| !ns.is_empty()),
            default_value: self.default_value.clone().filter(|d| !d.is_empty()),
        }
    }
}

/// Encoder/decoder pair the observer is configured with
pub trait Wrapper {
    /// Embed the key metadata into the translation text
    fn wrap(&self, props: &WrapProps) -> String;

    /// Decode `text`; `None` when it holds no reference at all
    fn unwrap(&self, text: &str) -> Option<Unwrapped>;

    /// Cheap check whether `text` may hold a reference
    fn test_text(&self, text: &str) -> bool {
        self.unwrap(text).is_some()
    }
}

impl<W: Wrapper + ?Sized> Wrapper for Box<W> {
    fn wrap(&self, props: &WrapProps) -> String {
        (**self).wrap(props)
    }

    fn unwrap(&self, text: &str) -> Option<Unwrapped> {
        (**self).unwrap(text)
    }

    fn test_text(&self, text: &str) -> bool {
        (**self).test_text(text)
    }
}
