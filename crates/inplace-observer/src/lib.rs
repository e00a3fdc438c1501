//! inplace Observer
//!
//! Keeps a live index between wrapped translations rendered into a DOM tree
//! and the keys that produced them.
//!
//! # Pipeline
//! - the observer watches a root element for mutations
//! - the node handler picks the text and attribute nodes worth scanning
//! - the wrapper decodes them into plain text plus key references
//! - the element registry records which element shows which keys
//!
//! # Example
//! ```rust,ignore
//! use inplace_observer::{Observer, RunProps};
//!
//! let mut observer = Observer::new();
//! observer.run(Some(&mut document), RunProps::default())?;
//! // ... page mutates ...
//! observer.flush(&mut document);
//! let positions = observer.find_positions(&document, Some("greet"), None);
//! ```

mod element_registry;
mod element_store;
mod error;
mod helpers;
mod node_handler;
mod observer;
mod options;
pub mod wrapper;

pub use element_registry::{ClickCallback, ElementRegistry, PointerEvent, TranslationClick};
pub use element_store::{ElementMeta, ElementStore, NodeMeta};
pub use error::ObserverError;
pub use helpers::{compare_descriptors, get_node_text, set_node_text, DomHelper, KeyDescriptor};
pub use node_handler::NodeHandler;
pub use observer::{Highlight, KeyPosition, MutationBatch, Observer, RunProps};
pub use options::{ModifierKey, ObserverOptions, PassToParent, WrapperKind};
pub use wrapper::{InvisibleWrapper, TextWrapper, Unwrapped, WrapProps, WrappedKey, Wrapper};

/// Marks an element whose key is given literally by the attribute value
pub const KEY_ONLY_ATTRIBUTE: &str = "data-inplace-key-only";

/// Excludes an element and its subtree from scanning
pub const RESTRICT_ATTRIBUTE: &str = "data-inplace-restricted";

/// Namespace an absent namespace stands for
pub const DEFAULT_NAMESPACE: &str = "";
