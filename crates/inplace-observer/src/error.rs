//! Observer errors

use inplace_dom::{DomError, NodeId};

/// Errors raised by the observer
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// A live text or attribute node without an element to anchor it
    #[error("no suitable parent found for node {0:?}")]
    NoSuitableParent(NodeId),

    #[error("target {0:?} is not an element")]
    InvalidTarget(NodeId),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("invalid observer configuration: {0}")]
    Config(#[from] serde_json::Error),
}
