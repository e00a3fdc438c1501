//! DOM errors

use crate::NodeId;

/// Errors raised by tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} does not exist")]
    InvalidNode(NodeId),

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} carries no value")]
    NoValue(NodeId),

    #[error("cannot insert {child:?} into {parent:?}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("{child:?} is not a child of {parent:?}")]
    NotFound { parent: NodeId, child: NodeId },

    #[error("observer options select no mutation types")]
    InvalidObserverOptions,
}
