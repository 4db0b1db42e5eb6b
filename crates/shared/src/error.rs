use thiserror::Error;

use crate::domain::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
    #[error("node {0} cannot have children")]
    NotAContainer(NodeId),
    #[error("inserting {child} under {parent} would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    #[error("reference node {reference} is not a child of {parent}")]
    NotAChild { parent: NodeId, reference: NodeId },
    #[error("document already holds its limit of {limit} nodes")]
    NodeLimit { limit: usize },
}
