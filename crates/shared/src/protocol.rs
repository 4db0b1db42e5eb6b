//! Child-list mutation records delivered from a document to its observers.

use serde::{Deserialize, Serialize};

use crate::domain::{NodeId, NodeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl NodeRef {
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_nodes: Vec<NodeRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_nodes: Vec<NodeRef>,
}

impl MutationRecord {
    pub fn added(target: NodeId, node: NodeRef) -> Self {
        Self {
            target,
            added_nodes: vec![node],
            removed_nodes: Vec::new(),
        }
    }

    pub fn removed(target: NodeId, node: NodeRef) -> Self {
        Self {
            target,
            added_nodes: Vec::new(),
            removed_nodes: vec![node],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationBatch {
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    pub fn new(records: Vec<MutationRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True when at least one record inserted an element node. Text-only
    /// insertions and removals never qualify.
    pub fn adds_elements(&self) -> bool {
        self.records
            .iter()
            .flat_map(|record| record.added_nodes.iter())
            .any(NodeRef::is_element)
    }

    pub fn added_element_count(&self) -> usize {
        self.records
            .iter()
            .flat_map(|record| record.added_nodes.iter())
            .filter(|node| node.is_element())
            .count()
    }
}
