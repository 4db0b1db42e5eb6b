//! In-memory stand-in for a host page's live document: an arena tree with
//! attributes, click dispatch, batched child-list mutation records and a
//! small CSS selector engine.

mod document;
pub mod selector;

pub use document::{
    ClickHandler, Document, SharedDocument, MAX_NODES, MUTATION_CHANNEL_CAPACITY,
};
pub use selector::{Selector, SelectorError};
pub use shared::{
    domain::{NodeId, NodeKind},
    error::DomError,
    protocol::{MutationBatch, MutationRecord, NodeRef},
};
