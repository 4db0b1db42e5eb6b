//! Markup owned by the engine and lookups over it. The document is the only
//! record of what has been wrapped; nothing here keeps a side table.

use std::iter;

use dom::Document;
use serde::Serialize;
use shared::domain::{CollapseState, NodeId, RoleHints};

use crate::toggle;

pub const WRAPPER_CLASS: &str = "message-collapser-wrapper";
pub const TOGGLE_CLASS: &str = "message-collapser-toggle";
pub const ICON_CLASS: &str = "message-collapser-icon";
pub const LINE_CLASS: &str = "message-collapser-line";
pub const BODY_CLASS: &str = "message-collapser-body";
pub const PREVIEW_CLASS: &str = "message-collapser-preview";
pub const CONTENT_CLASS: &str = "message-collapser-content";
pub const USER_CLASS: &str = "message-collapser-user";
pub const ASSISTANT_CLASS: &str = "message-collapser-assistant";
pub const COLLAPSED_CLASS: &str = "collapsed";
pub const TOGGLE_ICON: &str = "\u{25BC}";
pub const PREVIEW_ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapperParts {
    pub wrapper: NodeId,
    pub toggle: NodeId,
    pub line: NodeId,
    pub body: NodeId,
    pub preview: NodeId,
    pub content: NodeId,
}

impl WrapperParts {
    pub fn locate(doc: &Document, wrapper: NodeId) -> Option<Self> {
        if !doc.has_class(wrapper, WRAPPER_CLASS) {
            return None;
        }
        let child_with = |parent: NodeId, class: &str| {
            doc.children(parent)
                .iter()
                .copied()
                .find(|child| doc.has_class(*child, class))
        };
        let body = child_with(wrapper, BODY_CLASS)?;
        Some(Self {
            wrapper,
            toggle: child_with(wrapper, TOGGLE_CLASS)?,
            line: child_with(wrapper, LINE_CLASS)?,
            body,
            preview: child_with(body, PREVIEW_CLASS)?,
            content: child_with(body, CONTENT_CLASS)?,
        })
    }

    /// The relocated host element. `None` once the host has pulled it out.
    pub fn original(&self, doc: &Document) -> Option<NodeId> {
        doc.children(self.content)
            .iter()
            .copied()
            .find(|child| doc.is_element(*child))
    }
}

/// True when `node` is a wrapper or sits anywhere inside one.
pub fn is_wrapped(doc: &Document, node: NodeId) -> bool {
    enclosing_wrapper(doc, node).is_some()
}

pub fn enclosing_wrapper(doc: &Document, node: NodeId) -> Option<NodeId> {
    iter::once(node)
        .chain(doc.ancestors(node))
        .find(|candidate| doc.has_class(*candidate, WRAPPER_CLASS))
}

pub fn contains_wrapper(doc: &Document, node: NodeId) -> bool {
    doc.descendants(node)
        .any(|descendant| doc.has_class(descendant, WRAPPER_CLASS))
}

/// Connected wrappers in document order.
pub fn wrappers(doc: &Document) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .filter(|node| doc.has_class(*node, WRAPPER_CLASS))
        .collect()
}

pub fn roles(doc: &Document, wrapper: NodeId) -> RoleHints {
    RoleHints {
        user: doc.has_class(wrapper, USER_CLASS),
        assistant: doc.has_class(wrapper, ASSISTANT_CLASS),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrapperSummary {
    pub wrapper: NodeId,
    pub original: Option<NodeId>,
    pub roles: RoleHints,
    pub state: CollapseState,
    pub consistent: bool,
    pub preview: String,
}

pub fn summaries(doc: &Document) -> Vec<WrapperSummary> {
    wrappers(doc)
        .into_iter()
        .filter_map(|wrapper| {
            let parts = WrapperParts::locate(doc, wrapper)?;
            Some(WrapperSummary {
                wrapper,
                original: parts.original(doc),
                roles: roles(doc, wrapper),
                state: toggle::state(doc, wrapper)?,
                consistent: toggle::is_consistent(doc, wrapper),
                preview: doc.text_content(parts.preview),
            })
        })
        .collect()
}
