//! Wraps one accepted message element in place.
//!
//! ```text
//! div.message-collapser-wrapper
//! ├── button.message-collapser-toggle[aria-expanded]
//! ├── div.message-collapser-line
//! └── div.message-collapser-body
//!     ├── div.message-collapser-preview
//!     └── div.message-collapser-content
//!         └── <original element, moved here>
//! ```

use std::iter;

use dom::{Document, DomError};
use shared::domain::{CollapseState, NodeId, RoleHints};
use tracing::{debug, trace};

use crate::{
    heuristics::Heuristics,
    toggle,
    wrapper::{
        self, WrapperParts, ASSISTANT_CLASS, BODY_CLASS, CONTENT_CLASS, ICON_CLASS, LINE_CLASS,
        PREVIEW_CLASS, PREVIEW_ELLIPSIS, TOGGLE_CLASS, TOGGLE_ICON, USER_CLASS, WRAPPER_CLASS,
    },
};

const AUTHOR_ROLE_ATTRIBUTE: &str = "data-message-author-role";

/// Returns the new wrapper, or `None` when there was nothing to do: the
/// element left the document, is already wrapped, or already contains a
/// wrapper.
pub fn augment(doc: &mut Document, element: NodeId, heuristics: &Heuristics) -> Option<NodeId> {
    if !doc.is_connected(element) {
        debug!(node = %element, "candidate left the document before augmentation");
        return None;
    }
    let parent = doc.parent(element)?;
    if wrapper::is_wrapped(doc, element) {
        trace!(node = %element, "candidate already inside a wrapper");
        return None;
    }
    if wrapper::contains_wrapper(doc, element) {
        debug!(node = %element, "candidate encloses an existing wrapper; not nesting");
        return None;
    }

    let roles = detect_roles(doc, element, heuristics);
    let preview = preview_text(doc, element, roles, heuristics);

    match build_and_insert(doc, parent, element, roles, &preview) {
        Ok(parts) => {
            debug!(
                node = %element,
                wrapper = %parts.wrapper,
                user = roles.user,
                assistant = roles.assistant,
                preview_chars = preview.chars().count(),
                "message wrapped"
            );
            Some(parts.wrapper)
        }
        Err(err) => {
            debug!(node = %element, error = %err, "augmentation skipped");
            None
        }
    }
}

fn build_and_insert(
    doc: &mut Document,
    parent: NodeId,
    element: NodeId,
    roles: RoleHints,
    preview: &str,
) -> Result<WrapperParts, DomError> {
    let wrapper = doc.create_element("div")?;
    doc.add_class(wrapper, WRAPPER_CLASS)?;
    if roles.user {
        doc.add_class(wrapper, USER_CLASS)?;
    }
    if roles.assistant {
        doc.add_class(wrapper, ASSISTANT_CLASS)?;
    }

    let toggle_control = doc.create_element("button")?;
    doc.set_attribute(toggle_control, "type", "button")?;
    doc.set_attribute(toggle_control, "class", TOGGLE_CLASS)?;
    doc.set_attribute(
        toggle_control,
        "aria-expanded",
        CollapseState::Expanded.aria_expanded(),
    )?;
    doc.set_attribute(toggle_control, "aria-label", "Toggle message")?;
    let icon = doc.create_element("span")?;
    doc.set_attribute(icon, "class", ICON_CLASS)?;
    doc.set_text_content(icon, TOGGLE_ICON)?;
    doc.append_child(toggle_control, icon)?;

    let line = doc.create_element("div")?;
    doc.set_attribute(line, "class", LINE_CLASS)?;

    let body = doc.create_element("div")?;
    doc.set_attribute(body, "class", BODY_CLASS)?;
    let preview_node = doc.create_element("div")?;
    doc.set_attribute(preview_node, "class", PREVIEW_CLASS)?;
    doc.set_text_content(preview_node, preview)?;
    let content = doc.create_element("div")?;
    doc.set_attribute(content, "class", CONTENT_CLASS)?;
    doc.append_child(body, preview_node)?;
    doc.append_child(body, content)?;

    doc.append_child(wrapper, toggle_control)?;
    doc.append_child(wrapper, line)?;
    doc.append_child(wrapper, body)?;

    let parts = WrapperParts {
        wrapper,
        toggle: toggle_control,
        line,
        body,
        preview: preview_node,
        content,
    };
    toggle::wire_controls(doc, &parts)?;

    doc.insert_before(parent, wrapper, Some(element))?;
    if let Err(err) = doc.append_child(content, element) {
        // Never leave an empty wrapper behind.
        let _ = doc.remove(wrapper);
        return Err(err);
    }
    Ok(parts)
}

/// Speaker hints from the element's own classes and author-role attribute,
/// then those of its ancestors up to (not including) `body`.
pub fn detect_roles(doc: &Document, element: NodeId, heuristics: &Heuristics) -> RoleHints {
    let mut roles = RoleHints::default();
    for node in iter::once(element).chain(doc.ancestors(element)) {
        match doc.tag(node) {
            None | Some("body") | Some("html") => break,
            Some(_) => {}
        }
        let class = doc
            .attribute(node, "class")
            .unwrap_or_default()
            .to_ascii_lowercase();
        let author = doc
            .attribute(node, AUTHOR_ROLE_ATTRIBUTE)
            .unwrap_or_default()
            .to_ascii_lowercase();
        roles.user |= has_marker(&class, &author, &heuristics.user_markers);
        roles.assistant |= has_marker(&class, &author, &heuristics.assistant_markers);
    }
    roles
}

fn has_marker(class: &str, author: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|marker| class.contains(marker.as_str()) || author.contains(marker.as_str()))
}

/// User messages preview their own text; anything else previews the first
/// response-content sub-element, or nothing when there is none.
pub fn preview_text(
    doc: &Document,
    element: NodeId,
    roles: RoleHints,
    heuristics: &Heuristics,
) -> String {
    let source = if roles.is_user() {
        doc.text_content(element)
    } else {
        heuristics
            .response_content
            .as_ref()
            .and_then(|selector| doc.query_first(element, selector))
            .map(|node| doc.text_content(node))
            .unwrap_or_default()
    };
    truncate_preview(source.trim(), heuristics.preview_max_chars)
}

pub fn truncate_preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{PREVIEW_ELLIPSIS}", &text[..cut]),
        None => text.to_owned(),
    }
}

#[cfg(test)]
#[path = "tests/augment_tests.rs"]
mod tests;
