//! Per-wrapper expanded/collapsed state. The state lives only in the
//! `collapsed` class on the content region and toggle control and in the
//! toggle's `aria-expanded` attribute; every transition rewrites all three
//! inside one synchronous call.

use dom::{Document, DomError};
use shared::domain::{CollapseState, NodeId};
use tracing::debug;

use crate::wrapper::{WrapperParts, COLLAPSED_CLASS};

pub fn state(doc: &Document, wrapper: NodeId) -> Option<CollapseState> {
    let parts = WrapperParts::locate(doc, wrapper)?;
    Some(CollapseState::from_collapsed(
        doc.has_class(parts.content, COLLAPSED_CLASS),
    ))
}

/// The content marker, toggle marker and `aria-expanded` all agree.
pub fn is_consistent(doc: &Document, wrapper: NodeId) -> bool {
    let Some(parts) = WrapperParts::locate(doc, wrapper) else {
        return false;
    };
    let content_collapsed = doc.has_class(parts.content, COLLAPSED_CLASS);
    let toggle_collapsed = doc.has_class(parts.toggle, COLLAPSED_CLASS);
    let expected_aria = CollapseState::from_collapsed(content_collapsed).aria_expanded();
    content_collapsed == toggle_collapsed
        && doc.attribute(parts.toggle, "aria-expanded") == Some(expected_aria)
}

/// Forces `wrapper` into `target`. Returns the applied state, or `None` when
/// `wrapper` is not (or no longer) a complete wrapper.
pub fn set_state(doc: &mut Document, wrapper: NodeId, target: CollapseState) -> Option<CollapseState> {
    let parts = WrapperParts::locate(doc, wrapper)?;
    match apply(doc, &parts, target) {
        Ok(()) => Some(target),
        Err(err) => {
            debug!(wrapper = %wrapper, error = %err, "could not apply collapse state");
            None
        }
    }
}

pub fn toggle(doc: &mut Document, wrapper: NodeId) -> Option<CollapseState> {
    let next = state(doc, wrapper)?.toggled();
    set_state(doc, wrapper, next)
}

fn apply(doc: &mut Document, parts: &WrapperParts, target: CollapseState) -> Result<(), DomError> {
    let collapsed = target.is_collapsed();
    doc.set_class(parts.content, COLLAPSED_CLASS, collapsed)?;
    doc.set_class(parts.toggle, COLLAPSED_CLASS, collapsed)?;
    doc.set_attribute(parts.toggle, "aria-expanded", target.aria_expanded())
}

/// Registers the activation routes: the toggle control and the vertical
/// line flip the wrapper, the preview forwards its click to the toggle.
pub(crate) fn wire_controls(doc: &mut Document, parts: &WrapperParts) -> Result<(), DomError> {
    let wrapper = parts.wrapper;
    doc.add_click_handler(parts.toggle, move |doc, _| activate(doc, wrapper))?;
    doc.add_click_handler(parts.line, move |doc, _| activate(doc, wrapper))?;

    let toggle_control = parts.toggle;
    doc.add_click_handler(parts.preview, move |doc, _| {
        if let Err(err) = doc.click(toggle_control) {
            debug!(wrapper = %wrapper, error = %err, "preview click not forwarded");
        }
    })
}

fn activate(doc: &mut Document, wrapper: NodeId) {
    if let Some(state) = toggle(doc, wrapper) {
        debug!(wrapper = %wrapper, ?state, "message toggled");
    }
}

#[cfg(test)]
#[path = "tests/toggle_tests.rs"]
mod tests;
