use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use dom::{Document, DomError};
use serde::Serialize;
use shared::domain::{CollapseState, NodeId};
use tracing::{debug, info, warn};

use crate::{toggle, wrapper};

pub const GLOBAL_TOGGLE_ID: &str = "message-collapser-toggle-all";
pub const GLOBAL_TOGGLE_CLASS: &str = "message-collapser-toggle-all";
const LABEL_CLASS: &str = "message-collapser-toggle-all-label";
const ICON_CLASS: &str = "message-collapser-toggle-all-icon";
/// Containers tried in order when the button has to be (re)inserted.
const CONTAINER_PREFERENCE: [&str; 4] = ["header", "nav", "main", "body"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Installation {
    Present,
    Inserted,
    NoContainer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Activation {
    pub state: CollapseState,
    pub wrappers: usize,
}

/// The aggregate collapse state for one page view.
///
/// Only tracks what the last activation asked for. Wrappers toggled by hand
/// afterwards drift away from it until the next activation forces them back.
#[derive(Debug, Default)]
pub struct GlobalToggle {
    all_collapsed: AtomicBool,
}

impl GlobalToggle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> CollapseState {
        CollapseState::from_collapsed(self.all_collapsed.load(Ordering::Acquire))
    }

    /// Flips the aggregate state and forces every connected wrapper to it.
    pub fn activate(&self, doc: &mut Document) -> Activation {
        let collapsed = !self.all_collapsed.fetch_xor(true, Ordering::AcqRel);
        let state = CollapseState::from_collapsed(collapsed);

        let wrappers = wrapper::wrappers(doc)
            .into_iter()
            .filter(|wrapper| toggle::set_state(doc, *wrapper, state).is_some())
            .count();

        if let Some(button) = doc.element_by_id(GLOBAL_TOGGLE_ID) {
            if let Err(err) = render(doc, button, state) {
                debug!(error = %err, "global toggle label not updated");
            }
        }

        info!(?state, wrappers, "global toggle applied");
        Activation { state, wrappers }
    }

    /// Makes sure the button is in the document, reinserting it when a host
    /// re-render dropped it.
    pub fn ensure_installed(self: &Arc<Self>, doc: &mut Document) -> Installation {
        if doc.element_by_id(GLOBAL_TOGGLE_ID).is_some() {
            return Installation::Present;
        }

        let Some(container) = CONTAINER_PREFERENCE
            .iter()
            .find_map(|tag| doc.first_element_by_tag(tag))
        else {
            warn!("no container available for the global toggle");
            return Installation::NoContainer;
        };

        match self.install(doc, container) {
            Ok(button) => {
                info!(button = %button, container = %container, "global toggle inserted");
                Installation::Inserted
            }
            Err(err) => {
                warn!(error = %err, "global toggle could not be inserted");
                Installation::NoContainer
            }
        }
    }

    fn install(self: &Arc<Self>, doc: &mut Document, container: NodeId) -> Result<NodeId, DomError> {
        let button = doc.create_element("button")?;
        doc.set_attribute(button, "id", GLOBAL_TOGGLE_ID)?;
        doc.set_attribute(button, "class", GLOBAL_TOGGLE_CLASS)?;
        doc.set_attribute(button, "type", "button")?;

        let icon = doc.create_element("span")?;
        doc.set_attribute(icon, "class", ICON_CLASS)?;
        doc.append_child(button, icon)?;
        let label = doc.create_element("span")?;
        doc.set_attribute(label, "class", LABEL_CLASS)?;
        doc.append_child(button, label)?;
        render(doc, button, self.state())?;

        let global = Arc::clone(self);
        doc.add_click_handler(button, move |doc, _| {
            global.activate(doc);
        })?;

        doc.prepend_child(container, button)?;
        Ok(button)
    }
}

/// Label and icon describe the action the next click performs.
fn render(doc: &mut Document, button: NodeId, state: CollapseState) -> Result<(), DomError> {
    let (icon, label) = match state {
        CollapseState::Expanded => ("\u{25B2}", "Collapse All"),
        CollapseState::Collapsed => ("\u{25BC}", "Expand All"),
    };
    let children = doc.children(button).to_vec();
    for child in children {
        if doc.has_class(child, ICON_CLASS) {
            doc.set_text_content(child, icon)?;
        } else if doc.has_class(child, LABEL_CLASS) {
            doc.set_text_content(child, label)?;
        }
    }
    doc.set_attribute(button, "aria-pressed", if state.is_collapsed() { "true" } else { "false" })
}

pub fn label(doc: &Document) -> Option<String> {
    let button = doc.element_by_id(GLOBAL_TOGGLE_ID)?;
    doc.children(button)
        .iter()
        .find(|child| doc.has_class(**child, LABEL_CLASS))
        .map(|child| doc.text_content(*child))
}

#[cfg(test)]
#[path = "tests/global_toggle_tests.rs"]
mod tests;
