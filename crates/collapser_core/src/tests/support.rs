//! Host-page fixtures shared by the unit tests.

use dom::{Document, NodeId, SharedDocument};

use crate::{Collapser, Heuristics, Settings};

pub(crate) fn heuristics() -> Heuristics {
    Heuristics::from_settings(&Settings::default()).expect("default heuristics")
}

pub(crate) struct ChatPage {
    pub doc: Document,
    pub main: NodeId,
    pub thread: NodeId,
}

/// `body > main > div.conversation-thread`, no pending records.
pub(crate) fn chat_page() -> ChatPage {
    let mut doc = Document::new();
    let body = doc.body().expect("body");
    let main = doc.append_element(body, "main", &[]).expect("main");
    let thread = doc
        .append_element(main, "section", &[("class", "conversation-thread")])
        .expect("thread");
    doc.take_records();
    ChatPage { doc, main, thread }
}

/// A message element whose text is split over one `<p>` per paragraph.
pub(crate) fn add_message(
    doc: &mut Document,
    parent: NodeId,
    class: &str,
    paragraphs: &[&str],
) -> NodeId {
    let message = doc
        .append_element(parent, "div", &[("class", class)])
        .expect("message");
    for text in paragraphs {
        let para = doc.append_element(message, "p", &[]).expect("p");
        doc.append_text(para, text).expect("text");
    }
    message
}

/// A message element holding bare text, no structural children.
pub(crate) fn add_plain(doc: &mut Document, parent: NodeId, class: &str, text: &str) -> NodeId {
    let message = doc
        .append_element(parent, "div", &[("class", class)])
        .expect("message");
    doc.append_text(message, text).expect("text");
    message
}

pub(crate) fn collapser(doc: Document) -> Collapser {
    Collapser::new(SharedDocument::new(doc), Settings::default()).expect("collapser")
}

pub(crate) fn text_of_len(len: usize) -> String {
    "abcdefghij".chars().cycle().take(len).collect()
}
