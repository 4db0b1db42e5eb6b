use super::*;
use crate::{
    test_support::{add_message, add_plain, chat_page, heuristics, text_of_len},
    toggle,
    wrapper::{self, WrapperParts},
};
use shared::domain::CollapseState;

const GREETING: &str = "Hello, how are you today please respond";

#[test]
fn wraps_a_user_message_with_a_full_preview() {
    let mut page = chat_page();
    let message = add_message(&mut page.doc, page.thread, "message user", &[GREETING]);

    let wrapper = augment(&mut page.doc, message, &heuristics()).expect("wrapped");
    let parts = WrapperParts::locate(&page.doc, wrapper).expect("parts");

    assert_eq!(wrapper::wrappers(&page.doc), vec![wrapper]);
    assert!(page.doc.has_class(wrapper, USER_CLASS));
    assert!(!page.doc.has_class(wrapper, ASSISTANT_CLASS));
    assert_eq!(page.doc.text_content(parts.preview), GREETING);
    assert_eq!(toggle::state(&page.doc, wrapper), Some(CollapseState::Expanded));
    assert_eq!(page.doc.attribute(parts.toggle, "aria-expanded"), Some("true"));
    assert!(toggle::is_consistent(&page.doc, wrapper));
}

#[test]
fn wrapper_takes_the_original_position_and_owns_the_element() {
    let mut page = chat_page();
    let before = add_plain(&mut page.doc, page.thread, "note", "before");
    let message = add_message(&mut page.doc, page.thread, "message", &[&text_of_len(40)]);
    let after = add_plain(&mut page.doc, page.thread, "note", "after");

    let wrapper = augment(&mut page.doc, message, &heuristics()).expect("wrapped");
    let parts = WrapperParts::locate(&page.doc, wrapper).expect("parts");

    assert_eq!(page.doc.children(page.thread), &[before, wrapper, after]);
    assert_eq!(page.doc.parent(message), Some(parts.content));
    assert_eq!(parts.original(&page.doc), Some(message));
    assert_eq!(page.doc.children(parts.content), &[message]);
}

#[test]
fn relocation_keeps_every_descendant_in_order() {
    let mut page = chat_page();
    let message = add_message(
        &mut page.doc,
        page.thread,
        "message assistant",
        &["First paragraph of the answer.", "Second paragraph."],
    );
    let code = page.doc.append_element(message, "pre", &[("data-lang", "rust")]).expect("pre");
    page.doc.append_text(code, "fn main() {}").expect("code");

    let descendants_before: Vec<_> = page.doc.descendants(message).collect();
    let text_before = page.doc.text_content(message);
    let class_before = page.doc.attribute(message, "class").map(str::to_owned);

    augment(&mut page.doc, message, &heuristics()).expect("wrapped");

    let descendants_after: Vec<_> = page.doc.descendants(message).collect();
    assert_eq!(descendants_after, descendants_before);
    assert_eq!(page.doc.text_content(message), text_before);
    assert_eq!(page.doc.attribute(message, "class").map(str::to_owned), class_before);
    assert_eq!(page.doc.attribute(code, "data-lang"), Some("rust"));
}

#[test]
fn host_listeners_on_the_original_keep_working() {
    let mut page = chat_page();
    let message = add_message(&mut page.doc, page.thread, "message", &[&text_of_len(40)]);
    page.doc
        .add_click_handler(message, |doc, node| {
            doc.set_attribute(node, "data-host-clicked", "1").expect("attr");
        })
        .expect("handler");

    let wrapper = augment(&mut page.doc, message, &heuristics()).expect("wrapped");
    page.doc.click(message).expect("click");

    assert_eq!(page.doc.attribute(message, "data-host-clicked"), Some("1"));
    // Clicking the message body is not a toggle route.
    assert_eq!(toggle::state(&page.doc, wrapper), Some(CollapseState::Expanded));
}

#[test]
fn assistant_preview_comes_from_the_response_content() {
    let mut page = chat_page();
    let message = page
        .doc
        .append_element(page.thread, "div", &[("class", "message assistant")])
        .expect("message");
    let header = page.doc.append_element(message, "span", &[]).expect("header");
    page.doc.append_text(header, "Assistant").expect("text");
    let markdown = page
        .doc
        .append_element(message, "div", &[("class", "markdown")])
        .expect("markdown");
    let para = page.doc.append_element(markdown, "p", &[]).expect("p");
    page.doc.append_text(para, "  Here is the answer you asked for.  ").expect("text");

    let heuristics = heuristics();
    let roles = detect_roles(&page.doc, message, &heuristics);
    assert!(roles.assistant);
    assert!(!roles.user);
    assert_eq!(
        preview_text(&page.doc, message, roles, &heuristics),
        "Here is the answer you asked for."
    );
}

#[test]
fn non_user_message_without_response_content_has_empty_preview() {
    let mut page = chat_page();
    let message = add_message(&mut page.doc, page.thread, "message", &[&text_of_len(40)]);
    let wrapper = augment(&mut page.doc, message, &heuristics()).expect("wrapped");
    let parts = WrapperParts::locate(&page.doc, wrapper).expect("parts");

    assert_eq!(page.doc.text_content(parts.preview), "");
    assert!(page.doc.children(parts.preview).is_empty());
}

#[test]
fn roles_come_from_ancestors_but_stop_at_body() {
    let mut page = chat_page();
    let body = page.doc.body().expect("body");
    page.doc.set_attribute(body, "class", "user-logged-in").expect("class");
    let turn = page
        .doc
        .append_element(page.thread, "div", &[("class", "turn human-turn")])
        .expect("turn");
    let message = add_message(&mut page.doc, turn, "message", &[&text_of_len(30)]);
    let unrelated = add_message(&mut page.doc, page.thread, "message", &[&text_of_len(30)]);
    let heuristics = heuristics();

    assert!(detect_roles(&page.doc, message, &heuristics).user);
    assert_eq!(detect_roles(&page.doc, unrelated, &heuristics), RoleHints::default());
}

#[test]
fn both_roles_can_apply_and_user_wins_the_preview() {
    let mut page = chat_page();
    let message = add_message(
        &mut page.doc,
        page.thread,
        "message user-message assistant-reply",
        &[GREETING],
    );
    let heuristics = heuristics();
    let roles = detect_roles(&page.doc, message, &heuristics);
    assert!(roles.user && roles.assistant);
    assert_eq!(preview_text(&page.doc, message, roles, &heuristics), GREETING);
}

#[test]
fn preview_truncates_at_the_character_limit() {
    assert_eq!(truncate_preview(&text_of_len(150), 150), text_of_len(150));
    let truncated = truncate_preview(&text_of_len(151), 150);
    assert_eq!(truncated, format!("{}...", text_of_len(150)));
    assert_eq!(truncated.chars().count(), 153);

    let accented: String = "é".repeat(160);
    let truncated = truncate_preview(&accented, 150);
    assert_eq!(truncated, format!("{}...", "é".repeat(150)));
}

#[test]
fn long_user_message_preview_is_truncated() {
    let mut page = chat_page();
    let message = add_message(&mut page.doc, page.thread, "message user", &[&text_of_len(400)]);
    let wrapper = augment(&mut page.doc, message, &heuristics()).expect("wrapped");
    let parts = WrapperParts::locate(&page.doc, wrapper).expect("parts");
    assert_eq!(
        page.doc.text_content(parts.preview),
        format!("{}...", text_of_len(150))
    );
}

#[test]
fn vanished_candidate_is_a_no_op() {
    let mut page = chat_page();
    let message = add_message(&mut page.doc, page.thread, "message", &[&text_of_len(40)]);
    page.doc.remove(message).expect("host removes message");

    assert_eq!(augment(&mut page.doc, message, &heuristics()), None);
    assert!(wrapper::wrappers(&page.doc).is_empty());
}

#[test]
fn refuses_to_wrap_twice_or_around_an_existing_wrapper() {
    let mut page = chat_page();
    let outer = page
        .doc
        .append_element(page.thread, "div", &[("class", "turn")])
        .expect("outer");
    let inner = add_message(&mut page.doc, outer, "message", &[&text_of_len(40)]);
    let heuristics = heuristics();

    let wrapper = augment(&mut page.doc, inner, &heuristics).expect("wrapped");
    assert_eq!(augment(&mut page.doc, inner, &heuristics), None);
    assert_eq!(augment(&mut page.doc, wrapper, &heuristics), None);
    assert_eq!(augment(&mut page.doc, outer, &heuristics), None);
    assert_eq!(wrapper::wrappers(&page.doc), vec![wrapper]);
}

#[test]
fn full_document_leaves_the_message_in_place() {
    let mut page = chat_page();
    let message = add_message(&mut page.doc, page.thread, "message", &[&text_of_len(40)]);
    page.doc.take_records();
    page.doc.set_node_limit(page.doc.node_count() + 3);

    assert_eq!(augment(&mut page.doc, message, &heuristics()), None);
    assert_eq!(page.doc.parent(message), Some(page.thread));
    assert!(wrapper::wrappers(&page.doc).is_empty());
    assert_eq!(page.doc.pending_record_count(), 0);
}
