use super::*;

struct Fixture {
    doc: Document,
    chat: NodeId,
    turn: NodeId,
    para: NodeId,
    nested: NodeId,
}

fn fixture() -> Fixture {
    let mut doc = Document::new();
    let body = doc.body().expect("body");
    let chat = doc
        .append_element(body, "div", &[("class", "chat-container")])
        .expect("chat");
    let turn = doc
        .append_element(
            chat,
            "div",
            &[
                ("class", "message user-message"),
                ("data-message-author-role", "user"),
                ("id", "turn-1"),
            ],
        )
        .expect("turn");
    let para = doc.append_element(turn, "p", &[]).expect("p");
    let nested = doc
        .append_element(para, "div", &[("class", "inline")])
        .expect("nested");
    Fixture {
        doc,
        chat,
        turn,
        para,
        nested,
    }
}

fn sel(source: &str) -> Selector {
    Selector::parse(source).expect("selector")
}

#[test]
fn matches_type_class_id_and_attribute_conditions() {
    let f = fixture();
    assert!(sel("div").matches(&f.doc, f.turn));
    assert!(sel("*").matches(&f.doc, f.turn));
    assert!(sel(".message").matches(&f.doc, f.turn));
    assert!(!sel(".mess").matches(&f.doc, f.turn));
    assert!(sel("#turn-1").matches(&f.doc, f.turn));
    assert!(sel("[data-message-author-role]").matches(&f.doc, f.turn));
    assert!(sel("[data-message-author-role=\"user\"]").matches(&f.doc, f.turn));
    assert!(sel("[data-message-author-role=user]").matches(&f.doc, f.turn));
    assert!(sel("[class*='user-mess']").matches(&f.doc, f.turn));
    assert!(sel("[class^=message]").matches(&f.doc, f.turn));
    assert!(sel("[class$=\"-message\"]").matches(&f.doc, f.turn));
    assert!(sel("[class~=\"user-message\"]").matches(&f.doc, f.turn));
    assert!(!sel("[class~=\"user\"]").matches(&f.doc, f.turn));
    assert!(sel("div.message#turn-1[data-message-author-role]").matches(&f.doc, f.turn));
    assert!(!sel("span.message").matches(&f.doc, f.turn));
}

#[test]
fn substring_match_with_empty_value_never_matches() {
    let f = fixture();
    assert!(!sel("[class*=\"\"]").matches(&f.doc, f.turn));
}

#[test]
fn combinators_walk_parents_and_ancestors() {
    let f = fixture();
    assert!(sel("[class*=\"chat\"] > div").matches(&f.doc, f.turn));
    assert!(!sel("[class*=\"chat\"] > div").matches(&f.doc, f.nested));
    assert!(sel("[class*=\"chat\"] div").matches(&f.doc, f.nested));
    assert!(sel(".chat-container .message > p").matches(&f.doc, f.para));
    assert!(!sel(".message > .inline").matches(&f.doc, f.nested));
}

#[test]
fn selector_lists_match_any_alternative() {
    let f = fixture();
    let list = sel("h1, p ,  pre");
    assert!(list.matches(&f.doc, f.para));
    assert!(!list.matches(&f.doc, f.chat));

    let joined = Selector::parse_list(&["h2", ".inline"]).expect("list");
    assert!(joined.matches(&f.doc, f.nested));
    assert_eq!(joined.source(), "h2, .inline");
}

#[test]
fn text_nodes_never_match() {
    let mut f = fixture();
    let text = f.doc.append_text(f.para, "hi").expect("text");
    assert!(!sel("*").matches(&f.doc, text));
}

#[test]
fn query_all_returns_document_order_and_closest_is_inclusive() {
    let f = fixture();
    let divs = f.doc.query_all(f.doc.root(), &sel("div"));
    assert_eq!(divs, vec![f.chat, f.turn, f.nested]);
    assert_eq!(f.doc.closest(f.nested, &sel(".message")), Some(f.turn));
    assert_eq!(f.doc.closest(f.turn, &sel(".message")), Some(f.turn));
    assert_eq!(f.doc.closest(f.chat, &sel(".message")), None);
}

#[test]
fn reports_parse_errors() {
    assert_eq!(Selector::parse("   "), Err(SelectorError::Empty));
    assert_eq!(Selector::parse("div >"), Err(SelectorError::DanglingCombinator));
    assert_eq!(Selector::parse("div,"), Err(SelectorError::DanglingCombinator));
    assert!(matches!(
        Selector::parse("[class*=\"message"),
        Err(SelectorError::Unterminated { what: "string", .. })
    ));
    assert!(matches!(
        Selector::parse("[class"),
        Err(SelectorError::Unterminated { .. })
    ));
    assert!(matches!(
        Selector::parse("div!"),
        Err(SelectorError::Unexpected { found: '!', .. })
    ));
    assert!(matches!(
        Selector::parse("."),
        Err(SelectorError::ExpectedName { offset: 1 })
    ));
}

#[test]
fn parses_from_str() {
    let parsed: Selector = "main > article".parse().expect("parse");
    assert_eq!(parsed.to_string(), "main > article");
}
