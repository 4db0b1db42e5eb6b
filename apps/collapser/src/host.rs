//! A scripted chat page standing in for the host application.

use anyhow::{Context, Result};
use dom::{Document, NodeId, SharedDocument};

const USER_PROMPTS: [&str; 4] = [
    "Can you explain why my build fails after upgrading the compiler?",
    "Thanks. How would I write a test for that?",
    "ok",
    "What does the borrow checker complain about in this snippet exactly?",
];

pub struct ChatHost {
    document: SharedDocument,
    thread: NodeId,
    turns: usize,
}

impl ChatHost {
    /// `header` with a title and `main > div.chat-thread` for the turns.
    pub fn new() -> Result<Self> {
        let mut doc = Document::new();
        let body = doc.body().context("document has no body")?;
        let header = doc.append_element(body, "header", &[("class", "app-header")])?;
        doc.append_text(header, "Conversation")?;
        let main = doc.append_element(body, "main", &[])?;
        let thread = doc.append_element(main, "div", &[("class", "chat-thread")])?;
        doc.take_records();

        Ok(Self {
            document: SharedDocument::new(doc),
            thread,
            turns: 0,
        })
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Renders `count` turns without notifying observers, like markup that
    /// is already there when the page loads.
    pub fn render_initial(&mut self, count: usize) -> Result<()> {
        let thread = self.thread;
        let first = self.turns;
        self.document.with(|doc| -> Result<()> {
            for index in first..first + count {
                append_turn(doc, thread, index)?;
            }
            doc.take_records();
            Ok(())
        })?;
        self.turns += count;
        Ok(())
    }

    /// Appends `count` turns and delivers them as a single mutation batch.
    pub fn stream(&mut self, count: usize) -> Result<usize> {
        let thread = self.thread;
        let first = self.turns;
        let delivered = self.document.with(|doc| -> Result<usize> {
            for index in first..first + count {
                append_turn(doc, thread, index)?;
            }
            Ok(doc.flush_mutations())
        })?;
        self.turns += count;
        Ok(delivered)
    }
}

fn append_turn(doc: &mut Document, thread: NodeId, index: usize) -> Result<NodeId> {
    if index % 2 == 0 {
        let prompt = USER_PROMPTS[(index / 2) % USER_PROMPTS.len()];
        let turn = doc.append_element(
            thread,
            "div",
            &[("class", "message user-message"), ("data-message-author-role", "user")],
        )?;
        doc.append_text(turn, prompt)?;
        return Ok(turn);
    }

    let turn = doc.append_element(
        thread,
        "div",
        &[
            ("class", "message bot-message"),
            ("data-message-author-role", "assistant"),
        ],
    )?;
    let answer = doc.append_element(turn, "div", &[("class", "markdown prose")])?;
    let para = doc.append_element(answer, "p", &[])?;
    doc.append_text(para, &format!("Reply {index}: here is a walkthrough of the change."))?;
    let code = doc.append_element(answer, "pre", &[])?;
    doc.append_text(code, "fn main() {\n    println!(\"hello\");\n}")?;
    Ok(turn)
}
