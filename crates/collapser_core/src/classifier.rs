//! Decides which host elements are chat messages worth wrapping.
//!
//! The pipeline short-circuits in a fixed order: candidate selectors (in
//! priority order), the wrapper ancestry guard, the minimum length filter,
//! then the structure-or-long-text filter.

use std::collections::HashSet;

use dom::Document;
use serde::Serialize;
use shared::domain::NodeId;
use tracing::trace;

use crate::{heuristics::Heuristics, wrapper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    /// The node is a wrapper or already lives inside one.
    AlreadyWrapped,
    TooShort,
    /// Mid-length text without any structural descendant; presumed noise.
    Unstructured,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Accepted elements in selector-priority order: everything the first
    /// selector found (in document order), then new finds of the second, and
    /// so on. Augmenting in this order wraps a specific match before a
    /// generic container around it.
    pub accepted: Vec<NodeId>,
    pub candidates: usize,
    pub already_wrapped: usize,
    pub too_short: usize,
    pub unstructured: usize,
}

pub fn classify(doc: &Document, heuristics: &Heuristics) -> Classification {
    let mut classification = Classification::default();
    let mut seen = HashSet::new();

    for selector in &heuristics.candidates {
        let matches = doc.query_all(doc.root(), selector);
        if !matches.is_empty() {
            trace!(selector = %selector, hits = matches.len(), "candidate selector matched");
        }
        // A node hit by several selectors is one candidate, ranked by the
        // first selector that found it.
        for node in matches {
            if !seen.insert(node) {
                continue;
            }
            classification.candidates += 1;
            match evaluate(doc, node, heuristics) {
                Verdict::Accept => classification.accepted.push(node),
                Verdict::AlreadyWrapped => classification.already_wrapped += 1,
                Verdict::TooShort => classification.too_short += 1,
                Verdict::Unstructured => classification.unstructured += 1,
            }
        }
    }
    classification
}

pub fn evaluate(doc: &Document, node: NodeId, heuristics: &Heuristics) -> Verdict {
    if wrapper::is_wrapped(doc, node) {
        return Verdict::AlreadyWrapped;
    }
    let length = trimmed_text_len(doc, node);
    if length < heuristics.min_text_chars {
        return Verdict::TooShort;
    }
    if length > heuristics.long_text_chars || has_structure(doc, node, heuristics) {
        Verdict::Accept
    } else {
        Verdict::Unstructured
    }
}

pub fn trimmed_text_len(doc: &Document, node: NodeId) -> usize {
    doc.text_content(node).trim().chars().count()
}

fn has_structure(doc: &Document, node: NodeId, heuristics: &Heuristics) -> bool {
    doc.descendants(node)
        .any(|descendant| heuristics.structural.matches(doc, descendant))
}

#[cfg(test)]
#[path = "tests/classifier_tests.rs"]
mod tests;
