//! CSS selector subset used by the message heuristics.
//!
//! Supported: type and universal selectors, `.class`, `#id`, attribute
//! selectors (`[a]`, `=`, `*=`, `^=`, `$=`, `~=`), compound selectors, the
//! descendant and child combinators, and comma-separated lists.

use std::{fmt, str::FromStr};

use shared::domain::NodeId;
use thiserror::Error;

use crate::document::Document;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("expected a name at offset {offset}")]
    ExpectedName { offset: usize },
    #[error("unterminated {what} starting at offset {offset}")]
    Unterminated { what: &'static str, offset: usize },
    #[error("combinator without a right-hand selector")]
    DanglingCombinator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
    Suffix(String),
    Word(String),
}

impl AttributeOp {
    fn matches(&self, value: &str) -> bool {
        match self {
            Self::Exists => true,
            Self::Equals(expected) => value == expected,
            Self::Contains(needle) => !needle.is_empty() && value.contains(needle.as_str()),
            Self::Prefix(prefix) => !prefix.is_empty() && value.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => !suffix.is_empty() && value.ends_with(suffix.as_str()),
            Self::Word(word) => value.split_ascii_whitespace().any(|token| token == word),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Id(String),
    Class(String),
    Attribute { name: String, op: AttributeOp },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    conditions: Vec<Condition>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|expected| expected != tag) {
            return false;
        }
        self.conditions.iter().all(|condition| match condition {
            Condition::Id(id) => doc.attribute(node, "id") == Some(id.as_str()),
            Condition::Class(class) => doc.has_class(node, class),
            Condition::Attribute { name, op } => {
                doc.attribute(node, name).is_some_and(|value| op.matches(value))
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One alternative of a selector list. `parts[i].0` links `parts[i - 1]`
/// to `parts[i]`; the combinator of the first part is unused.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.parts
            .len()
            .checked_sub(1)
            .is_some_and(|last| self.matches_at(doc, node, last))
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent_element(node)
                .is_some_and(|parent| self.matches_at(doc, parent, index - 1)),
            Combinator::Descendant => doc
                .ancestors(node)
                .filter(|ancestor| doc.is_element(*ancestor))
                .any(|ancestor| self.matches_at(doc, ancestor, index - 1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let alternatives = Parser::new(source).parse_list()?;
        Ok(Self {
            source: source.trim().to_owned(),
            alternatives,
        })
    }

    /// Joins several selector strings into one list selector.
    pub fn parse_list<S: AsRef<str>>(sources: &[S]) -> Result<Self, SelectorError> {
        let joined = sources
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(", ");
        Self::parse(&joined)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Only elements can match; text and document nodes never do.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|alternative| alternative.matches(doc, node))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::parse(source)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::Unexpected {
                found,
                offset: self.pos,
            },
            None => SelectorError::DanglingCombinator,
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Complex>, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                return if alternatives.is_empty() {
                    Err(SelectorError::Empty)
                } else {
                    Err(SelectorError::DanglingCombinator)
                };
            }
            alternatives.push(self.parse_complex()?);
            match self.bump() {
                None => return Ok(alternatives),
                Some(',') => continue,
                Some(found) => {
                    return Err(SelectorError::Unexpected {
                        found,
                        offset: self.pos - 1,
                    })
                }
            }
        }
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = vec![(Combinator::Descendant, self.parse_compound()?)];
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => return Ok(Complex { parts }),
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.unexpected()),
            };
            if matches!(self.peek(), None | Some(',')) {
                return Err(SelectorError::DanglingCombinator);
            }
            parts.push((combinator, self.parse_compound()?));
        }
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        let mut any = false;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                any = true;
            }
            Some(ch) if is_name_char(ch) => {
                compound.tag = Some(self.parse_name()?.to_ascii_lowercase());
                any = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    compound.conditions.push(Condition::Class(self.parse_name()?));
                }
                Some('#') => {
                    self.pos += 1;
                    compound.conditions.push(Condition::Id(self.parse_name()?));
                }
                Some('[') => {
                    let condition = self.parse_attribute()?;
                    compound.conditions.push(condition);
                }
                _ => break,
            }
            any = true;
        }

        if any {
            Ok(compound)
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_name(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(SelectorError::ExpectedName { offset: start });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<Condition, SelectorError> {
        let open = self.pos;
        self.pos += 1;
        self.skip_whitespace();
        let name = self.parse_name()?.to_ascii_lowercase();
        self.skip_whitespace();

        let unterminated = SelectorError::Unterminated {
            what: "attribute selector",
            offset: open,
        };
        let op_char = match self.bump() {
            Some(']') => {
                return Ok(Condition::Attribute {
                    name,
                    op: AttributeOp::Exists,
                })
            }
            Some('=') => '=',
            Some(ch @ ('*' | '^' | '$' | '~')) => {
                if self.bump() != Some('=') {
                    return Err(SelectorError::Unexpected {
                        found: ch,
                        offset: self.pos.saturating_sub(2),
                    });
                }
                ch
            }
            Some(found) => {
                return Err(SelectorError::Unexpected {
                    found,
                    offset: self.pos - 1,
                })
            }
            None => return Err(unterminated),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                let start = self.pos;
                self.pos += 1;
                let value_start = self.pos;
                while self.peek().is_some_and(|ch| ch != quote) {
                    self.pos += 1;
                }
                if self.bump() != Some(quote) {
                    return Err(SelectorError::Unterminated {
                        what: "string",
                        offset: start,
                    });
                }
                self.chars[value_start..self.pos - 1].iter().collect()
            }
            _ => self.parse_name()?,
        };
        self.skip_whitespace();
        if self.bump() != Some(']') {
            return Err(unterminated);
        }

        let op = match op_char {
            '=' => AttributeOp::Equals(value),
            '*' => AttributeOp::Contains(value),
            '^' => AttributeOp::Prefix(value),
            '$' => AttributeOp::Suffix(value),
            _ => AttributeOp::Word(value),
        };
        Ok(Condition::Attribute { name, op })
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

#[cfg(test)]
#[path = "tests/selector_tests.rs"]
mod tests;
