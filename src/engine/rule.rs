//! Named rules: OR-combinations of tag checkers.

use std::collections::BTreeSet;

use crate::tree::{ElementTag, Node, Span, TreeError};

use super::checker::TagChecker;
use super::policy::Outcome;

/// One quality rule judged element by element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    id: String,
    description: Option<String>,
    checkers: Vec<TagChecker>,
}

impl Rule {
    pub fn new(id: impl Into<String>, checkers: Vec<TagChecker>) -> Self {
        Self {
            id: id.into(),
            description: None,
            checkers,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn checkers(&self) -> &[TagChecker] {
        &self.checkers
    }

    /// Element kinds this rule needs from the parser.
    pub fn tags(&self) -> BTreeSet<ElementTag> {
        self.checkers.iter().map(TagChecker::tag).collect()
    }

    /// Evaluate every checker against `node`.
    ///
    /// Any violating checker makes the whole rule violate, so a node is
    /// reported at most once per rule.
    pub fn evaluate(&self, node: &Node) -> Result<Outcome, TreeError> {
        let mut outcome = Outcome::NotApplicable;
        for checker in &self.checkers {
            match checker.evaluate(node)? {
                Outcome::Violation => return Ok(Outcome::Violation),
                Outcome::Pass => outcome = Outcome::Pass,
                Outcome::NotApplicable => {}
            }
        }
        Ok(outcome)
    }
}

/// Location to report for a violating element.
///
/// Elements often spread their attributes over many lines; the begin position
/// moves to the tag-name token when the parser provides one.
pub fn location(node: &Node) -> Span {
    let mut span = node.span;
    if let Some(tag_name) = node.tag_name_child() {
        span.begin_line = tag_name.span.begin_line;
        span.begin_column = tag_name.span.begin_column;
    }
    span
}
