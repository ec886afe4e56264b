//! Violations and the sink they are reported to.

use serde::{Deserialize, Serialize};

use crate::tree::Span;

/// A rule violation located in one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Violation {
    pub file: String,
    pub rule: String,
    pub span: Span,
    pub message: String,
}

/// Receives violations as soon as the engine decides them.
pub trait ViolationSink {
    fn report(&mut self, violation: Violation);
}

impl ViolationSink for Vec<Violation> {
    fn report(&mut self, violation: Violation) {
        self.push(violation);
    }
}
