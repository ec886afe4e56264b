//! Typed value comparison: one attribute value against one policy.
//!
//! Bounds only exist on [`IntegerPolicy`], so a string check can never be
//! asked for a maximum.

use serde::{Deserialize, Serialize};

use super::attribute::AttributeMatch;

/// Result of evaluating a check against one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Violation,
    /// The element is not the kind of element the check targets.
    NotApplicable,
}

impl Outcome {
    pub fn is_violation(self) -> bool {
        self == Outcome::Violation
    }
}

/// How an attribute's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueDomain {
    Integer,
    String,
    Presence,
}

impl std::fmt::Display for ValueDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueDomain::Integer => write!(f, "integer"),
            ValueDomain::String => write!(f, "string"),
            ValueDomain::Presence => write!(f, "presence"),
        }
    }
}

/// Policies over integer values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegerPolicy {
    MandatoryValue(u64),
    MandatoryValues(Vec<u64>),
    ForbiddenValue(u64),
    ForbiddenValues(Vec<u64>),
    MaxValue(u64),
    MinValue(u64),
}

impl IntegerPolicy {
    pub fn allows(&self, value: u64) -> bool {
        match self {
            IntegerPolicy::MandatoryValue(expected) => value == *expected,
            IntegerPolicy::MandatoryValues(set) => set.contains(&value),
            IntegerPolicy::ForbiddenValue(forbidden) => value != *forbidden,
            IntegerPolicy::ForbiddenValues(set) => !set.contains(&value),
            IntegerPolicy::MaxValue(bound) => value <= *bound,
            IntegerPolicy::MinValue(bound) => value >= *bound,
        }
    }
}

/// Policies over case-insensitive string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringPolicy {
    MandatoryValue(String),
    MandatoryValues(Vec<String>),
    ForbiddenValue(String),
    ForbiddenValues(Vec<String>),
}

impl StringPolicy {
    /// Trim and lower-case the configured values.
    pub fn normalized(self) -> Self {
        let all = |set: Vec<String>| set.iter().map(|v| normalize(v)).collect();
        match self {
            StringPolicy::MandatoryValue(v) => StringPolicy::MandatoryValue(normalize(&v)),
            StringPolicy::MandatoryValues(set) => StringPolicy::MandatoryValues(all(set)),
            StringPolicy::ForbiddenValue(v) => StringPolicy::ForbiddenValue(normalize(&v)),
            StringPolicy::ForbiddenValues(set) => StringPolicy::ForbiddenValues(all(set)),
        }
    }

    /// `value` and the configured values must already be normalized.
    pub fn allows(&self, value: &str) -> bool {
        match self {
            StringPolicy::MandatoryValue(expected) => expected == value,
            StringPolicy::MandatoryValues(set) => set.iter().any(|v| v == value),
            StringPolicy::ForbiddenValue(forbidden) => forbidden != value,
            StringPolicy::ForbiddenValues(set) => !set.iter().any(|v| v == value),
        }
    }
}

/// A value domain together with the policy applied within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Integer(IntegerPolicy),
    String(StringPolicy),
    /// The attribute must exist; its value is irrelevant.
    Presence,
}

impl Check {
    /// String check with its configured values normalized.
    pub fn string(policy: StringPolicy) -> Self {
        Check::String(policy.normalized())
    }

    pub fn domain(&self) -> ValueDomain {
        match self {
            Check::Integer(_) => ValueDomain::Integer,
            Check::String(_) => ValueDomain::String,
            Check::Presence => ValueDomain::Presence,
        }
    }

    /// Evaluate the attribute found on an applicable element (or its absence).
    pub fn evaluate(&self, attribute: Option<&AttributeMatch<'_>>) -> Outcome {
        let passed = match (self, attribute) {
            (Check::Presence, found) => found.is_some(),
            (Check::Integer(_) | Check::String(_), None) => true,
            (Check::Integer(policy), Some(attr)) => match parse_integer(attr.value_text()) {
                Some(value) => policy.allows(value),
                // Garbled numeric configuration is treated as insecure.
                None => false,
            },
            (Check::String(policy), Some(attr)) => policy.allows(&attr.normalized_value()),
        };

        if passed {
            Outcome::Pass
        } else {
            Outcome::Violation
        }
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Parse purely decimal text. Signs, separators and overflow yield `None`.
fn parse_integer(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}
