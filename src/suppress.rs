//! Inline suppression of violations via XML comments.
//!
//! Supports suppression comments like:
//! - `<!-- webcfg-guard:ignore <rule> - <reason> -->`
//! - `<!-- webcfg-guard:ignore-next-line <rule> - <reason> -->`
//! - `<!-- webcfg-guard:ignore-file <rule> - <reason> -->`

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::Violation;

/// How a suppression applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionType {
    /// Applies to the same line
    Line,
    /// Applies to the next line
    NextLine,
    /// Applies to the entire file
    File,
}

/// An inline suppression directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    /// Rule id to suppress, or "*" for all
    pub rule: String,
    pub reason: String,
    pub file: String,
    /// Line number (0 for file-level)
    pub line: usize,
    pub suppression_type: SuppressionType,
}

/// A violation that was suppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressedViolation {
    pub violation: Violation,
    pub suppression: Suppression,
}

lazy_static::lazy_static! {
    static ref SUPPRESSION_PATTERN: Regex = Regex::new(
        r"<!--\s*webcfg-guard:(ignore(?:-file|-next-line)?)\s+(\S+)\s*(?:-\s*(.*?))?\s*-->"
    )
    .unwrap();
}

/// Parse suppression directives from file content.
pub fn parse_suppressions(file_path: &str, content: &str) -> Vec<Suppression> {
    let mut suppressions = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_number = line_num + 1;

        let Some(caps) = SUPPRESSION_PATTERN.captures(line) else {
            continue;
        };
        let directive = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let rule = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let reason = caps
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        let suppression_type = match directive {
            "ignore-file" => SuppressionType::File,
            "ignore-next-line" => SuppressionType::NextLine,
            _ => {
                // Alone on its line, the comment covers the next element.
                let starts_line = caps
                    .get(0)
                    .map(|m| line[..m.start()].trim().is_empty())
                    .unwrap_or(true);
                if starts_line {
                    SuppressionType::NextLine
                } else {
                    SuppressionType::Line
                }
            }
        };

        suppressions.push(Suppression {
            rule: rule.to_string(),
            reason,
            file: file_path.to_string(),
            line: if suppression_type == SuppressionType::File {
                0
            } else {
                line_number
            },
            suppression_type,
        });
    }

    suppressions
}

/// Check if a violation matches a suppression.
pub fn matches_suppression(violation: &Violation, suppression: &Suppression) -> bool {
    if violation.file != suppression.file {
        return false;
    }

    if suppression.rule != "*" && !suppression.rule.eq_ignore_ascii_case(&violation.rule) {
        return false;
    }

    let line = violation.span.begin_line;
    match suppression.suppression_type {
        SuppressionType::File => true,
        SuppressionType::Line => line == suppression.line,
        SuppressionType::NextLine => line == suppression.line + 1,
    }
}

/// Separate violations into active and suppressed based on suppressions.
pub fn filter_suppressed(
    violations: Vec<Violation>,
    suppressions: &[Suppression],
) -> (Vec<Violation>, Vec<SuppressedViolation>) {
    let mut active = Vec::new();
    let mut suppressed = Vec::new();

    for violation in violations {
        match suppressions
            .iter()
            .find(|s| matches_suppression(&violation, s))
        {
            Some(suppression) => suppressed.push(SuppressedViolation {
                violation,
                suppression: suppression.clone(),
            }),
            None => active.push(violation),
        }
    }

    (active, suppressed)
}
