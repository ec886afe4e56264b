//! Runs the analyzer over many files and gathers the results.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analyzer::{Analyzer, FileOutcome};
use crate::engine::Violation;
use crate::project::SourceFile;
use crate::suppress::{filter_suppressed, parse_suppressions, SuppressedViolation};

/// Results of running analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub violations: Vec<Violation>,
    /// Violations that were suppressed by inline comments
    #[serde(default)]
    pub suppressed: Vec<SuppressedViolation>,
    /// Number of files analyzed
    pub scanned: usize,
    /// Files that could not be analyzed (unreadable or unparsable)
    #[serde(default)]
    pub failed: Vec<String>,
}

impl DetectionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: DetectionResult) {
        self.violations.extend(other.violations);
        self.suppressed.extend(other.suppressed);
        self.scanned += other.scanned;
        self.failed.extend(other.failed);
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Number of active violations of `rule`.
    pub fn count_for(&self, rule: &str) -> usize {
        self.violations.iter().filter(|v| v.rule == rule).count()
    }
}

/// Analyzes files in parallel; each file gets its own walk state.
pub struct Runner<'a> {
    analyzer: &'a Analyzer,
}

impl<'a> Runner<'a> {
    pub fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer }
    }

    pub fn run(&self, files: &[SourceFile]) -> DetectionResult {
        let mut results: Vec<DetectionResult> = files
            .par_iter()
            .map(|file| self.run_file(file))
            .collect();

        let mut result = DetectionResult::new();
        for r in results.drain(..) {
            result.merge(r);
        }
        result.violations.sort();
        result
    }

    fn run_file(&self, file: &SourceFile) -> DetectionResult {
        let mut result = DetectionResult::new();
        let mut found = Vec::new();

        match self.analyzer.introducing_file(file, &mut found) {
            FileOutcome::Analyzed { .. } => result.scanned = 1,
            FileOutcome::Unreadable | FileOutcome::ParseFailed => {
                result.failed.push(file.path.to_string_lossy().to_string());
                return result;
            }
            FileOutcome::Ineligible | FileOutcome::NoParser => return result,
        }

        let (active, suppressed) = apply_suppressions(&file.path, found);
        result.violations = active;
        result.suppressed = suppressed;
        result
    }
}

fn apply_suppressions(
    path: &Path,
    violations: Vec<Violation>,
) -> (Vec<Violation>, Vec<SuppressedViolation>) {
    if violations.is_empty() {
        return (violations, Vec::new());
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return (violations, Vec::new()),
    };
    let suppressions = parse_suppressions(&path.to_string_lossy(), &content);
    if suppressions.is_empty() {
        return (violations, Vec::new());
    }
    filter_suppressed(violations, &suppressions)
}
