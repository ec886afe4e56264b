//! File-level analysis: eligibility, parsing and the walk, with every
//! per-file failure contained.

use std::fs;
use std::sync::Arc;

use log::{info, warn};

use crate::engine::{RuleSet, ViolationSink, Walker};
use crate::parser::{ConfigParser, ParserFactory};
use crate::project::{is_target_config, SourceFile};

/// What happened to one introduced file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Analyzed {
        elements: usize,
        violations: usize,
        /// Rule evaluations skipped on malformed nodes.
        errors: usize,
    },
    /// Not a project-root web.config.
    Ineligible,
    /// No parser has been configured yet.
    NoParser,
    Unreadable,
    ParseFailed,
}

/// Runs the rule engine over introduced files.
pub struct Analyzer {
    rules: Arc<RuleSet>,
    parser: Option<Box<dyn ConfigParser>>,
}

impl Analyzer {
    /// Create an analyzer with no parser; call [`Analyzer::set_parser`] before use.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            parser: None,
        }
    }

    /// Create an analyzer and its parser in one step.
    pub fn with_parser(rules: Arc<RuleSet>, factory: &dyn ParserFactory) -> Self {
        let mut analyzer = Self::new(rules);
        analyzer.set_parser(factory);
        analyzer
    }

    /// Build the parser for the element kinds the rules need.
    pub fn set_parser(&mut self, factory: &dyn ParserFactory) {
        let tags = self.rules.requested_tags();
        info!(
            "creating config parser for {}",
            tags.iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.parser = Some(factory.create(&tags));
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Analyze `file` if it is its project's root web.config.
    pub fn introducing_file(&self, file: &SourceFile, sink: &mut dyn ViolationSink) -> FileOutcome {
        if !is_target_config(&file.path, &file.project) {
            return FileOutcome::Ineligible;
        }

        if self.parser.is_none() {
            warn!(
                "config parser not set, skipping analysis for {}",
                file.path.display()
            );
            return FileOutcome::NoParser;
        }

        let source = match fs::read_to_string(&file.path) {
            Ok(s) => s,
            Err(e) => {
                warn!("cannot read {}: {}", file.path.display(), e);
                return FileOutcome::Unreadable;
            }
        };

        self.analyze_source(&file.path.to_string_lossy(), &source, sink)
    }

    /// Analyze already-loaded content, without the eligibility check.
    pub fn analyze_source(
        &self,
        file: &str,
        source: &str,
        sink: &mut dyn ViolationSink,
    ) -> FileOutcome {
        let Some(parser) = &self.parser else {
            warn!("config parser not set, skipping analysis for {}", file);
            return FileOutcome::NoParser;
        };

        let nodes = match parser.parse(source) {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!("error during parsing of {}: {}", file, e);
                return FileOutcome::ParseFailed;
            }
        };

        let summary = Walker::new(&self.rules).walk(file, &nodes, sink);
        FileOutcome::Analyzed {
            elements: summary.elements,
            violations: summary.violations,
            errors: summary.errors,
        }
    }
}
