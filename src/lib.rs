//! webcfg-guard - security rules for ASP.NET web.config files.
//!
//! The root web.config of each .NET project is parsed into a flat sequence
//! of element nodes and checked by a small rule engine:
//!
//! - `tree`: element nodes, spans and node kinds
//! - `engine`: attribute lookup, typed value policies, tag checkers, rules,
//!   the tree walker and the cross-element correlation pass
//! - `rules`: the built-in rule set
//! - `contract`: YAML contract declaring extra rules and exclusions
//! - `parser`: parser factory and the XML implementation
//! - `project`: deciding which web.config is a project's root config
//! - `analyzer`: per-file analysis with contained failures
//! - `runner`: parallel analysis of many files plus inline suppressions
//! - `report`: output formatting (pretty, JSON, SARIF)

pub mod analyzer;
pub mod cli;
pub mod contract;
pub mod engine;
pub mod parser;
pub mod project;
pub mod report;
pub mod rules;
pub mod runner;
pub mod suppress;
pub mod tree;

pub use analyzer::{Analyzer, FileOutcome};
pub use contract::Contract;
pub use engine::{RuleSet, Violation, ViolationSink};
pub use parser::{ConfigParser, ParserFactory, XmlParserFactory};
pub use project::SourceFile;
pub use runner::{DetectionResult, Runner};
pub use tree::{ElementTag, Node, Span};
