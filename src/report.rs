//! Output formatting for webcfg-guard results.
//!
//! Supports three output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::engine::{RuleSet, Violation};
use crate::runner::DetectionResult;
use crate::suppress::{SuppressedViolation, SuppressionType};

// =============================================================================
// JSON Format
// =============================================================================

/// JSON report structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub path: String,
    pub contract: String,
    pub passed: bool,
    pub files_scanned: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_failed: Vec<String>,
    pub violations: Vec<JsonViolation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<JsonSuppressedViolation>,
    pub suppressed_count: usize,
    pub breakdown: Vec<BreakdownEntry>,
}

/// One violation with its full source range.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonViolation {
    pub rule: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub message: String,
}

/// Violation count per rule.
#[derive(Debug, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub rule: String,
    pub violations: usize,
}

/// Suppressed violation with suppression info.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSuppressedViolation {
    pub violation: JsonViolation,
    pub suppression: JsonSuppression,
}

/// Suppression directive info.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSuppression {
    pub rule: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    pub file: String,
    pub line: usize,
    #[serde(rename = "type")]
    pub suppression_type: String,
}

/// Build the JSON report for a run.
pub fn json_report(path: &str, contract_path: &str, result: &DetectionResult) -> JsonReport {
    let suppressed = result
        .suppressed
        .iter()
        .map(|sv| JsonSuppressedViolation {
            violation: violation_to_json(&sv.violation),
            suppression: JsonSuppression {
                rule: sv.suppression.rule.clone(),
                reason: sv.suppression.reason.clone(),
                file: sv.suppression.file.clone(),
                line: sv.suppression.line,
                suppression_type: suppression_type_name(sv.suppression.suppression_type)
                    .to_string(),
            },
        })
        .collect();

    let breakdown = breakdown(&result.violations)
        .into_iter()
        .map(|(rule, violations)| BreakdownEntry {
            rule: rule.to_string(),
            violations,
        })
        .collect();

    JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        path: path.to_string(),
        contract: contract_path.to_string(),
        passed: !result.has_violations(),
        files_scanned: result.scanned,
        files_failed: result.failed.clone(),
        violations: result.violations.iter().map(violation_to_json).collect(),
        suppressed,
        suppressed_count: result.suppressed.len(),
        breakdown,
    }
}

/// Write results in JSON format.
pub fn write_json(path: &str, contract_path: &str, result: &DetectionResult) -> anyhow::Result<()> {
    let report = json_report(path, contract_path, result);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

fn violation_to_json(v: &Violation) -> JsonViolation {
    JsonViolation {
        rule: v.rule.clone(),
        file: v.file.clone(),
        line: v.span.begin_line,
        column: v.span.begin_column,
        end_line: v.span.end_line,
        end_column: v.span.end_column,
        message: v.message.clone(),
    }
}

fn suppression_type_name(t: SuppressionType) -> &'static str {
    match t {
        SuppressionType::Line => "line",
        SuppressionType::NextLine => "next-line",
        SuppressionType::File => "file",
    }
}

/// Violation counts per rule, busiest rule first, ties by rule id.
fn breakdown(violations: &[Violation]) -> Vec<(&str, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in violations {
        *counts.entry(v.rule.as_str()).or_insert(0) += 1;
    }
    let mut rules: Vec<(&str, usize)> = counts.into_iter().collect();
    rules.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    rules
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "webcfg-guard";
const DEFAULT_LEVEL: &str = "error";

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifReport {
    pub version: String,
    #[serde(rename = "$schema")]
    pub schema: String,
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRun {
    pub tool: SarifTool,
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifTool {
    pub driver: SarifDriver,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifDriver {
    pub name: String,
    pub version: String,
    pub rules: Vec<SarifRule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRule {
    pub id: String,
    pub name: String,
    #[serde(rename = "shortDescription")]
    pub short_description: SarifMessage,
    #[serde(rename = "defaultConfiguration")]
    pub default_config: SarifRuleConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRuleConfig {
    pub level: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifResult {
    #[serde(rename = "ruleId")]
    pub rule_id: String,
    pub level: String,
    pub message: SarifMessage,
    pub locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifMessage {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    pub physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    pub artifact_location: SarifArtifact,
    pub region: SarifRegion,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifArtifact {
    pub uri: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SarifRegion {
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "startColumn")]
    pub start_column: usize,
    #[serde(rename = "endLine")]
    pub end_line: usize,
    #[serde(rename = "endColumn")]
    pub end_column: usize,
}

fn make_relative_path(file_path: &str, base_path: &Path) -> String {
    if base_path.to_string_lossy().is_empty() {
        return file_path.to_string();
    }

    let file = Path::new(file_path);

    // Single file scan
    if file == base_path {
        return file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.to_string());
    }

    file.strip_prefix(base_path)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| file_path.to_string())
}

/// Build the SARIF log for a run. Rule metadata comes from `rules`.
pub fn sarif_report(base_path: &Path, result: &DetectionResult, rules: &RuleSet) -> SarifReport {
    let rule_ids: BTreeSet<&str> = result.violations.iter().map(|v| v.rule.as_str()).collect();

    let sarif_rules = rule_ids
        .into_iter()
        .map(|id| SarifRule {
            id: id.to_string(),
            name: id.to_string(),
            short_description: SarifMessage {
                text: rules.description_of(id).unwrap_or(id).to_string(),
            },
            default_config: SarifRuleConfig {
                level: DEFAULT_LEVEL.to_string(),
            },
        })
        .collect();

    let results = result
        .violations
        .iter()
        .map(|v| SarifResult {
            rule_id: v.rule.clone(),
            level: DEFAULT_LEVEL.to_string(),
            message: SarifMessage {
                text: v.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: make_relative_path(&v.file, base_path),
                    },
                    region: SarifRegion {
                        start_line: v.span.begin_line.max(1),
                        start_column: v.span.begin_column.max(1),
                        end_line: v.span.end_line.max(1),
                        end_column: v.span.end_column.max(1),
                    },
                },
            }],
        })
        .collect();

    SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules: sarif_rules,
                },
            },
            results,
        }],
    }
}

/// Write results in SARIF format.
pub fn write_sarif(base_path: &Path, result: &DetectionResult, rules: &RuleSet) -> anyhow::Result<()> {
    let report = sarif_report(base_path, result, rules);
    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write results in pretty (human-readable) format.
pub fn write_pretty(path: &str, contract_path: &str, result: &DetectionResult, show_suppressed: bool) {
    // Header
    println!();
    print!("  ");
    print!("{}", TOOL_NAME.cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", path);
    print!("  {}", "Contract: ".dimmed());
    println!("{}", contract_path);
    println!();

    write_result_summary(result);
    println!();

    if !result.violations.is_empty() {
        write_violations(&result.violations);
        println!();
    }

    if !result.suppressed.is_empty() {
        write_suppressed_summary(&result.suppressed, show_suppressed);
        println!();
    }

    if !result.failed.is_empty() {
        write_failed(&result.failed);
        println!();
    }

    if !result.violations.is_empty() {
        write_breakdown(&result.violations);
        println!();
    }
}

fn write_result_summary(result: &DetectionResult) {
    if result.has_violations() {
        print!("  {}", "✗ FAIL".red());
    } else {
        print!("  {}", "✓ PASS".green());
    }

    let plural = if result.scanned != 1 { "s" } else { "" };
    print!("  {} config file{} analyzed", result.scanned, plural);

    if !result.suppressed.is_empty() {
        print!(
            "  {}",
            format!("({} suppressed)", result.suppressed.len()).dimmed()
        );
    }

    println!();
}

fn write_violations(violations: &[Violation]) {
    println!("  {} ({}):", "Violations".bold(), violations.len());
    println!();

    for v in violations {
        print!("    {} ", "ERROR".red());
        print!("  ");
        print!("{}", v.file.blue());
        print!(
            "{}",
            format!(":{}:{}", v.span.begin_line, v.span.begin_column).dimmed()
        );
        println!();

        println!("            {}", v.rule.dimmed());
        println!("            {}", v.message);
        println!();
    }
}

fn write_breakdown(violations: &[Violation]) {
    println!("  {}", "Breakdown:".bold());

    for (rule, count) in breakdown(violations) {
        let plural = if count != 1 { "s" } else { "" };
        println!("    {:<48} {} violation{}", rule, count, plural);
    }
}

fn write_failed(failed: &[String]) {
    println!("  {} ({}):", "Not analyzed".yellow(), failed.len());
    for file in failed {
        println!("    {}", file.dimmed());
    }
}

fn write_suppressed_summary(suppressed: &[SuppressedViolation], show_details: bool) {
    println!("  {} ({}):", "Suppressed".dimmed(), suppressed.len());

    if !show_details {
        println!("    {}", "(use --show-suppressed to see details)".dimmed());
        return;
    }

    println!();
    for sv in suppressed {
        let v = &sv.violation;
        let s = &sv.suppression;

        print!("    {:<48}", v.rule.dimmed());
        print!("{}", v.file.blue());
        if s.suppression_type == SuppressionType::File {
            print!("{}", ":* (file)".dimmed());
        } else {
            print!("{}", format!(":{}", v.span.begin_line).dimmed());
        }
        println!();

        if !s.reason.is_empty() {
            println!("            {}", format!("reason: {:?}", s.reason).dimmed());
        }
    }
}
