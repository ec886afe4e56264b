//! Rule contract definitions for webcfg-guard.
//!
//! A contract selects which rules apply to a project's web.config and may
//! declare additional rules. The YAML form is flat; [`build_rule_set`] turns
//! it into the typed engine model and rejects combinations the engine cannot
//! express, such as a bound on a string value.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::engine::{
    AnchorCondition, Check, CompoundRule, CountermandCondition, IntegerPolicy, Rule, RuleSet,
    StringPolicy, TagChecker, ValueDomain,
};
use crate::rules;
use crate::tree::ElementTag;

/// Top-level contract definition.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Contract {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the built-in rules apply (default: true)
    #[serde(default)]
    pub builtin_rules: Option<bool>,
    /// Built-in rule ids to turn off
    #[serde(default)]
    pub disabled_rules: Vec<String>,
    /// Glob patterns for paths to exclude from analysis (e.g., "**/bin/**")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
    #[serde(default)]
    pub compound_rules: Vec<CompoundRuleSpec>,
}

impl Contract {
    /// Parse a contract from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let contract: Contract = serde_yaml::from_str(&content)?;
        Ok(contract)
    }

    /// Returns whether the built-in rules apply (defaults to true).
    pub fn use_builtin_rules(&self) -> bool {
        self.builtin_rules.unwrap_or(true)
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    /// Uses globset for matching, which supports `**` for recursive directory matching.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();

        for pattern in &self.excluded_paths {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(&*path_str) {
                    return true;
                }
            }
        }
        false
    }
}

/// A single-element rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleSpec {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub checks: Vec<CheckSpec>,
}

/// One attribute check, in its flat YAML form.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckSpec {
    pub tag: ElementTag,
    pub attribute: String,
    pub domain: ValueDomain,
    /// Omitted for the presence domain
    #[serde(default)]
    pub policy: Option<PolicyKind>,
    #[serde(default)]
    pub value: Option<ValueSpec>,
    #[serde(default)]
    pub values: Vec<ValueSpec>,
}

/// Policy names accepted in contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    MandatoryValue,
    MandatoryValues,
    ForbiddenValue,
    ForbiddenValues,
    MaxValue,
    MinValue,
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PolicyKind::MandatoryValue => "mandatory_value",
            PolicyKind::MandatoryValues => "mandatory_values",
            PolicyKind::ForbiddenValue => "forbidden_value",
            PolicyKind::ForbiddenValues => "forbidden_values",
            PolicyKind::MaxValue => "max_value",
            PolicyKind::MinValue => "min_value",
        };
        write!(f, "{}", name)
    }
}

/// A configured value; YAML numbers and strings are both accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ValueSpec {
    Integer(u64),
    Text(String),
}

impl ValueSpec {
    fn as_text(&self) -> String {
        match self {
            ValueSpec::Integer(n) => n.to_string(),
            ValueSpec::Text(s) => s.clone(),
        }
    }

    fn as_integer(&self) -> Option<u64> {
        match self {
            ValueSpec::Integer(n) => Some(*n),
            ValueSpec::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A rule correlating two elements of the same file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompoundRuleSpec {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub anchor: AnchorSpec,
    pub countermand: CountermandSpec,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnchorSpec {
    pub tag: ElementTag,
    pub attribute: String,
    /// Values that enable the capability (default: "true", "1")
    #[serde(default = "default_affirmative")]
    pub values: Vec<ValueSpec>,
}

fn default_affirmative() -> Vec<ValueSpec> {
    vec![
        ValueSpec::Text("true".to_string()),
        ValueSpec::Integer(1),
    ]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CountermandSpec {
    pub tag: ElementTag,
    pub attribute: String,
    pub value: ValueSpec,
}

/// Reasons a contract cannot be turned into a rule set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("rule id must not be empty")]
    EmptyRuleId,
    #[error("rule {0:?} is defined more than once")]
    DuplicateRule(String),
    #[error("rule {0:?} has no checks")]
    NoChecks(String),
    #[error("rule {0:?}: disabled rule is not a built-in rule")]
    UnknownDisabledRule(String),
    #[error("rule {rule:?}: {tag}.{attribute} needs a policy for the {domain} domain")]
    MissingPolicy {
        rule: String,
        tag: ElementTag,
        attribute: String,
        domain: ValueDomain,
    },
    #[error("rule {rule:?}: policy {policy} is not valid for the {domain} domain")]
    PolicyDomainMismatch {
        rule: String,
        policy: PolicyKind,
        domain: ValueDomain,
    },
    #[error("rule {rule:?}: policy {policy} needs a value")]
    MissingValue { rule: String, policy: PolicyKind },
    #[error("rule {rule:?}: {value:?} is not an integer")]
    NotAnInteger { rule: String, value: String },
    #[error("rule {rule:?}: attribute name must not be empty")]
    EmptyAttribute { rule: String },
    #[error("invalid excluded_paths pattern {pattern:?}: {message}")]
    InvalidGlob { pattern: String, message: String },
}

/// Build the immutable rule set a contract describes.
pub fn build_rule_set(contract: &Contract) -> Result<RuleSet, ContractError> {
    let builtin = rules::builtin();
    for id in &contract.disabled_rules {
        if !builtin.rule_ids().contains(&id.as_str()) {
            return Err(ContractError::UnknownDisabledRule(id.clone()));
        }
    }

    let disabled: HashSet<&str> = contract.disabled_rules.iter().map(String::as_str).collect();
    let mut single = Vec::new();
    let mut compound = Vec::new();

    if contract.use_builtin_rules() {
        single.extend(
            builtin
                .rules()
                .iter()
                .filter(|r| !disabled.contains(r.id()))
                .cloned(),
        );
        compound.extend(
            builtin
                .compound_rules()
                .iter()
                .filter(|r| !disabled.contains(r.id()))
                .cloned(),
        );
    }

    for spec in &contract.rules {
        single.push(build_rule(spec)?);
    }
    for spec in &contract.compound_rules {
        compound.push(build_compound_rule(spec)?);
    }

    let rule_set = RuleSet::new(single, compound);
    let mut seen = HashSet::new();
    for id in rule_set.rule_ids() {
        if !seen.insert(id) {
            return Err(ContractError::DuplicateRule(id.to_string()));
        }
    }

    Ok(rule_set)
}

fn build_rule(spec: &RuleSpec) -> Result<Rule, ContractError> {
    if spec.id.trim().is_empty() {
        return Err(ContractError::EmptyRuleId);
    }
    if spec.checks.is_empty() {
        return Err(ContractError::NoChecks(spec.id.clone()));
    }

    let checkers = spec
        .checks
        .iter()
        .map(|c| build_checker(&spec.id, c))
        .collect::<Result<Vec<_>, _>>()?;

    let rule = Rule::new(spec.id.clone(), checkers);
    Ok(match &spec.description {
        Some(d) => rule.with_description(d.clone()),
        None => rule,
    })
}

fn build_checker(rule: &str, spec: &CheckSpec) -> Result<TagChecker, ContractError> {
    if spec.attribute.trim().is_empty() {
        return Err(ContractError::EmptyAttribute {
            rule: rule.to_string(),
        });
    }
    let check = build_check(rule, spec)?;
    Ok(TagChecker::new(spec.tag, spec.attribute.trim(), check))
}

fn build_check(rule: &str, spec: &CheckSpec) -> Result<Check, ContractError> {
    let mismatch = |policy| ContractError::PolicyDomainMismatch {
        rule: rule.to_string(),
        policy,
        domain: spec.domain,
    };

    let policy = match (spec.domain, spec.policy) {
        (ValueDomain::Presence, None) => return Ok(Check::Presence),
        (ValueDomain::Presence, Some(PolicyKind::MandatoryValue | PolicyKind::MandatoryValues)) => {
            return Ok(Check::Presence)
        }
        (ValueDomain::Presence, Some(policy)) => return Err(mismatch(policy)),
        (domain, None) => {
            return Err(ContractError::MissingPolicy {
                rule: rule.to_string(),
                tag: spec.tag,
                attribute: spec.attribute.clone(),
                domain,
            })
        }
        (_, Some(policy)) => policy,
    };

    let single = || {
        spec.value.clone().ok_or(ContractError::MissingValue {
            rule: rule.to_string(),
            policy,
        })
    };
    let set = || -> Result<Vec<ValueSpec>, ContractError> {
        match (&spec.value, spec.values.is_empty()) {
            (_, false) => Ok(spec.values.clone()),
            (Some(v), true) => Ok(vec![v.clone()]),
            (None, true) => Err(ContractError::MissingValue {
                rule: rule.to_string(),
                policy,
            }),
        }
    };
    let integer = |v: &ValueSpec| {
        v.as_integer().ok_or_else(|| ContractError::NotAnInteger {
            rule: rule.to_string(),
            value: v.as_text(),
        })
    };
    let integers = |vs: Vec<ValueSpec>| vs.iter().map(integer).collect::<Result<Vec<_>, _>>();
    let texts = |vs: Vec<ValueSpec>| vs.iter().map(ValueSpec::as_text).collect::<Vec<_>>();

    match spec.domain {
        ValueDomain::Integer => Ok(Check::Integer(match policy {
            PolicyKind::MandatoryValue => IntegerPolicy::MandatoryValue(integer(&single()?)?),
            PolicyKind::MandatoryValues => IntegerPolicy::MandatoryValues(integers(set()?)?),
            PolicyKind::ForbiddenValue => IntegerPolicy::ForbiddenValue(integer(&single()?)?),
            PolicyKind::ForbiddenValues => IntegerPolicy::ForbiddenValues(integers(set()?)?),
            PolicyKind::MaxValue => IntegerPolicy::MaxValue(integer(&single()?)?),
            PolicyKind::MinValue => IntegerPolicy::MinValue(integer(&single()?)?),
        })),
        ValueDomain::String => Ok(Check::string(match policy {
            PolicyKind::MandatoryValue => StringPolicy::MandatoryValue(single()?.as_text()),
            PolicyKind::MandatoryValues => StringPolicy::MandatoryValues(texts(set()?)),
            PolicyKind::ForbiddenValue => StringPolicy::ForbiddenValue(single()?.as_text()),
            PolicyKind::ForbiddenValues => StringPolicy::ForbiddenValues(texts(set()?)),
            PolicyKind::MaxValue | PolicyKind::MinValue => return Err(mismatch(policy)),
        })),
        ValueDomain::Presence => Ok(Check::Presence),
    }
}

fn build_compound_rule(spec: &CompoundRuleSpec) -> Result<CompoundRule, ContractError> {
    if spec.id.trim().is_empty() {
        return Err(ContractError::EmptyRuleId);
    }
    if spec.anchor.attribute.trim().is_empty() || spec.countermand.attribute.trim().is_empty() {
        return Err(ContractError::EmptyAttribute {
            rule: spec.id.clone(),
        });
    }

    let affirmative: Vec<String> = spec.anchor.values.iter().map(ValueSpec::as_text).collect();
    let affirmative: Vec<&str> = affirmative.iter().map(String::as_str).collect();
    let rule = CompoundRule::new(
        spec.id.clone(),
        AnchorCondition::new(spec.anchor.tag, spec.anchor.attribute.trim(), &affirmative),
        CountermandCondition::new(
            spec.countermand.tag,
            spec.countermand.attribute.trim(),
            spec.countermand.value.as_text(),
        ),
    );
    Ok(match &spec.description {
        Some(d) => rule.with_description(d.clone()),
        None => rule,
    })
}

/// Validate a contract for correctness.
pub fn validate(contract: &Contract) -> Result<(), ContractError> {
    for pattern in &contract.excluded_paths {
        globset::Glob::new(pattern).map_err(|e| ContractError::InvalidGlob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
    }

    build_rule_set(contract).map(|_| ())
}
