//! The immutable collection of rules a walk evaluates.

use std::collections::BTreeSet;

use crate::tree::ElementTag;

use super::correlation::CompoundRule;
use super::rule::Rule;

/// Single-element rules plus compound rules.
///
/// Built once, then shared read-only between every file's walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    compound_rules: Vec<CompoundRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>, compound_rules: Vec<CompoundRule>) -> Self {
        Self {
            rules,
            compound_rules,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn compound_rules(&self) -> &[CompoundRule] {
        &self.compound_rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.compound_rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len() + self.compound_rules.len()
    }

    /// All rule identifiers, single-element rules first.
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules
            .iter()
            .map(Rule::id)
            .chain(self.compound_rules.iter().map(CompoundRule::id))
            .collect()
    }

    /// Description of the rule with identifier `id`.
    pub fn description_of(&self, id: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.id() == id)
            .and_then(Rule::description)
            .or_else(|| {
                self.compound_rules
                    .iter()
                    .find(|r| r.id() == id)
                    .and_then(CompoundRule::description)
            })
    }

    /// Element kinds the parser must produce for these rules.
    pub fn requested_tags(&self) -> BTreeSet<ElementTag> {
        let mut tags: BTreeSet<ElementTag> = self.rules.iter().flat_map(Rule::tags).collect();
        tags.extend(self.compound_rules.iter().flat_map(CompoundRule::tags));
        tags
    }
}
