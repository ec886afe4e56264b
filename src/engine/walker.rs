//! Single pass over a file's elements.

use log::{info, warn};

use crate::tree::Node;

use super::correlation::CorrelatedFacts;
use super::rule::location;
use super::ruleset::RuleSet;
use super::types::{Violation, ViolationSink};

/// Counters for one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub elements: usize,
    pub violations: usize,
    /// Rule evaluations skipped because a node was malformed.
    pub errors: usize,
}

/// Walks element sequences against a [`RuleSet`].
pub struct Walker<'r> {
    rules: &'r RuleSet,
}

impl<'r> Walker<'r> {
    pub fn new(rules: &'r RuleSet) -> Self {
        Self { rules }
    }

    /// Evaluate every rule against `nodes`.
    ///
    /// Single-element violations are reported as they are found. Compound
    /// rules are decided once all nodes have been seen. A malformed node only
    /// skips the rule evaluation that tripped over it.
    pub fn walk(&self, file: &str, nodes: &[Node], sink: &mut dyn ViolationSink) -> WalkSummary {
        let mut summary = WalkSummary::default();
        let mut facts: Vec<CorrelatedFacts<'_>> = self
            .rules
            .compound_rules()
            .iter()
            .map(|_| CorrelatedFacts::new())
            .collect();

        for node in nodes {
            summary.elements += 1;

            for rule in self.rules.rules() {
                match rule.evaluate(node) {
                    Ok(outcome) if outcome.is_violation() => {
                        let message = rule
                            .description()
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("{} element violates {}", node.text, rule.id()));
                        self.emit(file, rule.id(), node, message, sink, &mut summary);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("skipping rule {} for {} in {}: {}", rule.id(), node.text, file, e);
                        summary.errors += 1;
                    }
                }
            }

            for (rule, state) in self.rules.compound_rules().iter().zip(facts.iter_mut()) {
                if let Err(e) = state.observe(rule, node) {
                    warn!("skipping rule {} for {} in {}: {}", rule.id(), node.text, file, e);
                    summary.errors += 1;
                }
            }
        }

        for (rule, state) in self.rules.compound_rules().iter().zip(facts.iter()) {
            if let Some(anchor) = state.verdict() {
                let message = rule.description().map(str::to_string).unwrap_or_else(|| {
                    format!(
                        "{} enabled without a matching {} grant",
                        rule.anchor().attribute,
                        rule.countermand().tag
                    )
                });
                self.emit(file, rule.id(), anchor, message, sink, &mut summary);
            }
        }

        summary
    }

    fn emit(
        &self,
        file: &str,
        rule: &str,
        node: &Node,
        message: String,
        sink: &mut dyn ViolationSink,
        summary: &mut WalkSummary,
    ) {
        let span = location(node);
        info!("violation of {} at {}:{}", rule, file, span);
        sink.report(Violation {
            file: file.to_string(),
            rule: rule.to_string(),
            span,
            message,
        });
        summary.violations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        AnchorCondition, Check, CompoundRule, CountermandCondition, IntegerPolicy, Rule,
        TagChecker,
    };
    use crate::tree::{ElementTag, NodeKind, Span};

    fn rules() -> RuleSet {
        RuleSet::new(
            vec![Rule::new(
                "AvoidInsufficientSessionExpirationInConfigFile",
                vec![TagChecker::new(
                    ElementTag::SessionState,
                    "timeout",
                    Check::Integer(IntegerPolicy::MaxValue(15)),
                )],
            )],
            vec![CompoundRule::new(
                "AvoidElmahEnabledInProduction",
                AnchorCondition::new(ElementTag::Security, "allowRemoteAccess", &["true", "1"]),
                CountermandCondition::new(ElementTag::Allow, "roles", "admin"),
            )],
        )
    }

    fn element(tag: ElementTag, line: usize, attrs: &[(&str, &str)]) -> Node {
        attrs.iter().fold(
            Node::element(tag, Span::new(line, 5, line + 2, 7)).with_child(Node::new(
                NodeKind::TagName,
                tag.xml_name(),
                Span::new(line, 6, line, 6 + tag.xml_name().len()),
            )),
            |node, (n, v)| node.with_child(Node::attribute(n, v, Span::default(), Span::default())),
        )
    }

    #[test]
    fn test_single_element_violation_is_reported_immediately() {
        let rules = rules();
        let nodes = [element(ElementTag::SessionState, 2, &[("timeout", "\"20\"")])];
        let mut found = Vec::new();
        let summary = Walker::new(&rules).walk("web.config", &nodes, &mut found);

        assert_eq!(summary.violations, 1);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, "AvoidInsufficientSessionExpirationInConfigFile");
        assert_eq!(found[0].span, Span::new(2, 6, 4, 7));
    }

    #[test]
    fn test_compound_violation_after_walk() {
        let rules = rules();
        let nodes = [
            element(ElementTag::SessionState, 2, &[("timeout", "\"10\"")]),
            element(ElementTag::Security, 7, &[("allowRemoteAccess", "\"true\"")]),
        ];
        let mut found = Vec::new();
        Walker::new(&rules).walk("web.config", &nodes, &mut found);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rule, "AvoidElmahEnabledInProduction");
        assert_eq!(found[0].span.begin_line, 7);
        assert!(found[0].message.contains("allowRemoteAccess"));
    }

    #[test]
    fn test_walk_is_idempotent() {
        let rules = rules();
        let nodes = [
            element(ElementTag::SessionState, 2, &[("timeout", "\"abc\"")]),
            element(ElementTag::Security, 7, &[("allowRemoteAccess", "\"1\"")]),
        ];
        let walker = Walker::new(&rules);
        let mut first = Vec::new();
        let mut second = Vec::new();
        walker.walk("web.config", &nodes, &mut first);
        walker.walk("web.config", &nodes, &mut second);
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_element_does_not_stop_the_walk() {
        let rules = rules();
        let mut broken = Node::attribute("timeout", "\"99\"", Span::default(), Span::default());
        broken.children.truncate(1);
        let nodes = [
            Node::element(ElementTag::SessionState, Span::new(1, 1, 1, 10)).with_child(broken),
            element(ElementTag::SessionState, 5, &[("timeout", "\"99\"")]),
        ];
        let mut found = Vec::new();
        let summary = Walker::new(&rules).walk("web.config", &nodes, &mut found);

        assert_eq!(summary.errors, 1);
        assert_eq!(summary.elements, 2);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span.begin_line, 5);
    }
}
