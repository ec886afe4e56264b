//! Compound rules judged from facts gathered across a whole file.
//!
//! A compound rule fires when an *anchor* element (a dangerous toggle) is
//! seen and no *countermand* element (a grant restricting it) appears
//! anywhere in the same file. Document order does not matter.

use std::collections::BTreeSet;

use crate::tree::{ElementTag, Node, NodeKind, TreeError};

use super::attribute::find_attribute;

/// Element whose attribute enables a dangerous capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorCondition {
    pub tag: ElementTag,
    pub attribute: String,
    /// Values that switch the capability on, compared case-insensitively.
    pub affirmative: Vec<String>,
}

impl AnchorCondition {
    pub fn new(tag: ElementTag, attribute: impl Into<String>, affirmative: &[&str]) -> Self {
        Self {
            tag,
            attribute: attribute.into(),
            affirmative: affirmative.iter().map(|v| v.trim().to_lowercase()).collect(),
        }
    }

    fn is_affirmative(&self, normalized: &str) -> bool {
        self.affirmative.iter().any(|v| v == normalized)
    }
}

/// Element whose attribute makes the anchor acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountermandCondition {
    pub tag: ElementTag,
    pub attribute: String,
    pub value: String,
}

impl CountermandCondition {
    pub fn new(tag: ElementTag, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag,
            attribute: attribute.into(),
            value: value.into().trim().to_lowercase(),
        }
    }
}

/// A rule correlating two non-nested elements of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundRule {
    id: String,
    description: Option<String>,
    anchor: AnchorCondition,
    countermand: CountermandCondition,
}

impl CompoundRule {
    pub fn new(
        id: impl Into<String>,
        anchor: AnchorCondition,
        countermand: CountermandCondition,
    ) -> Self {
        Self {
            id: id.into(),
            description: None,
            anchor,
            countermand,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn anchor(&self) -> &AnchorCondition {
        &self.anchor
    }

    pub fn countermand(&self) -> &CountermandCondition {
        &self.countermand
    }

    pub fn tags(&self) -> BTreeSet<ElementTag> {
        [self.anchor.tag, self.countermand.tag].into_iter().collect()
    }
}

/// Per-walk state of one compound rule.
///
/// Holds a reference to the anchor element so its location can be reported
/// once the walk is over. Never shared between walks.
#[derive(Debug, Default)]
pub struct CorrelatedFacts<'a> {
    candidate_anchor: Option<&'a Node>,
    countermanding_seen: bool,
}

impl<'a> CorrelatedFacts<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidate_anchor(&self) -> Option<&'a Node> {
        self.candidate_anchor
    }

    pub fn countermanding_seen(&self) -> bool {
        self.countermanding_seen
    }

    /// Record what `node` contributes to `rule`.
    ///
    /// Only the first matching attribute of an element is examined. A later
    /// affirmative anchor replaces an earlier one.
    pub fn observe(&mut self, rule: &CompoundRule, node: &'a Node) -> Result<(), TreeError> {
        let tag = match node.kind {
            NodeKind::Element(tag) => tag,
            NodeKind::TagName
            | NodeKind::Attribute
            | NodeKind::AttributeName
            | NodeKind::AttributeValue => return Ok(()),
        };

        if tag == rule.anchor.tag {
            if let Some(attr) = find_attribute(node, &rule.anchor.attribute)? {
                if rule.anchor.is_affirmative(&attr.normalized_value()) {
                    self.candidate_anchor = Some(node);
                }
            }
        }

        if tag == rule.countermand.tag {
            if let Some(attr) = find_attribute(node, &rule.countermand.attribute)? {
                if attr.normalized_value() == rule.countermand.value {
                    self.countermanding_seen = true;
                }
            }
        }

        Ok(())
    }

    /// The element to report once the walk is complete, if any.
    pub fn verdict(&self) -> Option<&'a Node> {
        if self.countermanding_seen {
            None
        } else {
            self.candidate_anchor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Span;

    fn elmah_rule() -> CompoundRule {
        CompoundRule::new(
            "AvoidElmahEnabledInProduction",
            AnchorCondition::new(ElementTag::Security, "allowRemoteAccess", &["true", "1"]),
            CountermandCondition::new(ElementTag::Allow, "roles", "admin"),
        )
    }

    fn element(tag: ElementTag, line: usize, attrs: &[(&str, &str)]) -> Node {
        attrs.iter().fold(
            Node::element(tag, Span::new(line, 1, line, 40)),
            |node, (n, v)| node.with_child(Node::attribute(n, v, Span::default(), Span::default())),
        )
    }

    fn verdict_line(nodes: &[Node]) -> Option<usize> {
        let rule = elmah_rule();
        let mut facts = CorrelatedFacts::new();
        for node in nodes {
            facts.observe(&rule, node).unwrap();
        }
        facts.verdict().map(|n| n.span.begin_line)
    }

    #[test]
    fn test_conditions_store_normalized_values() {
        let anchor = AnchorCondition::new(ElementTag::Security, "allowRemoteAccess", &[" True ", "1"]);
        assert_eq!(anchor.affirmative, vec!["true", "1"]);
        assert!(anchor.is_affirmative("true"));

        let countermand = CountermandCondition::new(ElementTag::Allow, "roles", " Admin ");
        assert_eq!(countermand.value, "admin");
    }

    #[test]
    fn test_anchor_without_countermand() {
        let nodes = [element(ElementTag::Security, 3, &[("allowRemoteAccess", "\"True\"")])];
        assert_eq!(verdict_line(&nodes), Some(3));
    }

    #[test]
    fn test_numeric_affirmative() {
        let nodes = [element(ElementTag::Security, 3, &[("allowRemoteAccess", "\" 1 \"")])];
        assert_eq!(verdict_line(&nodes), Some(3));
    }

    #[test]
    fn test_countermand_in_either_order() {
        let security = element(ElementTag::Security, 3, &[("allowRemoteAccess", "\"true\"")]);
        let allow = element(ElementTag::Allow, 8, &[("roles", "\"Admin\"")]);
        assert_eq!(verdict_line(&[security.clone(), allow.clone()]), None);
        assert_eq!(verdict_line(&[allow, security]), None);
    }

    #[test]
    fn test_negative_toggle_is_not_an_anchor() {
        let nodes = [element(ElementTag::Security, 3, &[("allowRemoteAccess", "\"false\"")])];
        assert_eq!(verdict_line(&nodes), None);
        assert_eq!(verdict_line(&[]), None);
    }

    #[test]
    fn test_non_admin_grant_does_not_countermand() {
        let nodes = [
            element(ElementTag::Security, 3, &[("allowRemoteAccess", "\"yes\"")]),
            element(ElementTag::Security, 5, &[("allowRemoteAccess", "\"1\"")]),
            element(ElementTag::Allow, 8, &[("roles", "\"users\"")]),
        ];
        assert_eq!(verdict_line(&nodes), Some(5));
    }

    #[test]
    fn test_last_anchor_wins() {
        let nodes = [
            element(ElementTag::Security, 3, &[("allowRemoteAccess", "\"true\"")]),
            element(ElementTag::Security, 9, &[("allowRemoteAccess", "\"true\"")]),
            element(ElementTag::Security, 12, &[("allowRemoteAccess", "\"false\"")]),
        ];
        assert_eq!(verdict_line(&nodes), Some(9));
    }

    #[test]
    fn test_only_first_matching_attribute_counts() {
        let nodes = [element(
            ElementTag::Security,
            3,
            &[("allowRemoteAccess", "\"false\""), ("allowRemoteAccess", "\"true\"")],
        )];
        assert_eq!(verdict_line(&nodes), None);
    }

    #[test]
    fn test_malformed_attribute_surfaces_error() {
        let mut broken = Node::attribute("roles", "\"admin\"", Span::default(), Span::default());
        broken.children.pop();
        let allow = Node::element(ElementTag::Allow, Span::default()).with_child(broken);

        let mut facts = CorrelatedFacts::new();
        assert!(facts.observe(&elmah_rule(), &allow).is_err());
        assert!(!facts.countermanding_seen());
    }
}
