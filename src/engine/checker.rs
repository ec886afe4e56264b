//! A single (tag, attribute, check) test unit.

use crate::tree::{ElementTag, Node, NodeKind, TreeError};

use super::attribute::find_attribute;
use super::policy::{Check, Outcome};

/// Binds a [`Check`] to one attribute of one kind of element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagChecker {
    tag: ElementTag,
    attribute: String,
    check: Check,
}

impl TagChecker {
    pub fn new(tag: ElementTag, attribute: impl Into<String>, check: Check) -> Self {
        Self {
            tag,
            attribute: attribute.into().to_lowercase(),
            check,
        }
    }

    pub fn tag(&self) -> ElementTag {
        self.tag
    }

    /// Attribute name, lower-cased.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn check(&self) -> &Check {
        &self.check
    }

    /// Evaluate this checker against one node.
    pub fn evaluate(&self, node: &Node) -> Result<Outcome, TreeError> {
        match node.kind {
            NodeKind::Element(tag) if tag == self.tag => {}
            NodeKind::Element(_)
            | NodeKind::TagName
            | NodeKind::Attribute
            | NodeKind::AttributeName
            | NodeKind::AttributeValue => return Ok(Outcome::NotApplicable),
        }

        let attribute = find_attribute(node, &self.attribute)?;
        Ok(self.check.evaluate(attribute.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::policy::{IntegerPolicy, StringPolicy};
    use crate::tree::Span;

    fn forms(attrs: &[(&str, &str)]) -> Node {
        attrs.iter().fold(
            Node::element(ElementTag::Forms, Span::new(3, 5, 3, 40)),
            |node, (name, value)| {
                node.with_child(Node::attribute(
                    name,
                    value,
                    Span::default(),
                    Span::default(),
                ))
            },
        )
    }

    #[test]
    fn test_other_tags_are_not_applicable() {
        let checker = TagChecker::new(ElementTag::SessionState, "cookieless", Check::Presence);
        assert_eq!(checker.evaluate(&forms(&[])).unwrap(), Outcome::NotApplicable);

        let token = Node::new(NodeKind::TagName, "forms", Span::default());
        assert_eq!(checker.evaluate(&token).unwrap(), Outcome::NotApplicable);
    }

    #[test]
    fn test_attribute_name_is_case_insensitive() {
        let checker = TagChecker::new(
            ElementTag::Forms,
            "Cookieless",
            Check::string(StringPolicy::MandatoryValue("usecookies".into())),
        );
        assert_eq!(checker.attribute(), "cookieless");
        assert_eq!(
            checker
                .evaluate(&forms(&[("COOKIELESS", "\"UseCookies\"")]))
                .unwrap(),
            Outcome::Pass
        );
    }

    #[test]
    fn test_presence_and_value_checkers_are_independent() {
        let presence = TagChecker::new(ElementTag::Forms, "cookieless", Check::Presence);
        let value = TagChecker::new(
            ElementTag::Forms,
            "cookieless",
            Check::string(StringPolicy::MandatoryValue("usecookies".into())),
        );

        let absent = forms(&[("name", "\".ASPXAUTH\"")]);
        assert_eq!(presence.evaluate(&absent).unwrap(), Outcome::Violation);
        assert_eq!(value.evaluate(&absent).unwrap(), Outcome::Pass);

        let wrong = forms(&[("cookieless", "\"UseUri\"")]);
        assert_eq!(presence.evaluate(&wrong).unwrap(), Outcome::Pass);
        assert_eq!(value.evaluate(&wrong).unwrap(), Outcome::Violation);
    }

    #[test]
    fn test_integer_checker_on_element() {
        let checker = TagChecker::new(
            ElementTag::Forms,
            "timeout",
            Check::Integer(IntegerPolicy::MaxValue(15)),
        );
        assert_eq!(
            checker.evaluate(&forms(&[("timeout", "\"30\"")])).unwrap(),
            Outcome::Violation
        );
        assert_eq!(
            checker.evaluate(&forms(&[("timeout", "\"15\"")])).unwrap(),
            Outcome::Pass
        );
    }
}
