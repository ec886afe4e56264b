//! Attribute lookup on element nodes.

use crate::tree::{Node, NodeKind, TreeError};

/// An attribute statement found on an element.
#[derive(Debug, Clone, Copy)]
pub struct AttributeMatch<'a> {
    pub statement: &'a Node,
    pub name: &'a Node,
    pub value: &'a Node,
}

impl<'a> AttributeMatch<'a> {
    /// Raw value token, quotes included.
    pub fn raw_value(&self) -> &'a str {
        &self.value.text
    }

    /// Value with one leading and one trailing quote removed, then trimmed.
    pub fn value_text(&self) -> &'a str {
        strip_quotes(&self.value.text).trim()
    }

    /// Value text lower-cased, for case-insensitive comparison.
    pub fn normalized_value(&self) -> String {
        self.value_text().to_lowercase()
    }
}

/// Remove one leading and one trailing quote character, if present.
pub fn strip_quotes(raw: &str) -> &str {
    let is_quote = |c: char| c == '"' || c == '\'';
    let s = raw.strip_prefix(is_quote).unwrap_or(raw);
    s.strip_suffix(is_quote).unwrap_or(s)
}

/// Find the first attribute of `node` whose name starts with `name`, ignoring case.
///
/// Only direct children are inspected. A prefix match tolerates parsers that
/// annotate the raw name token.
pub fn find_attribute<'a>(
    node: &'a Node,
    name: &str,
) -> Result<Option<AttributeMatch<'a>>, TreeError> {
    let target = name.to_lowercase();

    for statement in &node.children {
        match statement.kind {
            NodeKind::Attribute => {}
            NodeKind::Element(_)
            | NodeKind::TagName
            | NodeKind::AttributeName
            | NodeKind::AttributeValue => continue,
        }

        let name_token = statement
            .children
            .first()
            .ok_or(TreeError::MissingAttributeName {
                span: statement.span,
            })?;

        if !name_token.text.to_lowercase().starts_with(&target) {
            continue;
        }

        let value_token =
            statement
                .children
                .get(1)
                .ok_or_else(|| TreeError::MissingAttributeValue {
                    name: name_token.text.clone(),
                    span: statement.span,
                })?;

        return Ok(Some(AttributeMatch {
            statement,
            name: name_token,
            value: value_token,
        }));
    }

    Ok(None)
}
