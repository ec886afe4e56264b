//! Parsed configuration tree consumed by the rule engine.
//!
//! The parser owns the construction of these nodes; the engine only reads
//! them. Every node carries a closed [`NodeKind`] so rule dispatch is an
//! exhaustive `match` instead of a comparison on type names.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Configuration constructs the engine knows how to dispatch on.
///
/// The serialized name is the node-type name used in rule contracts. The
/// XML element name (what appears in `web.config`) is given by
/// [`ElementTag::xml_name`]. Contracts may use either, in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ElementTag {
    #[serde(rename = "sessionState")]
    SessionState,
    /// `<forms>` under `<authentication>`.
    #[serde(rename = "FormsTagInConfig")]
    Forms,
    /// ELMAH `<security>` element.
    #[serde(rename = "security")]
    Security,
    /// `<allow>` under `<authorization>`.
    #[serde(rename = "AllowElement")]
    Allow,
    #[serde(rename = "compilation")]
    Compilation,
    #[serde(rename = "httpCookies")]
    HttpCookies,
    #[serde(rename = "customErrors")]
    CustomErrors,
    #[serde(rename = "trace")]
    Trace,
    #[serde(rename = "httpRuntime")]
    HttpRuntime,
}

impl ElementTag {
    pub const ALL: [ElementTag; 9] = [
        ElementTag::SessionState,
        ElementTag::Forms,
        ElementTag::Security,
        ElementTag::Allow,
        ElementTag::Compilation,
        ElementTag::HttpCookies,
        ElementTag::CustomErrors,
        ElementTag::Trace,
        ElementTag::HttpRuntime,
    ];

    /// Node-type name, as used in contracts and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementTag::SessionState => "sessionState",
            ElementTag::Forms => "FormsTagInConfig",
            ElementTag::Security => "security",
            ElementTag::Allow => "AllowElement",
            ElementTag::Compilation => "compilation",
            ElementTag::HttpCookies => "httpCookies",
            ElementTag::CustomErrors => "customErrors",
            ElementTag::Trace => "trace",
            ElementTag::HttpRuntime => "httpRuntime",
        }
    }

    /// Element name as written in the configuration file.
    pub fn xml_name(&self) -> &'static str {
        match self {
            ElementTag::Forms => "forms",
            ElementTag::Allow => "allow",
            other => other.as_str(),
        }
    }

    /// Resolve an element name from the configuration file.
    pub fn from_xml_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.xml_name().eq_ignore_ascii_case(name))
    }

    /// Resolve a node-type name or an element name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|tag| {
            tag.as_str().eq_ignore_ascii_case(name) || tag.xml_name().eq_ignore_ascii_case(name)
        })
    }
}

impl<'de> Deserialize<'de> for ElementTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Self::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown element tag {:?}", name)))
    }
}

impl std::fmt::Display for ElementTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source range of a node. Lines and columns are 1-based.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Span {
    pub begin_line: usize,
    pub begin_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    pub fn new(begin_line: usize, begin_column: usize, end_line: usize, end_column: usize) -> Self {
        Self {
            begin_line,
            begin_column,
            end_line,
            end_column,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.begin_line, self.begin_column, self.end_line, self.end_column
        )
    }
}

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A configuration element of a known construct.
    Element(ElementTag),
    /// The element's own name token.
    TagName,
    /// A `name="value"` statement. Children are `AttributeName` then `AttributeValue`.
    Attribute,
    AttributeName,
    /// Raw value token, quotes included.
    AttributeValue,
}

/// A node of the parsed configuration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Raw source text of the token (for elements, the tag name).
    pub text: String,
    pub span: Span,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            children: Vec::new(),
        }
    }

    /// Create an element node with no children.
    pub fn element(tag: ElementTag, span: Span) -> Self {
        Self::new(NodeKind::Element(tag), tag.xml_name(), span)
    }

    /// Create an attribute statement from its raw name and raw (quoted) value.
    pub fn attribute(name: &str, raw_value: &str, name_span: Span, value_span: Span) -> Self {
        let span = Span::new(
            name_span.begin_line,
            name_span.begin_column,
            value_span.end_line,
            value_span.end_column,
        );
        let mut attribute = Self::new(NodeKind::Attribute, format!("{}={}", name, raw_value), span);
        attribute
            .children
            .push(Self::new(NodeKind::AttributeName, name, name_span));
        attribute
            .children
            .push(Self::new(NodeKind::AttributeValue, raw_value, value_span));
        attribute
    }

    /// Append a child, builder style.
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// The element tag, if this node is an element.
    pub fn tag(&self) -> Option<ElementTag> {
        match self.kind {
            NodeKind::Element(tag) => Some(tag),
            NodeKind::TagName
            | NodeKind::Attribute
            | NodeKind::AttributeName
            | NodeKind::AttributeValue => None,
        }
    }

    /// The last direct child classified as the tag-name token.
    pub fn tag_name_child(&self) -> Option<&Node> {
        self.children
            .iter()
            .rev()
            .find(|child| child.kind == NodeKind::TagName)
    }
}

/// A node did not have the shape its kind promises.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("attribute statement at {span} has no name token")]
    MissingAttributeName { span: Span },
    #[error("attribute {name:?} at {span} has no value token")]
    MissingAttributeValue { name: String, span: Span },
}
