//! Configuration parsers producing the element sequence the engine walks.
//!
//! This module provides:
//! - `ConfigParser` trait: turns file content into a flat, document-ordered
//!   sequence of requested elements
//! - `ParserFactory` trait: builds a parser for a set of element kinds
//! - `XmlParserFactory`: roxmltree-backed implementation

use std::collections::BTreeSet;
use std::ops::Range;

use thiserror::Error;

use crate::tree::{ElementTag, Node, NodeKind, Span};

/// Failure to turn file content into nodes.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("unexpected token at {line}:{column}: {message}")]
    Token {
        line: usize,
        column: usize,
        message: String,
    },
}

/// Parser trait for configuration files.
pub trait ConfigParser: Send + Sync {
    /// Parse `source` into the requested elements, in document order.
    fn parse(&self, source: &str) -> Result<Vec<Node>, ParseError>;

    /// Element kinds this parser emits.
    fn tags(&self) -> &BTreeSet<ElementTag>;
}

/// Builds parsers restricted to a set of element kinds.
pub trait ParserFactory {
    fn create(&self, tags: &BTreeSet<ElementTag>) -> Box<dyn ConfigParser>;
}

/// Factory for [`XmlConfigParser`].
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlParserFactory;

impl ParserFactory for XmlParserFactory {
    fn create(&self, tags: &BTreeSet<ElementTag>) -> Box<dyn ConfigParser> {
        Box::new(XmlConfigParser::new(tags.clone()))
    }
}

/// XML parser for web.config files.
///
/// `roxmltree` checks well-formedness and finds elements; the raw attribute
/// tokens (quotes included) and their positions come from scanning each
/// start tag, since the engine interprets the raw text itself.
#[derive(Debug, Clone)]
pub struct XmlConfigParser {
    tags: BTreeSet<ElementTag>,
}

impl XmlConfigParser {
    pub fn new(tags: BTreeSet<ElementTag>) -> Self {
        Self { tags }
    }
}

impl ConfigParser for XmlConfigParser {
    fn parse(&self, source: &str) -> Result<Vec<Node>, ParseError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(source, options)?;
        let lines = LineIndex::new(source);
        let mut nodes = Vec::new();

        for element in doc.descendants().filter(|n| n.is_element()) {
            let tag = match ElementTag::from_xml_name(element.tag_name().name()) {
                Some(tag) if self.tags.contains(&tag) => tag,
                _ => continue,
            };
            nodes.push(build_element(source, &lines, tag, element.range())?);
        }

        Ok(nodes)
    }

    fn tags(&self) -> &BTreeSet<ElementTag> {
        &self.tags
    }
}

fn build_element(
    source: &str,
    lines: &LineIndex,
    tag: ElementTag,
    range: Range<usize>,
) -> Result<Node, ParseError> {
    let start_tag = scan_start_tag(source, range.start, lines)?;

    let mut node = Node::new(
        NodeKind::Element(tag),
        &source[start_tag.name.clone()],
        lines.span(range),
    );
    node.children.push(Node::new(
        NodeKind::TagName,
        &source[start_tag.name.clone()],
        lines.span(start_tag.name),
    ));
    for attr in start_tag.attributes {
        node.children.push(Node::attribute(
            &source[attr.name.clone()],
            &source[attr.value.clone()],
            lines.span(attr.name),
            lines.span(attr.value),
        ));
    }

    Ok(node)
}

/// Byte ranges of one raw `name="value"` pair.
struct RawAttribute {
    name: Range<usize>,
    /// Includes the quotes.
    value: Range<usize>,
}

struct StartTag {
    name: Range<usize>,
    attributes: Vec<RawAttribute>,
}

fn scan_start_tag(source: &str, start: usize, lines: &LineIndex) -> Result<StartTag, ParseError> {
    let bytes = source.as_bytes();
    let error = |pos: usize, message: &str| {
        let (line, column) = lines.position(pos);
        ParseError::Token {
            line,
            column,
            message: message.to_string(),
        }
    };
    let is_delim = |b: u8| b.is_ascii_whitespace() || b == b'/' || b == b'>' || b == b'=';
    let skip_ws = |mut pos: usize| {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos
    };

    if bytes.get(start) != Some(&b'<') {
        return Err(error(start, "expected start tag"));
    }

    let mut pos = start + 1;
    let name_start = pos;
    while pos < bytes.len() && !is_delim(bytes[pos]) {
        pos += 1;
    }
    let name = name_start..pos;
    let mut attributes = Vec::new();

    loop {
        pos = skip_ws(pos);
        match bytes.get(pos) {
            None => return Err(error(pos, "unterminated start tag")),
            Some(b'>') | Some(b'/') => break,
            Some(_) => {}
        }

        let attr_start = pos;
        while pos < bytes.len() && !is_delim(bytes[pos]) {
            pos += 1;
        }
        let attr_name = attr_start..pos;
        if attr_name.is_empty() {
            return Err(error(pos, "expected attribute name"));
        }

        pos = skip_ws(pos);
        if bytes.get(pos) != Some(&b'=') {
            return Err(error(pos, "expected '=' after attribute name"));
        }
        pos = skip_ws(pos + 1);

        let quote = match bytes.get(pos) {
            Some(&q) if q == b'"' || q == b'\'' => q,
            _ => return Err(error(pos, "expected quoted attribute value")),
        };
        let value_start = pos;
        pos += 1;
        while pos < bytes.len() && bytes[pos] != quote {
            pos += 1;
        }
        if pos >= bytes.len() {
            return Err(error(value_start, "unterminated attribute value"));
        }
        pos += 1;

        attributes.push(RawAttribute {
            name: attr_name,
            value: value_start..pos,
        });
    }

    Ok(StartTag { name, attributes })
}

/// Byte offset to 1-based line/column conversion. Columns count characters.
struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        let line_start = self.line_starts[line];
        let column = self
            .source
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        (line + 1, column + 1)
    }

    fn span(&self, range: Range<usize>) -> Span {
        let (begin_line, begin_column) = self.position(range.start);
        let (end_line, end_column) = self.position(range.end);
        Span::new(begin_line, begin_column, end_line, end_column)
    }
}
