use std::ops::Range;

use serde_json::Value;
use thiserror::Error;

use pubweave_model::{
    coalesce_text, Element, EmbeddingKind, HtmlRule, Mark, Node, Schema, TextLeaf, ATTR_CLASS,
    ATTR_DATA, ATTR_FIELD_SLUG, ATTR_ID, ATTR_PARENT_PUB_ID, ATTR_PUB_ID, ATTR_PUB_TYPE_ID,
};

use crate::compiler::unescape;
use crate::tokenizer::{parse_tag, tokenize, TagParts, Token};

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Unexpected content at {pos}: {message}")]
    Unexpected { pos: usize, message: String },

    #[error("Unknown tag at {pos}: {name}")]
    UnknownTag { pos: usize, name: String },

    #[error("Bad attribute at {pos}: {message}")]
    BadAttribute { pos: usize, message: String },

    #[error("Imported tree is not valid: {0}")]
    Structure(String),
}

impl ParseError {
    fn unexpected(pos: usize, message: impl Into<String>) -> Self {
        Self::Unexpected {
            pos,
            message: message.into(),
        }
    }

    fn unknown_tag(pos: usize, name: impl Into<String>) -> Self {
        Self::UnknownTag {
            pos,
            name: name.into(),
        }
    }

    fn bad_attribute(pos: usize, message: impl Into<String>) -> Self {
        Self::BadAttribute {
            pos,
            message: message.into(),
        }
    }
}

/// Parse an HTML fragment back into a document tree.
///
/// Import is governed by the same per-type [`HtmlRule`]s the compiler
/// exports with; the resulting tree is validated against the schema
/// before it is returned.
pub fn parse_html(schema: &Schema, source: &str) -> ParseResult<Element> {
    let mut importer = Importer::new(schema, source);
    let content = importer.parse_block_nodes(None)?;
    let doc = Element::new("doc").with_children(content);
    schema
        .validate_element(&doc)
        .map_err(|e| ParseError::Structure(e.to_string()))?;
    Ok(doc)
}

/// What an opening tag resolves to under the schema's HTML rules
enum Resolution {
    Node { type_name: String, rule: HtmlRule },
    Mark { name: String },
}

pub struct Importer<'a> {
    tokens: Vec<(Token<'a>, Range<usize>)>,
    pos: usize,
    schema: &'a Schema,
}

impl<'a> Importer<'a> {
    pub fn new(schema: &'a Schema, source: &'a str) -> Self {
        Self {
            tokens: tokenize(source),
            pos: 0,
            schema,
        }
    }

    fn peek(&self) -> Option<(Token<'a>, Range<usize>)> {
        self.tokens.get(self.pos).cloned()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn resolve_tag(&self, parts: &TagParts) -> Option<Resolution> {
        for name in self.schema.mark_type_names() {
            if let Some(spec) = self.schema.mark_spec(name) {
                if spec.tag == parts.name {
                    return Some(Resolution::Mark {
                        name: name.to_string(),
                    });
                }
            }
        }

        for type_name in self.schema.node_type_names() {
            let Some(spec) = self.schema.node_spec(type_name) else {
                continue;
            };
            let Some(rule) = &spec.html else {
                continue;
            };
            let matched = match rule {
                HtmlRule::Tag(tag) | HtmlRule::Void(tag) => *tag == parts.name,
                HtmlRule::HeadingByLevel => heading_level(&parts.name).is_some(),
                HtmlRule::Image => parts.name == "img",
                HtmlRule::Embed => {
                    parts.name == "div"
                        && match (spec.embedding, parts.attr("data-embed")) {
                            (Some(EmbeddingKind::Atom), Some("atom")) => true,
                            (Some(EmbeddingKind::Doc), Some("doc")) => true,
                            _ => false,
                        }
                }
            };
            if matched {
                return Some(Resolution::Node {
                    type_name: type_name.to_string(),
                    rule: rule.clone(),
                });
            }
        }

        None
    }

    /// Parse block-level children until `end_tag` closes (or input ends).
    ///
    /// Whitespace-only character data between block tags is formatting
    /// noise from pretty printing and is dropped.
    pub fn parse_block_nodes(&mut self, end_tag: Option<&str>) -> ParseResult<Vec<Node>> {
        let mut nodes = Vec::new();
        loop {
            let Some((token, span)) = self.peek() else {
                return if end_tag.is_some() {
                    Err(ParseError::UnexpectedEof)
                } else {
                    Ok(nodes)
                };
            };

            match token {
                Token::Text(t) => {
                    if t.trim().is_empty() {
                        self.advance();
                        continue;
                    }
                    return Err(ParseError::unexpected(
                        span.start,
                        "character data outside a text block",
                    ));
                }

                Token::CloseTag(slice) => {
                    let name = close_name(slice);
                    if end_tag == Some(name) {
                        self.advance();
                        return Ok(nodes);
                    }
                    return Err(ParseError::unexpected(
                        span.start,
                        format!("unmatched closing tag </{}>", name),
                    ));
                }

                Token::OpenTag(slice) => {
                    let parts = parse_tag(slice);
                    self.advance();
                    nodes.push(self.parse_element(parts, span.start)?);
                }
            }
        }
    }

    fn parse_element(&mut self, parts: TagParts, at: usize) -> ParseResult<Node> {
        let resolution = self
            .resolve_tag(&parts)
            .ok_or_else(|| ParseError::unknown_tag(at, parts.name.clone()))?;

        let (type_name, rule) = match resolution {
            Resolution::Node { type_name, rule } => (type_name, rule),
            Resolution::Mark { name } => {
                return Err(ParseError::unexpected(
                    at,
                    format!("mark tag <{}> outside a text block", name),
                ));
            }
        };

        let mut el = Element::new(&type_name);
        for key in [ATTR_ID, ATTR_CLASS] {
            if let Some(v) = parts.attr(key) {
                el.attrs.insert(key.to_string(), Value::from(v));
            }
        }

        match rule {
            HtmlRule::Tag(tag) => {
                let children = if self.schema.is_textblock(&type_name) {
                    self.parse_inline_nodes(&tag)?
                } else {
                    self.parse_block_nodes(Some(tag.as_str()))?
                };
                el.content = children;
            }

            HtmlRule::HeadingByLevel => {
                let level = heading_level(&parts.name)
                    .ok_or_else(|| ParseError::unknown_tag(at, parts.name.clone()))?;
                el.attrs.insert("level".to_string(), Value::from(level));
                el.content = self.parse_inline_nodes(&parts.name)?;
            }

            // void tags carry no children and no closing tag
            HtmlRule::Void(_) => {}

            HtmlRule::Image => {
                for key in ["src", "alt"] {
                    if let Some(v) = parts.attr(key) {
                        el.attrs.insert(key.to_string(), Value::from(v));
                    }
                }
            }

            HtmlRule::Embed => {
                for (name, key) in [
                    ("data-pub-id", ATTR_PUB_ID),
                    ("data-pub-type-id", ATTR_PUB_TYPE_ID),
                    ("data-parent-pub-id", ATTR_PARENT_PUB_ID),
                    ("data-field-slug", ATTR_FIELD_SLUG),
                ] {
                    if let Some(v) = parts.attr(name) {
                        el.attrs.insert(key.to_string(), Value::from(v));
                    }
                }
                if let Some(json) = parts.attr("data-values") {
                    let data: Value = serde_json::from_str(json).map_err(|e| {
                        ParseError::bad_attribute(at, format!("data-values: {}", e))
                    })?;
                    el.attrs.insert(ATTR_DATA.to_string(), data);
                }
                el.content = self.parse_block_nodes(Some("div"))?;
            }
        }

        Ok(Node::Element(el))
    }

    /// Parse inline children until `end_tag` closes, tracking the open
    /// mark stack.
    fn parse_inline_nodes(&mut self, end_tag: &str) -> ParseResult<Vec<Node>> {
        let mut marks: Vec<Mark> = Vec::new();
        let mut nodes = Vec::new();

        loop {
            let Some((token, span)) = self.peek() else {
                return Err(ParseError::UnexpectedEof);
            };

            match token {
                Token::Text(t) => {
                    self.advance();
                    nodes.push(Node::Text(TextLeaf::new(unescape(t), marks.clone())));
                }

                Token::OpenTag(slice) => {
                    let parts = parse_tag(slice);
                    match self.resolve_tag(&parts) {
                        Some(Resolution::Mark { name }) => {
                            self.advance();
                            let mut mark = Mark::new(&name);
                            if let Some(spec) = self.schema.mark_spec(&name) {
                                for key in &spec.attr_keys {
                                    if let Some(v) = parts.attr(key) {
                                        mark.attrs.insert(key.clone(), Value::from(v));
                                    }
                                }
                            }
                            marks.push(mark);
                        }
                        Some(Resolution::Node {
                            type_name,
                            rule: HtmlRule::Void(_),
                        }) => {
                            self.advance();
                            nodes.push(Node::Element(Element::new(type_name)));
                        }
                        Some(Resolution::Node { type_name, .. }) => {
                            return Err(ParseError::unexpected(
                                span.start,
                                format!("block node {} inside a text block", type_name),
                            ));
                        }
                        None => {
                            return Err(ParseError::unknown_tag(span.start, parts.name));
                        }
                    }
                }

                Token::CloseTag(slice) => {
                    let name = close_name(slice).to_string();
                    self.advance();
                    if name == end_tag {
                        if let Some(open) = marks.last() {
                            return Err(ParseError::unexpected(
                                span.start,
                                format!("unclosed mark {}", open.type_name),
                            ));
                        }
                        coalesce_text(&mut nodes);
                        return Ok(nodes);
                    }
                    let closed = marks
                        .iter()
                        .rposition(|m| {
                            self.schema
                                .mark_spec(&m.type_name)
                                .map(|spec| spec.tag == name)
                                .unwrap_or(false)
                        })
                        .ok_or_else(|| {
                            ParseError::unexpected(
                                span.start,
                                format!("unmatched closing tag </{}>", name),
                            )
                        })?;
                    marks.remove(closed);
                }
            }
        }
    }
}

fn close_name(slice: &str) -> &str {
    slice
        .trim_start_matches("</")
        .trim_end_matches('>')
        .trim_end()
}

fn heading_level(tag: &str) -> Option<i64> {
    let rest = tag.strip_prefix('h')?;
    let level: i64 = rest.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}
