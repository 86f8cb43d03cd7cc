//! # Schema Registry
//!
//! Declares node and mark types: their attribute schemas, content rules,
//! block/inline classification, capabilities and HTML import/export rules.
//!
//! The registry is built once at engine initialization and is immutable
//! afterwards; every other component consumes the resulting type tables.
//! Registering two types under the same name is a configuration error,
//! fatal to initialization.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::embed::{
    ATTR_CLASS, ATTR_DATA, ATTR_FIELD_SLUG, ATTR_ID, ATTR_PARENT_PUB_ID, ATTR_PUB_ID,
    ATTR_PUB_TYPE_ID, NODE_CONTEXT_ATOM, NODE_CONTEXT_DOC,
};
use crate::error::{SchemaError, SchemaResult};
use crate::node::{AttrMap, Element, Node};

/// Which children a content rule admits
#[derive(Debug, Clone, PartialEq)]
pub enum ChildClass {
    /// Text leaves and inline-classified elements
    Inline,
    /// Block-classified elements
    Block,
    /// An explicit list of element type names
    OneOf(Vec<String>),
}

/// Content rule for a node type
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ContentRule {
    /// No structural children (leaf / atom)
    #[default]
    Empty,
    ZeroOrMore(ChildClass),
    OneOrMore(ChildClass),
}

/// Embedding capability of a node type.
///
/// Embedding nodes are dispatched on this tagged variant, never on their
/// type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    /// Leaf embedding carrying a `data` snapshot
    Atom,
    /// Block embedding whose content is edited in place
    Doc,
}

/// HTML export/import rule declared per node type
#[derive(Debug, Clone, PartialEq)]
pub enum HtmlRule {
    /// Container serialized as a fixed tag; `id`/`class` attributes carry over
    Tag(String),
    /// Heading serialized as `h{level}`, parsed back by reading the tag
    HeadingByLevel,
    /// Childless void tag (`<br>`)
    Void(String),
    /// `img` element carrying `src`/`alt`
    Image,
    /// Embedding `div` carrying `data-*` attributes
    Embed,
}

impl HtmlRule {
    pub fn tag(name: impl Into<String>) -> Self {
        HtmlRule::Tag(name.into())
    }
}

/// Specification of a node type
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// Attribute schema: name -> default value
    pub attrs: AttrMap,
    pub content: ContentRule,
    /// Inline vs block classification
    pub inline: bool,
    /// Atomic: no structural children even when block-classified
    pub atom: bool,
    /// Tabular container; descendants are exempt from overlays
    pub tabular: bool,
    /// Inline kind decorated even without marks
    pub always_annotate: bool,
    /// Media kind; the inspector routes to the upload view
    pub media: bool,
    pub embedding: Option<EmbeddingKind>,
    pub html: Option<HtmlRule>,
}

/// Specification of a mark type
#[derive(Debug, Clone, Default)]
pub struct MarkSpec {
    /// Attribute schema: name -> default value
    pub attrs: AttrMap,
    /// HTML tag the mark exports to
    pub tag: String,
    /// Mark attributes carried over as identically-named HTML attributes
    pub attr_keys: Vec<String>,
}

/// Builds the immutable type tables
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    nodes: HashMap<String, NodeSpec>,
    marks: HashMap<String, MarkSpec>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_node_type(
        &mut self,
        name: impl Into<String>,
        spec: NodeSpec,
    ) -> SchemaResult<()> {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            return Err(SchemaError::DuplicateNodeType(name));
        }
        self.nodes.insert(name, spec);
        Ok(())
    }

    pub fn register_mark_type(
        &mut self,
        name: impl Into<String>,
        spec: MarkSpec,
    ) -> SchemaResult<()> {
        let name = name.into();
        if self.marks.contains_key(&name) {
            return Err(SchemaError::DuplicateMarkType(name));
        }
        self.marks.insert(name, spec);
        Ok(())
    }

    pub fn build(self) -> Schema {
        Schema {
            nodes: self.nodes,
            marks: self.marks,
        }
    }
}

/// Immutable node/mark type tables
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: HashMap<String, NodeSpec>,
    marks: HashMap<String, MarkSpec>,
}

impl Schema {
    pub fn node_spec(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.get(name)
    }

    pub fn mark_spec(&self, name: &str) -> Option<&MarkSpec> {
        self.marks.get(name)
    }

    pub fn node_type_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn mark_type_names(&self) -> impl Iterator<Item = &str> {
        self.marks.keys().map(String::as_str)
    }

    /// Leaf in the position space: occupies a single unit
    pub fn is_leaf(&self, name: &str) -> bool {
        self.node_spec(name)
            .map(|spec| spec.content == ContentRule::Empty)
            .unwrap_or(false)
    }

    /// Block node holding inline content
    pub fn is_textblock(&self, name: &str) -> bool {
        matches!(
            self.node_spec(name).map(|spec| &spec.content),
            Some(ContentRule::ZeroOrMore(ChildClass::Inline))
                | Some(ContentRule::OneOrMore(ChildClass::Inline))
        )
    }

    /// Does `parent_type` declare the attribute `key`?
    pub fn has_attr(&self, parent_type: &str, key: &str) -> bool {
        self.node_spec(parent_type)
            .map(|spec| spec.attrs.contains_key(key))
            .unwrap_or(false)
    }

    /// Would `children` conform to `parent_type`'s content rule?
    pub fn validate_content(&self, parent_type: &str, children: &[Node]) -> bool {
        let Some(spec) = self.node_spec(parent_type) else {
            return false;
        };
        match &spec.content {
            ContentRule::Empty => children.is_empty(),
            ContentRule::ZeroOrMore(class) => {
                children.iter().all(|c| self.matches_class(class, c))
            }
            ContentRule::OneOrMore(class) => {
                !children.is_empty() && children.iter().all(|c| self.matches_class(class, c))
            }
        }
    }

    fn matches_class(&self, class: &ChildClass, node: &Node) -> bool {
        match class {
            ChildClass::Inline => node.is_inline(self),
            ChildClass::Block => matches!(
                node,
                Node::Element(el) if self
                    .node_spec(&el.type_name)
                    .map(|spec| !spec.inline)
                    .unwrap_or(false)
            ),
            ChildClass::OneOf(names) => matches!(
                node,
                Node::Element(el) if names.iter().any(|n| n == &el.type_name)
            ),
        }
    }

    /// Validate a whole subtree: every type known, every node's children
    /// conforming to its content rule, every mark registered.
    pub fn validate_element(&self, el: &Element) -> SchemaResult<()> {
        if self.node_spec(&el.type_name).is_none() {
            return Err(SchemaError::UnknownNodeType(el.type_name.clone()));
        }
        for child in &el.content {
            match child {
                Node::Element(child_el) => self.validate_element(child_el)?,
                Node::Text(t) => {
                    for mark in &t.marks {
                        if self.mark_spec(&mark.type_name).is_none() {
                            return Err(SchemaError::UnknownMarkType(mark.type_name.clone()));
                        }
                    }
                }
            }
        }
        if !self.validate_content(&el.type_name, &el.content) {
            return Err(SchemaError::invalid_structure(format!(
                "children of {} violate its content rule",
                el.type_name
            )));
        }
        Ok(())
    }

    /// The standard document schema: base rich-text kinds plus the two
    /// embedding node types.
    pub fn default_document_schema() -> SchemaResult<Schema> {
        let mut b = SchemaBuilder::new();

        let styling = |extra: &[(&str, Value)]| -> AttrMap {
            let mut attrs = AttrMap::new();
            attrs.insert(ATTR_ID.into(), Value::Null);
            attrs.insert(ATTR_CLASS.into(), Value::Null);
            for (k, v) in extra {
                attrs.insert((*k).into(), v.clone());
            }
            attrs
        };

        b.register_node_type(
            "doc",
            NodeSpec {
                content: ContentRule::OneOrMore(ChildClass::Block),
                ..Default::default()
            },
        )?;
        b.register_node_type(
            "paragraph",
            NodeSpec {
                attrs: styling(&[]),
                content: ContentRule::ZeroOrMore(ChildClass::Inline),
                html: Some(HtmlRule::tag("p")),
                ..Default::default()
            },
        )?;
        b.register_node_type(
            "heading",
            NodeSpec {
                attrs: styling(&[("level", json!(1))]),
                content: ContentRule::ZeroOrMore(ChildClass::Inline),
                html: Some(HtmlRule::HeadingByLevel),
                ..Default::default()
            },
        )?;
        b.register_node_type(
            "blockquote",
            NodeSpec {
                attrs: styling(&[]),
                content: ContentRule::OneOrMore(ChildClass::Block),
                html: Some(HtmlRule::tag("blockquote")),
                ..Default::default()
            },
        )?;
        b.register_node_type(
            "image",
            NodeSpec {
                attrs: styling(&[("src", Value::Null), ("alt", Value::Null)]),
                atom: true,
                media: true,
                html: Some(HtmlRule::Image),
                ..Default::default()
            },
        )?;
        b.register_node_type(
            "hard_break",
            NodeSpec {
                inline: true,
                atom: true,
                always_annotate: true,
                html: Some(HtmlRule::Void("br".into())),
                ..Default::default()
            },
        )?;
        b.register_node_type(
            "table",
            NodeSpec {
                attrs: styling(&[]),
                content: ContentRule::OneOrMore(ChildClass::OneOf(vec!["table_row".into()])),
                tabular: true,
                html: Some(HtmlRule::tag("table")),
                ..Default::default()
            },
        )?;
        b.register_node_type(
            "table_row",
            NodeSpec {
                content: ContentRule::OneOrMore(ChildClass::OneOf(vec![
                    "table_cell".into(),
                    "table_header".into(),
                ])),
                tabular: true,
                html: Some(HtmlRule::tag("tr")),
                ..Default::default()
            },
        )?;
        b.register_node_type(
            "table_header",
            NodeSpec {
                content: ContentRule::OneOrMore(ChildClass::Block),
                tabular: true,
                html: Some(HtmlRule::tag("th")),
                ..Default::default()
            },
        )?;
        b.register_node_type(
            "table_cell",
            NodeSpec {
                content: ContentRule::OneOrMore(ChildClass::Block),
                tabular: true,
                html: Some(HtmlRule::tag("td")),
                ..Default::default()
            },
        )?;

        let embed_attrs = || -> AttrMap {
            let mut attrs = AttrMap::new();
            attrs.insert(ATTR_ID.into(), Value::Null);
            attrs.insert(ATTR_CLASS.into(), Value::Null);
            attrs.insert(ATTR_PUB_ID.into(), Value::Null);
            attrs.insert(ATTR_PUB_TYPE_ID.into(), Value::Null);
            attrs.insert(ATTR_PARENT_PUB_ID.into(), Value::Null);
            attrs.insert(ATTR_FIELD_SLUG.into(), Value::Null);
            attrs.insert(ATTR_DATA.into(), json!({}));
            attrs
        };

        b.register_node_type(
            NODE_CONTEXT_ATOM,
            NodeSpec {
                attrs: embed_attrs(),
                atom: true,
                embedding: Some(EmbeddingKind::Atom),
                html: Some(HtmlRule::Embed),
                ..Default::default()
            },
        )?;
        b.register_node_type(
            NODE_CONTEXT_DOC,
            NodeSpec {
                attrs: embed_attrs(),
                content: ContentRule::OneOrMore(ChildClass::Block),
                embedding: Some(EmbeddingKind::Doc),
                html: Some(HtmlRule::Embed),
                ..Default::default()
            },
        )?;

        b.register_mark_type(
            "em",
            MarkSpec {
                tag: "em".into(),
                ..Default::default()
            },
        )?;
        b.register_mark_type(
            "strong",
            MarkSpec {
                tag: "strong".into(),
                ..Default::default()
            },
        )?;
        let mut link_attrs = AttrMap::new();
        link_attrs.insert("href".into(), Value::Null);
        link_attrs.insert("title".into(), Value::Null);
        b.register_mark_type(
            "link",
            MarkSpec {
                attrs: link_attrs,
                tag: "a".into(),
                attr_keys: vec!["href".into(), "title".into()],
            },
        )?;

        Ok(b.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn test_duplicate_registration_is_fatal() {
        let mut b = SchemaBuilder::new();
        b.register_node_type("paragraph", NodeSpec::default()).unwrap();

        let err = b
            .register_node_type("paragraph", NodeSpec::default())
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateNodeType("paragraph".into()));
    }

    #[test]
    fn test_validate_content_rules() {
        let schema = Schema::default_document_schema().unwrap();

        // doc requires one or more blocks
        assert!(!schema.validate_content("doc", &[]));
        assert!(schema.validate_content("doc", &[Node::element("paragraph")]));
        assert!(!schema.validate_content("doc", &[Node::text("loose")]));

        // paragraph admits zero or more inline children
        assert!(schema.validate_content("paragraph", &[]));
        assert!(schema.validate_content(
            "paragraph",
            &[Node::text("a"), Node::element("hard_break")]
        ));
        assert!(!schema.validate_content("paragraph", &[Node::element("paragraph")]));

        // tables admit only rows
        assert!(schema.validate_content("table", &[Node::element("table_row")]));
        assert!(!schema.validate_content("table", &[Node::element("paragraph")]));

        // atoms admit nothing
        assert!(schema.validate_content("image", &[]));
        assert!(!schema.validate_content("image", &[Node::text("x")]));
    }

    #[test]
    fn test_classification_helpers() {
        let schema = Schema::default_document_schema().unwrap();

        assert!(schema.is_textblock("paragraph"));
        assert!(schema.is_textblock("heading"));
        assert!(!schema.is_textblock("blockquote"));

        assert!(schema.is_leaf("image"));
        assert!(schema.is_leaf(crate::embed::NODE_CONTEXT_ATOM));
        assert!(!schema.is_leaf(crate::embed::NODE_CONTEXT_DOC));
    }

    #[test]
    fn test_validate_element_rejects_unknown_types() {
        let schema = Schema::default_document_schema().unwrap();

        let bad = crate::node::Element::new("doc")
            .with_child(Node::element("sidebar"));
        assert_eq!(
            schema.validate_element(&bad),
            Err(SchemaError::UnknownNodeType("sidebar".into()))
        );
    }
}
