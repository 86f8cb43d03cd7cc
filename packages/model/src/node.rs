//! # Document Tree
//!
//! The persisted tree model: typed elements and text leaves carrying marks.
//!
//! The serialized form is the save/round-trip format the host hands us:
//! nested `{type, attrs, content[]}` objects and `{text, marks[]}` leaves.
//!
//! Every node occupies a contiguous range in a flattened position space:
//! a text leaf takes one unit per character, a leaf element (atom) takes
//! one unit, and a container element takes `2 + content` (one unit for
//! each boundary). All reads and writes address positions, never node
//! references, so a tree can be cloned per version and compared cheaply.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::Schema;

/// Attribute map, keyed by attribute name as it appears on the wire.
pub type AttrMap = serde_json::Map<String, Value>;

/// A node in the document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(TextLeaf),
}

/// Typed element with attributes and ordered children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "AttrMap::is_empty")]
    pub attrs: AttrMap,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
}

/// Inline text run carrying a set of marks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLeaf {
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

/// Inline annotation applied to a text run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "AttrMap::is_empty")]
    pub attrs: AttrMap,
}

impl Mark {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: AttrMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextLeaf {
            text: text.into(),
            marks: Vec::new(),
        })
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text(TextLeaf {
            text: text.into(),
            marks,
        })
    }

    pub fn element(type_name: impl Into<String>) -> Self {
        Node::Element(Element::new(type_name))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextLeaf> {
        match self {
            Node::Text(t) => Some(t),
            Node::Element(_) => None,
        }
    }

    /// True for text leaves and inline-classified elements
    pub fn is_inline(&self, schema: &Schema) -> bool {
        match self {
            Node::Text(_) => true,
            Node::Element(el) => schema
                .node_spec(&el.type_name)
                .map(|spec| spec.inline)
                .unwrap_or(false),
        }
    }

    /// Size of this node in the flattened position space
    pub fn size(&self, schema: &Schema) -> usize {
        match self {
            Node::Text(t) => t.len(),
            Node::Element(el) => el.size(schema),
        }
    }
}

impl Element {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: AttrMap::new(),
            content: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.content.push(child);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.content.extend(children);
        self
    }

    /// Read a string attribute, treating null/missing as absent
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn size(&self, schema: &Schema) -> usize {
        if schema.is_leaf(&self.type_name) {
            1
        } else {
            2 + self.content_size(schema)
        }
    }

    /// Total size of the content span (positions inside this element)
    pub fn content_size(&self, schema: &Schema) -> usize {
        self.content.iter().map(|c| c.size(schema)).sum()
    }

    /// Resolve an offset in this element's content space to a child index.
    ///
    /// Returns `(index, offset_within_child)`. An offset landing on a child
    /// boundary resolves to `(index_of_following_child, 0)`; the end of the
    /// content span resolves to `(content.len(), 0)`. Returns `None` when
    /// the offset lies past the end.
    pub fn index_at(&self, schema: &Schema, offset: usize) -> Option<(usize, usize)> {
        let mut off = 0;
        for (i, child) in self.content.iter().enumerate() {
            if offset == off {
                return Some((i, 0));
            }
            let size = child.size(schema);
            if offset < off + size {
                return Some((i, offset - off));
            }
            off += size;
        }
        if offset == off {
            Some((self.content.len(), 0))
        } else {
            None
        }
    }

    /// The node starting exactly at `pos` (positions are content-relative).
    ///
    /// Every non-root node has a unique start position: an element's first
    /// child starts one unit after the element itself.
    pub fn node_at(&self, schema: &Schema, pos: usize) -> Option<&Node> {
        let mut off = 0;
        for child in &self.content {
            if pos == off {
                return Some(child);
            }
            let size = child.size(schema);
            if pos < off + size {
                if let Node::Element(el) = child {
                    if size > 1 {
                        return el.node_at(schema, pos - off - 1);
                    }
                }
                return None;
            }
            off += size;
        }
        None
    }

    /// Mutable variant of [`node_at`](Self::node_at)
    pub fn node_at_mut(&mut self, schema: &Schema, pos: usize) -> Option<&mut Node> {
        let mut off = 0;
        for i in 0..self.content.len() {
            let size = self.content[i].size(schema);
            if pos == off {
                return self.content.get_mut(i);
            }
            if pos < off + size {
                if let Node::Element(el) = &mut self.content[i] {
                    if size > 1 {
                        return el.node_at_mut(schema, pos - off - 1);
                    }
                }
                return None;
            }
            off += size;
        }
        None
    }

    /// Depth-first walk over every descendant node.
    ///
    /// The callback receives the node, its start position (relative to this
    /// element's content space) and the chain of ancestor element type names
    /// from the outside in, excluding this element itself.
    pub fn descendants<'a>(
        &'a self,
        schema: &Schema,
        f: &mut dyn FnMut(&'a Node, usize, &[&'a str]),
    ) {
        let mut ancestors: Vec<&'a str> = Vec::new();
        walk(self, schema, 0, &mut ancestors, f);
    }
}

fn walk<'a>(
    el: &'a Element,
    schema: &Schema,
    base: usize,
    ancestors: &mut Vec<&'a str>,
    f: &mut dyn FnMut(&'a Node, usize, &[&'a str]),
) {
    let mut off = base;
    for child in &el.content {
        f(child, off, ancestors.as_slice());
        if let Node::Element(child_el) = child {
            if !schema.is_leaf(&child_el.type_name) {
                ancestors.push(&child_el.type_name);
                walk(child_el, schema, off + 1, ancestors, f);
                ancestors.pop();
            }
        }
        off += child.size(schema);
    }
}

impl TextLeaf {
    pub fn new(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    /// Length in characters (one position unit per character)
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Split at a character offset, both halves keeping the mark set
    pub fn split_at(&self, offset: usize) -> (TextLeaf, TextLeaf) {
        let byte = self
            .text
            .char_indices()
            .nth(offset)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len());
        (
            TextLeaf::new(&self.text[..byte], self.marks.clone()),
            TextLeaf::new(&self.text[byte..], self.marks.clone()),
        )
    }
}

/// Merge adjacent text leaves carrying identical mark sets.
///
/// Identical adjacent marks are semantically equivalent, so splices run
/// this before handing children back to the tree.
pub fn coalesce_text(children: &mut Vec<Node>) {
    let mut i = 0;
    while i + 1 < children.len() {
        let merge = matches!(
            (&children[i], &children[i + 1]),
            (Node::Text(a), Node::Text(b)) if a.marks == b.marks
        );
        if merge {
            if let Node::Text(next) = children.remove(i + 1) {
                if let Node::Text(prev) = &mut children[i] {
                    prev.text.push_str(&next.text);
                }
            }
        } else {
            i += 1;
        }
    }
    children.retain(|c| !matches!(c, Node::Text(t) if t.is_empty()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    fn schema() -> Schema {
        Schema::default_document_schema().unwrap()
    }

    fn para(text: &str) -> Node {
        Node::Element(Element::new("paragraph").with_child(Node::text(text)))
    }

    #[test]
    fn test_serde_wire_format() {
        let doc = Element::new("doc")
            .with_child(para("hello"))
            .with_child(Node::Element(
                Element::new("heading").with_attr("level", 2).with_child(
                    Node::marked_text("title", vec![Mark::new("em")]),
                ),
            ));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "doc");
        assert_eq!(json["content"][0]["type"], "paragraph");
        assert_eq!(json["content"][0]["content"][0]["text"], "hello");
        assert_eq!(json["content"][1]["attrs"]["level"], 2);
        assert_eq!(json["content"][1]["content"][0]["marks"][0]["type"], "em");

        let back: Element = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_position_sizes() {
        let s = schema();

        // paragraph("hello") = 2 + 5
        assert_eq!(para("hello").size(&s), 7);

        // atom elements take a single unit
        let img = Node::element("image");
        assert_eq!(img.size(&s), 1);

        let doc = Element::new("doc")
            .with_child(para("ab"))
            .with_child(Node::element("image"));
        assert_eq!(doc.content_size(&s), 5);
    }

    #[test]
    fn test_node_at_start_positions() {
        let s = schema();
        let doc = Element::new("doc")
            .with_child(para("ab"))
            .with_child(para("cd"));

        // first paragraph starts at 0, its text at 1
        assert_eq!(
            doc.node_at(&s, 0).and_then(Node::as_element).map(|e| e.type_name.as_str()),
            Some("paragraph")
        );
        assert_eq!(
            doc.node_at(&s, 1).and_then(Node::as_text).map(|t| t.text.as_str()),
            Some("ab")
        );

        // second paragraph starts after the first (size 4)
        assert_eq!(
            doc.node_at(&s, 4).and_then(Node::as_element).map(|e| e.type_name.as_str()),
            Some("paragraph")
        );

        // interior of a text run is not a node start
        assert!(doc.node_at(&s, 2).is_none());
    }

    #[test]
    fn test_index_at_boundaries() {
        let s = schema();
        let p = Element::new("paragraph")
            .with_child(Node::text("ab"))
            .with_child(Node::text("cd"));

        assert_eq!(p.index_at(&s, 0), Some((0, 0)));
        assert_eq!(p.index_at(&s, 1), Some((0, 1)));
        assert_eq!(p.index_at(&s, 2), Some((1, 0)));
        assert_eq!(p.index_at(&s, 4), Some((2, 0)));
        assert_eq!(p.index_at(&s, 5), None);
    }

    #[test]
    fn test_descendants_reports_ancestors() {
        let s = schema();
        let doc = Element::new("doc").with_child(Node::Element(
            Element::new("blockquote").with_child(para("x")),
        ));

        let mut seen = Vec::new();
        doc.descendants(&s, &mut |node, pos, ancestors| {
            let label = match node {
                Node::Element(el) => el.type_name.clone(),
                Node::Text(t) => format!("\"{}\"", t.text),
            };
            seen.push((label, pos, ancestors.to_vec().join("/")));
        });

        assert_eq!(
            seen,
            vec![
                ("blockquote".to_string(), 0, String::new()),
                ("paragraph".to_string(), 1, "blockquote".to_string()),
                ("\"x\"".to_string(), 2, "blockquote/paragraph".to_string()),
            ]
        );
    }

    #[test]
    fn test_coalesce_merges_identical_marks() {
        let mut children = vec![
            Node::marked_text("a", vec![Mark::new("em")]),
            Node::marked_text("b", vec![Mark::new("em")]),
            Node::marked_text("c", vec![Mark::new("strong")]),
            Node::text(""),
        ];
        coalesce_text(&mut children);

        assert_eq!(children.len(), 2);
        assert_eq!(children[0].as_text().unwrap().text, "ab");
        assert_eq!(children[1].as_text().unwrap().text, "c");
    }

    #[test]
    fn test_text_split_is_char_based() {
        let t = TextLeaf::new("héllo", vec![]);
        let (left, right) = t.split_at(2);
        assert_eq!(left.text, "hé");
        assert_eq!(right.text, "llo");
    }
}
