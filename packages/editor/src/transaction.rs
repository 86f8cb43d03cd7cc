//! # Transactions
//!
//! Atomic, all-or-nothing tree mutations.
//!
//! ## Design Principles
//!
//! 1. **Validated**: every step checks structural constraints against the
//!    schema before the new children are handed back to the tree
//! 2. **All-or-nothing**: steps apply to a cloned tree; any failure
//!    discards the clone and the previous version stays current
//! 3. **Positional**: steps address the flattened position space, never
//!    node references
//! 4. **Mapped**: each step yields a [`StepMap`] so selections and other
//!    ephemeral positions can be carried to the next version
//!
//! ## Replace Semantics
//!
//! A replace range must resolve against the tree in one of three ways:
//! an inline splice inside a single text block (text leaves split at the
//! boundaries, identical adjacent marks coalesce), a child-slice
//! replacement aligned with node boundaries, or a text block split when
//! block nodes land inside inline content (the surrounding halves keep
//! the text block's type, emptied halves are dropped). Anything else is
//! rejected as unaligned.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use pubweave_model::{
    coalesce_text, Element, Mark, Node, Schema, TextLeaf, ATTR_DATA, ATTR_ID,
};

use crate::errors::{TransactionError, TxResult};
use crate::state::Selection;

/// One positional mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Replace the range with the given nodes
    Replace {
        from: usize,
        to: usize,
        nodes: Vec<Node>,
    },

    /// Insert a text run at a position
    InsertText {
        pos: usize,
        text: String,
        #[serde(default)]
        marks: Vec<Mark>,
    },

    /// Remove the range
    Delete { from: usize, to: usize },

    /// Apply a mark across the range
    AddMark { from: usize, to: usize, mark: Mark },

    /// Strip a mark type across the range
    RemoveMark {
        from: usize,
        to: usize,
        mark_type: String,
    },

    /// Replace a single node attribute, preserving every other attribute
    SetNodeAttr {
        pos: usize,
        key: String,
        value: Value,
    },

    /// Replace a single attribute of one mark on a text leaf
    SetMarkAttr {
        pos: usize,
        mark_index: usize,
        key: String,
        value: Value,
    },

    /// Replace a single entry of an embedding node's `data` snapshot
    SetDataEntry {
        pos: usize,
        key: String,
        value: Value,
    },
}

/// Range mapping produced by one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    pub start: usize,
    pub old_end: usize,
    pub new_end: usize,
}

impl StepMap {
    pub fn identity() -> Self {
        Self {
            start: 0,
            old_end: 0,
            new_end: 0,
        }
    }

    /// Carry a position across this step
    pub fn map(&self, pos: usize) -> usize {
        if pos <= self.start {
            pos
        } else if pos >= self.old_end {
            pos - self.old_end + self.new_end
        } else {
            self.new_end
        }
    }
}

/// The composed maps of a whole transaction
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new(maps: Vec<StepMap>) -> Self {
        Self { maps }
    }

    pub fn map(&self, pos: usize) -> usize {
        self.maps.iter().fold(pos, |p, m| m.map(p))
    }
}

/// An atomic group of steps, optionally carrying a new selection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transaction {
    pub steps: Vec<Step>,
    pub selection: Option<Selection>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn replace(from: usize, to: usize, nodes: Vec<Node>) -> Self {
        Self::new().step(Step::Replace { from, to, nodes })
    }

    pub fn insert_text(pos: usize, text: impl Into<String>) -> Self {
        Self::new().step(Step::InsertText {
            pos,
            text: text.into(),
            marks: Vec::new(),
        })
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Self::new().step(Step::Delete { from, to })
    }

    pub fn set_node_attr(pos: usize, key: impl Into<String>, value: Value) -> Self {
        Self::new().step(Step::SetNodeAttr {
            pos,
            key: key.into(),
            value,
        })
    }

    pub fn set_mark_attr(
        pos: usize,
        mark_index: usize,
        key: impl Into<String>,
        value: Value,
    ) -> Self {
        Self::new().step(Step::SetMarkAttr {
            pos,
            mark_index,
            key: key.into(),
            value,
        })
    }

    pub fn set_data_entry(pos: usize, key: impl Into<String>, value: Value) -> Self {
        Self::new().step(Step::SetDataEntry {
            pos,
            key: key.into(),
            value,
        })
    }

    pub fn selection_only(selection: Selection) -> Self {
        Self::new().with_selection(selection)
    }
}

impl Step {
    /// Apply this step to the tree, validating structural constraints
    pub fn apply(&self, schema: &Schema, doc: &mut Element) -> TxResult<StepMap> {
        match self {
            Step::Replace { from, to, nodes } => replace_step(schema, doc, *from, *to, nodes),

            Step::InsertText { pos, text, marks } => {
                if text.is_empty() {
                    return Ok(StepMap::identity());
                }
                let leaf = Node::Text(TextLeaf::new(text.clone(), marks.clone()));
                replace_step(schema, doc, *pos, *pos, &[leaf])
            }

            Step::Delete { from, to } => replace_step(schema, doc, *from, *to, &[]),

            Step::AddMark { from, to, mark } => {
                if schema.mark_spec(&mark.type_name).is_none() {
                    return Err(TransactionError::invalid_structure(format!(
                        "unknown mark type {}",
                        mark.type_name
                    )));
                }
                mark_range(schema, doc, *from, *to, &MarkOp::Add(mark))?;
                Ok(StepMap::identity())
            }

            Step::RemoveMark {
                from,
                to,
                mark_type,
            } => {
                mark_range(schema, doc, *from, *to, &MarkOp::Remove(mark_type))?;
                Ok(StepMap::identity())
            }

            Step::SetNodeAttr { pos, key, value } => {
                let node = doc
                    .node_at_mut(schema, *pos)
                    .ok_or(TransactionError::NoNodeAt(*pos))?;
                let Node::Element(el) = node else {
                    return Err(TransactionError::NotAnElement(*pos));
                };
                if !schema.has_attr(&el.type_name, key) {
                    return Err(TransactionError::UnknownAttr {
                        type_name: el.type_name.clone(),
                        key: key.clone(),
                    });
                }
                el.attrs.insert(key.clone(), value.clone());
                Ok(StepMap::identity())
            }

            Step::SetMarkAttr {
                pos,
                mark_index,
                key,
                value,
            } => {
                let node = doc
                    .node_at_mut(schema, *pos)
                    .ok_or(TransactionError::NoNodeAt(*pos))?;
                let Node::Text(leaf) = node else {
                    return Err(TransactionError::NotText(*pos));
                };
                let mark =
                    leaf.marks
                        .get_mut(*mark_index)
                        .ok_or(TransactionError::MarkIndexOutOfRange {
                            pos: *pos,
                            index: *mark_index,
                        })?;
                let declared = schema
                    .mark_spec(&mark.type_name)
                    .map(|spec| spec.attrs.contains_key(key))
                    .unwrap_or(false);
                if !declared {
                    return Err(TransactionError::UnknownAttr {
                        type_name: mark.type_name.clone(),
                        key: key.clone(),
                    });
                }
                mark.attrs.insert(key.clone(), value.clone());
                Ok(StepMap::identity())
            }

            Step::SetDataEntry { pos, key, value } => {
                let is_embedding = match doc.node_at(schema, *pos) {
                    Some(Node::Element(el)) => schema
                        .node_spec(&el.type_name)
                        .map(|spec| spec.embedding.is_some())
                        .unwrap_or(false),
                    Some(_) => return Err(TransactionError::NotAnElement(*pos)),
                    None => return Err(TransactionError::NoNodeAt(*pos)),
                };
                if !is_embedding {
                    return Err(TransactionError::NotAnEmbedding(*pos));
                }
                let Some(Node::Element(el)) = doc.node_at_mut(schema, *pos) else {
                    return Err(TransactionError::NoNodeAt(*pos));
                };
                let data = el
                    .attrs
                    .entry(ATTR_DATA.to_string())
                    .or_insert_with(|| json!({}));
                if !data.is_object() {
                    *data = json!({});
                }
                if let Value::Object(map) = data {
                    map.insert(key.clone(), value.clone());
                }
                Ok(StepMap::identity())
            }
        }
    }
}

fn replace_step(
    schema: &Schema,
    doc: &mut Element,
    from: usize,
    to: usize,
    nodes: &[Node],
) -> TxResult<StepMap> {
    if from > to {
        return Err(TransactionError::RangeNotAligned { from, to });
    }
    let before = doc.content_size(schema);
    if to > before {
        return Err(TransactionError::OutOfBounds(to));
    }

    replace_in_element(schema, doc, from, to, nodes)?;

    let after = doc.content_size(schema);
    let new_end = (to as i64 + after as i64 - before as i64) as usize;
    Ok(StepMap {
        start: from,
        old_end: to,
        new_end,
    })
}

fn replace_in_element(
    schema: &Schema,
    el: &mut Element,
    from: usize,
    to: usize,
    nodes: &[Node],
) -> TxResult<()> {
    if schema.is_textblock(&el.type_name) {
        if !nodes.iter().all(|n| n.is_inline(schema)) {
            return Err(TransactionError::invalid_structure(
                "block content inside a text block",
            ));
        }
        return splice_inline(schema, el, from, to, nodes);
    }

    let (start_idx, start_off) = el
        .index_at(schema, from)
        .ok_or(TransactionError::OutOfBounds(from))?;
    let (end_idx, end_off) = el
        .index_at(schema, to)
        .ok_or(TransactionError::OutOfBounds(to))?;

    // range strictly inside one child element: descend, or split the
    // child when block nodes land in inline content
    if start_idx == end_idx && start_off > 0 {
        let all_inline = nodes.iter().all(|n| n.is_inline(schema));
        let child_is_textblock = matches!(
            &el.content[start_idx],
            Node::Element(c) if schema.is_textblock(&c.type_name)
        );

        if child_is_textblock && !all_inline {
            return split_textblock(schema, el, start_idx, start_off - 1, end_off - 1, nodes);
        }

        let Node::Element(child) = &mut el.content[start_idx] else {
            return Err(TransactionError::RangeNotAligned { from, to });
        };
        return replace_in_element(schema, child, start_off - 1, end_off - 1, nodes);
    }

    if start_off != 0 || end_off != 0 {
        return Err(TransactionError::RangeNotAligned { from, to });
    }

    let mut new_children = Vec::with_capacity(el.content.len() + nodes.len());
    new_children.extend_from_slice(&el.content[..start_idx]);
    new_children.extend_from_slice(nodes);
    new_children.extend_from_slice(&el.content[end_idx..]);

    if !schema.validate_content(&el.type_name, &new_children) {
        return Err(TransactionError::invalid_structure(format!(
            "children of {} violate its content rule",
            el.type_name
        )));
    }
    el.content = new_children;
    Ok(())
}

/// Splice inline nodes into a text block's content span
fn splice_inline(
    schema: &Schema,
    el: &mut Element,
    from: usize,
    to: usize,
    nodes: &[Node],
) -> TxResult<()> {
    let cs = el.content_size(schema);
    if to > cs {
        return Err(TransactionError::OutOfBounds(to));
    }

    let mut new_content = inline_slice(schema, &el.content, 0, from);
    new_content.extend(nodes.iter().cloned());
    new_content.extend(inline_slice(schema, &el.content, to, cs));
    coalesce_text(&mut new_content);

    if !schema.validate_content(&el.type_name, &new_content) {
        return Err(TransactionError::invalid_structure(format!(
            "children of {} violate its content rule",
            el.type_name
        )));
    }
    el.content = new_content;
    Ok(())
}

/// Split a text block child around the range and splice block nodes in.
/// Emptied halves are dropped; the trailing half is a new node and loses
/// the original's id.
fn split_textblock(
    schema: &Schema,
    el: &mut Element,
    idx: usize,
    inner_from: usize,
    inner_to: usize,
    nodes: &[Node],
) -> TxResult<()> {
    let Node::Element(child) = &el.content[idx] else {
        return Err(TransactionError::invalid_structure("expected a text block"));
    };
    let cs = child.content_size(schema);
    if inner_to > cs {
        return Err(TransactionError::OutOfBounds(inner_to));
    }

    let before = inline_slice(schema, &child.content, 0, inner_from);
    let after = inline_slice(schema, &child.content, inner_to, cs);

    let mut replacement: Vec<Node> = Vec::new();
    if !before.is_empty() {
        replacement.push(Node::Element(Element {
            type_name: child.type_name.clone(),
            attrs: child.attrs.clone(),
            content: before,
        }));
    }
    replacement.extend(nodes.iter().cloned());
    if !after.is_empty() {
        let mut attrs = child.attrs.clone();
        attrs.remove(ATTR_ID);
        replacement.push(Node::Element(Element {
            type_name: child.type_name.clone(),
            attrs,
            content: after,
        }));
    }

    let mut new_children = Vec::with_capacity(el.content.len() + replacement.len());
    new_children.extend_from_slice(&el.content[..idx]);
    new_children.extend(replacement);
    new_children.extend_from_slice(&el.content[idx + 1..]);

    if !schema.validate_content(&el.type_name, &new_children) {
        return Err(TransactionError::invalid_structure(format!(
            "children of {} violate its content rule",
            el.type_name
        )));
    }
    el.content = new_children;
    Ok(())
}

/// Cut the inline content between two offsets, splitting text leaves at
/// the boundaries
fn inline_slice(schema: &Schema, children: &[Node], from: usize, to: usize) -> Vec<Node> {
    let mut out = Vec::new();
    let mut off = 0;
    for child in children {
        let size = child.size(schema);
        let (start, end) = (off, off + size);
        off = end;
        if end <= from || start >= to {
            continue;
        }
        let s = from.max(start) - start;
        let e = to.min(end) - start;
        match child {
            Node::Text(t) => {
                let (_, rest) = t.split_at(s);
                let (mid, _) = rest.split_at(e - s);
                if !mid.is_empty() {
                    out.push(Node::Text(mid));
                }
            }
            Node::Element(_) => {
                if s == 0 && e == size {
                    out.push(child.clone());
                }
            }
        }
    }
    coalesce_text(&mut out);
    out
}

enum MarkOp<'a> {
    Add(&'a Mark),
    Remove(&'a str),
}

fn mark_range(
    schema: &Schema,
    el: &mut Element,
    from: usize,
    to: usize,
    op: &MarkOp<'_>,
) -> TxResult<()> {
    if from >= to {
        return Ok(());
    }
    let cs = el.content_size(schema);
    if to > cs {
        return Err(TransactionError::OutOfBounds(to));
    }

    let mut new_content = Vec::with_capacity(el.content.len());
    let mut off = 0;
    for child in &el.content {
        let size = child.size(schema);
        let (start, end) = (off, off + size);
        off = end;
        if end <= from || start >= to {
            new_content.push(child.clone());
            continue;
        }
        match child {
            Node::Text(t) => {
                let s = from.max(start) - start;
                let e = to.min(end) - start;
                let (left, rest) = t.split_at(s);
                let (mut mid, right) = rest.split_at(e - s);
                apply_mark_op(&mut mid.marks, op);
                for leaf in [left, mid, right] {
                    if !leaf.is_empty() {
                        new_content.push(Node::Text(leaf));
                    }
                }
            }
            Node::Element(c) if !schema.is_leaf(&c.type_name) => {
                let mut inner = c.clone();
                let inner_from = from.max(start + 1) - (start + 1);
                let inner_to = to.min(end - 1) - (start + 1);
                mark_range(schema, &mut inner, inner_from, inner_to, op)?;
                new_content.push(Node::Element(inner));
            }
            other => new_content.push(other.clone()),
        }
    }
    coalesce_text(&mut new_content);
    el.content = new_content;
    Ok(())
}

fn apply_mark_op(marks: &mut Vec<Mark>, op: &MarkOp<'_>) {
    match op {
        MarkOp::Add(mark) => {
            if let Some(existing) = marks
                .iter_mut()
                .find(|m| m.type_name == mark.type_name)
            {
                *existing = (*mark).clone();
            } else {
                marks.push((*mark).clone());
            }
        }
        MarkOp::Remove(mark_type) => {
            marks.retain(|m| m.type_name != *mark_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubweave_model::{Mark, Schema};

    fn schema() -> Schema {
        Schema::default_document_schema().unwrap()
    }

    fn para(text: &str) -> Node {
        Node::Element(Element::new("paragraph").with_child(Node::text(text)))
    }

    fn doc(children: Vec<Node>) -> Element {
        Element::new("doc").with_children(children)
    }

    #[test]
    fn test_insert_text_inside_paragraph() {
        let s = schema();
        let mut d = doc(vec![para("helo")]);

        // caret between "he" and "lo": paragraph opens at 0, text at 1
        let map = Step::InsertText {
            pos: 3,
            text: "l".into(),
            marks: vec![],
        }
        .apply(&s, &mut d)
        .unwrap();

        let p = d.content[0].as_element().unwrap();
        assert_eq!(p.content.len(), 1);
        assert_eq!(p.content[0].as_text().unwrap().text, "hello");
        assert_eq!(map.map(6), 7); // positions after the caret shift right
        assert_eq!(map.map(2), 2);
    }

    #[test]
    fn test_delete_text_range() {
        let s = schema();
        let mut d = doc(vec![para("hello world")]);

        Step::Delete { from: 6, to: 12 }.apply(&s, &mut d).unwrap();

        let p = d.content[0].as_element().unwrap();
        assert_eq!(p.content[0].as_text().unwrap().text, "hello");
    }

    #[test]
    fn test_replace_rejects_block_at_inline_offset_misaligned() {
        let s = schema();
        let mut d = doc(vec![para("ab"), para("cd")]);

        // range spanning from inside the first paragraph into the second
        let err = Step::Delete { from: 2, to: 6 }.apply(&s, &mut d).unwrap_err();
        assert!(matches!(err, TransactionError::RangeNotAligned { .. }));

        // tree untouched
        assert_eq!(d, doc(vec![para("ab"), para("cd")]));
    }

    #[test]
    fn test_replace_whole_block_at_boundaries() {
        let s = schema();
        let mut d = doc(vec![para("ab"), para("cd")]);

        // first paragraph occupies 0..4
        Step::Replace {
            from: 0,
            to: 4,
            nodes: vec![Node::element("image")],
        }
        .apply(&s, &mut d)
        .unwrap();

        assert_eq!(d.content.len(), 2);
        assert_eq!(d.content[0].as_element().unwrap().type_name, "image");
    }

    #[test]
    fn test_structural_violation_is_rejected_before_application() {
        let s = schema();
        let original = doc(vec![para("ab")]);
        let mut d = original.clone();

        // a bare text leaf is not valid doc content
        let err = Step::Replace {
            from: 0,
            to: 4,
            nodes: vec![Node::text("loose")],
        }
        .apply(&s, &mut d)
        .unwrap_err();

        assert!(matches!(err, TransactionError::InvalidStructure(_)));
        assert_eq!(d, original);
    }

    #[test]
    fn test_block_insert_splits_text_block() {
        let s = schema();
        let mut d = doc(vec![para("before after")]);

        // split between "before" and " after": inner offsets 1+6
        Step::Replace {
            from: 7,
            to: 7,
            nodes: vec![Node::element("image")],
        }
        .apply(&s, &mut d)
        .unwrap();

        assert_eq!(d.content.len(), 3);
        assert_eq!(
            d.content[0].as_element().unwrap().content[0]
                .as_text()
                .unwrap()
                .text,
            "before"
        );
        assert_eq!(d.content[1].as_element().unwrap().type_name, "image");
        assert_eq!(
            d.content[2].as_element().unwrap().content[0]
                .as_text()
                .unwrap()
                .text,
            " after"
        );
    }

    #[test]
    fn test_block_insert_drops_emptied_halves() {
        let s = schema();
        let mut d = doc(vec![para("x")]);

        // replace the paragraph's whole interior with a block
        Step::Replace {
            from: 1,
            to: 2,
            nodes: vec![Node::element("image")],
        }
        .apply(&s, &mut d)
        .unwrap();

        assert_eq!(d.content.len(), 1);
        assert_eq!(d.content[0].as_element().unwrap().type_name, "image");
    }

    #[test]
    fn test_add_mark_splits_and_coalesces() {
        let s = schema();
        let mut d = doc(vec![para("hello world")]);

        Step::AddMark {
            from: 1,
            to: 6,
            mark: Mark::new("strong"),
        }
        .apply(&s, &mut d)
        .unwrap();

        let p = d.content[0].as_element().unwrap();
        assert_eq!(p.content.len(), 2);
        assert_eq!(p.content[0].as_text().unwrap().text, "hello");
        assert_eq!(p.content[0].as_text().unwrap().marks, vec![Mark::new("strong")]);
        assert_eq!(p.content[1].as_text().unwrap().text, " world");
        assert!(p.content[1].as_text().unwrap().marks.is_empty());

        Step::RemoveMark {
            from: 1,
            to: 6,
            mark_type: "strong".into(),
        }
        .apply(&s, &mut d)
        .unwrap();

        let p = d.content[0].as_element().unwrap();
        assert_eq!(p.content.len(), 1);
        assert_eq!(p.content[0].as_text().unwrap().text, "hello world");
    }

    #[test]
    fn test_set_node_attr_preserves_other_attrs() {
        let s = schema();
        let mut d = doc(vec![Node::Element(
            Element::new("heading")
                .with_attr("level", 2)
                .with_attr("id", "intro")
                .with_child(Node::text("t")),
        )]);

        Step::SetNodeAttr {
            pos: 0,
            key: "level".into(),
            value: json!(3),
        }
        .apply(&s, &mut d)
        .unwrap();

        let h = d.content[0].as_element().unwrap();
        assert_eq!(h.attrs["level"], json!(3));
        assert_eq!(h.attrs["id"], json!("intro"));
        assert_eq!(h.content[0].as_text().unwrap().text, "t");
    }

    #[test]
    fn test_set_undeclared_attr_is_rejected() {
        let s = schema();
        let mut d = doc(vec![para("x")]);

        let err = Step::SetNodeAttr {
            pos: 0,
            key: "sidebar".into(),
            value: json!(true),
        }
        .apply(&s, &mut d)
        .unwrap_err();

        assert!(matches!(err, TransactionError::UnknownAttr { .. }));
    }

    #[test]
    fn test_set_mark_attr_targets_one_mark() {
        let s = schema();
        let mut d = doc(vec![Node::Element(Element::new("paragraph").with_child(
            Node::marked_text(
                "link",
                vec![
                    Mark::new("em"),
                    Mark::new("link").with_attr("href", "https://old.example"),
                ],
            ),
        ))]);

        Step::SetMarkAttr {
            pos: 1,
            mark_index: 1,
            key: "href".into(),
            value: json!("https://new.example"),
        }
        .apply(&s, &mut d)
        .unwrap();

        let leaf = d.content[0].as_element().unwrap().content[0].as_text().unwrap();
        assert_eq!(leaf.marks[0], Mark::new("em"));
        assert_eq!(leaf.marks[1].attrs["href"], json!("https://new.example"));
    }

    #[test]
    fn test_set_data_entry_on_embedding_only() {
        let s = schema();
        let mut d = doc(vec![
            Node::Element(
                Element::new(pubweave_model::NODE_CONTEXT_ATOM)
                    .with_attr("pubId", "p1")
                    .with_attr(ATTR_DATA, json!({"name": "Ada", "orcid": "x"})),
            ),
            para("plain"),
        ]);

        Step::SetDataEntry {
            pos: 0,
            key: "name".into(),
            value: json!("Grace"),
        }
        .apply(&s, &mut d)
        .unwrap();

        let atom = d.content[0].as_element().unwrap();
        assert_eq!(atom.attrs[ATTR_DATA]["name"], json!("Grace"));
        assert_eq!(atom.attrs[ATTR_DATA]["orcid"], json!("x"));

        let err = Step::SetDataEntry {
            pos: 1,
            key: "name".into(),
            value: json!("nope"),
        }
        .apply(&s, &mut d)
        .unwrap_err();
        assert_eq!(err, TransactionError::NotAnEmbedding(1));
    }

    #[test]
    fn test_insert_coalesces_with_neighbouring_run() {
        let s = schema();
        let mut d = doc(vec![para("ac")]);

        Step::InsertText {
            pos: 2,
            text: "b".into(),
            marks: vec![],
        }
        .apply(&s, &mut d)
        .unwrap();

        let p = d.content[0].as_element().unwrap();
        assert_eq!(p.content.len(), 1);
        assert_eq!(p.content[0].as_text().unwrap().text, "abc");
    }
}
