//! # Attribute Inspector
//!
//! Reads and writes node and mark attributes through transactions.
//!
//! Each commit issues one transaction replacing only the targeted
//! attribute, mark attribute or data entry; everything else on the node
//! is preserved. Commits carry the node identity observed when the panel
//! opened — if the node has since been removed or replaced, the commit
//! resolves to nothing instead of re-creating state.

use serde::Serialize;
use serde_json::Value;

use pubweave_model::{embedding_of, Element, Node, Schema, ATTR_DATA, ATTR_ID};

use crate::transaction::Transaction;

/// Ephemeral inspector state, derived from the current selection or an
/// overlay click. Never serialized with the document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PanelState {
    pub active: Option<ActiveNode>,
    /// Upload failure surfaced inline; the node stays attribute-incomplete
    /// so the user can retry
    pub upload_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveNode {
    pub pos: usize,
    /// `id` attribute at activation time, used to detect replacement
    pub node_id: Option<String>,
    pub geometry: Option<OverlayGeometry>,
}

/// Where the overlay sits in the host viewport; supplied by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayGeometry {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// One editable row in the panel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldDescriptor {
    Attr {
        key: String,
        value: Value,
    },
    MarkAttr {
        mark_index: usize,
        mark_type: String,
        key: String,
        value: Value,
    },
    DataEntry {
        key: String,
        value: Value,
    },
    /// Media nodes route to the dedicated upload view instead of generic
    /// key/value rows
    Upload {
        src: Option<String>,
    },
}

/// Editable field descriptors for the active node
pub fn fields_for(schema: &Schema, node: &Node) -> Vec<FieldDescriptor> {
    let mut fields = Vec::new();
    match node {
        Node::Element(el) => {
            let Some(spec) = schema.node_spec(&el.type_name) else {
                return fields;
            };
            if spec.media {
                fields.push(FieldDescriptor::Upload {
                    src: el.attr_str("src").map(str::to_string),
                });
                return fields;
            }
            for (key, default) in &spec.attrs {
                if key == ATTR_DATA {
                    continue;
                }
                let value = el.attrs.get(key).unwrap_or(default).clone();
                fields.push(FieldDescriptor::Attr {
                    key: key.clone(),
                    value,
                });
            }
            if embedding_of(schema, el).is_some() {
                if let Some(Value::Object(data)) = el.attrs.get(ATTR_DATA) {
                    for (key, value) in data {
                        fields.push(FieldDescriptor::DataEntry {
                            key: key.clone(),
                            value: value.clone(),
                        });
                    }
                }
            }
        }
        Node::Text(leaf) => {
            for (index, mark) in leaf.marks.iter().enumerate() {
                let Some(spec) = schema.mark_spec(&mark.type_name) else {
                    continue;
                };
                for (key, default) in &spec.attrs {
                    let value = mark.attrs.get(key).unwrap_or(default).clone();
                    fields.push(FieldDescriptor::MarkAttr {
                        mark_index: index,
                        mark_type: mark.type_name.clone(),
                        key: key.clone(),
                        value,
                    });
                }
            }
        }
    }
    fields
}

/// Transaction replacing one attribute of the element at `pos`, or `None`
/// when the node is gone or has been replaced since the panel opened.
pub fn commit_attr(
    schema: &Schema,
    doc: &Element,
    pos: usize,
    expected_id: Option<&str>,
    key: impl Into<String>,
    value: Value,
) -> Option<Transaction> {
    let key = key.into();
    let el = element_if_current(schema, doc, pos, expected_id)?;
    if !schema.has_attr(&el.type_name, &key) {
        return None;
    }
    Some(Transaction::set_node_attr(pos, key, value))
}

/// Transaction replacing one attribute of one mark on the text leaf at
/// `pos`; `None` when the leaf or mark no longer exists.
pub fn commit_mark_attr(
    schema: &Schema,
    doc: &Element,
    pos: usize,
    mark_index: usize,
    key: impl Into<String>,
    value: Value,
) -> Option<Transaction> {
    let leaf = doc.node_at(schema, pos)?.as_text()?;
    leaf.marks.get(mark_index)?;
    Some(Transaction::set_mark_attr(pos, mark_index, key, value))
}

/// Transaction replacing one entry of the embedding's `data` snapshot
pub fn commit_data_attr(
    schema: &Schema,
    doc: &Element,
    pos: usize,
    expected_id: Option<&str>,
    key: impl Into<String>,
    value: Value,
) -> Option<Transaction> {
    let el = element_if_current(schema, doc, pos, expected_id)?;
    embedding_of(schema, el)?;
    Some(Transaction::set_data_entry(pos, key, value))
}

fn element_if_current<'a>(
    schema: &Schema,
    doc: &'a Element,
    pos: usize,
    expected_id: Option<&str>,
) -> Option<&'a Element> {
    let el = doc.node_at(schema, pos)?.as_element()?;
    if el.attr_str(ATTR_ID) != expected_id {
        return None;
    }
    Some(el)
}
