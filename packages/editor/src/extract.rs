//! # Pub Value Extractor
//!
//! Walks the final tree once at save time and produces per-record field
//! updates. Pure and deterministic for a fixed tree: no network, no
//! storage, no dependence on anything but the traversal.

use std::collections::BTreeMap;

use serde_json::Value;

use pubweave_model::{embedding_of, Element, EmbeddingKind, Node, Schema, CONTENT_FIELD_SLUG};

/// Partial field updates per record id
pub type FieldUpdates = BTreeMap<String, Value>;

/// Extract field updates for every record the tree touches.
///
/// The root record's canonical content field is set to the serialized
/// top-level content. Every embedding node then contributes its `data`
/// snapshot, and a ContextDoc additionally contributes its serialized
/// content under the bound field slug (defaulting to the canonical
/// content field). Contributions merge shallowly, last write wins in
/// depth-first traversal order.
pub fn extract(
    schema: &Schema,
    doc: &Element,
    root_record_id: &str,
) -> BTreeMap<String, FieldUpdates> {
    let mut result: BTreeMap<String, FieldUpdates> = BTreeMap::new();

    let mut root_entry = FieldUpdates::new();
    root_entry.insert(
        CONTENT_FIELD_SLUG.to_string(),
        serialize_content(&doc.content),
    );
    result.insert(root_record_id.to_string(), root_entry);

    doc.descendants(schema, &mut |node, _pos, _ancestors| {
        let Node::Element(el) = node else { return };
        let Some(embed) = embedding_of(schema, el) else {
            return;
        };
        let Some(pub_id) = embed.pub_id else { return };

        let entry = result.entry(pub_id.to_string()).or_default();
        if let Some(Value::Object(data)) = el.attrs.get(pubweave_model::ATTR_DATA) {
            for (key, value) in data {
                entry.insert(key.clone(), value.clone());
            }
        }
        if embed.kind == EmbeddingKind::Doc {
            entry.insert(
                embed.resolved_field_slug().to_string(),
                serialize_content(&el.content),
            );
        }
    });

    result
}

fn serialize_content(nodes: &[Node]) -> Value {
    serde_json::to_value(nodes).unwrap_or_else(|_| Value::Array(Vec::new()))
}
