//! # Overlay Derivation
//!
//! Ephemeral UI affordances derived purely from tree state.
//!
//! `compute_overlays` is a pure function: tree in, overlay list out. It is
//! recomputed in full after every transaction and never issues one itself.
//! Clicking an overlay does not mutate anything either — overlays emit
//! [`OverlayIntent`] messages consumed by the editor's reducer, which owns
//! all ephemeral UI state.

use serde::Serialize;
use serde_json::Value;

use pubweave_model::{embedding_of, Element, EmbeddingRef, Node, NodeSpec, RecordTypeTable, Schema};

/// One decoration entry, positioned at a node's tree coordinate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlay {
    pub pos: usize,
    pub kind: OverlayKind,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Block,
    Inline,
    Embedding,
}

/// Message emitted by an overlay click; the editor reducer consumes these
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayIntent {
    Select { pos: usize },
}

impl Overlay {
    /// The intent a click on this overlay emits
    pub fn intent(&self) -> OverlayIntent {
        OverlayIntent::Select { pos: self.pos }
    }
}

/// Context needed to label embedding overlays
#[derive(Debug, Clone, Copy)]
pub struct OverlayEnv<'a> {
    /// The record owning the edited document; embeddings bound to it are
    /// "local", everything else is "foreign"
    pub parent_pub_id: &'a str,
    pub record_types: &'a RecordTypeTable,
}

/// Derive one overlay per block node and per annotated inline leaf.
///
/// Nodes under a tabular ancestor are exempt, to avoid overlay clutter
/// inside grids.
pub fn compute_overlays(schema: &Schema, doc: &Element, env: &OverlayEnv) -> Vec<Overlay> {
    let mut overlays = Vec::new();
    doc.descendants(schema, &mut |node, pos, ancestors| {
        if ancestors.iter().any(|name| is_tabular(schema, name)) {
            return;
        }
        match node {
            Node::Element(el) => {
                let Some(spec) = schema.node_spec(&el.type_name) else {
                    return;
                };
                if let Some(embed) = embedding_of(schema, el) {
                    overlays.push(Overlay {
                        pos,
                        kind: OverlayKind::Embedding,
                        label: embed_label(&embed, env),
                    });
                } else if !spec.inline {
                    overlays.push(Overlay {
                        pos,
                        kind: OverlayKind::Block,
                        label: block_label(el, spec),
                    });
                } else if spec.always_annotate {
                    overlays.push(Overlay {
                        pos,
                        kind: OverlayKind::Inline,
                        label: el.type_name.clone(),
                    });
                }
            }
            Node::Text(t) => {
                if !t.marks.is_empty() {
                    overlays.push(Overlay {
                        pos,
                        kind: OverlayKind::Inline,
                        label: "text".to_string(),
                    });
                }
            }
        }
    });
    overlays
}

fn is_tabular(schema: &Schema, type_name: &str) -> bool {
    schema
        .node_spec(type_name)
        .map(|spec| spec.tabular)
        .unwrap_or(false)
}

/// Ordinary nodes are labeled by type name; nodes carrying a `level`
/// attribute (headings) additionally show it.
fn block_label(el: &Element, _spec: &NodeSpec) -> String {
    match el.attrs.get("level").and_then(Value::as_i64) {
        Some(level) => format!("{} {}", el.type_name, level),
        None => el.type_name.clone(),
    }
}

/// Local bindings show the bound field (`~Name`), foreign bindings the
/// target record's type (`/Type`).
fn embed_label(embed: &EmbeddingRef<'_>, env: &OverlayEnv) -> String {
    let local = embed.pub_id == Some(env.parent_pub_id);
    if local {
        let slug = embed.resolved_field_slug();
        let display = embed
            .pub_type_id
            .and_then(|ty| env.record_types.field_name(ty, slug))
            .unwrap_or(slug);
        format!("~{}", display)
    } else {
        let type_name = embed
            .pub_type_id
            .map(|ty| {
                env.record_types
                    .get(ty)
                    .map(|t| t.name.as_str())
                    .unwrap_or(ty)
            })
            .unwrap_or("unknown");
        format!("/{}", type_name)
    }
}
