//! # Embedding Nodes
//!
//! ContextAtom and ContextDoc bind a slice of the document to an external
//! record and one of its fields.
//!
//! ContextAtom is a leaf: the target record has no natural rich-text body,
//! so the node carries a `data` snapshot of field values. ContextDoc holds
//! ordinary block children: the target's primary field *is* rich text and
//! is edited in place as part of the parent document.
//!
//! Construction is atomic by design: the single element returned here is
//! inserted by a single transaction step, so a partially-initialized
//! embedding is never observable.

use serde_json::{json, Map, Value};

use crate::error::{SchemaError, SchemaResult};
use crate::id_generator::{new_record_id, IdGenerator};
use crate::node::{Element, Node};
use crate::record::{RecordSummary, RecordTypeTable, CONTENT_FIELD_SLUG};
use crate::schema::{EmbeddingKind, Schema};

pub const NODE_CONTEXT_ATOM: &str = "context_atom";
pub const NODE_CONTEXT_DOC: &str = "context_doc";

pub const ATTR_ID: &str = "id";
pub const ATTR_CLASS: &str = "class";
pub const ATTR_PUB_ID: &str = "pubId";
pub const ATTR_PUB_TYPE_ID: &str = "pubTypeId";
pub const ATTR_PARENT_PUB_ID: &str = "parentPubId";
pub const ATTR_FIELD_SLUG: &str = "fieldSlug";
pub const ATTR_DATA: &str = "data";

/// The embedding capability of a concrete element, read through the schema
/// rather than by matching type names.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbeddingRef<'a> {
    pub kind: EmbeddingKind,
    pub pub_id: Option<&'a str>,
    pub pub_type_id: Option<&'a str>,
    pub field_slug: Option<&'a str>,
}

impl<'a> EmbeddingRef<'a> {
    /// Bound field, defaulting to the canonical content field when unset
    pub fn resolved_field_slug(&self) -> &'a str {
        self.field_slug.unwrap_or(CONTENT_FIELD_SLUG)
    }
}

/// Read the embedding capability of an element, if its type declares one
pub fn embedding_of<'a>(schema: &Schema, el: &'a Element) -> Option<EmbeddingRef<'a>> {
    let kind = schema.node_spec(&el.type_name)?.embedding?;
    Some(EmbeddingRef {
        kind,
        pub_id: el.attr_str(ATTR_PUB_ID),
        pub_type_id: el.attr_str(ATTR_PUB_TYPE_ID),
        field_slug: el.attr_str(ATTR_FIELD_SLUG),
    })
}

/// What a suggestion commit points the embedding at
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedTarget {
    /// An existing record found by the host search
    ExistingRecord(RecordSummary),
    /// A fresh record of a chosen type
    NewRecord { type_id: String },
    /// A field of the record owning the current document
    LocalField { slug: String },
}

/// The document's owning record, threaded in explicitly
#[derive(Debug, Clone, Copy)]
pub struct EmbedContext<'a> {
    pub parent_pub_id: &'a str,
    pub parent_pub_type_id: &'a str,
}

/// Resolve a record summary by id (backed by the host's `get_record`)
pub type RecordLookup<'a> = &'a dyn Fn(&str) -> Option<RecordSummary>;

/// Build the embedding node for a target.
///
/// Decision rule: a target bound to rich-text content — a local field
/// reference, or a record whose type declares the canonical content field —
/// produces a ContextDoc seeded with the field's existing serialized
/// content (or a single empty paragraph). Anything else produces a
/// ContextAtom whose `data` snapshots the target's current field values;
/// a new record gets a freshly generated identifier and empty defaults.
///
/// An unresolvable record type aborts with no node built.
pub fn build_embedding(
    types: &RecordTypeTable,
    target: &EmbedTarget,
    ctx: EmbedContext<'_>,
    ids: &mut IdGenerator,
    lookup: RecordLookup<'_>,
) -> SchemaResult<Element> {
    match target {
        EmbedTarget::LocalField { slug } => {
            let ty = types
                .get(ctx.parent_pub_type_id)
                .ok_or_else(|| SchemaError::UnknownRecordType(ctx.parent_pub_type_id.into()))?;
            if ty.field(slug).is_none() {
                return Err(SchemaError::UnknownField {
                    type_id: ty.id.clone(),
                    slug: slug.clone(),
                });
            }
            let existing = lookup(ctx.parent_pub_id).and_then(|r| r.values.get(slug).cloned());
            Ok(embed_element(
                EmbeddingKind::Doc,
                ids,
                ctx,
                ctx.parent_pub_id,
                ctx.parent_pub_type_id,
                Some(slug),
                Map::new(),
                seed_content(existing.as_ref()),
            ))
        }

        EmbedTarget::ExistingRecord(summary) => {
            let ty = types
                .get(&summary.type_id)
                .ok_or_else(|| SchemaError::UnknownRecordType(summary.type_id.clone()))?;
            if ty.content_field().is_some() {
                Ok(embed_element(
                    EmbeddingKind::Doc,
                    ids,
                    ctx,
                    &summary.id,
                    &summary.type_id,
                    None,
                    Map::new(),
                    seed_content(summary.values.get(CONTENT_FIELD_SLUG)),
                ))
            } else {
                let mut data = Map::new();
                for (slug, value) in &summary.values {
                    data.insert(slug.clone(), value.clone());
                }
                Ok(embed_element(
                    EmbeddingKind::Atom,
                    ids,
                    ctx,
                    &summary.id,
                    &summary.type_id,
                    None,
                    data,
                    Vec::new(),
                ))
            }
        }

        EmbedTarget::NewRecord { type_id } => {
            let ty = types
                .get(type_id)
                .ok_or_else(|| SchemaError::UnknownRecordType(type_id.clone()))?;
            let record_id = new_record_id();
            if ty.content_field().is_some() {
                Ok(embed_element(
                    EmbeddingKind::Doc,
                    ids,
                    ctx,
                    &record_id,
                    type_id,
                    None,
                    Map::new(),
                    vec![empty_paragraph()],
                ))
            } else {
                // Every declared field starts as an empty string
                let mut data = Map::new();
                for field in &ty.fields {
                    data.insert(field.slug.clone(), json!(""));
                }
                Ok(embed_element(
                    EmbeddingKind::Atom,
                    ids,
                    ctx,
                    &record_id,
                    type_id,
                    None,
                    data,
                    Vec::new(),
                ))
            }
        }
    }
}

pub fn empty_paragraph() -> Node {
    Node::element("paragraph")
}

/// Deserialize a stored rich-text value, falling back to one empty paragraph
fn seed_content(value: Option<&Value>) -> Vec<Node> {
    value
        .and_then(|v| serde_json::from_value::<Vec<Node>>(v.clone()).ok())
        .filter(|nodes| !nodes.is_empty())
        .unwrap_or_else(|| vec![empty_paragraph()])
}

#[allow(clippy::too_many_arguments)]
fn embed_element(
    kind: EmbeddingKind,
    ids: &mut IdGenerator,
    ctx: EmbedContext<'_>,
    pub_id: &str,
    pub_type_id: &str,
    field_slug: Option<&str>,
    data: Map<String, Value>,
    content: Vec<Node>,
) -> Element {
    let type_name = match kind {
        EmbeddingKind::Atom => NODE_CONTEXT_ATOM,
        EmbeddingKind::Doc => NODE_CONTEXT_DOC,
    };
    Element::new(type_name)
        .with_attr(ATTR_ID, ids.new_id())
        .with_attr(ATTR_CLASS, Value::Null)
        .with_attr(ATTR_PUB_ID, pub_id)
        .with_attr(ATTR_PUB_TYPE_ID, pub_type_id)
        .with_attr(ATTR_PARENT_PUB_ID, ctx.parent_pub_id)
        .with_attr(
            ATTR_FIELD_SLUG,
            field_slug.map(Value::from).unwrap_or(Value::Null),
        )
        .with_attr(ATTR_DATA, Value::Object(data))
        .with_children(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldSpec, RecordType};
    use std::collections::BTreeMap;

    fn types() -> RecordTypeTable {
        RecordTypeTable::from_types(vec![
            RecordType {
                id: "article".into(),
                name: "Article".into(),
                fields: vec![
                    field(CONTENT_FIELD_SLUG, "Content", "rich-text"),
                    field("author", "Author", "string"),
                ],
            },
            RecordType {
                id: "person".into(),
                name: "Person".into(),
                fields: vec![field("name", "Name", "string"), field("orcid", "ORCID", "string")],
            },
        ])
        .unwrap()
    }

    fn field(slug: &str, name: &str, kind: &str) -> FieldSpec {
        FieldSpec {
            slug: slug.into(),
            name: name.into(),
            schema_kind: kind.into(),
        }
    }

    fn ctx<'a>() -> EmbedContext<'a> {
        EmbedContext {
            parent_pub_id: "root-pub",
            parent_pub_type_id: "article",
        }
    }

    fn no_lookup(_: &str) -> Option<RecordSummary> {
        None
    }

    #[test]
    fn test_type_with_content_field_builds_doc() {
        let mut ids = IdGenerator::new("root-pub");
        let summary = RecordSummary {
            id: "pub-2".into(),
            type_id: "article".into(),
            title: "Other".into(),
            values: BTreeMap::new(),
        };

        let el = build_embedding(
            &types(),
            &EmbedTarget::ExistingRecord(summary),
            ctx(),
            &mut ids,
            &no_lookup,
        )
        .unwrap();

        assert_eq!(el.type_name, NODE_CONTEXT_DOC);
        assert_eq!(el.attr_str(ATTR_PUB_ID), Some("pub-2"));
        assert_eq!(el.attr_str(ATTR_PARENT_PUB_ID), Some("root-pub"));
        // empty field value seeds one empty paragraph
        assert_eq!(el.content, vec![empty_paragraph()]);
    }

    #[test]
    fn test_type_without_content_field_builds_atom_with_snapshot() {
        let mut ids = IdGenerator::new("root-pub");
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), json!("Ada Lovelace"));
        let summary = RecordSummary {
            id: "person-1".into(),
            type_id: "person".into(),
            title: "Ada".into(),
            values,
        };

        let el = build_embedding(
            &types(),
            &EmbedTarget::ExistingRecord(summary),
            ctx(),
            &mut ids,
            &no_lookup,
        )
        .unwrap();

        assert_eq!(el.type_name, NODE_CONTEXT_ATOM);
        assert!(el.content.is_empty());
        assert_eq!(el.attrs[ATTR_DATA]["name"], json!("Ada Lovelace"));
    }

    #[test]
    fn test_new_record_gets_fresh_id_and_empty_defaults() {
        let mut ids = IdGenerator::new("root-pub");
        let el = build_embedding(
            &types(),
            &EmbedTarget::NewRecord {
                type_id: "person".into(),
            },
            ctx(),
            &mut ids,
            &no_lookup,
        )
        .unwrap();

        let pub_id = el.attr_str(ATTR_PUB_ID).unwrap();
        assert!(!pub_id.is_empty());
        assert_ne!(pub_id, "root-pub");
        assert_eq!(el.attrs[ATTR_DATA]["name"], json!(""));
        assert_eq!(el.attrs[ATTR_DATA]["orcid"], json!(""));
    }

    #[test]
    fn test_local_field_builds_doc_bound_to_parent() {
        let mut ids = IdGenerator::new("root-pub");
        let el = build_embedding(
            &types(),
            &EmbedTarget::LocalField {
                slug: "author".into(),
            },
            ctx(),
            &mut ids,
            &no_lookup,
        )
        .unwrap();

        assert_eq!(el.type_name, NODE_CONTEXT_DOC);
        assert_eq!(el.attr_str(ATTR_PUB_ID), Some("root-pub"));
        assert_eq!(el.attr_str(ATTR_FIELD_SLUG), Some("author"));
        assert_eq!(el.content, vec![empty_paragraph()]);
    }

    #[test]
    fn test_unknown_record_type_aborts() {
        let mut ids = IdGenerator::new("root-pub");
        let err = build_embedding(
            &types(),
            &EmbedTarget::NewRecord {
                type_id: "galaxy".into(),
            },
            ctx(),
            &mut ids,
            &no_lookup,
        )
        .unwrap_err();

        assert_eq!(err, SchemaError::UnknownRecordType("galaxy".into()));
    }

    #[test]
    fn test_existing_content_seeds_doc() {
        let mut ids = IdGenerator::new("root-pub");
        let stored = json!([{ "type": "paragraph", "content": [{ "text": "stored" }] }]);
        let lookup = move |id: &str| -> Option<RecordSummary> {
            (id == "root-pub").then(|| RecordSummary {
                id: "root-pub".into(),
                type_id: "article".into(),
                title: String::new(),
                values: BTreeMap::from([("author".to_string(), stored.clone())]),
            })
        };

        let el = build_embedding(
            &types(),
            &EmbedTarget::LocalField {
                slug: "author".into(),
            },
            ctx(),
            &mut ids,
            &lookup,
        )
        .unwrap();

        assert_eq!(el.content.len(), 1);
        let para = el.content[0].as_element().unwrap();
        assert_eq!(para.content[0].as_text().unwrap().text, "stored");
    }
}
