//! Record ("pub") type tables supplied by the host.
//!
//! A record is an external structured content unit with a typed schema and
//! named fields; the engine only ever sees these shapes, never storage.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SchemaError, SchemaResult};

/// Slug of the canonical rich-text content field. A record type declaring
/// it binds to ContextDoc embeddings; one without it binds to ContextAtom.
pub const CONTENT_FIELD_SLUG: &str = "rd:content";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub slug: String,
    pub name: String,
    pub schema_kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordType {
    pub id: String,
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl RecordType {
    pub fn field(&self, slug: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.slug == slug)
    }

    /// The canonical content field, when this type declares one
    pub fn content_field(&self) -> Option<&FieldSpec> {
        self.field(CONTENT_FIELD_SLUG)
    }
}

/// Host-supplied record types, keyed by id, iteration in supply order
#[derive(Debug, Clone, Default)]
pub struct RecordTypeTable {
    types: Vec<RecordType>,
    index: HashMap<String, usize>,
}

impl RecordTypeTable {
    pub fn from_types(types: Vec<RecordType>) -> SchemaResult<Self> {
        let mut table = RecordTypeTable::default();
        for ty in types {
            if table.index.contains_key(&ty.id) {
                return Err(SchemaError::DuplicateRecordType(ty.id));
            }
            table.index.insert(ty.id.clone(), table.types.len());
            table.types.push(ty);
        }
        Ok(table)
    }

    pub fn get(&self, id: &str) -> Option<&RecordType> {
        self.index.get(id).map(|i| &self.types[*i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordType> {
        self.types.iter()
    }

    /// Display name of a field, when both the type and the field resolve
    pub fn field_name(&self, type_id: &str, slug: &str) -> Option<&str> {
        self.get(type_id)
            .and_then(|ty| ty.field(slug))
            .map(|f| f.name.as_str())
    }
}

/// A concrete record as the host search/lookup callbacks describe it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub id: String,
    pub type_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(id: &str, slugs: &[&str]) -> RecordType {
        RecordType {
            id: id.into(),
            name: id.to_uppercase(),
            fields: slugs
                .iter()
                .map(|s| FieldSpec {
                    slug: (*s).into(),
                    name: (*s).into(),
                    schema_kind: "string".into(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_duplicate_type_id_rejected() {
        let err = RecordTypeTable::from_types(vec![ty("a", &[]), ty("a", &[])]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateRecordType("a".into()));
    }

    #[test]
    fn test_content_field_detection() {
        let with = ty("doc-like", &[CONTENT_FIELD_SLUG, "title"]);
        let without = ty("flat", &["title"]);

        assert!(with.content_field().is_some());
        assert!(without.content_field().is_none());
    }

    #[test]
    fn test_iteration_preserves_supply_order() {
        let table =
            RecordTypeTable::from_types(vec![ty("z", &[]), ty("a", &[]), ty("m", &[])]).unwrap();
        let ids: Vec<_> = table.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }
}
