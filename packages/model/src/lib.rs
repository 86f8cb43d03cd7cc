//! # Pubweave Model
//!
//! The document side of the engine: schema registry, tree model,
//! flattened position space, record-type tables and embedding node
//! construction. Everything here is synchronous and storage-free; the
//! editor layer owns mutation, the overlay layer owns derived views.

pub mod embed;
pub mod error;
pub mod id_generator;
pub mod node;
pub mod record;
pub mod schema;

pub use embed::{
    build_embedding, embedding_of, empty_paragraph, EmbedContext, EmbedTarget, EmbeddingRef,
    ATTR_CLASS, ATTR_DATA, ATTR_FIELD_SLUG, ATTR_ID, ATTR_PARENT_PUB_ID, ATTR_PUB_ID,
    ATTR_PUB_TYPE_ID, NODE_CONTEXT_ATOM, NODE_CONTEXT_DOC,
};
pub use error::{SchemaError, SchemaResult};
pub use id_generator::{document_seed, new_record_id, IdGenerator};
pub use node::{coalesce_text, AttrMap, Element, Mark, Node, TextLeaf};
pub use record::{FieldSpec, RecordSummary, RecordType, RecordTypeTable, CONTENT_FIELD_SLUG};
pub use schema::{
    ChildClass, ContentRule, EmbeddingKind, HtmlRule, MarkSpec, NodeSpec, Schema, SchemaBuilder,
};
