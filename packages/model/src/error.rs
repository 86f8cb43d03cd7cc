//! Error types for the schema and record layer

use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Node type already registered: {0}")]
    DuplicateNodeType(String),

    #[error("Mark type already registered: {0}")]
    DuplicateMarkType(String),

    #[error("Record type already registered: {0}")]
    DuplicateRecordType(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("Record type {type_id} has no field {slug}")]
    UnknownField { type_id: String, slug: String },

    #[error("Invalid document structure: {0}")]
    InvalidStructure(String),
}

impl SchemaError {
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure(message.into())
    }
}
