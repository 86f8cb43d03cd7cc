//! Error types for the editor

use thiserror::Error;

use pubweave_model::SchemaError;

pub type TxResult<T> = Result<T, TransactionError>;

/// A rejected mutation. Transactions are all-or-nothing: any step failing
/// leaves the previous tree version untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionError {
    #[error("Position out of bounds: {0}")]
    OutOfBounds(usize),

    #[error("Replace range {from}..{to} does not align with node boundaries")]
    RangeNotAligned { from: usize, to: usize },

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("No node starts at position {0}")]
    NoNodeAt(usize),

    #[error("Node at {0} is not an element")]
    NotAnElement(usize),

    #[error("Node at {0} is not a text leaf")]
    NotText(usize),

    #[error("Node at {0} is not an embedding")]
    NotAnEmbedding(usize),

    #[error("Attribute {key} is not declared on {type_name}")]
    UnknownAttr { type_name: String, key: String },

    #[error("Mark index {index} out of range at {pos}")]
    MarkIndexOutOfRange { pos: usize, index: usize },
}

impl TransactionError {
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure(message.into())
    }
}

/// Errors surfaced by the engine facade
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("Initial document failed to deserialize: {0}")]
    Deserialize(String),
}
