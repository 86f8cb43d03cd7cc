//! # Host Integration Contract
//!
//! The hosting application supplies the record search, record lookup,
//! upload and change-notification callbacks. Search and upload are the
//! only asynchronous seams in the whole engine; everything else is
//! synchronous and re-derived from the current tree.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use pubweave_model::RecordSummary;

use crate::state::EditorState;

pub type HostFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Resolves once the host search completes; may be slow or unreliable
pub type SearchFuture = HostFuture<Result<Vec<RecordSummary>, HostError>>;

/// Resolves to the uploaded asset's URL
pub type UploadFuture = HostFuture<Result<String, HostError>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("record search failed: {0}")]
    Search(String),

    #[error("upload failed: {0}")]
    Upload(String),
}

/// Callbacks the host wires in at engine construction
pub trait Host {
    /// Free-text search over existing records
    fn search_records(&self, filter: &str) -> SearchFuture;

    /// Synchronous record lookup by id
    fn get_record(&self, id: &str) -> Option<RecordSummary>;

    /// Store a media asset and return its URL
    fn upload(&self, file_name: &str) -> UploadFuture;

    /// Invoked after every applied transaction
    fn on_change(&self, state: &EditorState) {
        let _ = state;
    }
}
