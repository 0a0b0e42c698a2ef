//! Store errors.

use thiserror::Error;

/// Errors produced by document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with this id in the collection.
    #[error("document not found in {collection}: {org_id}")]
    NotFound {
        /// Collection name.
        collection: String,
        /// Document id.
        org_id: String,
    },

    /// A unique index rejected the write.
    #[error("unique index violation on {collection}.{field}: {value}")]
    Conflict {
        /// Collection name.
        collection: String,
        /// Indexed field.
        field: String,
        /// Conflicting value.
        value: String,
    },

    /// The collection was never declared to the store.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// The document is not usable (e.g. missing its id field).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Transient backend failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Document (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
