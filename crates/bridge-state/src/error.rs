//! Error types for bridge-state

use thiserror::Error;

/// Errors raised by a persistence context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Query or backend failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A record handle that the context does not know about
    #[error("Record not found: {record_id}")]
    RecordNotFound { record_id: String },

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),

    /// Transaction (save/discard) failed
    #[error("Transaction failed: {0}")]
    Transaction(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
