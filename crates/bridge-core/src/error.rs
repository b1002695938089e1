//! Error types for bridge-core

use bridge_state::StorageError;
use thiserror::Error;

use crate::path::FieldPath;

/// Errors raised while registering schemas or importing records.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A required field is missing or a field has the wrong shape
    #[error("Malformed input at {path}: {message}")]
    MalformedInput { path: FieldPath, message: String },

    /// No candidate of a polymorphic slot decoded the input
    #[error("No variant of [{}] matched at {path}: {}", candidates.join(", "), failures.join("; "))]
    InvalidVariant {
        path: FieldPath,
        candidates: Vec<String>,
        /// One entry per candidate, in trial order
        failures: Vec<String>,
    },

    /// The persistence context could not find or create a record
    #[error("Could not resolve {entity} {identifier}: {source}")]
    ResolutionFailure {
        entity: String,
        identifier: String,
        #[source]
        source: StorageError,
    },

    /// Invalid descriptor or schema, detected before any decode
    #[error("Invalid schema configuration: {0}")]
    Configuration(String),

    /// Any other persistence failure (writes, reads, save, discard)
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl BridgeError {
    pub fn malformed(path: &FieldPath, message: impl Into<String>) -> Self {
        BridgeError::MalformedInput {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Path of the failing subtree, for input errors.
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            BridgeError::MalformedInput { path, .. } | BridgeError::InvalidVariant { path, .. } => {
                Some(path)
            }
            _ => None,
        }
    }
}
