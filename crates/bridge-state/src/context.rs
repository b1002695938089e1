//! Persistence context trait definitions
//!
//! A `PersistenceContext` is the session-scoped collaborator the import
//! engine talks to:
//! - `find_unique` / `create`: record lookup and creation by attribute
//! - `set_field` / `set_relationship`: mutation of a record
//! - `fetch` / `count`: read access for encoding and inspection
//! - `save` / `discard`: atomic commit or rollback of the session
//!
//! Implementations live in `memory` (in-process) and `surreal_context`
//! (SurrealDB).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Opaque handle naming one persisted record within a context.
///
/// Handles are generated by the context on `create` and are distinct from
/// the externally-supplied entity identifiers stored in the record's fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Generate a new random RecordId
    pub fn new() -> Self {
        RecordId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of a persisted record as seen through a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    /// Entity (type) name the record was created as
    pub entity: String,
    /// Scalar attribute values keyed by internal field name
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Relationship targets keyed by internal field name
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<RecordId>>,
}

impl StoredRecord {
    /// An empty record of the given entity.
    pub fn empty(id: RecordId, entity: impl Into<String>) -> Self {
        Self {
            id,
            entity: entity.into(),
            fields: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Attribute value, if it was ever set.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Relationship targets; an unset relationship reads as empty.
    pub fn relation(&self, name: &str) -> &[RecordId] {
        self.relations.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether this record's `field` holds exactly `value`.
    pub fn matches(&self, entity: &str, field: &str, value: &serde_json::Value) -> bool {
        self.entity == entity && self.fields.get(field) == Some(value)
    }
}

/// Session-scoped persistence collaborator.
///
/// Guarantees expected by the import engine:
/// - Writes made through the context are visible to later `find_unique`
///   and `fetch` calls in the same session, before `save`.
/// - `save` makes every write since the last `save`/`discard` durable at
///   once; `discard` drops all of them. Nothing is partially applied.
#[async_trait]
pub trait PersistenceContext: Send + Sync {
    /// Find the single record of `entity` whose `field` equals `value`.
    async fn find_unique(
        &self,
        entity: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> StorageResult<Option<RecordId>>;

    /// Create a new, empty record of `entity`.
    async fn create(&self, entity: &str) -> StorageResult<RecordId>;

    /// Overwrite one attribute of a record.
    async fn set_field(
        &self,
        record: &RecordId,
        name: &str,
        value: serde_json::Value,
    ) -> StorageResult<()>;

    /// Replace one relationship of a record with `targets`.
    async fn set_relationship(
        &self,
        record: &RecordId,
        name: &str,
        targets: Vec<RecordId>,
    ) -> StorageResult<()>;

    /// Read a record. Returns `StorageError::RecordNotFound` if absent.
    async fn fetch(&self, record: &RecordId) -> StorageResult<StoredRecord>;

    /// Number of records of `entity` visible in this session.
    async fn count(&self, entity: &str) -> StorageResult<usize>;

    /// Commit every pending write.
    async fn save(&self) -> StorageResult<()>;

    /// Drop every pending write.
    async fn discard(&self) -> StorageResult<()>;
}
