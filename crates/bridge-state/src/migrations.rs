//! SurrealDB schema initialization
//!
//! Sets up the single table that holds every imported record. Safe to call
//! multiple times (idempotent).

use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::context::StorageResult;
use crate::error::StorageError;

/// Table holding every persisted record regardless of entity
pub const RECORDS_TABLE: &str = "bridge_records";

/// Initialize the `bridge_records` table
///
/// Schema:
/// ```text
/// TABLE bridge_records {
///   record_id:  STRING (unique)
///   entity:     STRING (indexed)
///   fields:     OBJECT (attribute name -> value)
///   relations:  OBJECT (relationship name -> [record_id])
/// }
/// ```
pub async fn init_schema(db: &Surreal<Any>) -> StorageResult<()> {
    info!("Initializing recordbridge SurrealDB schema");

    let sql = format!(
        r#"
        DEFINE TABLE IF NOT EXISTS {RECORDS_TABLE} SCHEMALESS;

        DEFINE INDEX IF NOT EXISTS idx_record_id ON TABLE {RECORDS_TABLE} COLUMNS record_id UNIQUE;

        -- Lookups always filter by entity first
        DEFINE INDEX IF NOT EXISTS idx_record_entity ON TABLE {RECORDS_TABLE} COLUMNS entity;
    "#
    );

    db.query(sql)
        .await
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;

    debug!(table = RECORDS_TABLE, "records table ready");
    Ok(())
}
