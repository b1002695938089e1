//! SurrealDB-backed PersistenceContext implementation
//!
//! Writes are staged in a working set and flushed to `bridge_records` in a
//! single transaction on `save`. Lookups consult the working set first and
//! fall back to the table, so uncommitted records are visible to the session
//! that created them.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::config::{AuthScope, StoreConfig, DEFAULT_DATABASE, DEFAULT_NAMESPACE};
use crate::context::{PersistenceContext, RecordId, StorageResult, StoredRecord};
use crate::error::StorageError;
use crate::migrations::{self, RECORDS_TABLE};

/// Row shape of the `bridge_records` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbRecord {
    record_id: String,
    entity: String,
    #[serde(default)]
    fields: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    relations: BTreeMap<String, Vec<String>>,
}

impl DbRecord {
    fn into_stored(self) -> StoredRecord {
        StoredRecord {
            id: RecordId(self.record_id),
            entity: self.entity,
            fields: self.fields,
            relations: self
                .relations
                .into_iter()
                .map(|(name, ids)| (name, ids.into_iter().map(RecordId).collect()))
                .collect(),
        }
    }

    fn from_stored(record: &StoredRecord) -> Self {
        Self {
            record_id: record.id.0.clone(),
            entity: record.entity.clone(),
            fields: record.fields.clone(),
            relations: record
                .relations
                .iter()
                .map(|(name, ids)| (name.clone(), ids.iter().map(|id| id.0.clone()).collect()))
                .collect(),
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT record_id, entity, fields, relations FROM type::table($table)";

/// SurrealDB-backed implementation of [`PersistenceContext`].
pub struct SurrealContext {
    db: Surreal<Any>,
    /// Records created or modified since the last save/discard
    working: Mutex<HashMap<RecordId, StoredRecord>>,
}

impl SurrealContext {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `recordbridge/main`, and runs `init_schema`.
    pub async fn in_memory() -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect("mem://")
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Self::open(db, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await
    }

    /// Connect to a remote instance and sign in at the configured scope.
    #[instrument(skip(config), fields(endpoint = %config.endpoint, scope = %config.scope))]
    pub async fn connect(config: &StoreConfig) -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect(config.endpoint.as_str())
            .await
            .map_err(|e| StorageError::Connection(format!("{}: {e}", config.endpoint)))?;

        let signed_in = match config.scope {
            AuthScope::Root => db
                .signin(Root {
                    username: &config.username,
                    password: &config.password,
                })
                .await
                .map(drop),
            AuthScope::Database => db
                .signin(Database {
                    namespace: &config.namespace,
                    database: &config.database,
                    username: &config.username,
                    password: &config.password,
                })
                .await
                .map(drop),
        };
        signed_in.map_err(|e| {
            StorageError::Connection(format!(
                "{} sign-in as {} rejected: {e}",
                config.scope, config.username
            ))
        })?;

        Self::open(db, &config.namespace, &config.database).await
    }

    /// Open the store the environment points at.
    ///
    /// `SURREALDB_ENDPOINT` selects an authenticated remote store and
    /// `SURREALDB_URL` an unauthenticated one; with neither set the store
    /// is in-memory.
    pub async fn from_env() -> StorageResult<Self> {
        if let Some(config) = StoreConfig::from_env()? {
            return Self::connect(&config).await;
        }

        match std::env::var("SURREALDB_URL") {
            Ok(url) => {
                info!(%url, "connecting without credentials");
                let db = surrealdb::engine::any::connect(url.as_str())
                    .await
                    .map_err(|e| StorageError::Connection(format!("{url}: {e}")))?;
                Self::open(db, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await
            }
            Err(_) => {
                info!("no store configured, using in-memory SurrealDB");
                Self::in_memory().await
            }
        }
    }

    async fn open(db: Surreal<Any>, namespace: &str, database: &str) -> StorageResult<Self> {
        db.use_ns(namespace)
            .use_db(database)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!(namespace, database, "SurrealContext ready");
        Ok(Self {
            db,
            working: Mutex::new(HashMap::new()),
        })
    }

    // -- private helpers -----------------------------------------------------

    async fn select(
        &self,
        filter: &str,
        binds: Vec<(&'static str, serde_json::Value)>,
    ) -> StorageResult<Vec<DbRecord>> {
        let mut query = self
            .db
            .query(format!("{SELECT_COLUMNS} WHERE {filter}"))
            .bind(("table", RECORDS_TABLE));
        for bind in binds {
            query = query.bind(bind);
        }

        let rows: Vec<DbRecord> = query.await?.take(0)?;
        Ok(rows)
    }

    async fn load_committed(&self, record: &RecordId) -> StorageResult<Option<StoredRecord>> {
        let rows = self
            .select("record_id = $rid", vec![("rid", record.0.clone().into())])
            .await?;
        Ok(rows.into_iter().next().map(DbRecord::into_stored))
    }

    /// Apply `mutate` to the working copy of `record`, loading it first if
    /// this session has not touched it yet.
    async fn modify(
        &self,
        record: &RecordId,
        mutate: impl FnOnce(&mut StoredRecord) + Send,
    ) -> StorageResult<()> {
        let mut working = self.working.lock().await;
        if !working.contains_key(record) {
            let loaded =
                self.load_committed(record)
                    .await?
                    .ok_or_else(|| StorageError::RecordNotFound {
                        record_id: record.0.clone(),
                    })?;
            working.insert(record.clone(), loaded);
        }
        if let Some(stored) = working.get_mut(record) {
            mutate(stored);
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceContext for SurrealContext {
    async fn find_unique(
        &self,
        entity: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> StorageResult<Option<RecordId>> {
        let working = self.working.lock().await;
        if let Some(found) = working.values().find(|r| r.matches(entity, field, value)) {
            return Ok(Some(found.id.clone()));
        }

        // Committed rows the session has touched are judged by their working copy.
        let rows = self
            .select(
                "entity = $entity AND fields[$field] = $value",
                vec![
                    ("entity", entity.into()),
                    ("field", field.into()),
                    ("value", value.clone()),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| RecordId(row.record_id))
            .find(|id| !working.contains_key(id)))
    }

    async fn create(&self, entity: &str) -> StorageResult<RecordId> {
        let id = RecordId::new();
        let mut working = self.working.lock().await;
        working.insert(id.clone(), StoredRecord::empty(id.clone(), entity));
        debug!(entity, record_id = %id, "staged new record");
        Ok(id)
    }

    async fn set_field(
        &self,
        record: &RecordId,
        name: &str,
        value: serde_json::Value,
    ) -> StorageResult<()> {
        let name = name.to_string();
        self.modify(record, move |r| {
            r.fields.insert(name, value);
        })
        .await
    }

    async fn set_relationship(
        &self,
        record: &RecordId,
        name: &str,
        targets: Vec<RecordId>,
    ) -> StorageResult<()> {
        let name = name.to_string();
        self.modify(record, move |r| {
            r.relations.insert(name, targets);
        })
        .await
    }

    async fn fetch(&self, record: &RecordId) -> StorageResult<StoredRecord> {
        {
            let working = self.working.lock().await;
            if let Some(stored) = working.get(record) {
                return Ok(stored.clone());
            }
        }
        self.load_committed(record)
            .await?
            .ok_or_else(|| StorageError::RecordNotFound {
                record_id: record.0.clone(),
            })
    }

    async fn count(&self, entity: &str) -> StorageResult<usize> {
        let working = self.working.lock().await;
        let committed = self
            .select("entity = $entity", vec![("entity", entity.into())])
            .await?;
        let committed_only = committed
            .iter()
            .filter(|row| !working.contains_key(&RecordId(row.record_id.clone())))
            .count();
        let staged = working.values().filter(|r| r.entity == entity).count();
        Ok(committed_only + staged)
    }

    #[instrument(skip(self))]
    async fn save(&self) -> StorageResult<()> {
        let mut working = self.working.lock().await;
        if working.is_empty() {
            return Ok(());
        }

        let rows: Vec<DbRecord> = working.values().map(DbRecord::from_stored).collect();
        let mut sql = String::from("BEGIN TRANSACTION;\n");
        for i in 0..rows.len() {
            sql.push_str(&format!(
                "UPSERT type::thing($table, $id{i}) CONTENT $row{i};\n"
            ));
        }
        sql.push_str("COMMIT TRANSACTION;");

        let mut query = self.db.query(sql).bind(("table", RECORDS_TABLE));
        for (i, row) in rows.into_iter().enumerate() {
            query = query
                .bind((format!("id{i}"), row.record_id.clone()))
                .bind((format!("row{i}"), row));
        }
        query
            .await
            .and_then(|response| response.check())
            .map_err(|e| StorageError::Transaction(e.to_string()))?;

        info!(records = working.len(), "SurrealContext saved");
        working.clear();
        Ok(())
    }

    async fn discard(&self) -> StorageResult<()> {
        let mut working = self.working.lock().await;
        debug!(records = working.len(), "SurrealContext discarded");
        working.clear();
        Ok(())
    }
}
