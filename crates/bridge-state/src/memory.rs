//! In-memory persistence context
//!
//! Provides `MemoryContext`, which satisfies the `PersistenceContext`
//! contract without any external dependencies. Used by tests and by the
//! CLI's `--memory` mode.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::context::*;
use crate::error::StorageError;

type Graph = HashMap<RecordId, StoredRecord>;

#[derive(Debug, Default)]
struct Sessions {
    committed: Graph,
    working: Graph,
}

/// In-memory context backed by a committed graph and a working copy.
///
/// All reads and writes go to the working copy; `save` promotes it to
/// committed and `discard` resets it from committed.
#[derive(Debug, Default)]
pub struct MemoryContext {
    state: Mutex<Sessions>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Sessions>> {
        self.state
            .lock()
            .map_err(|e| StorageError::Backend(format!("memory context poisoned: {e}")))
    }

    /// Number of committed records of `entity`.
    pub fn committed_count(&self, entity: &str) -> StorageResult<usize> {
        let state = self.lock()?;
        Ok(state
            .committed
            .values()
            .filter(|r| r.entity == entity)
            .count())
    }
}

#[async_trait]
impl PersistenceContext for MemoryContext {
    async fn find_unique(
        &self,
        entity: &str,
        field: &str,
        value: &serde_json::Value,
    ) -> StorageResult<Option<RecordId>> {
        let state = self.lock()?;
        Ok(state
            .working
            .values()
            .find(|r| r.matches(entity, field, value))
            .map(|r| r.id.clone()))
    }

    async fn create(&self, entity: &str) -> StorageResult<RecordId> {
        let id = RecordId::new();
        let mut state = self.lock()?;
        state
            .working
            .insert(id.clone(), StoredRecord::empty(id.clone(), entity));
        Ok(id)
    }

    async fn set_field(
        &self,
        record: &RecordId,
        name: &str,
        value: serde_json::Value,
    ) -> StorageResult<()> {
        let mut state = self.lock()?;
        let stored = state
            .working
            .get_mut(record)
            .ok_or_else(|| StorageError::RecordNotFound {
                record_id: record.0.clone(),
            })?;
        stored.fields.insert(name.to_string(), value);
        Ok(())
    }

    async fn set_relationship(
        &self,
        record: &RecordId,
        name: &str,
        targets: Vec<RecordId>,
    ) -> StorageResult<()> {
        let mut state = self.lock()?;
        let stored = state
            .working
            .get_mut(record)
            .ok_or_else(|| StorageError::RecordNotFound {
                record_id: record.0.clone(),
            })?;
        stored.relations.insert(name.to_string(), targets);
        Ok(())
    }

    async fn fetch(&self, record: &RecordId) -> StorageResult<StoredRecord> {
        let state = self.lock()?;
        state
            .working
            .get(record)
            .cloned()
            .ok_or_else(|| StorageError::RecordNotFound {
                record_id: record.0.clone(),
            })
    }

    async fn count(&self, entity: &str) -> StorageResult<usize> {
        let state = self.lock()?;
        Ok(state.working.values().filter(|r| r.entity == entity).count())
    }

    async fn save(&self) -> StorageResult<()> {
        let mut state = self.lock()?;
        state.committed = state.working.clone();
        debug!(records = state.committed.len(), "memory context saved");
        Ok(())
    }

    async fn discard(&self) -> StorageResult<()> {
        let mut state = self.lock()?;
        state.working = state.committed.clone();
        debug!(records = state.working.len(), "memory context discarded");
        Ok(())
    }
}
