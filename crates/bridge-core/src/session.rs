//! Import session
//!
//! A `Session` pairs a validated schema with one persistence context and
//! is the only place mutable import state lives. Every operation of the
//! bridge goes through it; nothing is cached between calls.

use std::sync::Arc;

use bridge_state::{PersistenceContext, RecordId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::descriptor::Entity;
use crate::encoder::Encoder;
use crate::error::BridgeError;
use crate::identifier::{Identifier, IdentifierValue};
use crate::path::FieldPath;
use crate::resolver::Resolver;
use crate::schema::Schema;
use crate::upsert::Upserter;
use crate::variant::{self, Selected};
use crate::Result;

/// One transactional import scope.
pub struct Session {
    schema: Arc<Schema>,
    context: Arc<dyn PersistenceContext>,
    /// Serializes find-or-create across concurrent upserts on this session
    resolve_lock: Mutex<()>,
}

impl Session {
    pub fn new(schema: Arc<Schema>, context: Arc<dyn PersistenceContext>) -> Self {
        Self {
            schema,
            context,
            resolve_lock: Mutex::new(()),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn context(&self) -> &dyn PersistenceContext {
        self.context.as_ref()
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.schema, self.context.as_ref(), &self.resolve_lock)
    }

    fn upserter(&self) -> Upserter<'_> {
        Upserter::new(&self.schema, self.context.as_ref(), self.resolver())
    }

    /// Find-or-create the record of `entity` named by `identifier`.
    pub async fn resolve(
        &self,
        entity: &str,
        identifier: impl Into<IdentifierValue>,
    ) -> Result<RecordId> {
        let descriptor = self.schema.entity(entity)?;
        self.resolver().resolve(descriptor, &identifier.into()).await
    }

    /// Look up the record of `E` named by `identifier` without creating it.
    pub async fn find<E: Entity>(&self, identifier: Identifier<E>) -> Result<Option<RecordId>> {
        let descriptor = self.schema.entity(E::NAME)?;
        self.resolver().find(descriptor, &identifier.into()).await
    }

    /// Untyped counterpart of [`Session::find`].
    pub async fn lookup(
        &self,
        entity: &str,
        identifier: impl Into<IdentifierValue>,
    ) -> Result<Option<RecordId>> {
        let descriptor = self.schema.entity(entity)?;
        self.resolver().find(descriptor, &identifier.into()).await
    }

    /// Create or update the record described by `value` and everything
    /// nested inside it.
    #[instrument(skip(self, value))]
    pub async fn upsert(&self, value: &Value, entity: &str) -> Result<RecordId> {
        let descriptor = self.schema.entity(entity)?;
        self.upserter()
            .upsert(descriptor, value, FieldPath::root())
            .await
    }

    /// Upsert every element of a top-level sequence as `entity`.
    #[instrument(skip(self, values))]
    pub async fn upsert_many(&self, values: &Value, entity: &str) -> Result<Vec<RecordId>> {
        let descriptor = self.schema.entity(entity)?;
        let elements = values
            .as_array()
            .ok_or_else(|| BridgeError::malformed(&FieldPath::root(), "expected a sequence"))?;

        let upserter = self.upserter();
        let mut records = Vec::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            records.push(
                upserter
                    .upsert(descriptor, element, FieldPath::root().index(i))
                    .await?,
            );
        }
        Ok(records)
    }

    /// Upsert a typed model value through its serialized form.
    pub async fn upsert_entity<E: Entity + Serialize>(&self, entity: &E) -> Result<RecordId> {
        let value = serde_json::to_value(entity).map_err(|e| {
            BridgeError::malformed(&FieldPath::root(), format!("cannot serialize {}: {e}", E::NAME))
        })?;
        self.upsert(&value, E::NAME).await
    }

    /// Ordered trial decode of `raw` against `candidates`.
    pub fn decode_polymorphic(&self, raw: &Value, candidates: &[&str]) -> Result<Selected> {
        variant::decode_polymorphic(&self.schema, raw, candidates, &FieldPath::root())
    }

    /// Encode a persisted record back into its wire shape.
    pub async fn encode(&self, record: &RecordId) -> Result<Value> {
        Encoder::new(&self.schema, self.context.as_ref())
            .encode(record)
            .await
    }

    /// Encode a record and decode it into a typed model value.
    pub async fn decode_as<T: DeserializeOwned>(&self, record: &RecordId) -> Result<T> {
        let value = self.encode(record).await?;
        serde_json::from_value(value)
            .map_err(|e| BridgeError::malformed(&FieldPath::root(), e.to_string()))
    }

    /// Number of records of `entity` visible in this session.
    pub async fn count(&self, entity: &str) -> Result<usize> {
        self.schema.entity(entity)?;
        Ok(self.context.count(entity).await?)
    }

    pub async fn commit(&self) -> Result<()> {
        self.context.save().await?;
        Ok(())
    }

    pub async fn rollback(&self) -> Result<()> {
        self.context.discard().await?;
        Ok(())
    }

    /// Upsert `value` (an object, or a sequence of objects) as `entity` and
    /// commit, or discard everything if any part fails.
    #[instrument(skip(self, value))]
    pub async fn import(&self, value: &Value, entity: &str) -> Result<Vec<RecordId>> {
        let outcome = match value {
            Value::Array(_) => self.upsert_many(value, entity).await,
            _ => self.upsert(value, entity).await.map(|record| vec![record]),
        };

        match outcome {
            Ok(records) => {
                self.commit().await?;
                info!(entity, records = records.len(), "import committed");
                Ok(records)
            }
            Err(err) => {
                warn!(entity, error = %err, "import failed, discarding session");
                self.rollback().await?;
                Err(err)
            }
        }
    }
}
