//! Find-or-create resolution
//!
//! The resolver guarantees one persisted record per (entity, identifier)
//! within a session. It never copies attribute values; that is the upsert
//! engine's job.
//!
//! Candidates of a polymorphic slot share one identifier space: a record
//! is never created under an identifier a sibling candidate already holds,
//! so a bare reference into the slot names exactly one record.

use bridge_state::{PersistenceContext, RecordId};
use tokio::sync::Mutex;
use tracing::debug;

use crate::descriptor::EntityDescriptor;
use crate::error::BridgeError;
use crate::identifier::IdentifierValue;
use crate::path::FieldPath;
use crate::schema::Schema;
use crate::Result;

/// Resolves identifiers to records through a persistence context.
///
/// Lookup and creation run under `lock`, so two resolutions of the same
/// key sharing a session cannot both miss and create.
pub struct Resolver<'s> {
    schema: &'s Schema,
    context: &'s dyn PersistenceContext,
    lock: &'s Mutex<()>,
}

impl<'s> Resolver<'s> {
    pub fn new(
        schema: &'s Schema,
        context: &'s dyn PersistenceContext,
        lock: &'s Mutex<()>,
    ) -> Self {
        Self {
            schema,
            context,
            lock,
        }
    }

    /// Return the record of `descriptor` named by `identifier`, creating an
    /// empty one with only its identifier set if none exists.
    pub async fn resolve(
        &self,
        descriptor: &EntityDescriptor,
        identifier: &IdentifierValue,
    ) -> Result<RecordId> {
        self.resolve_at(descriptor, identifier, &FieldPath::root()).await
    }

    /// [`Resolver::resolve`] for an identifier read at `path`, which is
    /// where an identifier-space clash is reported.
    pub async fn resolve_at(
        &self,
        descriptor: &EntityDescriptor,
        identifier: &IdentifierValue,
        path: &FieldPath,
    ) -> Result<RecordId> {
        let field = identifier_field(descriptor)?;
        let value = identifier.to_json();
        let failure = |source| BridgeError::ResolutionFailure {
            entity: descriptor.name.clone(),
            identifier: identifier.to_string(),
            source,
        };

        let _guard = self.lock.lock().await;
        if let Some(existing) = self
            .context
            .find_unique(&descriptor.name, field, &value)
            .await
            .map_err(failure)?
        {
            return Ok(existing);
        }

        for sibling in self.schema.identifier_siblings(&descriptor.name) {
            let sibling_descriptor = self.schema.entity(sibling)?;
            let sibling_field = identifier_field(sibling_descriptor)?;
            let taken = self
                .context
                .find_unique(sibling, sibling_field, &value)
                .await
                .map_err(failure)?;
            if taken.is_some() {
                return Err(BridgeError::malformed(
                    path,
                    format!(
                        "{} identifier {identifier} is already held by a {sibling}; \
                         they share one identifier space",
                        descriptor.name
                    ),
                ));
            }
        }

        let created = self
            .context
            .create(&descriptor.name)
            .await
            .map_err(failure)?;
        self.context
            .set_field(&created, field, value)
            .await
            .map_err(failure)?;
        debug!(entity = %descriptor.name, %identifier, record_id = %created, "created record");
        Ok(created)
    }

    /// Look up without creating.
    pub async fn find(
        &self,
        descriptor: &EntityDescriptor,
        identifier: &IdentifierValue,
    ) -> Result<Option<RecordId>> {
        let field = identifier_field(descriptor)?;
        let _guard = self.lock.lock().await;
        self.context
            .find_unique(&descriptor.name, field, &identifier.to_json())
            .await
            .map_err(|source| BridgeError::ResolutionFailure {
                entity: descriptor.name.clone(),
                identifier: identifier.to_string(),
                source,
            })
    }
}

fn identifier_field(descriptor: &EntityDescriptor) -> Result<&str> {
    descriptor
        .identifier
        .as_ref()
        .map(|i| i.name.as_str())
        .ok_or_else(|| {
            BridgeError::Configuration(format!("{} has no identifier field", descriptor.name))
        })
}
