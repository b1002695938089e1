//! Persisted record → decoded value tree
//!
//! The structural inverse of the upsert engine. Relationships are emitted
//! as identifiers only, so encoding never follows a cycle and never
//! re-nests objects.

use bridge_state::{PersistenceContext, RecordId, StoredRecord};
use serde_json::{Map, Value};

use crate::descriptor::{Cardinality, EntityDescriptor};
use crate::error::BridgeError;
use crate::identifier::IdentifierValue;
use crate::path::FieldPath;
use crate::schema::Schema;
use crate::Result;

pub(crate) struct Encoder<'s> {
    schema: &'s Schema,
    context: &'s dyn PersistenceContext,
}

impl<'s> Encoder<'s> {
    pub(crate) fn new(schema: &'s Schema, context: &'s dyn PersistenceContext) -> Self {
        Self { schema, context }
    }

    pub(crate) async fn encode(&self, record: &RecordId) -> Result<Value> {
        let stored = self.context.fetch(record).await?;
        let descriptor = self.schema.entity(&stored.entity)?;
        let identifier = self.schema.identifier_of(descriptor)?;

        let mut out = Map::new();
        let id_value = stored.field(&identifier.name).cloned().ok_or_else(|| {
            BridgeError::malformed(
                &FieldPath::root().field(&identifier.wire_name),
                format!("stored {} record {} has no identifier", stored.entity, stored.id),
            )
        })?;
        out.insert(identifier.wire_name.clone(), id_value);

        for attribute in &descriptor.attributes {
            match stored.field(&attribute.name) {
                Some(value) => {
                    out.insert(attribute.wire_name.clone(), value.clone());
                }
                None if !attribute.presence.is_required() => {
                    out.insert(attribute.wire_name.clone(), Value::Null);
                }
                // Shell records created by reference carry only their identifier.
                None => {}
            }
        }

        for relationship in &descriptor.relationships {
            let targets = self.target_identifiers(&stored, &relationship.name).await?;
            let encoded = match relationship.cardinality {
                Cardinality::ToOne => targets
                    .into_iter()
                    .next()
                    .map(|id| id.to_json())
                    .unwrap_or(Value::Null),
                Cardinality::ToMany { ordered } => {
                    let mut targets = targets;
                    if !ordered {
                        targets.sort();
                    }
                    Value::Array(targets.iter().map(IdentifierValue::to_json).collect())
                }
            };
            out.insert(relationship.wire_name.clone(), encoded);
        }

        Ok(Value::Object(out))
    }

    async fn target_identifiers(
        &self,
        stored: &StoredRecord,
        relationship: &str,
    ) -> Result<Vec<IdentifierValue>> {
        let mut identifiers = Vec::new();
        for target in stored.relation(relationship) {
            let related = self.context.fetch(target).await?;
            let descriptor = self.schema.entity(&related.entity)?;
            identifiers.push(identifier_of(descriptor, &related, self.schema)?);
        }
        Ok(identifiers)
    }
}

fn identifier_of(
    descriptor: &EntityDescriptor,
    record: &StoredRecord,
    schema: &Schema,
) -> Result<IdentifierValue> {
    let field = schema.identifier_of(descriptor)?;
    record
        .field(&field.name)
        .and_then(|raw| IdentifierValue::from_json(&field.kind, raw))
        .ok_or_else(|| {
            BridgeError::malformed(
                &FieldPath::root().field(&field.wire_name),
                format!("stored {} record {} has no identifier", record.entity, record.id),
            )
        })
}
