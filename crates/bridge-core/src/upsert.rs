//! Decode → upsert → relate engine
//!
//! Walks a decoded value tree against the schema. Each object node is
//! resolved to a record, its attributes are copied on, and its
//! relationships are wired:
//! - a bare identifier is resolved (looked up or created empty), never
//!   decoded, so identifier cycles cannot recurse;
//! - a nested object is upserted recursively, bounded by input depth;
//! - to-many relationships are replaced wholesale, never appended to.
//!
//! A node's scalar fields and relationship shapes are validated before its
//! record is touched, so most malformed input fails without any write.

use bridge_state::{PersistenceContext, RecordId};
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::descriptor::{
    AbsentPolicy, Cardinality, EntityDescriptor, Presence, RelationTarget, RelationshipDescriptor,
};
use crate::error::BridgeError;
use crate::identifier::IdentifierValue;
use crate::path::FieldPath;
use crate::resolver::Resolver;
use crate::schema::Schema;
use crate::variant::select_descriptor;
use crate::Result;

/// What to do with one relationship once its targets are known.
enum RelationshipPlan<'v> {
    Keep,
    Clear,
    One(&'v Value),
    Many(&'v [Value]),
}

pub(crate) struct Upserter<'s> {
    schema: &'s Schema,
    context: &'s dyn PersistenceContext,
    resolver: Resolver<'s>,
}

impl<'s> Upserter<'s> {
    pub(crate) fn new(
        schema: &'s Schema,
        context: &'s dyn PersistenceContext,
        resolver: Resolver<'s>,
    ) -> Self {
        Self {
            schema,
            context,
            resolver,
        }
    }

    /// Upsert one object node as `descriptor`, returning its wired record.
    pub(crate) fn upsert<'a>(
        &'a self,
        descriptor: &'a EntityDescriptor,
        value: &'a Value,
        path: FieldPath,
    ) -> BoxFuture<'a, Result<RecordId>> {
        async move {
            let object = value.as_object().ok_or_else(|| {
                BridgeError::malformed(&path, format!("expected {} object", descriptor.name))
            })?;

            let identifier = self.extract_identifier(descriptor, object, &path)?;
            let writes = attribute_writes(descriptor, object, &path)?;
            let plans = descriptor
                .relationships
                .iter()
                .map(|r| relationship_plan(r, object, &path).map(|plan| (r, plan)))
                .collect::<Result<Vec<_>>>()?;

            let id_path = path.field(&self.schema.identifier_of(descriptor)?.wire_name);
            let record = self
                .resolver
                .resolve_at(descriptor, &identifier, &id_path)
                .await?;

            for (name, value) in writes {
                self.context.set_field(&record, name, value).await?;
            }

            for (relationship, plan) in plans {
                let rel_path = path.field(&relationship.wire_name);
                let targets = match plan {
                    RelationshipPlan::Keep => continue,
                    RelationshipPlan::Clear => Vec::new(),
                    RelationshipPlan::One(value) => {
                        vec![self.relate(&relationship.target, value, rel_path).await?]
                    }
                    RelationshipPlan::Many(values) => {
                        let ordered =
                            matches!(relationship.cardinality, Cardinality::ToMany { ordered: true });
                        let mut targets = Vec::with_capacity(values.len());
                        for (i, element) in values.iter().enumerate() {
                            let target = self
                                .relate(&relationship.target, element, rel_path.index(i))
                                .await?;
                            if ordered || !targets.contains(&target) {
                                targets.push(target);
                            }
                        }
                        targets
                    }
                };
                trace!(
                    entity = %descriptor.name,
                    relationship = %relationship.name,
                    targets = targets.len(),
                    "wiring relationship"
                );
                self.context
                    .set_relationship(&record, &relationship.name, targets)
                    .await?;
            }

            debug!(entity = %descriptor.name, %identifier, record_id = %record, "upserted record");
            Ok(record)
        }
        .boxed()
    }

    /// Resolve one relationship element: bare identifiers are looked up or
    /// created, nested objects are upserted.
    async fn relate(
        &self,
        target: &RelationTarget,
        value: &Value,
        path: FieldPath,
    ) -> Result<RecordId> {
        match (target, value) {
            (RelationTarget::Entity(name), Value::Object(_)) => {
                let descriptor = self.schema.entity(name)?;
                self.upsert(descriptor, value, path).await
            }
            (RelationTarget::Entity(name), _) => {
                let descriptor = self.schema.entity(name)?;
                let identifier = self.reference(descriptor, value, &path)?;
                self.resolver.resolve_at(descriptor, &identifier, &path).await
            }
            (RelationTarget::OneOf(names), Value::Object(_)) => {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                let descriptor = select_descriptor(self.schema, value, &names, &path)?;
                self.upsert(descriptor, value, path).await
            }
            (RelationTarget::OneOf(names), _) => {
                self.resolve_polymorphic_reference(names, value, path)
                    .await
            }
        }
    }

    /// A bare identifier in a polymorphic slot names whichever candidate
    /// already has a record with it, checked in candidate order.
    async fn resolve_polymorphic_reference(
        &self,
        names: &[String],
        value: &Value,
        path: FieldPath,
    ) -> Result<RecordId> {
        let mut failures = Vec::with_capacity(names.len());
        for name in names {
            let descriptor = self.schema.entity(name)?;
            let identifier = match self.reference(descriptor, value, &path) {
                Ok(identifier) => identifier,
                Err(err) => {
                    failures.push(format!("{name}: {err}"));
                    continue;
                }
            };
            match self.resolver.find(descriptor, &identifier).await? {
                Some(record) => return Ok(record),
                None => failures.push(format!("{name}: no record with identifier {identifier}")),
            }
        }
        Err(BridgeError::InvalidVariant {
            path,
            candidates: names.to_vec(),
            failures,
        })
    }

    fn extract_identifier(
        &self,
        descriptor: &EntityDescriptor,
        object: &Map<String, Value>,
        path: &FieldPath,
    ) -> Result<IdentifierValue> {
        let field = self.schema.identifier_of(descriptor)?;
        let id_path = path.field(&field.wire_name);
        match object.get(&field.wire_name) {
            None | Some(Value::Null) => Err(BridgeError::malformed(
                &id_path,
                format!("{} record has no identifier", descriptor.name),
            )),
            Some(raw) => IdentifierValue::from_json(&field.kind, raw).ok_or_else(|| {
                BridgeError::malformed(
                    &id_path,
                    format!("identifier must be {}", field.kind.describe()),
                )
            }),
        }
    }

    fn reference(
        &self,
        descriptor: &EntityDescriptor,
        value: &Value,
        path: &FieldPath,
    ) -> Result<IdentifierValue> {
        let field = self.schema.identifier_of(descriptor)?;
        IdentifierValue::from_json(&field.kind, value).ok_or_else(|| {
            BridgeError::malformed(
                path,
                format!(
                    "expected {} identifier ({}) or object",
                    descriptor.name,
                    field.kind.describe()
                ),
            )
        })
    }
}

/// Validate every attribute of a node and list the writes it implies.
fn attribute_writes<'d>(
    descriptor: &'d EntityDescriptor,
    object: &Map<String, Value>,
    path: &FieldPath,
) -> Result<Vec<(&'d str, Value)>> {
    let mut writes = Vec::with_capacity(descriptor.attributes.len());
    for attribute in &descriptor.attributes {
        let attr_path = path.field(&attribute.wire_name);
        match (object.get(&attribute.wire_name), attribute.presence) {
            (None, Presence::Required) => {
                return Err(BridgeError::malformed(&attr_path, "missing required field"));
            }
            (Some(Value::Null), Presence::Required) => {
                return Err(BridgeError::malformed(&attr_path, "must not be null"));
            }
            (None, Presence::Optional(AbsentPolicy::Keep)) => {}
            (None, Presence::Optional(AbsentPolicy::Clear)) | (Some(Value::Null), _) => {
                writes.push((attribute.name.as_str(), Value::Null));
            }
            (Some(value), _) => {
                if !attribute.kind.accepts(value) {
                    return Err(BridgeError::malformed(
                        &attr_path,
                        format!("expected {}", attribute.kind.describe()),
                    ));
                }
                writes.push((attribute.name.as_str(), value.clone()));
            }
        }
    }
    Ok(writes)
}

fn relationship_plan<'v>(
    relationship: &RelationshipDescriptor,
    object: &'v Map<String, Value>,
    path: &FieldPath,
) -> Result<RelationshipPlan<'v>> {
    let rel_path = path.field(&relationship.wire_name);
    let value = match (object.get(&relationship.wire_name), relationship.presence) {
        (None, Presence::Required) => {
            return Err(BridgeError::malformed(&rel_path, "missing required relationship"));
        }
        (Some(Value::Null), Presence::Required) => {
            return Err(BridgeError::malformed(&rel_path, "must not be null"));
        }
        (None, Presence::Optional(AbsentPolicy::Keep)) => return Ok(RelationshipPlan::Keep),
        (None, Presence::Optional(AbsentPolicy::Clear)) | (Some(Value::Null), _) => {
            return Ok(RelationshipPlan::Clear);
        }
        (Some(value), _) => value,
    };

    match relationship.cardinality {
        Cardinality::ToOne if value.is_array() => Err(BridgeError::malformed(
            &rel_path,
            "expected an identifier or object, found a sequence",
        )),
        Cardinality::ToOne => Ok(RelationshipPlan::One(value)),
        Cardinality::ToMany { .. } => value
            .as_array()
            .map(|values| RelationshipPlan::Many(values.as_slice()))
            .ok_or_else(|| BridgeError::malformed(&rel_path, "expected a sequence")),
    }
}
