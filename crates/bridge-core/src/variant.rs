//! Polymorphic variant selection
//!
//! A polymorphic slot holds one of several entity shapes that can only be
//! told apart by trying to decode each in turn. Candidates are tried in
//! their declared order and the first clean decode wins; the losing trials'
//! errors are only reported when every candidate fails.

use serde_json::Value;
use tracing::trace;

use crate::descriptor::{Cardinality, EntityDescriptor, Presence, RelationTarget};
use crate::error::BridgeError;
use crate::identifier::IdentifierValue;
use crate::path::FieldPath;
use crate::schema::Schema;
use crate::Result;

/// Outcome of a polymorphic decode.
#[derive(Debug, Clone, PartialEq)]
pub struct Selected {
    /// Name of the candidate entity that matched
    pub tag: String,
    pub value: Value,
}

/// Decoder for one candidate of a typed tagged union.
pub type VariantDecoder<T> = fn(&Value) -> std::result::Result<T, serde_json::Error>;

/// Try `candidates` in order against the schema and commit to the first
/// whose descriptor accepts `raw`.
pub fn decode_polymorphic(
    schema: &Schema,
    raw: &Value,
    candidates: &[&str],
    path: &FieldPath,
) -> Result<Selected> {
    let descriptor = select_descriptor(schema, raw, candidates, path)?;
    Ok(Selected {
        tag: descriptor.name.clone(),
        value: raw.clone(),
    })
}

pub(crate) fn select_descriptor<'s>(
    schema: &'s Schema,
    raw: &Value,
    candidates: &[&str],
    path: &FieldPath,
) -> Result<&'s EntityDescriptor> {
    let mut failures = Vec::with_capacity(candidates.len());
    for name in candidates {
        let descriptor = schema.entity(name)?;
        match validate(schema, descriptor, raw, path) {
            Ok(()) => {
                trace!(%path, variant = %name, "polymorphic slot resolved");
                return Ok(descriptor);
            }
            Err(err @ BridgeError::Configuration(_)) => return Err(err),
            Err(err) => failures.push(format!("{name}: {err}")),
        }
    }
    Err(BridgeError::InvalidVariant {
        path: path.clone(),
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
        failures,
    })
}

/// Typed counterpart of [`decode_polymorphic`]: run each candidate decoder
/// in order and return the first success with its tag.
pub fn select_variant<T>(
    raw: &Value,
    candidates: &[(&'static str, VariantDecoder<T>)],
) -> Result<(&'static str, T)> {
    let mut failures = Vec::with_capacity(candidates.len());
    for (tag, decode) in candidates {
        match decode(raw) {
            Ok(value) => return Ok((*tag, value)),
            Err(err) => failures.push(format!("{tag}: {err}")),
        }
    }
    Err(BridgeError::InvalidVariant {
        path: FieldPath::root(),
        candidates: candidates.iter().map(|(tag, _)| tag.to_string()).collect(),
        failures,
    })
}

/// Check that `raw` decodes as `descriptor` without writing anything.
///
/// Nested relationship objects are checked recursively; bare identifiers
/// only need the target's identifier shape.
pub fn validate(
    schema: &Schema,
    descriptor: &EntityDescriptor,
    raw: &Value,
    path: &FieldPath,
) -> Result<()> {
    let object = raw.as_object().ok_or_else(|| {
        BridgeError::malformed(path, format!("expected {} object", descriptor.name))
    })?;

    let identifier = schema.identifier_of(descriptor)?;
    let id_path = path.field(&identifier.wire_name);
    match object.get(&identifier.wire_name) {
        None | Some(Value::Null) => {
            return Err(BridgeError::malformed(&id_path, "missing identifier"));
        }
        Some(value) if IdentifierValue::from_json(&identifier.kind, value).is_none() => {
            return Err(BridgeError::malformed(
                &id_path,
                format!("identifier must be {}", identifier.kind.describe()),
            ));
        }
        Some(_) => {}
    }

    for attribute in &descriptor.attributes {
        let attr_path = path.field(&attribute.wire_name);
        match (object.get(&attribute.wire_name), attribute.presence) {
            (None, Presence::Required) => {
                return Err(BridgeError::malformed(&attr_path, "missing required field"));
            }
            (Some(Value::Null), Presence::Required) => {
                return Err(BridgeError::malformed(&attr_path, "must not be null"));
            }
            (None, _) | (Some(Value::Null), _) => {}
            (Some(value), _) if !attribute.kind.accepts(value) => {
                return Err(BridgeError::malformed(
                    &attr_path,
                    format!("expected {}", attribute.kind.describe()),
                ));
            }
            (Some(_), _) => {}
        }
    }

    for relationship in &descriptor.relationships {
        let rel_path = path.field(&relationship.wire_name);
        let value = match (object.get(&relationship.wire_name), relationship.presence) {
            (None, Presence::Required) => {
                return Err(BridgeError::malformed(&rel_path, "missing required relationship"));
            }
            (Some(Value::Null), Presence::Required) => {
                return Err(BridgeError::malformed(&rel_path, "must not be null"));
            }
            (None, _) | (Some(Value::Null), _) => continue,
            (Some(value), _) => value,
        };

        match relationship.cardinality {
            Cardinality::ToOne => validate_target(schema, &relationship.target, value, &rel_path)?,
            Cardinality::ToMany { .. } => {
                let elements = value
                    .as_array()
                    .ok_or_else(|| BridgeError::malformed(&rel_path, "expected a sequence"))?;
                for (i, element) in elements.iter().enumerate() {
                    validate_target(schema, &relationship.target, element, &rel_path.index(i))?;
                }
            }
        }
    }

    Ok(())
}

fn validate_target(
    schema: &Schema,
    target: &RelationTarget,
    value: &Value,
    path: &FieldPath,
) -> Result<()> {
    match (target, value) {
        (RelationTarget::Entity(name), Value::Object(_)) => {
            validate(schema, schema.entity(name)?, value, path)
        }
        (RelationTarget::OneOf(names), Value::Object(_)) => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            select_descriptor(schema, value, &names, path).map(|_| ())
        }
        (target, value) => {
            let accepted = target.candidates().into_iter().any(|name| {
                schema
                    .entity(name)
                    .and_then(|d| schema.identifier_of(d))
                    .map(|id| IdentifierValue::from_json(&id.kind, value).is_some())
                    .unwrap_or(false)
            });
            if accepted {
                Ok(())
            } else {
                Err(BridgeError::malformed(
                    path,
                    "expected an identifier or a nested object",
                ))
            }
        }
    }
}
