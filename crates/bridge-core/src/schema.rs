//! Validated registry of entity descriptors
//!
//! All configuration errors surface from [`SchemaBuilder::build`], before
//! any record is decoded.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::descriptor::{Entity, EntityDescriptor, IdentifierField, RelationTarget};
use crate::error::BridgeError;
use crate::Result;

/// Immutable set of entity descriptors, keyed by entity name.
#[derive(Debug, Clone)]
pub struct Schema {
    entities: BTreeMap<String, EntityDescriptor>,
    /// Entities sharing an identifier space with the key, excluding itself
    identifier_siblings: BTreeMap<String, Vec<String>>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Descriptor for `name`, or a configuration error if unregistered.
    pub fn entity(&self, name: &str) -> Result<&EntityDescriptor> {
        self.entities
            .get(name)
            .ok_or_else(|| BridgeError::Configuration(format!("unknown entity {name}")))
    }

    /// Identifier field of a registered descriptor.
    ///
    /// `build` guarantees every registered descriptor has one.
    pub fn identifier_of<'a>(&self, descriptor: &'a EntityDescriptor) -> Result<&'a IdentifierField> {
        descriptor.identifier.as_ref().ok_or_else(|| {
            BridgeError::Configuration(format!("{} has no identifier field", descriptor.name))
        })
    }

    /// Other entities whose identifiers share one space with `name`.
    ///
    /// Candidates of a polymorphic slot are referenced by bare identifier,
    /// so no two of them may hold the same one.
    pub fn identifier_siblings(&self, name: &str) -> &[String] {
        self.identifier_siblings
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Collects descriptors and validates them as a whole.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    descriptors: Vec<EntityDescriptor>,
}

impl SchemaBuilder {
    pub fn register(mut self, descriptor: EntityDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn register_entity<E: Entity>(self) -> Self {
        let descriptor = E::descriptor();
        debug_assert_eq!(descriptor.name, E::NAME);
        self.register(descriptor)
    }

    /// Validate every descriptor and produce the schema.
    ///
    /// Fails on: duplicate entity names, a missing identifier, an
    /// identifier of unsupported kind, duplicate field or wire names within
    /// an entity, empty candidate lists, and relationships to unregistered
    /// entities. Polymorphic candidates that cannot be told apart by shape
    /// are logged, not rejected.
    pub fn build(self) -> Result<Schema> {
        let mut entities = BTreeMap::new();
        for descriptor in self.descriptors {
            validate_fields(&descriptor)?;
            let name = descriptor.name.clone();
            if entities.insert(name.clone(), descriptor).is_some() {
                return Err(BridgeError::Configuration(format!(
                    "entity {name} registered twice"
                )));
            }
        }

        for descriptor in entities.values() {
            for relationship in &descriptor.relationships {
                let candidates = relationship.target.candidates();
                if candidates.is_empty() {
                    return Err(BridgeError::Configuration(format!(
                        "{}.{} has no candidate entities",
                        descriptor.name, relationship.name
                    )));
                }
                if let Some(missing) = candidates.iter().find(|c| !entities.contains_key(**c)) {
                    return Err(BridgeError::Configuration(format!(
                        "{}.{} targets unknown entity {missing}",
                        descriptor.name, relationship.name
                    )));
                }
                if let RelationTarget::OneOf(names) = &relationship.target {
                    check_distinguishable(&entities, &descriptor.name, &relationship.name, names);
                }
            }
        }

        let identifier_siblings = identifier_spaces(&entities);
        debug!(
            entities = entities.len(),
            shared_spaces = identifier_siblings.len(),
            "schema built"
        );
        Ok(Schema {
            entities,
            identifier_siblings,
        })
    }
}

fn validate_fields(descriptor: &EntityDescriptor) -> Result<()> {
    let identifier = descriptor.identifier.as_ref().ok_or_else(|| {
        BridgeError::Configuration(format!("{} has no identifier field", descriptor.name))
    })?;
    if !identifier.kind.is_identifier_kind() {
        return Err(BridgeError::Configuration(format!(
            "{}.{} has unsupported identifier kind {}",
            descriptor.name,
            identifier.name,
            identifier.kind.describe()
        )));
    }

    let mut names = HashSet::new();
    let mut wire_names = HashSet::new();
    for (name, wire_name) in descriptor.field_names() {
        if !names.insert(name) {
            return Err(BridgeError::Configuration(format!(
                "{}.{name} declared twice",
                descriptor.name
            )));
        }
        if !wire_names.insert(wire_name) {
            return Err(BridgeError::Configuration(format!(
                "{} maps two fields to wire name {wire_name}",
                descriptor.name
            )));
        }
    }
    Ok(())
}

/// Merge the candidate lists of every polymorphic slot into disjoint
/// groups; an entity in two slots joins both slots' candidates.
fn identifier_spaces(
    entities: &BTreeMap<String, EntityDescriptor>,
) -> BTreeMap<String, Vec<String>> {
    let mut groups: Vec<BTreeSet<String>> = Vec::new();
    for descriptor in entities.values() {
        for relationship in &descriptor.relationships {
            let RelationTarget::OneOf(names) = &relationship.target else {
                continue;
            };
            let mut merged: BTreeSet<String> = names.iter().cloned().collect();
            groups.retain(|group| {
                if group.is_disjoint(&merged) {
                    return true;
                }
                merged.extend(group.iter().cloned());
                false
            });
            groups.push(merged);
        }
    }

    let mut siblings = BTreeMap::new();
    for group in groups.into_iter().filter(|g| g.len() > 1) {
        for name in &group {
            let others = group.iter().filter(|n| *n != name).cloned().collect();
            siblings.insert(name.clone(), others);
        }
    }
    siblings
}

/// Warn when an earlier candidate would also accept a later candidate's
/// input, which makes the later variant unreachable for that shape.
fn check_distinguishable(
    entities: &BTreeMap<String, EntityDescriptor>,
    owner: &str,
    relationship: &str,
    candidates: &[String],
) {
    for (i, earlier) in candidates.iter().enumerate() {
        for later in &candidates[i + 1..] {
            let (Some(a), Some(b)) = (entities.get(earlier), entities.get(later)) else {
                continue;
            };
            if !a.rejects_shape_of(b) {
                warn!(
                    owner,
                    relationship,
                    earlier = %earlier,
                    later = %later,
                    "polymorphic candidates share every required field; input for the later one may decode as the earlier"
                );
            }
        }
    }
}
