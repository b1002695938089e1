//! Entity descriptors
//!
//! A descriptor is the per-type capability declaration the engine is driven
//! by: which field carries the identifier, which fields are scalar
//! attributes, and which fields relate to other entities. Descriptors are
//! plain data; the engine never needs the concrete Rust type.

use serde_json::Value;

/// Shape a scalar field must have in the decoded input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarKind {
    /// Signed 64-bit integer
    Integer,
    /// Any JSON number
    Float,
    Bool,
    String,
    /// String restricted to a closed set of values
    Enumeration(Vec<String>),
    /// Any JSON value, stored as-is
    Any,
}

impl ScalarKind {
    /// Enumeration over the given values.
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScalarKind::Enumeration(values.into_iter().map(Into::into).collect())
    }

    /// Whether a non-null decoded value has this shape.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ScalarKind::Integer => value.is_i64(),
            ScalarKind::Float => value.is_number(),
            ScalarKind::Bool => value.is_boolean(),
            ScalarKind::String => value.is_string(),
            ScalarKind::Enumeration(allowed) => value
                .as_str()
                .map(|s| allowed.iter().any(|a| a == s))
                .unwrap_or(false),
            ScalarKind::Any => true,
        }
    }

    /// Whether this kind may carry an entity identifier.
    pub fn is_identifier_kind(&self) -> bool {
        matches!(self, ScalarKind::Integer | ScalarKind::String)
    }

    pub fn describe(&self) -> String {
        match self {
            ScalarKind::Integer => "integer".to_string(),
            ScalarKind::Float => "number".to_string(),
            ScalarKind::Bool => "bool".to_string(),
            ScalarKind::String => "string".to_string(),
            ScalarKind::Enumeration(allowed) => format!("one of [{}]", allowed.join(", ")),
            ScalarKind::Any => "any value".to_string(),
        }
    }
}

/// What an omitted optional field means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentPolicy {
    /// Omission leaves the stored value untouched
    Keep,
    /// Omission clears the stored value, same as an explicit null
    Clear,
}

/// Whether a field must appear in every decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be present and non-null
    Required,
    /// May be omitted or null
    Optional(AbsentPolicy),
}

impl Presence {
    pub fn is_required(self) -> bool {
        matches!(self, Presence::Required)
    }
}

/// The field holding an entity's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierField {
    pub name: String,
    pub wire_name: String,
    pub kind: ScalarKind,
}

/// A scalar field copied verbatim onto the persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub name: String,
    pub wire_name: String,
    pub kind: ScalarKind,
    pub presence: Presence,
}

impl AttributeDescriptor {
    /// Required attribute whose wire name equals its field name.
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            name,
            kind,
            presence: Presence::Required,
        }
    }

    /// Read this attribute from a differently-named wire field.
    pub fn wire(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    /// Allow omission and null; omission keeps the stored value.
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional(AbsentPolicy::Keep);
        self
    }

    /// Allow omission and null; omission clears the stored value.
    pub fn clear_when_absent(mut self) -> Self {
        self.presence = Presence::Optional(AbsentPolicy::Clear);
        self
    }
}

/// How many targets a relationship holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany {
        /// Keep source order; otherwise the relation is a set
        ordered: bool,
    },
}

/// Entity type(s) a relationship may point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationTarget {
    Entity(String),
    /// Polymorphic slot; candidates are tried in this order
    OneOf(Vec<String>),
}

impl RelationTarget {
    pub fn candidates(&self) -> Vec<&str> {
        match self {
            RelationTarget::Entity(name) => vec![name.as_str()],
            RelationTarget::OneOf(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// A field naming other entities, by bare identifier or nested object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDescriptor {
    pub name: String,
    pub wire_name: String,
    pub target: RelationTarget,
    pub cardinality: Cardinality,
    pub presence: Presence,
}

impl RelationshipDescriptor {
    pub fn to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::build(name, RelationTarget::Entity(target.into()), Cardinality::ToOne)
    }

    /// Unordered to-many relationship.
    pub fn to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::build(
            name,
            RelationTarget::Entity(target.into()),
            Cardinality::ToMany { ordered: false },
        )
    }

    /// To-one polymorphic slot over `candidates`, in priority order.
    pub fn to_one_of<I, S>(name: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(
            name,
            RelationTarget::OneOf(candidates.into_iter().map(Into::into).collect()),
            Cardinality::ToOne,
        )
    }

    /// Unordered to-many polymorphic slot over `candidates`, in priority order.
    pub fn to_many_of<I, S>(name: impl Into<String>, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(
            name,
            RelationTarget::OneOf(candidates.into_iter().map(Into::into).collect()),
            Cardinality::ToMany { ordered: false },
        )
    }

    fn build(name: impl Into<String>, target: RelationTarget, cardinality: Cardinality) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            name,
            target,
            cardinality,
            presence: Presence::Required,
        }
    }

    pub fn wire(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    /// Preserve source order. No effect on to-one relationships.
    pub fn ordered(mut self) -> Self {
        if let Cardinality::ToMany { .. } = self.cardinality {
            self.cardinality = Cardinality::ToMany { ordered: true };
        }
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional(AbsentPolicy::Keep);
        self
    }

    pub fn clear_when_absent(mut self) -> Self {
        self.presence = Presence::Optional(AbsentPolicy::Clear);
        self
    }
}

/// Per-type metadata consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub name: String,
    pub identifier: Option<IdentifierField>,
    pub attributes: Vec<AttributeDescriptor>,
    pub relationships: Vec<RelationshipDescriptor>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: None,
            attributes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Declare the identifier field; wire name equals field name.
    pub fn identifier(self, name: impl Into<String>, kind: ScalarKind) -> Self {
        let name = name.into();
        self.identifier_renamed(name.clone(), name, kind)
    }

    pub fn identifier_renamed(
        mut self,
        name: impl Into<String>,
        wire_name: impl Into<String>,
        kind: ScalarKind,
    ) -> Self {
        self.identifier = Some(IdentifierField {
            name: name.into(),
            wire_name: wire_name.into(),
            kind,
        });
        self
    }

    pub fn attribute(mut self, attribute: AttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Shorthand for a required attribute with identical wire name.
    pub fn required(self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.attribute(AttributeDescriptor::new(name, kind))
    }

    /// Shorthand for an optional attribute that keeps its value when omitted.
    pub fn optional(self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.attribute(AttributeDescriptor::new(name, kind).optional())
    }

    pub fn relationship(mut self, relationship: RelationshipDescriptor) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Every (field name, wire name) pair declared, identifier first.
    pub(crate) fn field_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.identifier
            .iter()
            .map(|i| (i.name.as_str(), i.wire_name.as_str()))
            .chain(
                self.attributes
                    .iter()
                    .map(|a| (a.name.as_str(), a.wire_name.as_str())),
            )
            .chain(
                self.relationships
                    .iter()
                    .map(|r| (r.name.as_str(), r.wire_name.as_str())),
            )
    }

    /// Whether input shaped like `other` always fails to decode as `self`.
    ///
    /// True when `self` requires a wire field `other` does not declare, or
    /// when both require the same enumerated field with disjoint values.
    pub fn rejects_shape_of(&self, other: &EntityDescriptor) -> bool {
        let other_has = |wire: &str| other.field_names().any(|(_, w)| w == wire);

        let required_attr_missing = self
            .attributes
            .iter()
            .filter(|a| a.presence.is_required())
            .any(|a| !other_has(&a.wire_name));
        let required_rel_missing = self
            .relationships
            .iter()
            .filter(|r| r.presence.is_required())
            .any(|r| !other_has(&r.wire_name));
        let identifier_missing = self
            .identifier
            .as_ref()
            .map(|i| !other_has(&i.wire_name))
            .unwrap_or(false);

        let disjoint_enumeration = self.attributes.iter().any(|mine| {
            let ScalarKind::Enumeration(mine_values) = &mine.kind else {
                return false;
            };
            other.attributes.iter().any(|theirs| {
                let ScalarKind::Enumeration(their_values) = &theirs.kind else {
                    return false;
                };
                mine.wire_name == theirs.wire_name
                    && mine.presence.is_required()
                    && theirs.presence.is_required()
                    && !mine_values.iter().any(|v| their_values.contains(v))
            })
        });

        required_attr_missing || required_rel_missing || identifier_missing || disjoint_enumeration
    }
}

/// Implemented by model types that take part in the bridge.
pub trait Entity {
    /// Entity name used in descriptors and the persistence context
    const NAME: &'static str;

    fn descriptor() -> EntityDescriptor;
}
