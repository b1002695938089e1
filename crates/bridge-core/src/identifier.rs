//! Typed and untyped entity identifiers
//!
//! `Identifier<T>` is what model code holds: an `i64` tagged with the entity
//! it names, so a venue identifier cannot be passed where an event
//! identifier is expected. `IdentifierValue` is the untyped form the
//! descriptor-driven engine works with.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::descriptor::ScalarKind;

/// Stable external key of one `T` instance.
///
/// Serializes as the bare scalar.
pub struct Identifier<T> {
    raw: i64,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Identifier<T> {
    pub const fn new(raw: i64) -> Self {
        Self {
            raw,
            _entity: PhantomData,
        }
    }

    pub const fn raw(self) -> i64 {
        self.raw
    }

    /// Reinterpret the same raw value as an identifier of another entity.
    ///
    /// Only meaningful where two entity kinds share one identifier space,
    /// such as a polymorphic slot and its concrete variants.
    pub const fn cast<U>(self) -> Identifier<U> {
        Identifier::new(self.raw)
    }
}

impl<T> Clone for Identifier<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Identifier<T> {}

impl<T> PartialEq for Identifier<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Identifier<T> {}

impl<T> PartialOrd for Identifier<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Identifier<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> Hash for Identifier<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Identifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.raw)
    }
}

impl<T> fmt::Display for Identifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl<T> From<i64> for Identifier<T> {
    fn from(raw: i64) -> Self {
        Self::new(raw)
    }
}

impl<T> Serialize for Identifier<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.raw)
    }
}

impl<'de, T> Deserialize<'de> for Identifier<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        i64::deserialize(deserializer).map(Self::new)
    }
}

/// Identifier as seen by the descriptor-driven engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentifierValue {
    Integer(i64),
    String(String),
}

impl IdentifierValue {
    /// Read an identifier of `kind` out of a decoded value.
    ///
    /// Returns `None` when the value has the wrong shape; integers that do
    /// not fit in `i64` are rejected rather than truncated.
    pub fn from_json(kind: &ScalarKind, value: &Value) -> Option<Self> {
        match kind {
            ScalarKind::Integer => value.as_i64().map(IdentifierValue::Integer),
            ScalarKind::String => value.as_str().map(|s| IdentifierValue::String(s.to_string())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            IdentifierValue::Integer(raw) => Value::from(*raw),
            IdentifierValue::String(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for IdentifierValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierValue::Integer(raw) => write!(f, "{raw}"),
            IdentifierValue::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for IdentifierValue {
    fn from(raw: i64) -> Self {
        IdentifierValue::Integer(raw)
    }
}

impl From<&str> for IdentifierValue {
    fn from(s: &str) -> Self {
        IdentifierValue::String(s.to_string())
    }
}

impl<T> From<Identifier<T>> for IdentifierValue {
    fn from(id: Identifier<T>) -> Self {
        IdentifierValue::Integer(id.raw())
    }
}
