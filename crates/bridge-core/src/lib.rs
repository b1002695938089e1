//! Bridge-Core: descriptor-driven import engine
//!
//! Turns decoded JSON trees into a deduplicated, relationship-wired graph
//! of persisted records, and encodes that graph back out.
//!
//! ## Key Components
//!
//! - `Identifier<T>` / `IdentifierValue`: typed and untyped entity keys
//! - `EntityDescriptor` / `Schema`: per-type capability declarations,
//!   validated up front
//! - `Resolver`: find-or-create, one record per (entity, identifier)
//! - `Session`: upsert, polymorphic decode, encode, commit/rollback
//!
//! ## Example
//! ```ignore
//! let schema = Arc::new(Schema::builder().register(venue).register(room).build()?);
//! let session = Session::new(schema, Arc::new(MemoryContext::new()));
//! session.upsert(&json!({"id": 1, "name": "Hall A"}), "Venue").await?;
//! session.commit().await?;
//! ```

pub mod descriptor;
mod encoder;
mod error;
pub mod identifier;
pub mod path;
pub mod resolver;
pub mod schema;
mod session;
pub mod telemetry;
mod upsert;
pub mod variant;

pub use descriptor::{
    AbsentPolicy, AttributeDescriptor, Cardinality, Entity, EntityDescriptor, IdentifierField,
    Presence, RelationTarget, RelationshipDescriptor, ScalarKind,
};
pub use error::BridgeError;
pub use identifier::{Identifier, IdentifierValue};
pub use path::FieldPath;
pub use resolver::Resolver;
pub use schema::{Schema, SchemaBuilder};
pub use session::Session;
pub use variant::{decode_polymorphic, select_variant, Selected, VariantDecoder};

pub use bridge_state::{PersistenceContext, RecordId, StorageError, StoredRecord};

/// Result type for bridge-core operations
pub type Result<T> = std::result::Result<T, BridgeError>;
