//! Bridge-State: persistence contexts for recordbridge
//!
//! This crate provides the session-scoped persistence layer the import
//! engine writes through. It owns every persisted record; callers only ever
//! hold `RecordId` handles.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: find-by-attribute, record mutation, and atomic save/discard.
//!
//! ## Key Components
//!
//! - `PersistenceContext`: the collaborator contract
//! - `MemoryContext`: in-process context with committed and working graphs
//! - `SurrealContext`: SurrealDB-backed context with transactional save

pub mod config;
pub mod context;
mod error;
pub mod memory;
pub mod migrations;
pub mod surreal_context;

pub use config::{AuthScope, StoreConfig};
pub use context::{PersistenceContext, RecordId, StorageResult, StoredRecord};
pub use error::StorageError;
pub use memory::MemoryContext;
pub use surreal_context::SurrealContext;
