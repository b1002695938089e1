//! Summit-Model: conference schema for recordbridge
//!
//! Typed models for a conference feed (summits, venues, rooms, the event
//! schedule and the people behind it) and the entity descriptors that let
//! the bridge import them.
//!
//! ## Example
//! ```ignore
//! let schema = Arc::new(summit_model::summit_schema()?);
//! let session = Session::new(schema, Arc::new(MemoryContext::new()));
//! session.import(&feed, Summit::NAME).await?;
//! ```

pub mod model;

use bridge_core::{Schema, SchemaBuilder};

pub use model::*;

/// Register every conference entity on `builder`.
pub fn register(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .register_entity::<Summit>()
        .register_entity::<Company>()
        .register_entity::<Speaker>()
        .register_entity::<Affiliation>()
        .register_entity::<AffiliationOrganization>()
        .register_entity::<TicketType>()
        .register_entity::<Image>()
        .register_entity::<Venue>()
        .register_entity::<VenueFloor>()
        .register_entity::<VenueRoom>()
        .register_entity::<Track>()
        .register_entity::<TrackGroup>()
        .register_entity::<EventType>()
        .register_entity::<Event>()
        .register_entity::<Presentation>()
        .register_entity::<Tag>()
        .register_entity::<Link>()
        .register_entity::<Video>()
        .register_entity::<Slide>()
        .register_entity::<WirelessNetwork>()
}

/// The validated conference schema.
pub fn summit_schema() -> bridge_core::Result<Schema> {
    register(Schema::builder()).build()
}
