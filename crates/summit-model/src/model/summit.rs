use bridge_core::{Entity, EntityDescriptor, Identifier, RelationshipDescriptor, ScalarKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::people::{Company, Speaker, TicketType, WirelessNetwork};
use super::schedule::{Event, EventType, Track, TrackGroup};
use super::venue::{Location, LOCATION_CANDIDATES};

/// The root of a conference feed.
///
/// Feeds nest every child collection as full objects; once stored, each
/// collection encodes back as identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summit {
    pub id: Identifier<Summit>,
    pub name: String,
    pub time_zone: String,
    pub dates_label: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub end_date: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub schedule_start_date: Option<DateTime<Utc>>,
    pub active: bool,
    pub page_url: String,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub start_showing_venues_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sponsors: Vec<Identifier<Company>>,
    #[serde(default)]
    pub speakers: Vec<Identifier<Speaker>>,
    #[serde(default)]
    pub ticket_types: Vec<Identifier<TicketType>>,
    #[serde(default)]
    pub locations: Vec<Identifier<Location>>,
    #[serde(default)]
    pub tracks: Vec<Identifier<Track>>,
    #[serde(default)]
    pub track_groups: Vec<Identifier<TrackGroup>>,
    #[serde(default)]
    pub event_types: Vec<Identifier<EventType>>,
    #[serde(default)]
    pub schedule: Vec<Identifier<Event>>,
    #[serde(default)]
    pub wireless_networks: Vec<Identifier<WirelessNetwork>>,
}

impl Entity for Summit {
    const NAME: &'static str = "Summit";

    // Relationships are wired in declaration order, so locations precede
    // the schedule whose events name them by bare identifier.
    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("name", ScalarKind::String)
            .required("time_zone", ScalarKind::String)
            .optional("dates_label", ScalarKind::String)
            .required("start_date", ScalarKind::Integer)
            .required("end_date", ScalarKind::Integer)
            .optional("schedule_start_date", ScalarKind::Integer)
            .required("active", ScalarKind::Bool)
            .required("page_url", ScalarKind::String)
            .optional("start_showing_venues_date", ScalarKind::Integer)
            .relationship(RelationshipDescriptor::to_many("sponsors", Company::NAME).optional())
            .relationship(RelationshipDescriptor::to_many("speakers", Speaker::NAME).optional())
            .relationship(
                RelationshipDescriptor::to_many("ticket_types", TicketType::NAME).optional(),
            )
            .relationship(
                RelationshipDescriptor::to_many_of("locations", LOCATION_CANDIDATES).optional(),
            )
            .relationship(
                RelationshipDescriptor::to_many("track_groups", TrackGroup::NAME).optional(),
            )
            .relationship(RelationshipDescriptor::to_many("tracks", Track::NAME).optional())
            .relationship(
                RelationshipDescriptor::to_many("event_types", EventType::NAME).optional(),
            )
            .relationship(
                RelationshipDescriptor::to_many("schedule", Event::NAME)
                    .ordered()
                    .optional(),
            )
            .relationship(
                RelationshipDescriptor::to_many("wireless_networks", WirelessNetwork::NAME)
                    .optional(),
            )
    }
}
