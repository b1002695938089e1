//! Events and everything hanging off the schedule.

use bridge_core::{
    AttributeDescriptor, Entity, EntityDescriptor, Identifier, RelationshipDescriptor, ScalarKind,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::people::{Company, Speaker};
use super::summit::Summit;
use super::venue::{Location, LOCATION_CANDIDATES};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: Identifier<Track>,
    pub name: String,
    #[serde(rename = "track_groups", default)]
    pub groups: Vec<Identifier<TrackGroup>>,
}

impl Entity for Track {
    const NAME: &'static str = "Track";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("name", ScalarKind::String)
            .relationship(
                RelationshipDescriptor::to_many("groups", TrackGroup::NAME)
                    .wire("track_groups")
                    .optional(),
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackGroup {
    pub id: Identifier<TrackGroup>,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    #[serde(default)]
    pub tracks: Vec<Identifier<Track>>,
}

impl Entity for TrackGroup {
    const NAME: &'static str = "TrackGroup";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("name", ScalarKind::String)
            .optional("description", ScalarKind::String)
            .required("color", ScalarKind::String)
            .relationship(RelationshipDescriptor::to_many("tracks", Track::NAME).optional())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventType {
    pub id: Identifier<EventType>,
    pub name: String,
    pub color: String,
    pub black_out_times: bool,
}

impl Entity for EventType {
    const NAME: &'static str = "EventType";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("name", ScalarKind::String)
            .required("color", ScalarKind::String)
            .required("black_out_times", ScalarKind::Bool)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Identifier<Tag>,
    #[serde(rename = "tag")]
    pub name: String,
}

impl Entity for Tag {
    const NAME: &'static str = "Tag";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .attribute(AttributeDescriptor::new("name", ScalarKind::String).wire("tag"))
    }
}

/// Presentation difficulty, as spelled on the wire.
pub const LEVELS: [&str; 4] = ["Beginner", "Intermediate", "Advanced", "N/A"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub id: Identifier<Presentation>,
    pub level: Option<String>,
    #[serde(rename = "moderator_speaker_id")]
    pub moderator: Option<Identifier<Speaker>>,
    #[serde(default)]
    pub speakers: Vec<Identifier<Speaker>>,
}

impl Entity for Presentation {
    const NAME: &'static str = "Presentation";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .optional("level", ScalarKind::one_of(LEVELS))
            .relationship(
                RelationshipDescriptor::to_one("moderator", Speaker::NAME)
                    .wire("moderator_speaker_id")
                    .clear_when_absent(),
            )
            .relationship(
                RelationshipDescriptor::to_many("speakers", Speaker::NAME)
                    .ordered()
                    .optional(),
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: Identifier<Link>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub display_on_site: bool,
    pub featured: bool,
    pub order: i64,
    /// Not always a valid URL, kept as text.
    pub link: String,
    #[serde(rename = "event_id")]
    pub event: Identifier<Event>,
}

impl Entity for Link {
    const NAME: &'static str = "Link";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .optional("name", ScalarKind::String)
            .optional("description", ScalarKind::String)
            .required("display_on_site", ScalarKind::Bool)
            .required("featured", ScalarKind::Bool)
            .required("order", ScalarKind::Integer)
            .required("link", ScalarKind::String)
            .relationship(RelationshipDescriptor::to_one("event", Event::NAME).wire("event_id"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: Identifier<Video>,
    pub name: String,
    pub description: Option<String>,
    pub display_on_site: bool,
    pub featured: bool,
    pub highlighted: bool,
    pub youtube_id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub data_uploaded: DateTime<Utc>,
    pub order: i64,
    pub views: i64,
    #[serde(rename = "event_id")]
    pub event: Identifier<Event>,
}

impl Entity for Video {
    const NAME: &'static str = "Video";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("name", ScalarKind::String)
            .optional("description", ScalarKind::String)
            .required("display_on_site", ScalarKind::Bool)
            .required("featured", ScalarKind::Bool)
            .required("highlighted", ScalarKind::Bool)
            .required("youtube_id", ScalarKind::String)
            .required("data_uploaded", ScalarKind::Integer)
            .required("order", ScalarKind::Integer)
            .required("views", ScalarKind::Integer)
            .relationship(RelationshipDescriptor::to_one("event", Event::NAME).wire("event_id"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: Identifier<Slide>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub display_on_site: bool,
    pub featured: bool,
    pub order: i64,
    pub link: String,
    #[serde(rename = "event_id")]
    pub event: Identifier<Event>,
}

impl Entity for Slide {
    const NAME: &'static str = "Slide";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .optional("name", ScalarKind::String)
            .optional("description", ScalarKind::String)
            .required("display_on_site", ScalarKind::Bool)
            .required("featured", ScalarKind::Bool)
            .required("order", ScalarKind::Integer)
            .required("link", ScalarKind::String)
            .relationship(RelationshipDescriptor::to_one("event", Event::NAME).wire("event_id"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Identifier<Event>,
    pub title: String,
    #[serde(rename = "summit_id")]
    pub summit: Identifier<Summit>,
    pub description: Option<String>,
    pub social_description: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub end_date: DateTime<Utc>,
    #[serde(rename = "track_id")]
    pub track: Option<Identifier<Track>>,
    pub allow_feedback: bool,
    pub avg_feedback: f64,
    #[serde(rename = "type_id")]
    pub event_type: Identifier<EventType>,
    pub rsvp_link: Option<String>,
    pub rsvp_external: Option<bool>,
    pub to_record: Option<bool>,
    pub attachment: Option<String>,
    #[serde(default)]
    pub sponsors: Vec<Identifier<Company>>,
    #[serde(default)]
    pub tags: Vec<Identifier<Tag>>,
    #[serde(rename = "location_id")]
    pub location: Option<Identifier<Location>>,
    #[serde(default)]
    pub videos: Vec<Identifier<Video>>,
    #[serde(default)]
    pub slides: Vec<Identifier<Slide>>,
    #[serde(default)]
    pub links: Vec<Identifier<Link>>,
    pub presentation: Option<Identifier<Presentation>>,
}

impl Entity for Event {
    const NAME: &'static str = "Event";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("title", ScalarKind::String)
            .optional("description", ScalarKind::String)
            .optional("social_description", ScalarKind::String)
            .required("start_date", ScalarKind::Integer)
            .required("end_date", ScalarKind::Integer)
            .required("allow_feedback", ScalarKind::Bool)
            .required("avg_feedback", ScalarKind::Float)
            .optional("rsvp_link", ScalarKind::String)
            .optional("rsvp_external", ScalarKind::Bool)
            .optional("to_record", ScalarKind::Bool)
            .optional("attachment", ScalarKind::String)
            .relationship(RelationshipDescriptor::to_one("summit", Summit::NAME).wire("summit_id"))
            .relationship(
                RelationshipDescriptor::to_one("track", Track::NAME)
                    .wire("track_id")
                    .clear_when_absent(),
            )
            .relationship(
                RelationshipDescriptor::to_one("event_type", EventType::NAME).wire("type_id"),
            )
            .relationship(RelationshipDescriptor::to_many("sponsors", Company::NAME).optional())
            .relationship(RelationshipDescriptor::to_many("tags", Tag::NAME).optional())
            .relationship(
                RelationshipDescriptor::to_one_of("location", LOCATION_CANDIDATES)
                    .wire("location_id")
                    .clear_when_absent(),
            )
            .relationship(
                RelationshipDescriptor::to_many("videos", Video::NAME)
                    .ordered()
                    .optional(),
            )
            .relationship(
                RelationshipDescriptor::to_many("slides", Slide::NAME)
                    .ordered()
                    .optional(),
            )
            .relationship(
                RelationshipDescriptor::to_many("links", Link::NAME)
                    .ordered()
                    .optional(),
            )
            .relationship(
                RelationshipDescriptor::to_one("presentation", Presentation::NAME).optional(),
            )
    }
}
