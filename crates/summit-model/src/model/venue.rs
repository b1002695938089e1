//! Venues, floors, rooms, and the polymorphic `Location`.
//!
//! Typed models mirror the encoded shape: relationships are carried as
//! identifiers, never as nested objects.

use bridge_core::{
    select_variant, AttributeDescriptor, Entity, EntityDescriptor, Identifier,
    RelationshipDescriptor, ScalarKind, VariantDecoder,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// `class_name` values a venue may carry.
pub const VENUE_CLASS_NAMES: [&str; 4] = [
    "SummitVenue",
    "SummitExternalLocation",
    "SummitHotel",
    "SummitAirport",
];

/// The only `class_name` a room carries.
pub const ROOM_CLASS_NAME: &str = "SummitVenueRoom";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: Identifier<Image>,
    pub url: String,
}

impl Entity for Image {
    const NAME: &'static str = "Image";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("url", ScalarKind::String)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: Identifier<Venue>,
    pub class_name: String,
    pub name: String,
    pub description: Option<String>,
    pub location_type: String,
    pub country: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub state: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[serde(default)]
    pub maps: Vec<Identifier<Image>>,
    #[serde(default)]
    pub images: Vec<Identifier<Image>>,
    #[serde(default)]
    pub floors: Vec<Identifier<VenueFloor>>,
}

impl Entity for Venue {
    const NAME: &'static str = "Venue";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("class_name", ScalarKind::one_of(VENUE_CLASS_NAMES))
            .required("name", ScalarKind::String)
            .optional("description", ScalarKind::String)
            .required(
                "location_type",
                ScalarKind::one_of(["Internal", "External", "None"]),
            )
            .required("country", ScalarKind::String)
            .optional("address", ScalarKind::String)
            .optional("city", ScalarKind::String)
            .optional("zip_code", ScalarKind::String)
            .optional("state", ScalarKind::String)
            .optional("latitude", ScalarKind::String)
            .optional("longitude", ScalarKind::String)
            .relationship(
                RelationshipDescriptor::to_many("maps", Image::NAME)
                    .ordered()
                    .optional(),
            )
            .relationship(
                RelationshipDescriptor::to_many("images", Image::NAME)
                    .ordered()
                    .optional(),
            )
            .relationship(RelationshipDescriptor::to_many("floors", VenueFloor::NAME).optional())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueFloor {
    pub id: Identifier<VenueFloor>,
    pub name: String,
    pub description: Option<String>,
    pub number: i16,
    pub image: Option<String>,
    #[serde(rename = "venue_id")]
    pub venue: Identifier<Venue>,
    #[serde(default)]
    pub rooms: Vec<Identifier<VenueRoom>>,
}

impl Entity for VenueFloor {
    const NAME: &'static str = "VenueFloor";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("name", ScalarKind::String)
            .optional("description", ScalarKind::String)
            .required("number", ScalarKind::Integer)
            .optional("image", ScalarKind::String)
            .relationship(RelationshipDescriptor::to_one("venue", Venue::NAME).wire("venue_id"))
            .relationship(RelationshipDescriptor::to_many("rooms", VenueRoom::NAME).optional())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueRoom {
    pub id: Identifier<VenueRoom>,
    pub class_name: String,
    pub name: String,
    pub description: Option<String>,
    pub capacity: Option<i64>,
    #[serde(rename = "venue_id")]
    pub venue: Identifier<Venue>,
    #[serde(rename = "floor_id")]
    pub floor: Option<Identifier<VenueFloor>>,
}

impl Entity for VenueRoom {
    const NAME: &'static str = "VenueRoom";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("class_name", ScalarKind::one_of([ROOM_CLASS_NAME]))
            .required("name", ScalarKind::String)
            .optional("description", ScalarKind::String)
            .attribute(AttributeDescriptor::new("capacity", ScalarKind::Integer).optional())
            .relationship(RelationshipDescriptor::to_one("venue", Venue::NAME).wire("venue_id"))
            .relationship(
                RelationshipDescriptor::to_one("floor", VenueFloor::NAME)
                    .wire("floor_id")
                    .clear_when_absent(),
            )
    }
}

/// A place an event happens: either a whole venue or one of its rooms.
///
/// Decoded by ordered trial, venue first; the `class_name` values of the
/// two shapes never overlap, so at most one candidate accepts any input.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Venue(Venue),
    Room(VenueRoom),
}

/// Candidate entity names of a location slot, in trial order.
pub const LOCATION_CANDIDATES: [&str; 2] = [Venue::NAME, VenueRoom::NAME];

impl Location {
    pub fn identifier(&self) -> Identifier<Location> {
        match self {
            Location::Venue(venue) => venue.id.cast(),
            Location::Room(room) => room.id.cast(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Location::Venue(venue) => &venue.name,
            Location::Room(room) => &room.name,
        }
    }

    /// Decode a location, reporting which variant matched.
    pub fn decode(raw: &Value) -> bridge_core::Result<(&'static str, Location)> {
        let candidates: [(&'static str, VariantDecoder<Location>); 2] = [
            (Venue::NAME, decode_venue),
            (VenueRoom::NAME, decode_room),
        ];
        select_variant(raw, &candidates)
    }
}

fn decode_venue(raw: &Value) -> Result<Location, serde_json::Error> {
    let venue = Venue::deserialize(raw)?;
    if !VENUE_CLASS_NAMES.contains(&venue.class_name.as_str()) {
        return Err(serde_json::Error::custom(format!(
            "`{}` is not a venue class",
            venue.class_name
        )));
    }
    Ok(Location::Venue(venue))
}

fn decode_room(raw: &Value) -> Result<Location, serde_json::Error> {
    let room = VenueRoom::deserialize(raw)?;
    if room.class_name != ROOM_CLASS_NAME {
        return Err(serde_json::Error::custom(format!(
            "`{}` is not a room class",
            room.class_name
        )));
    }
    Ok(Location::Room(room))
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Location::decode(&raw)
            .map(|(_, location)| location)
            .map_err(D::Error::custom)
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Location::Venue(venue) => venue.serialize(serializer),
            Location::Room(room) => room.serialize(serializer),
        }
    }
}
