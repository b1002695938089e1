//! Conference domain models

pub mod people;
pub mod schedule;
pub mod summit;
pub mod venue;

pub use people::{
    Affiliation, AffiliationOrganization, Company, Speaker, TicketType, WirelessNetwork,
};
pub use schedule::{
    Event, EventType, Link, Presentation, Slide, Tag, Track, TrackGroup, Video, LEVELS,
};
pub use summit::Summit;
pub use venue::{
    Image, Location, Venue, VenueFloor, VenueRoom, LOCATION_CANDIDATES, ROOM_CLASS_NAME,
    VENUE_CLASS_NAMES,
};
