//! Imports of a full conference feed through the conference schema.

use std::sync::Arc;

use bridge_core::{BridgeError, Entity, Identifier, PersistenceContext, Session};
use bridge_state::MemoryContext;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use summit_model::*;

const FEED: &str = include_str!("fixtures/summit.json");

fn feed() -> Value {
    serde_json::from_str(FEED).unwrap()
}

fn session() -> Session {
    let schema = Arc::new(summit_schema().unwrap());
    Session::new(schema, Arc::new(MemoryContext::new()))
}

async fn imported() -> Session {
    let session = session();
    session.import(&feed(), Summit::NAME).await.unwrap();
    session
}

#[tokio::test]
async fn test_full_feed_import_counts() {
    let session = imported().await;

    let expected = [
        (Summit::NAME, 1),
        (Company::NAME, 2),
        (Speaker::NAME, 2),
        (Affiliation::NAME, 1),
        (AffiliationOrganization::NAME, 1),
        (TicketType::NAME, 1),
        (Image::NAME, 1),
        (Venue::NAME, 2),
        (VenueFloor::NAME, 1),
        (VenueRoom::NAME, 2),
        (Track::NAME, 2),
        (TrackGroup::NAME, 1),
        (EventType::NAME, 2),
        (Event::NAME, 2),
        (Presentation::NAME, 2),
        (Tag::NAME, 2),
        (Link::NAME, 1),
        (Video::NAME, 1),
        (Slide::NAME, 1),
        (WirelessNetwork::NAME, 1),
    ];
    for (entity, count) in expected {
        assert_eq!(session.count(entity).await.unwrap(), count, "{entity}");
    }
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let session = imported().await;
    let summit = session.find(Identifier::<Summit>::new(22)).await.unwrap().unwrap();
    let before = session.encode(&summit).await.unwrap();

    session.import(&feed(), Summit::NAME).await.unwrap();

    assert_eq!(session.count(Event::NAME).await.unwrap(), 2);
    assert_eq!(session.count(VenueRoom::NAME).await.unwrap(), 2);
    let again = session.find(Identifier::<Summit>::new(22)).await.unwrap().unwrap();
    assert_eq!(again, summit);
    assert_eq!(session.encode(&again).await.unwrap(), before);
}

#[tokio::test]
async fn test_locations_decode_to_their_variants() {
    let session = imported().await;
    let summit = session.find(Identifier::<Summit>::new(22)).await.unwrap().unwrap();
    let typed: Summit = session.decode_as(&summit).await.unwrap();

    assert_eq!(
        typed.locations,
        vec![
            Identifier::new(1),
            Identifier::new(2),
            Identifier::new(10),
            Identifier::new(11)
        ]
    );

    let hotel = session.find(Identifier::<Venue>::new(2)).await.unwrap();
    assert!(hotel.is_some());
    let room = session.find(Identifier::<VenueRoom>::new(10)).await.unwrap();
    assert!(room.is_some());
    // Room ids never leak into the venue table.
    assert!(session.find(Identifier::<Venue>::new(10)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_event_location_names_a_room_or_venue() {
    let session = imported().await;

    let keynote = session.find(Identifier::<Event>::new(1001)).await.unwrap().unwrap();
    let keynote: Event = session.decode_as(&keynote).await.unwrap();
    assert_eq!(keynote.location, Some(Identifier::new(1)));
    assert_eq!(keynote.start_date, Utc.timestamp_opt(1461600000, 0).unwrap());
    assert_eq!(keynote.presentation, Some(Identifier::new(1001)));

    let talk = session.find(Identifier::<Event>::new(1002)).await.unwrap().unwrap();
    let stored = session.context().fetch(&talk).await.unwrap();
    let location = session.context().fetch(&stored.relation("location")[0]).await.unwrap();
    assert_eq!(location.entity, VenueRoom::NAME);

    let talk: Event = session.decode_as(&talk).await.unwrap();
    // Unordered relations encode sorted by identifier.
    assert_eq!(talk.sponsors, vec![Identifier::new(1), Identifier::new(2)]);
    assert_eq!(talk.links, vec![Identifier::new(95)]);
}

#[tokio::test]
async fn test_room_references_venue_and_rename_keeps_identity() {
    let session = imported().await;

    let venue = session.find(Identifier::<Venue>::new(1)).await.unwrap().unwrap();
    let room = session.find(Identifier::<VenueRoom>::new(10)).await.unwrap().unwrap();
    let stored_room = session.context().fetch(&room).await.unwrap();
    assert_eq!(stored_room.relation("venue"), &[venue.clone()]);

    let before = session.encode(&venue).await.unwrap();
    let renamed = json!({
        "id": 1,
        "class_name": "SummitVenue",
        "name": "ACC",
        "description": null,
        "location_type": "Internal",
        "country": "US",
        "address": "500 E Cesar Chavez St",
        "city": "Austin",
        "zip_code": "78701",
        "state": "TX",
        "latitude": "30.2635",
        "longitude": "-97.7397"
    });
    let again = session.upsert(&renamed, Venue::NAME).await.unwrap();
    assert_eq!(again, venue);

    let mut expected = before;
    expected["name"] = json!("ACC");
    assert_eq!(session.encode(&venue).await.unwrap(), expected);
    assert_eq!(session.count(Venue::NAME).await.unwrap(), 2);

    let stored_room = session.context().fetch(&room).await.unwrap();
    assert_eq!(stored_room.relation("venue"), &[venue]);
}

#[tokio::test]
async fn test_typed_room_round_trip() {
    let session = session();
    let room = VenueRoom {
        id: Identifier::new(10),
        class_name: ROOM_CLASS_NAME.to_string(),
        name: "Ballroom A".to_string(),
        description: Some("Main stage".to_string()),
        capacity: Some(1200),
        venue: Identifier::new(1),
        floor: None,
    };

    let record = session.upsert_entity(&room).await.unwrap();
    let decoded: VenueRoom = session.decode_as(&record).await.unwrap();
    assert_eq!(decoded, room);

    // The referenced venue exists only as a shell record.
    assert_eq!(session.count(Venue::NAME).await.unwrap(), 1);
}

fn standup(location: Value) -> Value {
    json!({
        "id": 5,
        "title": "Standup",
        "summit_id": 22,
        "start_date": 1461600000,
        "end_date": 1461601800,
        "allow_feedback": false,
        "avg_feedback": 0,
        "type_id": 61,
        "location_id": location
    })
}

#[tokio::test]
async fn test_room_cannot_take_a_venue_identifier() {
    let session = session();
    session
        .import(
            &json!({
                "id": 1,
                "class_name": "SummitVenue",
                "name": "Hall",
                "location_type": "Internal",
                "country": "US"
            }),
            Venue::NAME,
        )
        .await
        .unwrap();

    let room = json!({
        "id": 1,
        "class_name": "SummitVenueRoom",
        "name": "Room 1",
        "venue_id": 1
    });
    let err = session.import(&standup(room), Event::NAME).await.unwrap_err();

    assert!(matches!(err, BridgeError::MalformedInput { .. }));
    assert_eq!(err.path().unwrap().to_string(), "location_id.id");
    assert_eq!(session.count(VenueRoom::NAME).await.unwrap(), 0);
    assert_eq!(session.count(Event::NAME).await.unwrap(), 0);
}

#[tokio::test]
async fn test_event_location_survives_encode_round_trip() {
    let session = imported().await;
    let talk = session.find(Identifier::<Event>::new(1002)).await.unwrap().unwrap();
    let room = session.find(Identifier::<VenueRoom>::new(10)).await.unwrap().unwrap();

    let encoded = session.encode(&talk).await.unwrap();
    assert_eq!(encoded["location_id"], json!(10));
    session.import(&encoded, Event::NAME).await.unwrap();

    let stored = session.context().fetch(&talk).await.unwrap();
    assert_eq!(stored.relation("location"), &[room]);
    assert_eq!(session.count(VenueRoom::NAME).await.unwrap(), 2);
}

#[tokio::test]
async fn test_unknown_location_reference_is_invalid_variant() {
    let session = session();

    let err = session.import(&standup(json!(404)), Event::NAME).await.unwrap_err();
    assert!(matches!(err, BridgeError::InvalidVariant { .. }));
    assert_eq!(session.count(Event::NAME).await.unwrap(), 0);
}

#[tokio::test]
async fn test_feed_without_identifier_is_rejected() {
    let session = session();
    let mut feed = feed();
    feed["schedule"][1]
        .as_object_mut()
        .unwrap()
        .remove("id");

    let err = session.import(&feed, Summit::NAME).await.unwrap_err();
    assert!(matches!(err, BridgeError::MalformedInput { .. }));
    assert_eq!(err.path().unwrap().to_string(), "schedule[1].id");
    assert_eq!(session.count(Summit::NAME).await.unwrap(), 0);
}
