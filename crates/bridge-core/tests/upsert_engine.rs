//! Behavioural tests for the upsert engine, driven by a synthetic schema.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_core::{
    AttributeDescriptor, BridgeError, EntityDescriptor, RelationshipDescriptor, ScalarKind,
    Schema, Session,
};
use bridge_state::{
    MemoryContext, PersistenceContext, RecordId, StorageError, StorageResult, StoredRecord,
};
use serde_json::{json, Value};

fn schema() -> Arc<Schema> {
    let schema = Schema::builder()
        .register(
            EntityDescriptor::new("Venue")
                .identifier("id", ScalarKind::Integer)
                .required("name", ScalarKind::String)
                .attribute(
                    AttributeDescriptor::new("description", ScalarKind::String).clear_when_absent(),
                )
                .optional("city", ScalarKind::String)
                .relationship(RelationshipDescriptor::to_many("rooms", "Room").optional()),
        )
        .register(
            EntityDescriptor::new("Room")
                .identifier("id", ScalarKind::Integer)
                .required("name", ScalarKind::String)
                .relationship(RelationshipDescriptor::to_one("venue", "Venue").wire("venue_id"))
                .relationship(
                    RelationshipDescriptor::to_one("annex", "Room")
                        .wire("annex_id")
                        .optional(),
                ),
        )
        .register(
            EntityDescriptor::new("Track")
                .identifier("id", ScalarKind::Integer)
                .required("name", ScalarKind::String)
                .relationship(
                    RelationshipDescriptor::to_many("groups", "Group").wire("track_groups"),
                )
                .relationship(RelationshipDescriptor::to_many("sessions", "Slot").ordered()),
        )
        .register(EntityDescriptor::new("Group").identifier("id", ScalarKind::Integer))
        .register(
            EntityDescriptor::new("Slot")
                .identifier("id", ScalarKind::Integer)
                .optional("title", ScalarKind::String),
        )
        .register(
            EntityDescriptor::new("Event")
                .identifier("id", ScalarKind::Integer)
                .required("name", ScalarKind::String)
                .relationship(
                    RelationshipDescriptor::to_one_of("location", ["Room", "Venue"]).optional(),
                ),
        )
        .build()
        .unwrap();
    Arc::new(schema)
}

fn session() -> (Session, Arc<MemoryContext>) {
    let ctx = Arc::new(MemoryContext::new());
    (Session::new(schema(), ctx.clone()), ctx)
}

async fn stored(session: &Session, record: &RecordId) -> StoredRecord {
    session.context().fetch(record).await.unwrap()
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn venue_then_room_scenario_preserves_identity() {
    let (session, _) = session();

    let venue = session
        .upsert(&json!({"id": 1, "name": "Hall A"}), "Venue")
        .await
        .unwrap();
    let room = session
        .upsert(&json!({"id": 10, "name": "101", "venue_id": 1}), "Room")
        .await
        .unwrap();
    let renamed = session
        .upsert(&json!({"id": 1, "name": "Hall A Renamed"}), "Venue")
        .await
        .unwrap();

    assert_eq!(venue, renamed);
    assert_eq!(session.count("Venue").await.unwrap(), 1);
    assert_eq!(stored(&session, &room).await.relation("venue"), &[venue.clone()]);
    assert_eq!(
        stored(&session, &venue).await.field("name"),
        Some(&json!("Hall A Renamed"))
    );
}

#[tokio::test]
async fn decoding_same_input_twice_creates_no_duplicates() {
    let (session, _) = session();
    let input = json!({
        "id": 1,
        "name": "Hall A",
        "rooms": [
            {"id": 10, "name": "101", "venue_id": 1},
            {"id": 11, "name": "102", "venue_id": 1}
        ]
    });

    let first = session.upsert(&input, "Venue").await.unwrap();
    let second = session.upsert(&input, "Venue").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(session.count("Venue").await.unwrap(), 1);
    assert_eq!(session.count("Room").await.unwrap(), 2);
}

#[tokio::test]
async fn reference_before_definition_fills_the_shell() {
    let (session, _) = session();

    let room = session
        .upsert(&json!({"id": 10, "name": "101", "venue_id": 5}), "Room")
        .await
        .unwrap();
    let shell = stored(&session, &room).await.relation("venue")[0].clone();
    assert_eq!(stored(&session, &shell).await.field("name"), None);

    let venue = session
        .upsert(&json!({"id": 5, "name": "Late Hall"}), "Venue")
        .await
        .unwrap();
    assert_eq!(venue, shell);
    assert_eq!(
        stored(&session, &venue).await.field("name"),
        Some(&json!("Late Hall"))
    );
}

#[tokio::test]
async fn concurrent_upserts_of_same_key_share_one_record() {
    let (session, _) = session();
    let a = json!({"id": 3, "name": "North"});
    let b = json!({"id": 3, "name": "South"});

    let (left, right) = tokio::join!(session.upsert(&a, "Venue"), session.upsert(&b, "Venue"));

    assert_eq!(left.unwrap(), right.unwrap());
    assert_eq!(session.count("Venue").await.unwrap(), 1);
}

#[tokio::test]
async fn self_reference_does_not_recurse() {
    let (session, _) = session();
    let room = session
        .upsert(
            &json!({"id": 10, "name": "101", "venue_id": 1, "annex_id": 10}),
            "Room",
        )
        .await
        .unwrap();

    assert_eq!(stored(&session, &room).await.relation("annex"), &[room.clone()]);
    assert_eq!(session.count("Room").await.unwrap(), 1);
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn absent_fields_follow_their_presence_policy() {
    let (session, _) = session();
    let venue = session
        .upsert(
            &json!({"id": 1, "name": "Hall", "description": "big", "city": "Austin"}),
            "Venue",
        )
        .await
        .unwrap();

    session
        .upsert(&json!({"id": 1, "name": "Hall"}), "Venue")
        .await
        .unwrap();

    let record = stored(&session, &venue).await;
    // `description` clears when omitted, `city` keeps its value.
    assert_eq!(record.field("description"), Some(&Value::Null));
    assert_eq!(record.field("city"), Some(&json!("Austin")));
}

#[tokio::test]
async fn explicit_null_clears_optional_field() {
    let (session, _) = session();
    let venue = session
        .upsert(&json!({"id": 1, "name": "Hall", "city": "Austin"}), "Venue")
        .await
        .unwrap();
    session
        .upsert(&json!({"id": 1, "name": "Hall", "city": null}), "Venue")
        .await
        .unwrap();

    assert_eq!(stored(&session, &venue).await.field("city"), Some(&Value::Null));
}

#[tokio::test]
async fn wrong_attribute_kind_is_malformed_and_writes_nothing() {
    let (session, _) = session();
    let err = session
        .upsert(&json!({"id": 1, "name": 42}), "Venue")
        .await
        .unwrap_err();

    assert!(matches!(&err, BridgeError::MalformedInput { path, .. } if path.to_string() == "name"));
    assert_eq!(session.count("Venue").await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_identifier_is_fatal() {
    let (session, _) = session();
    let err = session
        .upsert(&json!({"name": "Nameless"}), "Venue")
        .await
        .unwrap_err();

    match err {
        BridgeError::MalformedInput { path, .. } => assert_eq!(path.to_string(), "id"),
        other => panic!("expected MalformedInput, got {other:?}"),
    }
    assert_eq!(session.count("Venue").await.unwrap(), 0);
}

#[tokio::test]
async fn nested_missing_identifier_reports_its_path() {
    let (session, _) = session();
    let err = session
        .upsert(
            &json!({
                "id": 1,
                "name": "Hall",
                "rooms": [{"id": 10, "name": "101", "venue_id": 1}, {"name": "102", "venue_id": 1}]
            }),
            "Venue",
        )
        .await
        .unwrap_err();

    assert_eq!(err.path().unwrap().to_string(), "rooms[1].id");
}

#[tokio::test]
async fn string_identifier_for_integer_kind_is_malformed() {
    let (session, _) = session();
    let err = session
        .upsert(&json!({"id": "1", "name": "Hall"}), "Venue")
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::MalformedInput { .. }));
}

// ---------------------------------------------------------------------------
// Relationships
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_to_many_clears_relationship() {
    let (session, _) = session();
    let track = session
        .upsert(
            &json!({"id": 1, "name": "Cloud", "track_groups": [1, 2], "sessions": [7, 8]}),
            "Track",
        )
        .await
        .unwrap();
    assert_eq!(stored(&session, &track).await.relation("groups").len(), 2);

    session
        .upsert(
            &json!({"id": 1, "name": "Cloud", "track_groups": [], "sessions": []}),
            "Track",
        )
        .await
        .unwrap();

    let record = stored(&session, &track).await;
    assert!(record.relation("groups").is_empty());
    assert!(record.relation("sessions").is_empty());
}

#[tokio::test]
async fn to_many_replaces_rather_than_appends() {
    let (session, _) = session();
    let track = session
        .upsert(
            &json!({"id": 1, "name": "Cloud", "track_groups": [1, 2], "sessions": []}),
            "Track",
        )
        .await
        .unwrap();
    session
        .upsert(
            &json!({"id": 1, "name": "Cloud", "track_groups": [3], "sessions": []}),
            "Track",
        )
        .await
        .unwrap();

    let encoded = session.encode(&track).await.unwrap();
    assert_eq!(encoded["track_groups"], json!([3]));
    assert_eq!(session.count("Group").await.unwrap(), 3);
}

#[tokio::test]
async fn ordered_relationship_keeps_source_order_and_unordered_dedupes() {
    let (session, _) = session();
    let track = session
        .upsert(
            &json!({
                "id": 1,
                "name": "Cloud",
                "track_groups": [2, 1, 2],
                "sessions": [9, {"id": 3, "title": "Keynote"}, 5]
            }),
            "Track",
        )
        .await
        .unwrap();

    let encoded = session.encode(&track).await.unwrap();
    assert_eq!(encoded["sessions"], json!([9, 3, 5]));
    assert_eq!(encoded["track_groups"], json!([1, 2]));
}

#[tokio::test]
async fn bare_identifier_reference_does_not_decode_target() {
    let (session, _) = session();
    let venue = session
        .upsert(&json!({"id": 1, "name": "Hall A"}), "Venue")
        .await
        .unwrap();

    session
        .upsert(&json!({"id": 10, "name": "101", "venue_id": 1}), "Room")
        .await
        .unwrap();

    let record = stored(&session, &venue).await;
    assert_eq!(record.field("name"), Some(&json!("Hall A")));
}

#[tokio::test]
async fn nested_object_is_upserted() {
    let (session, _) = session();
    let room = session
        .upsert(
            &json!({"id": 10, "name": "101", "venue_id": {"id": 1, "name": "Hall Nested"}}),
            "Room",
        )
        .await
        .unwrap();

    let venue = stored(&session, &room).await.relation("venue")[0].clone();
    assert_eq!(
        stored(&session, &venue).await.field("name"),
        Some(&json!("Hall Nested"))
    );
}

#[tokio::test]
async fn missing_required_relationship_is_malformed() {
    let (session, _) = session();
    let err = session
        .upsert(&json!({"id": 10, "name": "101"}), "Room")
        .await
        .unwrap_err();
    assert_eq!(err.path().unwrap().to_string(), "venue_id");
}

// ---------------------------------------------------------------------------
// Polymorphic slots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn polymorphic_nested_object_picks_first_matching_candidate() {
    let (session, _) = session();
    let room_event = session
        .upsert(
            &json!({"id": 100, "name": "Talk", "location": {"id": 10, "name": "101", "venue_id": 1}}),
            "Event",
        )
        .await
        .unwrap();
    let venue_event = session
        .upsert(
            &json!({"id": 101, "name": "Party", "location": {"id": 2, "name": "Hall B"}}),
            "Event",
        )
        .await
        .unwrap();

    let room_target = stored(&session, &room_event).await.relation("location")[0].clone();
    let venue_target = stored(&session, &venue_event).await.relation("location")[0].clone();
    assert_eq!(stored(&session, &room_target).await.entity, "Room");
    assert_eq!(stored(&session, &venue_target).await.entity, "Venue");
}

#[tokio::test]
async fn polymorphic_bare_reference_finds_existing_variant() {
    let (session, _) = session();
    let venue = session
        .upsert(&json!({"id": 2, "name": "Hall B"}), "Venue")
        .await
        .unwrap();
    let event = session
        .upsert(&json!({"id": 100, "name": "Party", "location": 2}), "Event")
        .await
        .unwrap();

    assert_eq!(stored(&session, &event).await.relation("location"), &[venue]);
}

#[tokio::test]
async fn polymorphic_bare_reference_to_unknown_record_is_invalid_variant() {
    let (session, _) = session();
    let err = session
        .upsert(&json!({"id": 100, "name": "Party", "location": 404}), "Event")
        .await
        .unwrap_err();

    match err {
        BridgeError::InvalidVariant {
            candidates,
            failures,
            ..
        } => {
            assert_eq!(candidates, vec!["Room", "Venue"]);
            assert_eq!(failures.len(), 2);
        }
        other => panic!("expected InvalidVariant, got {other:?}"),
    }
}

#[tokio::test]
async fn polymorphic_object_matching_nothing_is_invalid_variant() {
    let (session, _) = session();
    let err = session
        .upsert(
            &json!({"id": 100, "name": "Talk", "location": {"id": 1}}),
            "Event",
        )
        .await
        .unwrap_err();

    assert!(
        matches!(&err, BridgeError::InvalidVariant { path, .. } if path.to_string() == "location")
    );
}

#[tokio::test]
async fn polymorphic_candidate_cannot_reuse_sibling_identifier() {
    let (session, _) = session();
    session
        .import(&json!({"id": 1, "name": "Hall A"}), "Venue")
        .await
        .unwrap();

    let err = session
        .import(
            &json!({
                "id": 5,
                "name": "Talk",
                "location": {"id": 1, "name": "101", "venue_id": 1}
            }),
            "Event",
        )
        .await
        .unwrap_err();

    assert!(
        matches!(&err, BridgeError::MalformedInput { path, .. } if path.to_string() == "location.id")
    );
    assert_eq!(session.count("Room").await.unwrap(), 0);
    assert_eq!(session.count("Event").await.unwrap(), 0);
}

#[tokio::test]
async fn sibling_identifier_is_rejected_in_either_order() {
    let (session, _) = session();
    session
        .upsert(&json!({"id": 7, "name": "101", "venue_id": 1}), "Room")
        .await
        .unwrap();

    let err = session
        .upsert(&json!({"id": 7, "name": "Hall Seven"}), "Venue")
        .await
        .unwrap_err();
    assert_eq!(err.path().unwrap().to_string(), "id");

    // A bare reference into the space is checked the same way.
    let err = session
        .upsert(&json!({"id": 11, "name": "102", "venue_id": 7}), "Room")
        .await
        .unwrap_err();
    assert!(
        matches!(&err, BridgeError::MalformedInput { path, .. } if path.to_string() == "venue_id")
    );
}

#[tokio::test]
async fn polymorphic_room_reference_survives_encode_round_trip() {
    let (session, _) = session();
    session
        .upsert(&json!({"id": 1, "name": "Hall A"}), "Venue")
        .await
        .unwrap();
    let event = session
        .upsert(
            &json!({
                "id": 5,
                "name": "Talk",
                "location": {"id": 10, "name": "101", "venue_id": 1}
            }),
            "Event",
        )
        .await
        .unwrap();
    let room = stored(&session, &event).await.relation("location")[0].clone();

    let encoded = session.encode(&event).await.unwrap();
    assert_eq!(encoded["location"], json!(10));
    session.upsert(&encoded, "Event").await.unwrap();

    let record = stored(&session, &event).await;
    assert_eq!(record.relation("location"), &[room.clone()]);
    assert_eq!(stored(&session, &room).await.entity, "Room");
}

#[tokio::test]
async fn session_decode_polymorphic_reports_tag() {
    let (session, _) = session();
    let ambiguous = json!({"id": 10, "name": "101", "venue_id": 1});

    let selected = session
        .decode_polymorphic(&ambiguous, &["Venue", "Room"])
        .unwrap();
    assert_eq!(selected.tag, "Venue");
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn encode_then_decode_reproduces_record() {
    let (session, _) = session();
    let room = session
        .upsert(
            &json!({"id": 10, "name": "101", "venue_id": 1, "annex_id": 11}),
            "Room",
        )
        .await
        .unwrap();
    let before = stored(&session, &room).await;

    let encoded = session.encode(&room).await.unwrap();
    assert_eq!(
        encoded,
        json!({"id": 10, "name": "101", "venue_id": 1, "annex_id": 11})
    );

    let again = session.upsert(&encoded, "Room").await.unwrap();
    assert_eq!(again, room);
    assert_eq!(stored(&session, &room).await, before);
}

#[tokio::test]
async fn encode_emits_null_for_unset_optional_fields() {
    let (session, _) = session();
    let venue = session
        .upsert(&json!({"id": 1, "name": "Hall"}), "Venue")
        .await
        .unwrap();

    let encoded = session.encode(&venue).await.unwrap();
    assert_eq!(encoded["city"], Value::Null);
    assert_eq!(encoded["description"], Value::Null);
    assert_eq!(encoded["rooms"], json!([]));
}

// ---------------------------------------------------------------------------
// Sessions and failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_import_discards_whole_session() {
    let (session, ctx) = session();
    session
        .import(&json!({"id": 1, "name": "Kept"}), "Venue")
        .await
        .unwrap();

    let err = session
        .import(
            &json!([
                {"id": 2, "name": "Dropped"},
                {"id": 3}
            ]),
            "Venue",
        )
        .await
        .unwrap_err();

    assert_eq!(err.path().unwrap().to_string(), "[1].name");
    assert_eq!(ctx.committed_count("Venue").unwrap(), 1);
    assert_eq!(session.count("Venue").await.unwrap(), 1);
}

#[tokio::test]
async fn rollback_restores_last_commit() {
    let (session, _) = session();
    let venue = session
        .upsert(&json!({"id": 1, "name": "Hall A"}), "Venue")
        .await
        .unwrap();
    session.commit().await.unwrap();

    session
        .upsert(&json!({"id": 1, "name": "Hall Z"}), "Venue")
        .await
        .unwrap();
    session.rollback().await.unwrap();

    assert_eq!(
        stored(&session, &venue).await.field("name"),
        Some(&json!("Hall A"))
    );
}

/// Context whose `create` always fails, to exercise resolution failures.
struct FailingCreates {
    inner: MemoryContext,
}

#[async_trait]
impl PersistenceContext for FailingCreates {
    async fn find_unique(
        &self,
        entity: &str,
        field: &str,
        value: &Value,
    ) -> StorageResult<Option<RecordId>> {
        self.inner.find_unique(entity, field, value).await
    }

    async fn create(&self, _entity: &str) -> StorageResult<RecordId> {
        Err(StorageError::Backend("disk full".into()))
    }

    async fn set_field(&self, record: &RecordId, name: &str, value: Value) -> StorageResult<()> {
        self.inner.set_field(record, name, value).await
    }

    async fn set_relationship(
        &self,
        record: &RecordId,
        name: &str,
        targets: Vec<RecordId>,
    ) -> StorageResult<()> {
        self.inner.set_relationship(record, name, targets).await
    }

    async fn fetch(&self, record: &RecordId) -> StorageResult<StoredRecord> {
        self.inner.fetch(record).await
    }

    async fn count(&self, entity: &str) -> StorageResult<usize> {
        self.inner.count(entity).await
    }

    async fn save(&self) -> StorageResult<()> {
        self.inner.save().await
    }

    async fn discard(&self) -> StorageResult<()> {
        self.inner.discard().await
    }
}

#[tokio::test]
async fn context_failure_surfaces_as_resolution_failure() {
    let session = Session::new(
        schema(),
        Arc::new(FailingCreates {
            inner: MemoryContext::new(),
        }),
    );

    let err = session
        .upsert(&json!({"id": 1, "name": "Hall"}), "Venue")
        .await
        .unwrap_err();

    match err {
        BridgeError::ResolutionFailure {
            entity,
            identifier,
            source,
        } => {
            assert_eq!(entity, "Venue");
            assert_eq!(identifier, "1");
            assert_eq!(source, StorageError::Backend("disk full".into()));
        }
        other => panic!("expected ResolutionFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_entity_is_configuration_error() {
    let (session, _) = session();
    let err = session
        .upsert(&json!({"id": 1}), "Hotel")
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Configuration(_)));
}
