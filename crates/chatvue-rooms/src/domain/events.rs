//! Domain events for the Chat Room context.

use chatvue_core::aggregate::{AggregateId, AggregateRoot};
use chatvue_core::error::DomainError;
use chatvue_core::event::{DomainEvent, EventContext, EventMetadata};
use chatvue_core::store::StoredEvent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Emitted when a chat room is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomCreated {
    /// The chat room identifier.
    pub room_id: AggregateId,
    /// The initial room name.
    pub room_name: String,
}

/// Emitted when a chat room is renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomUpdated {
    /// The chat room identifier.
    pub room_id: AggregateId,
    /// The new room name.
    pub room_name: String,
}

/// Emitted when a chat room is deleted. Terminal for the room's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomDeleted {
    /// The chat room identifier.
    pub room_id: AggregateId,
}

/// Event type identifier for [`RoomCreated`].
pub const ROOM_CREATED_EVENT_TYPE: &str = "RoomCreated";

/// Event type identifier for [`RoomUpdated`].
pub const ROOM_UPDATED_EVENT_TYPE: &str = "RoomUpdated";

/// Event type identifier for [`RoomDeleted`].
pub const ROOM_DELETED_EVENT_TYPE: &str = "RoomDeleted";

/// Event payload variants for the Chat Room context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEventKind {
    /// A room has been created.
    RoomCreated(RoomCreated),
    /// A room has been renamed.
    RoomUpdated(RoomUpdated),
    /// A room has been deleted.
    RoomDeleted(RoomDeleted),
}

/// Which event a transition produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEventVariant {
    /// Produces [`RoomCreated`].
    Created,
    /// Produces [`RoomUpdated`].
    Updated,
    /// Produces [`RoomDeleted`].
    Deleted,
}

/// Caller-supplied payload fields for [`new_event`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomPayload {
    /// Room name; required for `Created` and `Updated`, forbidden for `Deleted`.
    pub room_name: Option<String>,
}

impl RoomPayload {
    /// A payload carrying a room name.
    #[must_use]
    pub fn named(room_name: impl Into<String>) -> Self {
        Self {
            room_name: Some(room_name.into()),
        }
    }

    /// A payload with no fields.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Domain event envelope for the Chat Room context.
///
/// Fields are private: once built, an event cannot be altered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEvent {
    metadata: EventMetadata,
    kind: RoomEventKind,
}

impl RoomEvent {
    /// Event-specific payload.
    #[must_use]
    pub fn kind(&self) -> &RoomEventKind {
        &self.kind
    }
}

/// A validated payload, before metadata is attached.
enum Draft {
    Created(String),
    Updated(String),
    Deleted,
}

/// Builds the next event for `aggregate`.
///
/// Does not record or persist the event; callers push it onto the
/// aggregate's uncommitted events and append it to a store separately.
///
/// # Errors
///
/// - `DomainError::InvalidPayload` if `Created`/`Updated` lack a non-blank
///   room name, or `Deleted` carries one.
/// - `DomainError::MissingAggregateIdentity` if the aggregate has no id.
pub fn new_event<A>(
    variant: RoomEventVariant,
    aggregate: &A,
    payload: RoomPayload,
    ctx: EventContext<'_>,
) -> Result<RoomEvent, DomainError>
where
    A: AggregateRoot<Event = RoomEvent>,
{
    let draft = match (variant, payload.room_name) {
        (RoomEventVariant::Created, Some(name)) if !name.trim().is_empty() => {
            Draft::Created(name)
        }
        (RoomEventVariant::Updated, Some(name)) if !name.trim().is_empty() => {
            Draft::Updated(name)
        }
        (RoomEventVariant::Created | RoomEventVariant::Updated, _) => {
            return Err(DomainError::InvalidPayload(
                "room name must not be empty".into(),
            ));
        }
        (RoomEventVariant::Deleted, Some(_)) => {
            return Err(DomainError::InvalidPayload(
                "a deletion carries no room name".into(),
            ));
        }
        (RoomEventVariant::Deleted, None) => Draft::Deleted,
    };

    let event_type = match &draft {
        Draft::Created(_) => ROOM_CREATED_EVENT_TYPE,
        Draft::Updated(_) => ROOM_UPDATED_EVENT_TYPE,
        Draft::Deleted => ROOM_DELETED_EVENT_TYPE,
    };
    let metadata = EventMetadata::for_aggregate(aggregate, event_type, ctx)?;
    let room_id = metadata.aggregate_id().clone();

    let kind = match draft {
        Draft::Created(room_name) => RoomEventKind::RoomCreated(RoomCreated { room_id, room_name }),
        Draft::Updated(room_name) => RoomEventKind::RoomUpdated(RoomUpdated { room_id, room_name }),
        Draft::Deleted => RoomEventKind::RoomDeleted(RoomDeleted { room_id }),
    };

    Ok(RoomEvent { metadata, kind })
}

fn decode<T: DeserializeOwned>(stored: &StoredEvent) -> Result<T, DomainError> {
    serde_json::from_value(stored.payload.clone()).map_err(|e| DomainError::CorruptEvent {
        aggregate_id: stored.aggregate_id.clone(),
        event_id: stored.event_id,
        reason: format!("{} payload does not decode: {e}", stored.event_type),
    })
}

impl DomainEvent for RoomEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            RoomEventKind::RoomCreated(_) => ROOM_CREATED_EVENT_TYPE,
            RoomEventKind::RoomUpdated(_) => ROOM_UPDATED_EVENT_TYPE,
            RoomEventKind::RoomDeleted(_) => ROOM_DELETED_EVENT_TYPE,
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, DomainError> {
        let value = match &self.kind {
            RoomEventKind::RoomCreated(payload) => serde_json::to_value(payload),
            RoomEventKind::RoomUpdated(payload) => serde_json::to_value(payload),
            RoomEventKind::RoomDeleted(payload) => serde_json::to_value(payload),
        };
        value.map_err(|e| DomainError::Infrastructure(format!("event serialization failed: {e}")))
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError> {
        let kind = match stored.event_type.as_str() {
            ROOM_CREATED_EVENT_TYPE => RoomEventKind::RoomCreated(decode(stored)?),
            ROOM_UPDATED_EVENT_TYPE => RoomEventKind::RoomUpdated(decode(stored)?),
            ROOM_DELETED_EVENT_TYPE => RoomEventKind::RoomDeleted(decode(stored)?),
            other => {
                return Err(DomainError::UnknownEventType {
                    aggregate_id: stored.aggregate_id.clone(),
                    event_type: other.to_owned(),
                });
            }
        };

        let room_id = match &kind {
            RoomEventKind::RoomCreated(p) => &p.room_id,
            RoomEventKind::RoomUpdated(p) => &p.room_id,
            RoomEventKind::RoomDeleted(p) => &p.room_id,
        };
        if *room_id != stored.aggregate_id {
            return Err(DomainError::CorruptEvent {
                aggregate_id: stored.aggregate_id.clone(),
                event_id: stored.event_id,
                reason: format!("payload names room {room_id}"),
            });
        }

        Ok(Self {
            metadata: EventMetadata::from_stored(stored),
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chatvue_test_support::{FixedClock, SequenceIds};
    use uuid::Uuid;

    use super::*;
    use crate::domain::aggregates::ChatRoom;

    fn room(id: &str) -> ChatRoom {
        ChatRoom::new(AggregateId::new(id).unwrap())
    }

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_new_event_builds_created_envelope() {
        // Arrange
        let clock = clock();
        let ids = SequenceIds::new();
        let correlation_id = Uuid::new_v4();
        let ctx = EventContext {
            clock: &clock,
            ids: &ids,
            correlation_id,
        };

        // Act
        let event = new_event(
            RoomEventVariant::Created,
            &room("r1"),
            RoomPayload::named("General"),
            ctx,
        )
        .unwrap();

        // Assert
        let meta = event.metadata();
        assert_eq!(event.event_type(), ROOM_CREATED_EVENT_TYPE);
        assert_eq!(meta.event_type(), ROOM_CREATED_EVENT_TYPE);
        assert_eq!(meta.aggregate_id().as_str(), "r1");
        assert_eq!(meta.sequence_number(), 1);
        assert_eq!(meta.event_id(), Uuid::from_u128(1));
        assert_eq!(meta.correlation_id(), correlation_id);
        assert_eq!(meta.occurred_at(), clock.0);
        assert_eq!(
            event.kind(),
            &RoomEventKind::RoomCreated(RoomCreated {
                room_id: AggregateId::new("r1").unwrap(),
                room_name: "General".to_owned(),
            })
        );
    }

    #[test]
    fn test_each_variant_yields_its_own_kind() {
        let clock = clock();
        let ids = SequenceIds::new();
        let ctx = EventContext {
            clock: &clock,
            ids: &ids,
            correlation_id: Uuid::nil(),
        };
        let r1 = AggregateId::new("r1").unwrap();

        let updated = new_event(
            RoomEventVariant::Updated,
            &room("r1"),
            RoomPayload::named("Lobby"),
            ctx,
        )
        .unwrap();
        let deleted = new_event(
            RoomEventVariant::Deleted,
            &room("r1"),
            RoomPayload::empty(),
            ctx,
        )
        .unwrap();

        assert_eq!(updated.event_type(), ROOM_UPDATED_EVENT_TYPE);
        assert_eq!(
            updated.kind(),
            &RoomEventKind::RoomUpdated(RoomUpdated {
                room_id: r1.clone(),
                room_name: "Lobby".to_owned(),
            })
        );
        assert_eq!(deleted.event_type(), ROOM_DELETED_EVENT_TYPE);
        assert_eq!(
            deleted.kind(),
            &RoomEventKind::RoomDeleted(RoomDeleted { room_id: r1 })
        );
    }

    #[test]
    fn test_new_event_rejects_missing_or_blank_room_name() {
        let clock = clock();
        let ids = SequenceIds::new();
        let ctx = EventContext {
            clock: &clock,
            ids: &ids,
            correlation_id: Uuid::nil(),
        };

        for (variant, payload) in [
            (RoomEventVariant::Created, RoomPayload::empty()),
            (RoomEventVariant::Created, RoomPayload::named("   ")),
            (RoomEventVariant::Updated, RoomPayload::empty()),
        ] {
            let result = new_event(variant, &room("r1"), payload, ctx);
            assert!(
                matches!(result, Err(DomainError::InvalidPayload(_))),
                "{variant:?} should be rejected, got {result:?}"
            );
        }
    }

    #[test]
    fn test_new_event_rejects_named_deletion() {
        let clock = clock();
        let ids = SequenceIds::new();
        let ctx = EventContext {
            clock: &clock,
            ids: &ids,
            correlation_id: Uuid::nil(),
        };

        let result = new_event(
            RoomEventVariant::Deleted,
            &room("r1"),
            RoomPayload::named("General"),
            ctx,
        );

        assert!(matches!(result, Err(DomainError::InvalidPayload(_))));
    }

    #[test]
    fn test_new_event_requires_aggregate_identity() {
        let clock = clock();
        let ids = SequenceIds::new();
        let ctx = EventContext {
            clock: &clock,
            ids: &ids,
            correlation_id: Uuid::nil(),
        };

        let result = new_event(
            RoomEventVariant::Created,
            &ChatRoom::unidentified(),
            RoomPayload::named("General"),
            ctx,
        );

        assert!(matches!(result, Err(DomainError::MissingAggregateIdentity)));
    }

    #[test]
    fn test_deleted_payload_has_only_room_id() {
        let clock = clock();
        let ids = SequenceIds::new();
        let ctx = EventContext {
            clock: &clock,
            ids: &ids,
            correlation_id: Uuid::nil(),
        };
        let event = new_event(
            RoomEventVariant::Deleted,
            &room("r1"),
            RoomPayload::empty(),
            ctx,
        )
        .unwrap();

        let payload = event.to_payload().unwrap();

        assert_eq!(payload, serde_json::json!({ "room_id": "r1" }));
    }

    #[test]
    fn test_from_stored_rejects_unknown_type_and_foreign_fields() {
        let clock = clock();
        let ids = SequenceIds::new();
        let ctx = EventContext {
            clock: &clock,
            ids: &ids,
            correlation_id: Uuid::nil(),
        };
        let event = new_event(
            RoomEventVariant::Updated,
            &room("r1"),
            RoomPayload::named("Announcements"),
            ctx,
        )
        .unwrap();
        let stored = event.to_stored().unwrap();

        let mut unknown = stored.clone();
        unknown.event_type = "RoomArchived".to_owned();
        let mut extra_field = stored.clone();
        extra_field.payload["topic"] = serde_json::json!("misc");
        let mut wrong_room = stored.clone();
        wrong_room.payload["room_id"] = serde_json::json!("r2");

        assert_eq!(RoomEvent::from_stored(&stored).unwrap(), event);
        assert!(matches!(
            RoomEvent::from_stored(&unknown),
            Err(DomainError::UnknownEventType { .. })
        ));
        assert!(matches!(
            RoomEvent::from_stored(&extra_field),
            Err(DomainError::CorruptEvent { .. })
        ));
        assert!(matches!(
            RoomEvent::from_stored(&wrong_room),
            Err(DomainError::CorruptEvent { .. })
        ));
    }
}
