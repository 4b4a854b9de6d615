//! Aggregate roots for the Chat Room context.

use chatvue_core::aggregate::{AggregateId, AggregateRoot};
use chatvue_core::error::DomainError;
use chatvue_core::event::{DomainEvent, EventContext};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::events::{RoomEvent, RoomEventKind, RoomEventVariant, RoomPayload, new_event};

/// Observable state of a room, as rebuilt from its events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoomState {
    /// Current room name; `None` before creation.
    pub name: Option<String>,
    /// Whether the room has been deleted.
    pub deleted: bool,
}

/// The aggregate root for a chat room.
#[derive(Debug)]
pub struct ChatRoom {
    /// Aggregate identifier; `None` until assigned upstream.
    id: Option<AggregateId>,
    /// Current version (event count).
    pub(crate) version: i64,
    /// Name and tombstone flag.
    state: RoomState,
    /// Time of the last applied event.
    last_occurred_at: Option<DateTime<Utc>>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<RoomEvent>,
}

impl ChatRoom {
    /// Creates an empty room stream for `id`.
    #[must_use]
    pub fn new(id: AggregateId) -> Self {
        Self {
            id: Some(id),
            version: 0,
            state: RoomState::default(),
            last_occurred_at: None,
            uncommitted_events: Vec::new(),
        }
    }

    /// A room that has not been given an identifier yet.
    #[must_use]
    pub fn unidentified() -> Self {
        Self {
            id: None,
            version: 0,
            state: RoomState::default(),
            last_occurred_at: None,
            uncommitted_events: Vec::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &RoomState {
        &self.state
    }

    /// Current room name, if created.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.state.name.as_deref()
    }

    /// Whether the room has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.state.deleted
    }

    fn label(&self) -> String {
        self.id
            .as_ref()
            .map_or_else(|| "<unidentified>".to_owned(), ToString::to_string)
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if self.version == 0 {
            let id = self
                .id
                .clone()
                .ok_or(DomainError::MissingAggregateIdentity)?;
            return Err(DomainError::AggregateNotFound(id));
        }
        if self.state.deleted {
            return Err(DomainError::Validation(format!(
                "room {} has been deleted",
                self.label()
            )));
        }
        Ok(())
    }

    fn record(
        &mut self,
        variant: RoomEventVariant,
        payload: RoomPayload,
        ctx: EventContext<'_>,
    ) -> Result<(), DomainError> {
        let event = new_event(variant, &*self, payload, ctx)?;
        self.uncommitted_events.push(event);
        Ok(())
    }

    /// Creates the room, producing a `RoomCreated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the stream already has events,
    /// or any error of [`new_event`].
    pub fn create(&mut self, room_name: &str, ctx: EventContext<'_>) -> Result<(), DomainError> {
        if self.version > 0 || !self.uncommitted_events.is_empty() {
            return Err(DomainError::Validation(format!(
                "room {} already exists",
                self.label()
            )));
        }
        self.record(RoomEventVariant::Created, RoomPayload::named(room_name), ctx)
    }

    /// Renames the room, producing a `RoomUpdated` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the room was never
    /// created, `DomainError::Validation` if it is deleted or already has
    /// this name, or any error of [`new_event`].
    pub fn rename(&mut self, room_name: &str, ctx: EventContext<'_>) -> Result<(), DomainError> {
        self.ensure_live()?;
        if self.name() == Some(room_name) {
            return Err(DomainError::Validation(format!(
                "room {} is already named {room_name:?}",
                self.label()
            )));
        }
        self.record(RoomEventVariant::Updated, RoomPayload::named(room_name), ctx)
    }

    /// Deletes the room, producing a terminal `RoomDeleted` event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if the room was never
    /// created, `DomainError::Validation` if it is already deleted.
    pub fn delete(&mut self, ctx: EventContext<'_>) -> Result<(), DomainError> {
        self.ensure_live()?;
        self.record(RoomEventVariant::Deleted, RoomPayload::empty(), ctx)
    }
}

impl AggregateRoot for ChatRoom {
    type Event = RoomEvent;

    fn initial(id: AggregateId) -> Self {
        Self::new(id)
    }

    fn aggregate_id(&self) -> Option<&AggregateId> {
        self.id.as_ref()
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn last_occurred_at(&self) -> Option<DateTime<Utc>> {
        self.last_occurred_at
    }

    fn is_tombstoned(&self) -> bool {
        self.state.deleted
    }

    fn apply(&mut self, event: &Self::Event) {
        match event.kind() {
            RoomEventKind::RoomCreated(payload) => {
                self.state.name = Some(payload.room_name.clone());
            }
            RoomEventKind::RoomUpdated(payload) => {
                self.state.name = Some(payload.room_name.clone());
            }
            RoomEventKind::RoomDeleted(_) => {
                self.state.deleted = true;
            }
        }
        self.last_occurred_at = Some(event.metadata().occurred_at());
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}
