//! Domain event abstractions.
//!
//! Every event is an envelope: shared [`EventMetadata`] composed with a
//! variant-specific payload. Metadata is derived from the aggregate at
//! construction and cannot be changed afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::{AggregateId, AggregateRoot};
use crate::clock::Clock;
use crate::error::DomainError;
use crate::ids::IdGenerator;
use crate::store::StoredEvent;

/// Collaborators needed to stamp a new event.
#[derive(Clone, Copy)]
pub struct EventContext<'a> {
    /// Source of `occurred_at`.
    pub clock: &'a dyn Clock,
    /// Source of `event_id`.
    pub ids: &'a dyn IdGenerator,
    /// Correlation ID of the command producing the event.
    pub correlation_id: Uuid,
}

impl std::fmt::Debug for EventContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventContext")
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    event_id: Uuid,
    event_type: String,
    aggregate_id: AggregateId,
    sequence_number: i64,
    correlation_id: Uuid,
    causation_id: Uuid,
    occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Derives metadata for the next event of `aggregate`.
    ///
    /// The sequence number follows the applied version and any events the
    /// aggregate has already recorded but not yet committed. `occurred_at`
    /// never goes backwards relative to the last applied event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingAggregateIdentity` if the aggregate has
    /// no identifier.
    pub fn for_aggregate<A: AggregateRoot>(
        aggregate: &A,
        event_type: &str,
        ctx: EventContext<'_>,
    ) -> Result<Self, DomainError> {
        let aggregate_id = aggregate
            .aggregate_id()
            .cloned()
            .ok_or(DomainError::MissingAggregateIdentity)?;

        #[allow(clippy::cast_possible_wrap)]
        let pending = aggregate.uncommitted_events().len() as i64;

        let now = ctx.clock.now();
        let floor = aggregate
            .uncommitted_events()
            .last()
            .map(|e| e.metadata().occurred_at)
            .or_else(|| aggregate.last_occurred_at());
        let occurred_at = floor.map_or(now, |floor| now.max(floor));

        Ok(Self {
            event_id: ctx.ids.next_id(),
            event_type: event_type.to_owned(),
            aggregate_id,
            sequence_number: aggregate.version() + pending + 1,
            correlation_id: ctx.correlation_id,
            causation_id: ctx.correlation_id,
            occurred_at,
        })
    }

    /// Rebuilds metadata from its stored form.
    #[must_use]
    pub fn from_stored(stored: &StoredEvent) -> Self {
        Self {
            event_id: stored.event_id,
            event_type: stored.event_type.clone(),
            aggregate_id: stored.aggregate_id.clone(),
            sequence_number: stored.sequence_number,
            correlation_id: stored.correlation_id,
            causation_id: stored.causation_id,
            occurred_at: stored.occurred_at,
        }
    }

    /// Unique event identifier.
    #[must_use]
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    /// Type name for deserialization routing.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Aggregate/stream this event belongs to.
    #[must_use]
    pub fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    /// Position within the aggregate stream, starting at 1.
    #[must_use]
    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    /// Correlation ID for tracing a command through its effects.
    #[must_use]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Causation ID linking this event to the command that caused it.
    #[must_use]
    pub fn causation_id(&self) -> Uuid {
        self.causation_id
    }

    /// Timestamp of event creation.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;

    /// Serializes the event payload to JSON.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the payload cannot be
    /// represented as JSON.
    fn to_payload(&self) -> Result<serde_json::Value, DomainError>;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;

    /// Decodes an event from its stored form, routing on `event_type`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` if the type tag has no
    /// registered variant, or `DomainError::CorruptEvent` if the payload
    /// does not deserialize.
    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError>
    where
        Self: Sized;

    /// Converts the event into the form handed to an `EventStore`.
    ///
    /// # Errors
    ///
    /// Propagates payload serialization failures.
    fn to_stored(&self) -> Result<StoredEvent, DomainError> {
        let meta = self.metadata();
        Ok(StoredEvent {
            event_id: meta.event_id(),
            aggregate_id: meta.aggregate_id().clone(),
            event_type: self.event_type().to_owned(),
            payload: self.to_payload()?,
            sequence_number: meta.sequence_number(),
            correlation_id: meta.correlation_id(),
            causation_id: meta.causation_id(),
            occurred_at: meta.occurred_at(),
            global_offset: 0,
        })
    }
}
