//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::aggregate::AggregateId;

/// Top-level domain error type.
///
/// Factory-time errors (`InvalidPayload`, `MissingAggregateIdentity`) are
/// caller errors. `SequenceConflict` is expected under concurrency and is the
/// only retryable variant. Replay-time errors (`UnknownEventType`,
/// `TombstoneViolation`, `SequenceGap`, `CorruptEvent`) are data-integrity
/// failures and are never worth retrying.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The payload does not match the shape required by the event variant.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The aggregate has not been assigned an identifier yet.
    #[error("aggregate has no identity")]
    MissingAggregateIdentity,

    /// An event already exists at this position of the aggregate stream.
    #[error("sequence conflict on aggregate {aggregate_id}: sequence {sequence} is already taken")]
    SequenceConflict {
        /// The aggregate that had the conflict.
        aggregate_id: AggregateId,
        /// The sequence number that was rejected.
        sequence: i64,
    },

    /// A sequence number would leave, or revealed, a hole in the stream.
    #[error("sequence gap on aggregate {aggregate_id}: expected {expected}, found {actual}")]
    SequenceGap {
        /// The aggregate whose stream is not contiguous.
        aggregate_id: AggregateId,
        /// The next sequence number the stream expects.
        expected: i64,
        /// The sequence number that was seen.
        actual: i64,
    },

    /// No transition is registered for the stored event type.
    #[error("unknown event type {event_type:?} on aggregate {aggregate_id}")]
    UnknownEventType {
        /// The aggregate the event belongs to.
        aggregate_id: AggregateId,
        /// The unrecognised type tag.
        event_type: String,
    },

    /// An event was recorded after the aggregate's terminal event.
    #[error("tombstone violation on aggregate {aggregate_id}: event {sequence} follows deletion")]
    TombstoneViolation {
        /// The tombstoned aggregate.
        aggregate_id: AggregateId,
        /// The sequence number of the offending event.
        sequence: i64,
    },

    /// A stored event cannot be turned back into a domain event: its payload
    /// does not decode, or it names a different aggregate than its stream.
    #[error("corrupt event {event_id} on aggregate {aggregate_id}: {reason}")]
    CorruptEvent {
        /// The stream the event was read from.
        aggregate_id: AggregateId,
        /// The offending event.
        event_id: Uuid,
        /// What is wrong with it.
        reason: String,
    },

    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(AggregateId),

    /// A business rule rejected the command.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Whether the caller should re-read state and retry the operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SequenceConflict { .. })
    }
}
