//! Replay engine: rebuilds aggregate state by folding its event history.

use crate::aggregate::{AggregateId, AggregateRoot};
use crate::error::DomainError;
use crate::event::DomainEvent;
use crate::store::{EventStore, StoredEvent};

/// Folds `events` over the initial state of `aggregate_id`.
///
/// Events must belong to the aggregate and arrive in contiguous sequence
/// order starting at 1. Nothing may follow a tombstoning event.
///
/// # Errors
///
/// - `DomainError::UnknownEventType` if an event type has no registered
///   variant.
/// - `DomainError::TombstoneViolation` if an event follows the terminal one.
/// - `DomainError::SequenceGap` if the stream is not contiguous.
/// - `DomainError::CorruptEvent` if a payload does not decode or an event
///   belongs to another aggregate.
pub fn replay<A: AggregateRoot>(
    aggregate_id: AggregateId,
    events: &[StoredEvent],
) -> Result<A, DomainError> {
    let mut aggregate = A::initial(aggregate_id.clone());
    for stored in events {
        if stored.aggregate_id != aggregate_id {
            return Err(DomainError::CorruptEvent {
                reason: format!("stored under aggregate {}", stored.aggregate_id),
                aggregate_id,
                event_id: stored.event_id,
            });
        }
        if aggregate.is_tombstoned() {
            return Err(DomainError::TombstoneViolation {
                aggregate_id,
                sequence: stored.sequence_number,
            });
        }
        let expected = aggregate.version() + 1;
        if stored.sequence_number != expected {
            return Err(DomainError::SequenceGap {
                aggregate_id,
                expected,
                actual: stored.sequence_number,
            });
        }
        let event = A::Event::from_stored(stored)?;
        aggregate.apply(&event);
    }
    Ok(aggregate)
}

/// Loads the full stream of `aggregate_id` and replays it.
///
/// An aggregate without events rehydrates to its initial state.
///
/// # Errors
///
/// Propagates store failures and every error of [`replay`].
pub async fn rehydrate<A: AggregateRoot>(
    store: &dyn EventStore,
    aggregate_id: &AggregateId,
) -> Result<A, DomainError> {
    let events = store.read_stream(aggregate_id, 1).await?;
    replay(aggregate_id.clone(), &events)
}
