//! In-memory implementations of `EventStore` and `CheckpointStore`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{debug, instrument};

use chatvue_core::aggregate::AggregateId;
use chatvue_core::error::DomainError;
use chatvue_core::store::{CheckpointStore, EventStore, StoredEvent};

#[derive(Debug, Default)]
struct Log {
    /// Every event in global append order; index `i` has offset `i + 1`.
    events: Vec<StoredEvent>,
    /// Indices into `events` per aggregate, in sequence order.
    streams: HashMap<AggregateId, Vec<usize>>,
}

fn poisoned<T>(_: PoisonError<T>) -> DomainError {
    DomainError::Infrastructure("event store lock poisoned".into())
}

/// Process-wide event log held in memory.
///
/// Appends take a short write lock; the sequence check inside it is what
/// gives each aggregate a single writer.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    log: RwLock<Log>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events across all aggregates.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, DomainError> {
        Ok(self.log.read().map_err(poisoned)?.events.len())
    }

    /// Whether no event has been appended yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[instrument(skip(self, event), fields(aggregate_id = %event.aggregate_id, sequence = event.sequence_number))]
    async fn append(&self, event: &StoredEvent) -> Result<StoredEvent, DomainError> {
        let mut log = self.log.write().map_err(poisoned)?;

        #[allow(clippy::cast_possible_wrap)]
        let head = log
            .streams
            .get(&event.aggregate_id)
            .map_or(0, |stream| stream.len() as i64);

        if (1..=head).contains(&event.sequence_number) {
            return Err(DomainError::SequenceConflict {
                aggregate_id: event.aggregate_id.clone(),
                sequence: event.sequence_number,
            });
        }
        if event.sequence_number != head + 1 {
            return Err(DomainError::SequenceGap {
                aggregate_id: event.aggregate_id.clone(),
                expected: head + 1,
                actual: event.sequence_number,
            });
        }

        let index = log.events.len();
        let mut stored = event.clone();
        stored.global_offset = i64::try_from(index + 1)
            .map_err(|_| DomainError::Infrastructure("global offset overflow".into()))?;
        log.events.push(stored.clone());
        log.streams
            .entry(stored.aggregate_id.clone())
            .or_default()
            .push(index);

        debug!(global_offset = stored.global_offset, "appended event");
        Ok(stored)
    }

    async fn read_stream(
        &self,
        aggregate_id: &AggregateId,
        from_sequence: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let log = self.log.read().map_err(poisoned)?;
        let Some(stream) = log.streams.get(aggregate_id) else {
            return Ok(Vec::new());
        };
        Ok(stream
            .iter()
            .map(|&i| &log.events[i])
            .filter(|e| e.sequence_number >= from_sequence)
            .cloned()
            .collect())
    }

    async fn read_all(
        &self,
        after_offset: i64,
        limit: usize,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let log = self.log.read().map_err(poisoned)?;
        let start = usize::try_from(after_offset.max(0)).unwrap_or(usize::MAX);
        Ok(log
            .events
            .iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Checkpoints held in memory, keyed by consumer name.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    offsets: RwLock<HashMap<String, i64>>,
}

impl InMemoryCheckpointStore {
    /// Creates an empty checkpoint store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, consumer: &str) -> Result<i64, DomainError> {
        let offsets = self.offsets.read().map_err(poisoned)?;
        Ok(offsets.get(consumer).copied().unwrap_or(0))
    }

    async fn save(&self, consumer: &str, offset: i64) -> Result<(), DomainError> {
        self.offsets
            .write()
            .map_err(poisoned)?
            .insert(consumer.to_owned(), offset);
        Ok(())
    }
}
