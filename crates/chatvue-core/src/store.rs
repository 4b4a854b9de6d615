//! Event store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::AggregateId;
use crate::error::DomainError;

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: AggregateId,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Sequence number within the aggregate stream.
    pub sequence_number: i64,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Causation ID linking to the causing command.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
    /// Position in the store-wide feed. Zero until the store assigns it.
    pub global_offset: i64,
}

/// Append-only log of events, keyed by aggregate.
///
/// Implementations must make each append visible atomically and must never
/// retry internally: `SequenceConflict` goes back to the caller, who re-reads
/// and recomputes.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one event to its aggregate stream.
    ///
    /// Returns the stored copy carrying its assigned `global_offset`.
    ///
    /// # Errors
    ///
    /// `DomainError::SequenceConflict` if the stream already holds an event
    /// at `event.sequence_number`; `DomainError::SequenceGap` if the event
    /// would skip a position.
    async fn append(&self, event: &StoredEvent) -> Result<StoredEvent, DomainError>;

    /// Loads the events of one aggregate with `sequence_number >=
    /// from_sequence`, ordered ascending. Unknown aggregates yield an empty
    /// vector.
    async fn read_stream(
        &self,
        aggregate_id: &AggregateId,
        from_sequence: i64,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Loads up to `limit` events with `global_offset > after_offset`, in
    /// global append order.
    async fn read_all(
        &self,
        after_offset: i64,
        limit: usize,
    ) -> Result<Vec<StoredEvent>, DomainError>;
}

/// Persists the feed position of a named consumer.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Returns the last saved offset for `consumer`, or 0 if none.
    async fn load(&self, consumer: &str) -> Result<i64, DomainError>;

    /// Records `offset` as the last processed position for `consumer`.
    async fn save(&self, consumer: &str, offset: i64) -> Result<(), DomainError>;
}

/// Lazy, restartable cursor over [`EventStore::read_all`].
///
/// The cursor only advances past events it has handed out, so a consumer
/// that saves [`EventFeed::offset`] after processing a page and resumes from
/// it sees every event at least once.
pub struct EventFeed<'a> {
    store: &'a dyn EventStore,
    offset: i64,
    page_size: usize,
}

impl<'a> EventFeed<'a> {
    /// Starts a feed after `offset` (0 for the beginning of the log).
    #[must_use]
    pub fn resume(store: &'a dyn EventStore, offset: i64, page_size: usize) -> Self {
        Self {
            store,
            offset,
            page_size: page_size.max(1),
        }
    }

    /// The global offset of the last event returned.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Fetches the next page. An empty page means the consumer is caught up;
    /// calling again later picks up newly appended events.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the offset is left unchanged.
    pub async fn next_page(&mut self) -> Result<Vec<StoredEvent>, DomainError> {
        let page = self.store.read_all(self.offset, self.page_size).await?;
        if let Some(last) = page.last() {
            self.offset = last.global_offset;
        }
        Ok(page)
    }
}

impl std::fmt::Debug for EventFeed<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFeed")
            .field("offset", &self.offset)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Serves a fixed log and records the cursors it was asked for.
    struct PagedStore {
        log: Vec<StoredEvent>,
        requests: Mutex<Vec<(i64, usize)>>,
    }

    fn stored(global_offset: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: AggregateId::new(format!("r{global_offset}")).unwrap(),
            event_type: "RoomCreated".to_owned(),
            payload: serde_json::json!({}),
            sequence_number: 1,
            correlation_id: Uuid::nil(),
            causation_id: Uuid::nil(),
            occurred_at: Utc::now(),
            global_offset,
        }
    }

    #[async_trait]
    impl EventStore for PagedStore {
        async fn append(&self, _event: &StoredEvent) -> Result<StoredEvent, DomainError> {
            Err(DomainError::Infrastructure("read-only".into()))
        }

        async fn read_stream(
            &self,
            _aggregate_id: &AggregateId,
            _from_sequence: i64,
        ) -> Result<Vec<StoredEvent>, DomainError> {
            Ok(Vec::new())
        }

        async fn read_all(
            &self,
            after_offset: i64,
            limit: usize,
        ) -> Result<Vec<StoredEvent>, DomainError> {
            self.requests.lock().unwrap().push((after_offset, limit));
            Ok(self
                .log
                .iter()
                .filter(|e| e.global_offset > after_offset)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    #[tokio::test]
    async fn test_feed_pages_through_log_and_stops_when_caught_up() {
        // Arrange
        let store = PagedStore {
            log: (1..=5).map(stored).collect(),
            requests: Mutex::new(Vec::new()),
        };
        let mut feed = EventFeed::resume(&store, 0, 2);

        // Act
        let mut seen = Vec::new();
        loop {
            let page = feed.next_page().await.unwrap();
            if page.is_empty() {
                break;
            }
            seen.extend(page.into_iter().map(|e| e.global_offset));
        }

        // Assert
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(feed.offset(), 5);
        assert_eq!(
            *store.requests.lock().unwrap(),
            vec![(0, 2), (2, 2), (4, 2), (5, 2)]
        );
    }

    #[tokio::test]
    async fn test_feed_resumes_after_saved_offset() {
        // Arrange
        let store = PagedStore {
            log: (1..=4).map(stored).collect(),
            requests: Mutex::new(Vec::new()),
        };
        let mut feed = EventFeed::resume(&store, 3, 10);

        // Act
        let page = feed.next_page().await.unwrap();

        // Assert
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].global_offset, 4);
        assert_eq!(feed.offset(), 4);
    }

    #[tokio::test]
    async fn test_zero_page_size_is_clamped() {
        let store = PagedStore {
            log: vec![stored(1)],
            requests: Mutex::new(Vec::new()),
        };
        let mut feed = EventFeed::resume(&store, 0, 0);

        let page = feed.next_page().await.unwrap();

        assert_eq!(page.len(), 1);
    }
}
