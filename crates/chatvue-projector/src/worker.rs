//! Polling loop that keeps the room directory caught up.

use std::future::Future;
use std::time::Duration;

use chatvue_core::store::EventStore;
use chatvue_rooms::application::projections::{ProjectionProgress, RoomDirectoryProjection};
use tracing::{info, warn};

use crate::error::AppError;

/// Drives a [`RoomDirectoryProjection`] until asked to stop.
pub struct ProjectorWorker<'a> {
    store: &'a dyn EventStore,
    projection: RoomDirectoryProjection<'a>,
    batch_size: usize,
    poll_interval: Duration,
    store_timeout: Duration,
}

impl std::fmt::Debug for ProjectorWorker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectorWorker")
            .field("projection", &self.projection)
            .field("batch_size", &self.batch_size)
            .field("poll_interval", &self.poll_interval)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl<'a> ProjectorWorker<'a> {
    /// Creates a worker reading `store` in pages of `batch_size`.
    #[must_use]
    pub fn new(
        store: &'a dyn EventStore,
        projection: RoomDirectoryProjection<'a>,
        batch_size: usize,
        poll_interval: Duration,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            projection,
            batch_size,
            poll_interval,
            store_timeout,
        }
    }

    /// Runs one bounded catch-up pass.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Timeout` if the pass exceeds the store timeout,
    /// or the projection's own error.
    pub async fn tick(&self) -> Result<ProjectionProgress, AppError> {
        let run = self.projection.run_once(self.store, self.batch_size);
        match tokio::time::timeout(self.store_timeout, run).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AppError::Timeout(
                u64::try_from(self.store_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Ticks, sleeps for the poll interval, and repeats until `shutdown`
    /// resolves. Transient failures are logged and retried on the next tick.
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<(), AppError> {
        tokio::pin!(shutdown);
        loop {
            match self.tick().await {
                Ok(_) => {}
                Err(err) if err.is_transient() => {
                    warn!(error = %err, "projection pass failed, will retry");
                }
                Err(err) => return Err(err),
            }

            tokio::select! {
                () = &mut shutdown => {
                    info!("projector shutting down");
                    return Ok(());
                }
                () = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chatvue_core::aggregate::AggregateId;
    use chatvue_core::error::DomainError;
    use chatvue_core::store::{CheckpointStore, StoredEvent};
    use chatvue_event_store::memory::{InMemoryCheckpointStore, InMemoryEventStore};
    use chatvue_rooms::application::command_handlers::{
        RetryPolicy, RoomHandlerDeps, handle_create_room,
    };
    use chatvue_rooms::application::projections::{InMemoryRoomDirectory, RoomDirectoryStore};
    use chatvue_rooms::domain::commands::CreateRoom;
    use chatvue_test_support::{FailingEventStore, FixedClock, SequenceIds};
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    /// A store whose reads never complete.
    struct StalledEventStore;

    #[async_trait]
    impl EventStore for StalledEventStore {
        async fn append(&self, event: &StoredEvent) -> Result<StoredEvent, DomainError> {
            Ok(event.clone())
        }

        async fn read_stream(
            &self,
            _aggregate_id: &AggregateId,
            _from_sequence: i64,
        ) -> Result<Vec<StoredEvent>, DomainError> {
            std::future::pending().await
        }

        async fn read_all(
            &self,
            _after_offset: i64,
            _limit: usize,
        ) -> Result<Vec<StoredEvent>, DomainError> {
            std::future::pending().await
        }
    }

    async fn seeded_store() -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        let clock = FixedClock(Utc::now());
        let ids = SequenceIds::new();
        let deps = RoomHandlerDeps {
            clock: &clock,
            ids: &ids,
            store: &store,
            retry: RetryPolicy::default(),
        };
        for (room_id, room_name) in [("r1", "General"), ("r2", "Random")] {
            let command = CreateRoom {
                correlation_id: Uuid::new_v4(),
                room_id: room_id.to_owned(),
                room_name: room_name.to_owned(),
            };
            handle_create_room(&command, deps).await.unwrap();
        }
        store
    }

    fn worker<'a>(
        store: &'a dyn EventStore,
        directory: &'a InMemoryRoomDirectory,
        checkpoints: &'a InMemoryCheckpointStore,
    ) -> ProjectorWorker<'a> {
        ProjectorWorker::new(
            store,
            RoomDirectoryProjection::new("room_directory", directory, checkpoints),
            1,
            Duration::from_millis(5),
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_run_catches_up_before_honouring_shutdown() {
        // Arrange
        let store = seeded_store().await;
        let directory = InMemoryRoomDirectory::new();
        let checkpoints = InMemoryCheckpointStore::new();

        // Act
        worker(&store, &directory, &checkpoints)
            .run(std::future::ready(()))
            .await
            .unwrap();

        // Assert
        let names: Vec<Option<String>> = directory
            .list_live()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.room_name)
            .collect();
        assert_eq!(
            names,
            vec![Some("General".to_owned()), Some("Random".to_owned())]
        );
        assert_eq!(checkpoints.load("room_directory").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_store_outage_does_not_stop_the_worker() {
        let directory = InMemoryRoomDirectory::new();
        let checkpoints = InMemoryCheckpointStore::new();

        let result = worker(&FailingEventStore, &directory, &checkpoints)
            .run(std::future::ready(()))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_undecodable_feed_stops_the_worker() {
        let store = InMemoryEventStore::new();
        store
            .append(&StoredEvent {
                event_id: Uuid::new_v4(),
                aggregate_id: AggregateId::new("r1").unwrap(),
                event_type: "RoomArchived".to_owned(),
                payload: serde_json::json!({"room_id": "r1"}),
                sequence_number: 1,
                correlation_id: Uuid::nil(),
                causation_id: Uuid::nil(),
                occurred_at: Utc::now(),
                global_offset: 0,
            })
            .await
            .unwrap();
        let directory = InMemoryRoomDirectory::new();
        let checkpoints = InMemoryCheckpointStore::new();

        let result = worker(&store, &directory, &checkpoints)
            .run(std::future::pending())
            .await;

        match result {
            Err(AppError::Domain(DomainError::UnknownEventType { event_type, .. })) => {
                assert_eq!(event_type, "RoomArchived");
            }
            other => panic!("expected UnknownEventType, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_corrupt_room_event_stops_the_worker() {
        // Arrange: a RoomCreated without its name.
        let store = InMemoryEventStore::new();
        let corrupt_id = Uuid::new_v4();
        store
            .append(&StoredEvent {
                event_id: corrupt_id,
                aggregate_id: AggregateId::new("r1").unwrap(),
                event_type: "RoomCreated".to_owned(),
                payload: serde_json::json!({"room_id": "r1"}),
                sequence_number: 1,
                correlation_id: Uuid::nil(),
                causation_id: Uuid::nil(),
                occurred_at: Utc::now(),
                global_offset: 0,
            })
            .await
            .unwrap();
        let directory = InMemoryRoomDirectory::new();
        let checkpoints = InMemoryCheckpointStore::new();

        // Act
        let result = worker(&store, &directory, &checkpoints)
            .run(tokio::time::sleep(Duration::from_millis(100)))
            .await;

        // Assert
        match result {
            Err(AppError::Domain(DomainError::CorruptEvent { event_id, .. })) => {
                assert_eq!(event_id, corrupt_id);
            }
            other => panic!("expected CorruptEvent, got {other:?}"),
        }
        assert_eq!(checkpoints.load("room_directory").await.unwrap(), 0);
        assert!(directory.list_live().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tick_times_out_on_stalled_store() {
        let directory = InMemoryRoomDirectory::new();
        let checkpoints = InMemoryCheckpointStore::new();

        let result = worker(&StalledEventStore, &directory, &checkpoints)
            .tick()
            .await;

        assert!(matches!(result, Err(AppError::Timeout(50))));
    }
}
