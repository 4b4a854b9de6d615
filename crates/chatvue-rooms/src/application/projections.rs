//! Room directory projection.
//!
//! Folds the global event feed into one [`RoomSummary`] per room. Progress
//! is checkpointed per page under the projection's name, so a restarted
//! consumer may see a page twice; [`RoomDirectoryStore::record`] ignores
//! summaries that are not newer than what it holds, which makes redelivery
//! harmless.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chatvue_core::aggregate::AggregateId;
use chatvue_core::error::DomainError;
use chatvue_core::event::DomainEvent;
use chatvue_core::store::{CheckpointStore, EventFeed, EventStore, StoredEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::events::{RoomEvent, RoomEventKind};

/// Directory row for a single room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    /// The room identifier.
    pub room_id: AggregateId,
    /// Latest known name. `None` means "unchanged" when recording.
    pub room_name: Option<String>,
    /// Whether the room has been deleted.
    pub deleted: bool,
    /// Sequence number of the last event folded in.
    pub version: i64,
    /// When that event occurred.
    pub updated_at: DateTime<Utc>,
}

/// Turns one stored room event into the summary it implies.
///
/// # Errors
///
/// Returns `DomainError::UnknownEventType` for events this context does not
/// know and `DomainError::CorruptEvent` for undecodable payloads.
pub fn summarize(stored: &StoredEvent) -> Result<RoomSummary, DomainError> {
    let event = RoomEvent::from_stored(stored)?;
    let (room_name, deleted) = match event.kind() {
        RoomEventKind::RoomCreated(payload) => (Some(payload.room_name.clone()), false),
        RoomEventKind::RoomUpdated(payload) => (Some(payload.room_name.clone()), false),
        RoomEventKind::RoomDeleted(_) => (None, true),
    };
    Ok(RoomSummary {
        room_id: stored.aggregate_id.clone(),
        room_name,
        deleted,
        version: stored.sequence_number,
        updated_at: stored.occurred_at,
    })
}

/// Storage for the room directory read model.
#[async_trait]
pub trait RoomDirectoryStore: Send + Sync {
    /// Upserts `summary` if its version is newer than the stored row.
    /// A `None` name keeps the stored name. Returns whether anything changed.
    async fn record(&self, summary: &RoomSummary) -> Result<bool, DomainError>;

    /// Returns the row for `room_id`, deleted or not.
    async fn get(&self, room_id: &AggregateId) -> Result<Option<RoomSummary>, DomainError>;

    /// Returns all rooms that are not deleted, ordered by id.
    async fn list_live(&self) -> Result<Vec<RoomSummary>, DomainError>;
}

/// In-process room directory.
#[derive(Debug, Default)]
pub struct InMemoryRoomDirectory {
    rows: RwLock<BTreeMap<AggregateId, RoomSummary>>,
}

impl InMemoryRoomDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> DomainError {
    DomainError::Infrastructure("room directory lock poisoned".into())
}

#[async_trait]
impl RoomDirectoryStore for InMemoryRoomDirectory {
    async fn record(&self, summary: &RoomSummary) -> Result<bool, DomainError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        match rows.get_mut(&summary.room_id) {
            Some(row) if row.version >= summary.version => Ok(false),
            Some(row) => {
                if summary.room_name.is_some() {
                    row.room_name.clone_from(&summary.room_name);
                }
                row.deleted = summary.deleted;
                row.version = summary.version;
                row.updated_at = summary.updated_at;
                Ok(true)
            }
            None => {
                rows.insert(summary.room_id.clone(), summary.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, room_id: &AggregateId) -> Result<Option<RoomSummary>, DomainError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(room_id).cloned())
    }

    async fn list_live(&self) -> Result<Vec<RoomSummary>, DomainError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().filter(|row| !row.deleted).cloned().collect())
    }
}

/// Outcome of one catch-up run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjectionProgress {
    /// Events that changed the directory.
    pub applied: usize,
    /// Events the directory already reflected.
    pub skipped: usize,
    /// Checkpoint after the run.
    pub offset: i64,
}

/// Keeps a [`RoomDirectoryStore`] in step with the global feed.
pub struct RoomDirectoryProjection<'a> {
    name: &'a str,
    directory: &'a dyn RoomDirectoryStore,
    checkpoints: &'a dyn CheckpointStore,
}

impl std::fmt::Debug for RoomDirectoryProjection<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomDirectoryProjection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<'a> RoomDirectoryProjection<'a> {
    /// Creates a projection checkpointed under `name`.
    #[must_use]
    pub fn new(
        name: &'a str,
        directory: &'a dyn RoomDirectoryStore,
        checkpoints: &'a dyn CheckpointStore,
    ) -> Self {
        Self {
            name,
            directory,
            checkpoints,
        }
    }

    /// Reads pages from the saved checkpoint until the feed is exhausted,
    /// saving the checkpoint after each page.
    ///
    /// # Errors
    ///
    /// Stops at the first store, checkpoint or decoding error. Events of
    /// the failing page are delivered again on the next run.
    #[instrument(skip(self, store), fields(projection = self.name))]
    pub async fn run_once(
        &self,
        store: &dyn EventStore,
        page_size: usize,
    ) -> Result<ProjectionProgress, DomainError> {
        let start = self.checkpoints.load(self.name).await?;
        let mut feed = EventFeed::resume(store, start, page_size);
        let mut progress = ProjectionProgress {
            offset: start,
            ..ProjectionProgress::default()
        };

        loop {
            let page = feed.next_page().await?;
            if page.is_empty() {
                break;
            }
            for stored in &page {
                let summary = summarize(stored)?;
                if self.directory.record(&summary).await? {
                    progress.applied += 1;
                } else {
                    debug!(
                        room_id = %summary.room_id,
                        version = summary.version,
                        "directory already up to date"
                    );
                    progress.skipped += 1;
                }
            }
            self.checkpoints.save(self.name, feed.offset()).await?;
            progress.offset = feed.offset();
        }

        if progress.offset != start {
            info!(
                applied = progress.applied,
                skipped = progress.skipped,
                offset = progress.offset,
                "room directory caught up"
            );
        }
        Ok(progress)
    }
}
