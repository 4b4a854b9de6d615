//! Command handlers for the Chat Room context.
//!
//! Each handler loads the room's stream, replays it, runs the domain method
//! and appends the resulting events. When another writer got there first the
//! store answers `SequenceConflict`; the handler then re-reads and recomputes,
//! up to [`RetryPolicy::max_attempts`] times.

use chatvue_core::aggregate::{AggregateId, AggregateRoot};
use chatvue_core::clock::Clock;
use chatvue_core::command::Command;
use chatvue_core::error::DomainError;
use chatvue_core::event::{DomainEvent, EventContext};
use chatvue_core::ids::IdGenerator;
use chatvue_core::replay::replay;
use chatvue_core::store::{EventStore, StoredEvent};
use tracing::{info, instrument, warn};

use crate::domain::aggregates::ChatRoom;
use crate::domain::commands::{CreateRoom, DeleteRoom, RenameRoom};

/// How many times a handler runs the read-decide-append cycle before giving
/// up on a contended stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Collaborators shared by every room command handler.
#[derive(Clone, Copy)]
pub struct RoomHandlerDeps<'a> {
    /// Source of event timestamps.
    pub clock: &'a dyn Clock,
    /// Source of event ids.
    pub ids: &'a dyn IdGenerator,
    /// The event store.
    pub store: &'a dyn EventStore,
    /// Optimistic concurrency retry budget.
    pub retry: RetryPolicy,
}

impl std::fmt::Debug for RoomHandlerDeps<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandlerDeps")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Result of a successfully handled command.
#[derive(Debug)]
pub struct RoomCommandResult {
    /// The room affected by the command.
    pub aggregate_id: AggregateId,
    /// The stored events produced and persisted.
    pub stored_events: Vec<StoredEvent>,
    /// How many read-decide-append cycles it took.
    pub attempts: u32,
}

/// Runs `decide` against freshly replayed state until its events append
/// cleanly or the retry budget is spent.
async fn execute<C, F>(
    command: &C,
    deps: RoomHandlerDeps<'_>,
    mut decide: F,
) -> Result<RoomCommandResult, DomainError>
where
    C: Command,
    F: FnMut(&mut ChatRoom, EventContext<'_>) -> Result<(), DomainError>,
{
    let aggregate_id = command.aggregate_id()?;
    let ctx = EventContext {
        clock: deps.clock,
        ids: deps.ids,
        correlation_id: command.correlation_id(),
    };
    let max_attempts = deps.retry.max_attempts.max(1);

    let mut attempt = 1;
    'attempts: loop {
        let history = deps.store.read_stream(&aggregate_id, 1).await?;
        let mut room: ChatRoom = replay(aggregate_id.clone(), &history)?;

        decide(&mut room, ctx)?;

        let mut stored_events = Vec::with_capacity(room.uncommitted_events().len());
        for event in room.uncommitted_events() {
            match deps.store.append(&event.to_stored()?).await {
                Ok(stored) => stored_events.push(stored),
                // Only safe to recompute while nothing from this attempt
                // has been committed.
                Err(err)
                    if err.is_retryable() && stored_events.is_empty() && attempt < max_attempts =>
                {
                    warn!(
                        command = command.command_type(),
                        %aggregate_id,
                        attempt,
                        error = %err,
                        "append conflicted, retrying with fresh state"
                    );
                    attempt += 1;
                    continue 'attempts;
                }
                Err(err) => return Err(err),
            }
        }
        room.clear_uncommitted_events();

        info!(
            command = command.command_type(),
            %aggregate_id,
            attempt,
            event_count = stored_events.len(),
            "command handled"
        );
        return Ok(RoomCommandResult {
            aggregate_id,
            stored_events,
            attempts: attempt,
        });
    }
}

/// Handles the `CreateRoom` command.
///
/// # Errors
///
/// Returns `DomainError` if the id or name is invalid, the room already
/// exists, the stream fails to replay, or persistence fails.
#[instrument(skip_all, fields(room_id = %command.room_id, correlation_id = %command.correlation_id))]
pub async fn handle_create_room(
    command: &CreateRoom,
    deps: RoomHandlerDeps<'_>,
) -> Result<RoomCommandResult, DomainError> {
    execute(command, deps, |room, ctx| room.create(&command.room_name, ctx)).await
}

/// Handles the `RenameRoom` command.
///
/// # Errors
///
/// Returns `DomainError` if the room does not exist, is deleted, the name
/// is invalid, the stream fails to replay, or persistence fails.
#[instrument(skip_all, fields(room_id = %command.room_id, correlation_id = %command.correlation_id))]
pub async fn handle_rename_room(
    command: &RenameRoom,
    deps: RoomHandlerDeps<'_>,
) -> Result<RoomCommandResult, DomainError> {
    execute(command, deps, |room, ctx| room.rename(&command.room_name, ctx)).await
}

/// Handles the `DeleteRoom` command.
///
/// # Errors
///
/// Returns `DomainError` if the room does not exist or is already deleted,
/// the stream fails to replay, or persistence fails.
#[instrument(skip_all, fields(room_id = %command.room_id, correlation_id = %command.correlation_id))]
pub async fn handle_delete_room(
    command: &DeleteRoom,
    deps: RoomHandlerDeps<'_>,
) -> Result<RoomCommandResult, DomainError> {
    execute(command, deps, ChatRoom::delete).await
}
