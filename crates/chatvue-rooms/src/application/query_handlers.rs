//! Query handlers for the Chat Room context.
//!
//! These rebuild a room from its stream on every call and return a
//! read-only view. Listing rooms goes through the projection instead.

use chatvue_core::aggregate::{AggregateId, AggregateRoot};
use chatvue_core::error::DomainError;
use chatvue_core::replay::rehydrate;
use chatvue_core::store::EventStore;
use serde::Serialize;

use crate::domain::aggregates::ChatRoom;

/// Read-only view of a chat room aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomView {
    /// The room identifier.
    pub room_id: AggregateId,
    /// The current (or, if deleted, last) room name.
    pub room_name: Option<String>,
    /// Whether the room has been deleted.
    pub deleted: bool,
    /// Current version (event count).
    pub version: i64,
}

/// Retrieves a chat room by its aggregate ID.
///
/// Deleted rooms are still returned, flagged as deleted.
///
/// # Errors
///
/// Returns `DomainError::AggregateNotFound` if no events exist for the ID,
/// and any replay or store error otherwise.
pub async fn get_room_by_id(
    room_id: &AggregateId,
    store: &dyn EventStore,
) -> Result<RoomView, DomainError> {
    let room: ChatRoom = rehydrate(store, room_id).await?;
    if room.version() == 0 {
        return Err(DomainError::AggregateNotFound(room_id.clone()));
    }
    Ok(RoomView {
        room_id: room_id.clone(),
        room_name: room.name().map(str::to_owned),
        deleted: room.is_deleted(),
        version: room.version(),
    })
}
