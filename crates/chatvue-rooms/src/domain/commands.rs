//! Commands for the Chat Room context.

use chatvue_core::command::Command;
use uuid::Uuid;

/// Command to create a chat room.
#[derive(Debug, Clone)]
pub struct CreateRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room identifier, assigned upstream.
    pub room_id: String,
    /// The initial room name.
    pub room_name: String,
}

impl Command for CreateRoom {
    fn command_type(&self) -> &'static str {
        "rooms.create_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target(&self) -> &str {
        &self.room_id
    }
}

/// Command to rename a chat room.
#[derive(Debug, Clone)]
pub struct RenameRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room identifier.
    pub room_id: String,
    /// The new room name.
    pub room_name: String,
}

impl Command for RenameRoom {
    fn command_type(&self) -> &'static str {
        "rooms.rename_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target(&self) -> &str {
        &self.room_id
    }
}

/// Command to delete a chat room.
#[derive(Debug, Clone)]
pub struct DeleteRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room identifier.
    pub room_id: String,
}

impl Command for DeleteRoom {
    fn command_type(&self) -> &'static str {
        "rooms.delete_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn target(&self) -> &str {
        &self.room_id
    }
}
