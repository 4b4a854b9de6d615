//! Chatvue projector: keeps the `room_directory` read model in step with the
//! room event log.

pub mod config;
pub mod directory;
pub mod error;
pub mod worker;
