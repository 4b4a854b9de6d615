//! Domain model for the Chat Room context.

pub mod aggregates;
pub mod commands;
pub mod events;
