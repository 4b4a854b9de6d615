//! Chatvue — Chat Room bounded context.
//!
//! Responsible for the lifecycle of chat rooms: creation, renaming and
//! deletion, each recorded as an event in the room's stream, plus the room
//! directory read model built from the global feed.

pub mod application;
pub mod domain;
