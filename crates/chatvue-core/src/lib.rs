//! Chatvue Core — shared event-sourcing abstractions.
//!
//! This crate defines the aggregate, event, store and replay contracts that
//! bounded contexts and store implementations depend on. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod ids;
pub mod replay;
pub mod store;

#[cfg(test)]
mod testing;
