//! Application services for the Chat Room context.

pub mod command_handlers;
pub mod projections;
pub mod query_handlers;
