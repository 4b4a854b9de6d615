//! Shared test doubles for the Chatvue room service.

mod clock;
mod ids;
mod store;

pub use clock::{FixedClock, ScriptedClock};
pub use ids::SequenceIds;
pub use store::{
    EmptyEventStore, FailingEventStore, InterleavingEventStore, RecordingEventStore,
};
