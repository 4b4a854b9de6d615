//! Test clocks — deterministic `Clock` implementations for tests.

use std::sync::Mutex;

use chatvue_core::clock::Clock;
use chrono::{DateTime, Utc};

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A clock that returns the given instants in order, then repeats the last
/// one. Useful for simulating a wall clock that steps backwards.
#[derive(Debug)]
pub struct ScriptedClock {
    instants: Mutex<Vec<DateTime<Utc>>>,
}

impl ScriptedClock {
    /// Creates a clock that will replay `instants`.
    ///
    /// # Panics
    ///
    /// Panics if `instants` is empty.
    #[must_use]
    pub fn new(instants: Vec<DateTime<Utc>>) -> Self {
        assert!(!instants.is_empty(), "ScriptedClock needs at least one instant");
        let mut instants = instants;
        instants.reverse();
        Self {
            instants: Mutex::new(instants),
        }
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> DateTime<Utc> {
        let mut instants = self.instants.lock().unwrap();
        if instants.len() > 1 {
            instants.pop().unwrap()
        } else {
            instants[0]
        }
    }
}
