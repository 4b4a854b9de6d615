//! Event identifier generation.
//!
//! In production, identifiers are time-ordered v7 UUIDs. For reproducible
//! runs a seeded generator is injected instead, so the same command sequence
//! yields the same event ids.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use uuid::Uuid;

/// Abstraction over event id generation.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh identifier, never returned before by this generator.
    fn next_id(&self) -> Uuid;
}

/// Production generator producing v7 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeOrderedIds;

impl IdGenerator for TimeOrderedIds {
    fn next_id(&self) -> Uuid {
        Uuid::now_v7()
    }
}

/// Generator producing random v4 UUIDs from a seeded RNG.
#[derive(Debug)]
pub struct SeededIds {
    rng: Mutex<StdRng>,
}

impl SeededIds {
    /// Creates a generator whose output is fully determined by `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl IdGenerator for SeededIds {
    fn next_id(&self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}
