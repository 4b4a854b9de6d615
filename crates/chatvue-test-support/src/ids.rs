//! Test id generator — predictable event ids for assertions.

use std::sync::atomic::{AtomicU64, Ordering};

use chatvue_core::ids::IdGenerator;
use uuid::Uuid;

/// Hands out `Uuid::from_u128(1)`, `Uuid::from_u128(2)`, ... in call order.
#[derive(Debug, Default)]
pub struct SequenceIds {
    next: AtomicU64,
}

impl SequenceIds {
    /// Creates a generator whose first id is `Uuid::from_u128(1)`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequenceIds {
    fn next_id(&self) -> Uuid {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        Uuid::from_u128(u128::from(n))
    }
}
