//! Test stores — mock `EventStore` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chatvue_core::aggregate::AggregateId;
use chatvue_core::error::DomainError;
use chatvue_core::store::{EventStore, StoredEvent};

/// An event store that serves a fixed history from `read_stream` and records
/// every `append`. Appends always succeed and are not visible to later reads.
#[derive(Debug)]
pub struct RecordingEventStore {
    history: Vec<StoredEvent>,
    appended: Mutex<Vec<StoredEvent>>,
}

impl RecordingEventStore {
    /// Create a recording store that returns `history` from every
    /// `read_stream` call.
    #[must_use]
    pub fn new(history: Vec<StoredEvent>) -> Self {
        Self {
            history,
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all events that were appended.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<StoredEvent> {
        self.appended.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn append(&self, event: &StoredEvent) -> Result<StoredEvent, DomainError> {
        let mut appended = self.appended.lock().unwrap();
        let mut stored = event.clone();
        stored.global_offset = i64::try_from(self.history.len() + appended.len() + 1).unwrap();
        appended.push(stored.clone());
        Ok(stored)
    }

    async fn read_stream(
        &self,
        aggregate_id: &AggregateId,
        from_sequence: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .history
            .iter()
            .filter(|e| &e.aggregate_id == aggregate_id && e.sequence_number >= from_sequence)
            .cloned()
            .collect())
    }

    async fn read_all(
        &self,
        after_offset: i64,
        limit: usize,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .history
            .iter()
            .filter(|e| e.global_offset > after_offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// An event store that is always empty and silently accepts appends. Useful
/// for "aggregate not found" scenarios and creation commands.
#[derive(Debug)]
pub struct EmptyEventStore;

#[async_trait]
impl EventStore for EmptyEventStore {
    async fn append(&self, event: &StoredEvent) -> Result<StoredEvent, DomainError> {
        Ok(event.clone())
    }

    async fn read_stream(
        &self,
        _aggregate_id: &AggregateId,
        _from_sequence: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn read_all(
        &self,
        _after_offset: i64,
        _limit: usize,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append(&self, _event: &StoredEvent) -> Result<StoredEvent, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn read_stream(
        &self,
        _aggregate_id: &AggregateId,
        _from_sequence: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn read_all(
        &self,
        _after_offset: i64,
        _limit: usize,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// Wraps a real store and sneaks queued "competing writer" events into it
/// just before the next appends, so callers observe genuine sequence
/// conflicts.
pub struct InterleavingEventStore<S> {
    inner: S,
    intruders: Mutex<Vec<StoredEvent>>,
}

impl<S: EventStore> InterleavingEventStore<S> {
    /// Wraps `inner`; each of `intruders` is appended ahead of one caller
    /// append, in order.
    #[must_use]
    pub fn new(inner: S, intruders: Vec<StoredEvent>) -> Self {
        let mut intruders = intruders;
        intruders.reverse();
        Self {
            inner,
            intruders: Mutex::new(intruders),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: EventStore> EventStore for InterleavingEventStore<S> {
    async fn append(&self, event: &StoredEvent) -> Result<StoredEvent, DomainError> {
        let intruder = self.intruders.lock().unwrap().pop();
        if let Some(intruder) = intruder {
            self.inner.append(&intruder).await?;
        }
        self.inner.append(event).await
    }

    async fn read_stream(
        &self,
        aggregate_id: &AggregateId,
        from_sequence: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner.read_stream(aggregate_id, from_sequence).await
    }

    async fn read_all(
        &self,
        after_offset: i64,
        limit: usize,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner.read_all(after_offset, limit).await
    }
}
