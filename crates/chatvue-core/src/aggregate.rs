//! Aggregate root abstraction.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::event::DomainEvent;

/// Opaque, non-empty identifier of an aggregate stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AggregateId(String);

impl AggregateId {
    /// Creates an identifier from a string.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingAggregateIdentity` if the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::MissingAggregateIdentity);
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AggregateId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AggregateId> for String {
    fn from(id: AggregateId) -> Self {
        id.0
    }
}

/// Trait for aggregate roots that reconstitute from event history.
pub trait AggregateRoot: Send + Sync {
    /// The event type this aggregate produces and consumes.
    type Event: DomainEvent;

    /// Returns the zero-value state for the given stream, before any event.
    fn initial(id: AggregateId) -> Self
    where
        Self: Sized;

    /// Returns the aggregate identifier, or `None` if it has not been
    /// assigned one upstream yet.
    fn aggregate_id(&self) -> Option<&AggregateId>;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Returns the time of the most recently applied event.
    fn last_occurred_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Whether a terminal event has been applied. Any later event in the
    /// stream is an integrity violation.
    fn is_tombstoned(&self) -> bool {
        false
    }

    /// Apply an event to mutate internal state (used during reconstitution).
    /// Must be a pure function of the current state and the event.
    fn apply(&mut self, event: &Self::Event);

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Self::Event];

    /// Clears uncommitted events after persistence.
    fn clear_uncommitted_events(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_id_rejects_blank_values() {
        assert!(matches!(
            AggregateId::new("   "),
            Err(DomainError::MissingAggregateIdentity)
        ));
        assert!(matches!(
            AggregateId::new(""),
            Err(DomainError::MissingAggregateIdentity)
        ));
    }

    #[test]
    fn test_aggregate_id_serializes_as_plain_string() {
        let id = AggregateId::new("r1").unwrap();

        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::json!("r1"));

        let back: AggregateId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_value::<AggregateId>(serde_json::json!("")).is_err());
    }
}
