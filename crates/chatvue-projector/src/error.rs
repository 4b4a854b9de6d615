//! Chatvue projector error types.

use chatvue_core::error::DomainError;
use thiserror::Error;

/// Startup and runtime errors for the projector process.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failed at startup.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The event store or read model rejected an operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A catch-up run did not finish within the store timeout.
    #[error("projection run timed out after {0} ms")]
    Timeout(u64),
}

impl AppError {
    /// Whether the worker should keep polling after this error.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Domain(err) => match err {
                DomainError::Infrastructure(_) | DomainError::SequenceConflict { .. } => true,
                DomainError::CorruptEvent { .. }
                | DomainError::UnknownEventType { .. }
                | DomainError::TombstoneViolation { .. }
                | DomainError::SequenceGap { .. }
                | DomainError::InvalidPayload(_)
                | DomainError::MissingAggregateIdentity
                | DomainError::AggregateNotFound(_)
                | DomainError::Validation(_) => false,
            },
            Self::Config(_) | Self::Database(_) | Self::Migration(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chatvue_core::aggregate::AggregateId;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_timeouts_and_store_outages_are_transient() {
        assert!(AppError::Timeout(5000).is_transient());
        assert!(AppError::Domain(DomainError::Infrastructure("db down".into())).is_transient());
    }

    #[test]
    fn test_corrupt_feed_is_fatal() {
        let err = AppError::Domain(DomainError::UnknownEventType {
            aggregate_id: AggregateId::new("r1").unwrap(),
            event_type: "RoomArchived".into(),
        });

        assert!(!err.is_transient());
        assert!(
            !AppError::Domain(DomainError::CorruptEvent {
                aggregate_id: AggregateId::new("r1").unwrap(),
                event_id: Uuid::nil(),
                reason: "RoomCreated payload does not decode".into(),
            })
            .is_transient()
        );
        assert!(!AppError::Config("DATABASE_URL must be set".into()).is_transient());
    }

    #[test]
    fn test_domain_errors_display_unwrapped() {
        let err = AppError::from(DomainError::Validation("bad input".into()));

        assert_eq!(err.to_string(), DomainError::Validation("bad input".into()).to_string());
    }
}
