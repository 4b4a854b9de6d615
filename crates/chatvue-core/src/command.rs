//! Command abstractions.

use uuid::Uuid;

use crate::aggregate::AggregateId;

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the events it produces.
    fn correlation_id(&self) -> Uuid;

    /// The raw identifier of the aggregate the command targets.
    fn target(&self) -> &str;

    /// Parses the target into an `AggregateId`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingAggregateIdentity` if the target is blank.
    fn aggregate_id(&self) -> Result<AggregateId, crate::error::DomainError> {
        AggregateId::new(self.target())
    }
}
