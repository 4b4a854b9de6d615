//! Event store implementations for the Chatvue room service.
//!
//! [`memory::InMemoryEventStore`] keeps the log in process memory and is
//! created once at startup and shared by `Arc`. [`postgres::PgEventStore`]
//! persists the same log in PostgreSQL.

pub mod memory;
pub mod postgres;

/// Runs the bundled schema migrations against `pool`.
///
/// # Errors
///
/// Returns the migration error if any migration fails to apply.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
