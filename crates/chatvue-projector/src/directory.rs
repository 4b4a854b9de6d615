//! `PostgreSQL` room directory over the `room_directory` table.

use async_trait::async_trait;
use chatvue_core::aggregate::AggregateId;
use chatvue_core::error::DomainError;
use chatvue_rooms::application::projections::{RoomDirectoryStore, RoomSummary};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const SELECT_COLUMNS: &str = "room_id, room_name, deleted, version, updated_at";

#[allow(clippy::needless_pass_by_value)]
fn infra(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

fn from_row(row: &PgRow) -> Result<RoomSummary, DomainError> {
    let room_id: String = row.try_get("room_id").map_err(infra)?;
    Ok(RoomSummary {
        room_id: AggregateId::new(room_id)?,
        room_name: row.try_get("room_name").map_err(infra)?,
        deleted: row.try_get("deleted").map_err(infra)?,
        version: row.try_get("version").map_err(infra)?,
        updated_at: row.try_get("updated_at").map_err(infra)?,
    })
}

/// PostgreSQL-backed room directory.
#[derive(Debug, Clone)]
pub struct PgRoomDirectory {
    pool: PgPool,
}

impl PgRoomDirectory {
    /// Creates a new `PgRoomDirectory`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomDirectoryStore for PgRoomDirectory {
    async fn record(&self, summary: &RoomSummary) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r"
            INSERT INTO room_directory (room_id, room_name, deleted, version, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (room_id) DO UPDATE SET
                room_name  = COALESCE(EXCLUDED.room_name, room_directory.room_name),
                deleted    = EXCLUDED.deleted,
                version    = EXCLUDED.version,
                updated_at = EXCLUDED.updated_at
            WHERE room_directory.version < EXCLUDED.version
            ",
        )
        .bind(summary.room_id.as_str())
        .bind(summary.room_name.as_deref())
        .bind(summary.deleted)
        .bind(summary.version)
        .bind(summary.updated_at)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(result.rows_affected() > 0)
    }

    async fn get(&self, room_id: &AggregateId) -> Result<Option<RoomSummary>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM room_directory WHERE room_id = $1"
        ))
        .bind(room_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        row.as_ref().map(from_row).transpose()
    }

    async fn list_live(&self) -> Result<Vec<RoomSummary>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM room_directory WHERE NOT deleted ORDER BY room_id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;
        rows.iter().map(from_row).collect()
    }
}
