//! `PostgreSQL` implementations of `EventStore` and `CheckpointStore`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument, warn};

use chatvue_core::aggregate::AggregateId;
use chatvue_core::error::DomainError;
use chatvue_core::store::{CheckpointStore, EventStore, StoredEvent};

/// Name Postgres gives the `UNIQUE (aggregate_id, sequence_number)` constraint.
const STREAM_POSITION_CONSTRAINT: &str = "room_events_aggregate_id_sequence_number_key";

/// Advisory lock key guarding the visibility of `global_offset`.
///
/// Appends hold it shared, so writers never wait on each other. `read_all`
/// takes it exclusively, which waits for in-flight appends to finish: every
/// offset at or below the highest one it returns is then either committed
/// or rolled back for good.
pub const FEED_LOCK_KEY: i64 = 0x6368_6174_7675_6501;

const SELECT_COLUMNS: &str = "global_offset, event_id, aggregate_id, event_type, payload, \
     sequence_number, correlation_id, causation_id, occurred_at";

#[allow(clippy::needless_pass_by_value)]
fn infra(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(err.to_string())
}

fn from_row(row: &PgRow) -> Result<StoredEvent, DomainError> {
    let aggregate_id: String = row.try_get("aggregate_id").map_err(infra)?;
    Ok(StoredEvent {
        event_id: row.try_get("event_id").map_err(infra)?,
        aggregate_id: AggregateId::new(aggregate_id)?,
        event_type: row.try_get("event_type").map_err(infra)?,
        payload: row.try_get("payload").map_err(infra)?,
        sequence_number: row.try_get("sequence_number").map_err(infra)?,
        correlation_id: row.try_get("correlation_id").map_err(infra)?,
        causation_id: row.try_get("causation_id").map_err(infra)?,
        occurred_at: row.try_get("occurred_at").map_err(infra)?,
        global_offset: row.try_get("global_offset").map_err(infra)?,
    })
}

/// PostgreSQL-backed event store over the `room_events` table.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self, event), fields(aggregate_id = %event.aggregate_id, sequence = event.sequence_number))]
    async fn append(&self, event: &StoredEvent) -> Result<StoredEvent, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infra)?;

        sqlx::query("SELECT pg_advisory_xact_lock_shared($1)")
            .bind(FEED_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;

        let head: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(sequence_number), 0) FROM room_events WHERE aggregate_id = $1",
        )
        .bind(event.aggregate_id.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(infra)?;

        if (1..=head).contains(&event.sequence_number) {
            return Err(DomainError::SequenceConflict {
                aggregate_id: event.aggregate_id.clone(),
                sequence: event.sequence_number,
            });
        }
        if event.sequence_number != head + 1 {
            return Err(DomainError::SequenceGap {
                aggregate_id: event.aggregate_id.clone(),
                expected: head + 1,
                actual: event.sequence_number,
            });
        }

        // The unique constraint still backs the head check for writers that
        // bypass this store.
        let global_offset: i64 = sqlx::query_scalar(
            r"
            INSERT INTO room_events (
                event_id, aggregate_id, event_type, payload, sequence_number,
                correlation_id, causation_id, occurred_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING global_offset
            ",
        )
        .bind(event.event_id)
        .bind(event.aggregate_id.as_str())
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.sequence_number)
        .bind(event.correlation_id)
        .bind(event.causation_id)
        .bind(event.occurred_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db)
                if db.is_unique_violation()
                    && db.constraint() == Some(STREAM_POSITION_CONSTRAINT) =>
            {
                warn!("lost append race");
                DomainError::SequenceConflict {
                    aggregate_id: event.aggregate_id.clone(),
                    sequence: event.sequence_number,
                }
            }
            other => infra(other),
        })?;

        tx.commit().await.map_err(infra)?;

        debug!(global_offset, "appended event");
        Ok(StoredEvent {
            global_offset,
            ..event.clone()
        })
    }

    async fn read_stream(
        &self,
        aggregate_id: &AggregateId,
        from_sequence: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM room_events \
             WHERE aggregate_id = $1 AND sequence_number >= $2 \
             ORDER BY sequence_number ASC"
        ))
        .bind(aggregate_id.as_str())
        .bind(from_sequence)
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;

        rows.iter().map(from_row).collect()
    }

    async fn read_all(
        &self,
        after_offset: i64,
        limit: usize,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut tx = self.pool.begin().await.map_err(infra)?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(FEED_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(infra)?;

        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM room_events \
             WHERE global_offset > $1 \
             ORDER BY global_offset ASC \
             LIMIT $2"
        ))
        .bind(after_offset)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await
        .map_err(infra)?;

        tx.commit().await.map_err(infra)?;

        rows.iter().map(from_row).collect()
    }
}

/// PostgreSQL-backed checkpoints over the `projection_checkpoints` table.
#[derive(Debug, Clone)]
pub struct PgCheckpointStore {
    pool: PgPool,
}

impl PgCheckpointStore {
    /// Creates a new `PgCheckpointStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    async fn load(&self, consumer: &str) -> Result<i64, DomainError> {
        let offset: Option<i64> = sqlx::query_scalar(
            "SELECT last_offset FROM projection_checkpoints WHERE consumer = $1",
        )
        .bind(consumer)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;
        Ok(offset.unwrap_or(0))
    }

    async fn save(&self, consumer: &str, offset: i64) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO projection_checkpoints (consumer, last_offset, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (consumer)
            DO UPDATE SET last_offset = EXCLUDED.last_offset, updated_at = NOW()
            ",
        )
        .bind(consumer)
        .bind(offset)
        .execute(&self.pool)
        .await
        .map_err(infra)?;
        Ok(())
    }
}
