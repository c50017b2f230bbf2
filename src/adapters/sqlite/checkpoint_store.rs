//! SQLite-backed checkpoint store.
//!
//! Checkpoint rows are insert-only; the single permitted update clears the
//! `resumable` flag when a later checkpoint supersedes the row. Iteration
//! records are append-only and serialized as JSON in the `record` column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::PersistenceError;
use crate::domain::models::{Checkpoint, CheckpointPhase, IterationRecord};
use crate::domain::ports::CheckpointStore;

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        sqlx::query(
            "INSERT INTO checkpoints (
                id, run_id, document_fingerprint, iteration_index,
                phase, state, resumable, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(checkpoint.id.to_string())
        .bind(checkpoint.run_id.to_string())
        .bind(&checkpoint.document_fingerprint)
        .bind(i64::from(checkpoint.iteration_index))
        .bind(checkpoint.phase.as_str())
        .bind(&checkpoint.state)
        .bind(i32::from(checkpoint.resumable))
        .bind(checkpoint.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<Checkpoint>, PersistenceError> {
        let row: Option<CheckpointRow> = sqlx::query_as(
            "SELECT id, run_id, document_fingerprint, iteration_index,
                    phase, state, resumable, created_at
             FROM checkpoints WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), PersistenceError> {
        let result = sqlx::query("UPDATE checkpoints SET resumable = 0 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::CheckpointUnavailable(id));
        }
        Ok(())
    }

    async fn latest_resumable(&self, run_id: Uuid) -> Result<Option<Checkpoint>, PersistenceError> {
        let row: Option<CheckpointRow> = sqlx::query_as(
            "SELECT id, run_id, document_fingerprint, iteration_index,
                    phase, state, resumable, created_at
             FROM checkpoints
             WHERE run_id = ? AND resumable = 1
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
        )
        .bind(run_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn append_iteration(
        &self,
        run_id: Uuid,
        record: &IterationRecord,
    ) -> Result<(), PersistenceError> {
        let serialized = serde_json::to_string(record)?;

        sqlx::query(
            "INSERT INTO iteration_records (
                run_id, iteration_index, document_version, record, created_at
            ) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(run_id.to_string())
        .bind(i64::from(record.iteration_index))
        .bind(i64::from(record.document_version))
        .bind(serialized)
        .bind(record.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_iterations(&self, run_id: Uuid) -> Result<Vec<IterationRecord>, PersistenceError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT record FROM iteration_records
             WHERE run_id = ?
             ORDER BY iteration_index ASC, id ASC",
        )
        .bind(run_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(record,)| serde_json::from_str(&record).map_err(PersistenceError::from))
            .collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CheckpointRow {
    id: String,
    run_id: String,
    document_fingerprint: String,
    iteration_index: i64,
    phase: String,
    state: String,
    resumable: i64,
    created_at: String,
}

impl TryFrom<CheckpointRow> for Checkpoint {
    type Error = PersistenceError;

    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn try_from(row: CheckpointRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| PersistenceError::Serialization(format!("Invalid checkpoint id: {e}")))?;
        let run_id = Uuid::parse_str(&row.run_id)
            .map_err(|e| PersistenceError::Serialization(format!("Invalid run id: {e}")))?;
        let phase = CheckpointPhase::from_str(&row.phase).ok_or_else(|| {
            PersistenceError::Serialization(format!("Unknown checkpoint phase: {}", row.phase))
        })?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| PersistenceError::Serialization(format!("Invalid timestamp: {e}")))?
            .with_timezone(&Utc);

        Ok(Self {
            id,
            run_id,
            document_fingerprint: row.document_fingerprint,
            iteration_index: row.iteration_index as u32,
            phase,
            state: row.state,
            resumable: row.resumable != 0,
            created_at,
        })
    }
}
