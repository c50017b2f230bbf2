//! Checkpoint store port - durable pause/resume and iteration history.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::PersistenceError;
use crate::domain::models::{Checkpoint, IterationRecord};

/// Trait for durable checkpoint and iteration-record persistence.
///
/// All writes are inserts; the single permitted update is `invalidate`,
/// which flips the `resumable` flag on a superseded checkpoint. Each run
/// writes only rows keyed by its own run id, so concurrent document runs
/// never contend.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Insert a checkpoint row.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError>;

    /// Point lookup by checkpoint id.
    async fn load(&self, id: Uuid) -> Result<Option<Checkpoint>, PersistenceError>;

    /// Flag a superseded checkpoint as non-resumable.
    async fn invalidate(&self, id: Uuid) -> Result<(), PersistenceError>;

    /// Most recent resumable checkpoint for a run, if any.
    async fn latest_resumable(&self, run_id: Uuid) -> Result<Option<Checkpoint>, PersistenceError>;

    /// Append one iteration record to a run's history.
    async fn append_iteration(
        &self,
        run_id: Uuid,
        record: &IterationRecord,
    ) -> Result<(), PersistenceError>;

    /// Full iteration history for a run, ordered by iteration index.
    async fn load_iterations(&self, run_id: Uuid) -> Result<Vec<IterationRecord>, PersistenceError>;
}
