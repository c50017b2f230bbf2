//! In-memory checkpoint store for tests and embedded callers.
//!
//! Mirrors the SQLite store's semantics: inserts only, with `invalidate`
//! as the single permitted mutation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::PersistenceError;
use crate::domain::models::{Checkpoint, IterationRecord};
use crate::domain::ports::CheckpointStore;

pub struct MemoryCheckpointStore {
    checkpoints: Arc<RwLock<Vec<Checkpoint>>>,
    iterations: Arc<RwLock<HashMap<Uuid, Vec<IterationRecord>>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self {
            checkpoints: Arc::new(RwLock::new(Vec::new())),
            iterations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored checkpoints, resumable or not.
    pub async fn checkpoint_count(&self) -> usize {
        self.checkpoints.read().await.len()
    }

    pub async fn clear(&self) {
        self.checkpoints.write().await.clear();
        self.iterations.write().await.clear();
    }
}

impl Default for MemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let mut checkpoints = self.checkpoints.write().await;
        if checkpoints.iter().any(|c| c.id == checkpoint.id) {
            return Err(PersistenceError::Database(format!(
                "duplicate checkpoint id {}",
                checkpoint.id
            )));
        }
        checkpoints.push(checkpoint.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<Checkpoint>, PersistenceError> {
        let checkpoints = self.checkpoints.read().await;
        Ok(checkpoints.iter().find(|c| c.id == id).cloned())
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), PersistenceError> {
        let mut checkpoints = self.checkpoints.write().await;
        match checkpoints.iter_mut().find(|c| c.id == id) {
            Some(checkpoint) => {
                checkpoint.resumable = false;
                Ok(())
            }
            None => Err(PersistenceError::CheckpointUnavailable(id)),
        }
    }

    async fn latest_resumable(&self, run_id: Uuid) -> Result<Option<Checkpoint>, PersistenceError> {
        let checkpoints = self.checkpoints.read().await;
        // Later inserts win ties on created_at.
        Ok(checkpoints
            .iter()
            .filter(|c| c.run_id == run_id && c.resumable)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn append_iteration(
        &self,
        run_id: Uuid,
        record: &IterationRecord,
    ) -> Result<(), PersistenceError> {
        let mut iterations = self.iterations.write().await;
        iterations.entry(run_id).or_default().push(record.clone());
        Ok(())
    }

    async fn load_iterations(&self, run_id: Uuid) -> Result<Vec<IterationRecord>, PersistenceError> {
        let iterations = self.iterations.read().await;
        let mut records = iterations.get(&run_id).cloned().unwrap_or_default();
        records.sort_by_key(|r| r.iteration_index);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CheckpointPhase, QualityScore, RoundResult};

    fn checkpoint(run_id: Uuid, iteration: u32, phase: CheckpointPhase) -> Checkpoint {
        Checkpoint::new(run_id, "fp", iteration, phase, "{}")
    }

    fn record(iteration_index: u32) -> IterationRecord {
        IterationRecord::new(
            iteration_index,
            iteration_index,
            RoundResult::new(Vec::new()),
            QualityScore::neutral(iteration_index),
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = MemoryCheckpointStore::new();
        let saved = checkpoint(Uuid::new_v4(), 1, CheckpointPhase::Score);

        store.save(&saved).await.unwrap();
        let loaded = store.load(saved.id).await.unwrap().unwrap();

        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_duplicate_save_rejected() {
        let store = MemoryCheckpointStore::new();
        let saved = checkpoint(Uuid::new_v4(), 1, CheckpointPhase::Classify);

        store.save(&saved).await.unwrap();
        let err = store.save(&saved).await.unwrap_err();

        assert!(matches!(err, PersistenceError::Database(_)));
    }

    #[tokio::test]
    async fn test_invalidate_clears_resumable_flag() {
        let store = MemoryCheckpointStore::new();
        let saved = checkpoint(Uuid::new_v4(), 1, CheckpointPhase::Review);
        store.save(&saved).await.unwrap();

        store.invalidate(saved.id).await.unwrap();

        let loaded = store.load(saved.id).await.unwrap().unwrap();
        assert!(!loaded.resumable);
    }

    #[tokio::test]
    async fn test_invalidate_unknown_id_errors() {
        let store = MemoryCheckpointStore::new();
        let missing = Uuid::new_v4();

        let err = store.invalidate(missing).await.unwrap_err();

        assert!(matches!(
            err,
            PersistenceError::CheckpointUnavailable(id) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_latest_resumable_skips_invalidated() {
        let store = MemoryCheckpointStore::new();
        let run_id = Uuid::new_v4();
        let first = checkpoint(run_id, 1, CheckpointPhase::Classify);
        let second = checkpoint(run_id, 1, CheckpointPhase::Review);
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();
        store.invalidate(second.id).await.unwrap();

        let latest = store.latest_resumable(run_id).await.unwrap().unwrap();

        assert_eq!(latest.id, first.id);
    }

    #[tokio::test]
    async fn test_iteration_history_ordered() {
        let store = MemoryCheckpointStore::new();
        let run_id = Uuid::new_v4();
        let early = record(1);
        let late = record(2);

        store.append_iteration(run_id, &late).await.unwrap();
        store.append_iteration(run_id, &early).await.unwrap();

        let history = store.load_iterations(run_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].iteration_index, 1);
        assert_eq!(history[1].iteration_index, 2);
    }
}
