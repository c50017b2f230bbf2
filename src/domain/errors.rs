//! Domain errors for the review engine.

use thiserror::Error;
use uuid::Uuid;

/// Engine-level errors.
///
/// Every kind except `Configuration` is caught at the boundary where it
/// occurs and converted into a degraded-but-continuing result; a single
/// worker, scoring, or refinement failure never aborts a run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Worker execution failed: {0}")]
    WorkerExecution(String),

    #[error("Scoring response could not be parsed: {0}")]
    ScoringParse(String),

    #[error("Refinement failed: {0}")]
    Refinement(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Errors from the checkpoint store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Checkpoint not found or not resumable: {0}")]
    CheckpointUnavailable(Uuid),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}
