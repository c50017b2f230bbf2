//! Domain models.

pub mod checkpoint;
pub mod classification;
pub mod config;
pub mod document;
pub mod iteration;
pub mod quality;
pub mod report;
pub mod worker;

pub use checkpoint::{Checkpoint, CheckpointPhase, LoopSnapshot};
pub use classification::{fallback_capabilities, Classification};
pub use config::{
    BatchSettings, CompletionSettings, DatabaseSettings, EngineConfig, EngineSettings,
    LoggingSettings, RetrySettings, RunOptions,
};
pub use document::{Document, DocumentMeta};
pub use iteration::{ConvergenceState, IterationRecord, NO_IMPROVEMENT_MARKER};
pub use quality::{QualityScore, StopReason, NEUTRAL_OVERALL_SCORE};
pub use report::{RoundResult, WorkerReport};
pub use worker::{Cohort, DispatchKind, ResourceTier, Tier, WorkerSpec};
