//! Checkpoint and loop snapshot models.
//!
//! A checkpoint is a durable copy of loop state taken at a phase boundary.
//! Checkpoints are never mutated, only flagged non-resumable once a later
//! checkpoint for the same run supersedes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classification::Classification;
use super::document::Document;
use super::iteration::{ConvergenceState, IterationRecord};
use super::quality::QualityScore;
use super::report::RoundResult;

/// The loop phase a checkpoint was taken after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointPhase {
    /// Classification for the iteration finished
    Classify,
    /// Round (and any feedback round) finished
    Review,
    /// Quality score produced and the iteration record appended
    Score,
    /// Refinement applied (or skipped as a no-op) for the next iteration
    Refine,
}

impl CheckpointPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::Review => "review",
            Self::Score => "score",
            Self::Refine => "refine",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "classify" => Some(Self::Classify),
            "review" => Some(Self::Review),
            "score" => Some(Self::Score),
            "refine" => Some(Self::Refine),
            _ => None,
        }
    }
}

/// Durable pause/resume record for one document run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique identifier
    pub id: Uuid,
    /// Run this checkpoint belongs to
    pub run_id: Uuid,
    /// Content fingerprint of the document version under review
    pub document_fingerprint: String,
    /// Iteration the saved phase belongs to
    pub iteration_index: u32,
    /// Last phase that completed before the save
    pub phase: CheckpointPhase,
    /// Serialized `LoopSnapshot`
    pub state: String,
    /// Whether a resume may start from this checkpoint
    pub resumable: bool,
    /// When the checkpoint was written
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Create a resumable checkpoint from a snapshot's serialized state.
    pub fn new(
        run_id: Uuid,
        document_fingerprint: impl Into<String>,
        iteration_index: u32,
        phase: CheckpointPhase,
        state: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            document_fingerprint: document_fingerprint.into(),
            iteration_index,
            phase,
            state: state.into(),
            resumable: true,
            created_at: Utc::now(),
        }
    }
}

/// Complete serializable state of the convergence loop.
///
/// Everything needed to continue a run at the phase after `phase` without
/// re-running completed work. The loop owns the live value; checkpoints only
/// ever receive serialized copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSnapshot {
    /// Current document version under review
    pub document: Document,
    /// Iteration the cursor is in, 0 before the first review starts
    pub iteration_index: u32,
    /// Last completed phase, `None` before any phase has run
    pub phase: Option<CheckpointPhase>,
    /// Classification for the current iteration, once produced
    pub classification: Option<Classification>,
    /// Round output for the current iteration, once produced
    pub round: Option<RoundResult>,
    /// Quality score for the current iteration, once produced
    pub quality: Option<QualityScore>,
    /// Append-only history of completed iterations
    pub history: Vec<IterationRecord>,
    /// Best-so-far tracking and stop decision
    pub convergence: ConvergenceState,
    /// Improvement descriptions waiting to be attached to the next record
    pub pending_improvements: Vec<String>,
}

impl LoopSnapshot {
    /// Fresh snapshot for a run that has not started its first iteration.
    pub fn initial(document: Document) -> Self {
        Self {
            document,
            iteration_index: 0,
            phase: None,
            classification: None,
            round: None,
            quality: None,
            history: Vec::new(),
            convergence: ConvergenceState::new(),
            pending_improvements: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(state: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(state)
    }
}
