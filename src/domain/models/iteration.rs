//! Iteration history and convergence state models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quality::{QualityScore, StopReason};
use super::report::RoundResult;

/// Marker recorded when a refinement attempt failed and the document was
/// carried forward unchanged.
pub const NO_IMPROVEMENT_MARKER: &str = "no improvement applied";

/// One completed iteration of the convergence loop.
///
/// Records are append-only; the run accumulates an ordered, never-mutated
/// history of them. `improvements_applied` describes the refinement that
/// produced this iteration's document version, so it is empty for the first
/// iteration and carries the no-improvement marker after a failed refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-indexed iteration number
    pub iteration_index: u32,
    /// Version of the document this iteration reviewed
    pub document_version: u32,
    /// Full round output for this iteration
    pub round: RoundResult,
    /// Quality verdict for this iteration
    pub quality: QualityScore,
    /// Improvement descriptions applied to produce this document version
    pub improvements_applied: Vec<String>,
    /// When the iteration completed scoring
    pub timestamp: DateTime<Utc>,
}

impl IterationRecord {
    pub fn new(
        iteration_index: u32,
        document_version: u32,
        round: RoundResult,
        quality: QualityScore,
        improvements_applied: Vec<String>,
    ) -> Self {
        Self {
            iteration_index,
            document_version,
            round,
            quality,
            improvements_applied,
            timestamp: Utc::now(),
        }
    }

    /// Whether this iteration reviewed an unchanged document after a failed
    /// refinement.
    pub fn is_no_op(&self) -> bool {
        self.improvements_applied
            .iter()
            .any(|i| i == NO_IMPROVEMENT_MARKER)
    }
}

/// Best-so-far tracking and stop decision for one document run.
///
/// Recomputed incrementally as each record is appended.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConvergenceState {
    /// Iteration index of the best record seen so far
    pub best_iteration_index: Option<u32>,
    /// Copy of the best record seen so far
    pub best_record: Option<IterationRecord>,
    /// Why the run stopped, or `NoneYet` while it is in progress
    pub stop_reason: StopReason,
}

impl ConvergenceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a freshly appended record into the best-so-far tracking.
    pub fn observe(&mut self, record: &IterationRecord) {
        let improved = match &self.best_record {
            Some(best) => record.quality.is_better_than(&best.quality),
            None => true,
        };
        if improved {
            self.best_iteration_index = Some(record.iteration_index);
            self.best_record = Some(record.clone());
        }
    }
}
