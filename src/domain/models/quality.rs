//! Quality scoring model and stop reasons.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall score assigned when the scoring backend output is unparseable.
pub const NEUTRAL_OVERALL_SCORE: f64 = 50.0;

/// Structured quality verdict for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Overall score in [0, 100]
    pub overall_score: f64,
    /// Named dimension scores in [0, 100]
    pub dimension_scores: BTreeMap<String, f64>,
    /// Count of critical issues found
    pub critical_issues: u32,
    /// Count of moderate issues found
    pub moderate_issues: u32,
    /// Count of minor issues found
    pub minor_issues: u32,
    /// What the document does well
    pub strengths: Vec<String>,
    /// Where the document falls short
    pub weaknesses: Vec<String>,
    /// Iteration this score belongs to (1-indexed)
    pub iteration_index: u32,
}

impl QualityScore {
    /// The documented neutral default used when scoring output cannot be
    /// parsed: overall 50, zero issues, iteration index carried through.
    pub fn neutral(iteration_index: u32) -> Self {
        Self {
            overall_score: NEUTRAL_OVERALL_SCORE,
            dimension_scores: BTreeMap::new(),
            critical_issues: 0,
            moderate_issues: 0,
            minor_issues: 0,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            iteration_index,
        }
    }

    /// Strict ordering used for best-version tracking.
    ///
    /// A is better than B iff A has fewer critical issues, or the same
    /// number of critical issues and a strictly higher overall score.
    pub fn is_better_than(&self, other: &Self) -> bool {
        self.critical_issues < other.critical_issues
            || (self.critical_issues == other.critical_issues
                && self.overall_score > other.overall_score)
    }

    /// Whether this score satisfies the target stopping condition.
    pub fn meets_target(&self, target_score: f64) -> bool {
        self.overall_score >= target_score && self.critical_issues == 0
    }

    /// Total issue count across severities.
    pub fn total_issues(&self) -> u32 {
        self.critical_issues + self.moderate_issues + self.minor_issues
    }
}

impl Default for QualityScore {
    fn default() -> Self {
        Self::neutral(0)
    }
}

/// Why an iterative run stopped, if it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Run is still in progress or was paused before a decision
    NoneYet,
    /// Score reached the target with zero critical issues
    TargetReached,
    /// Iteration budget exhausted
    MaxIterations,
    /// Score improvement between consecutive iterations fell below epsilon
    Plateau,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoneYet => "none_yet",
            Self::TargetReached => "target_reached",
            Self::MaxIterations => "max_iterations",
            Self::Plateau => "plateau",
        }
    }

    /// Whether the run has actually stopped.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NoneYet)
    }
}

impl Default for StopReason {
    fn default() -> Self {
        Self::NoneYet
    }
}
