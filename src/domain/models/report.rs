//! Worker report and round result models.

use serde::{Deserialize, Serialize};

/// Summary text used when a worker call failed outright.
pub const FAILED_SUMMARY: &str = "analysis unavailable";

/// One worker's structured output for one round.
///
/// When the worker call failed after exhausting its retries, `error` is set
/// and the remaining fields hold neutral defaults. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    /// Capability tag of the worker that produced this report
    pub name: String,
    /// Short prose summary of the worker's findings
    pub summary: String,
    /// Individual observations
    pub comments: Vec<String>,
    /// Raw score as returned by the worker, 0-1 or 0-100 scale
    pub score: f64,
    /// Concrete improvement suggestions
    pub suggestions: Vec<String>,
    /// Failure description when the worker call did not succeed
    pub error: Option<String>,
}

impl WorkerReport {
    pub fn new(name: impl Into<String>, summary: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            comments: Vec::new(),
            score,
            suggestions: Vec::new(),
            error: None,
        }
    }

    /// Report for a worker whose call failed after exhausting retries.
    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: FAILED_SUMMARY.to_string(),
            comments: Vec::new(),
            score: 0.0,
            suggestions: Vec::new(),
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn with_comments(mut self, comments: Vec<String>) -> Self {
        self.comments = comments;
        self
    }

    #[must_use]
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Score normalized onto [0, 1].
    ///
    /// Scores above 1.0 are treated as a 0-100 scale and divided by 100
    /// before clamping.
    pub fn normalized_score(&self) -> f64 {
        let score = if self.score > 1.0 {
            self.score / 100.0
        } else {
            self.score
        };
        score.clamp(0.0, 1.0)
    }
}

/// All worker reports for one round, in cohort order.
///
/// Always the same length and order as the cohort that produced it, one
/// entry per worker regardless of success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    reports: Vec<WorkerReport>,
}

impl RoundResult {
    pub fn new(reports: Vec<WorkerReport>) -> Self {
        Self { reports }
    }

    pub fn reports(&self) -> &[WorkerReport] {
        &self.reports
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WorkerReport> {
        self.reports.iter()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WorkerReport> {
        self.reports.get(index)
    }

    /// Number of reports with `error` set.
    pub fn failed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failed()).count()
    }

    /// Names of workers whose calls failed, in cohort order.
    pub fn failed_workers(&self) -> Vec<String> {
        self.reports
            .iter()
            .filter(|r| r.is_failed())
            .map(|r| r.name.clone())
            .collect()
    }
}

impl<'a> IntoIterator for &'a RoundResult {
    type Item = &'a WorkerReport;
    type IntoIter = std::slice::Iter<'a, WorkerReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.reports.iter()
    }
}
