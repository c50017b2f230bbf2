//! Round synthesis and quality scoring.
//!
//! Synthesis is a deterministic local concatenation of the round's reports.
//! Scoring sends that synthesis to the completion backend for a structured
//! verdict; an unscoreable response degrades to the neutral default instead
//! of failing the iteration.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::models::{QualityScore, ResourceTier, RoundResult, WorkerReport};
use crate::domain::ports::{CompletionRequest, CompletionService};
use crate::services::response::extract_json;
use crate::services::retry::RetryPolicy;

const SCORE_TEMPERATURE: f64 = 0.0;

/// Mean of the round's normalized worker scores, in [0, 1].
///
/// Workers with `error` set are excluded from the mean rather than counted
/// as zeros, so one failed worker lowers coverage, not the apparent quality
/// of the document. A round with no successful workers scores 0.0.
pub fn global_confidence(round: &RoundResult) -> f64 {
    let scores: Vec<f64> = round
        .iter()
        .filter(|report| !report.is_failed())
        .map(WorkerReport::normalized_score)
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean.clamp(0.0, 1.0)
}

/// Deterministic textual synthesis of one round.
///
/// One block per worker in cohort order. Failed workers appear with their
/// error so downstream consumers can see the coverage gap. Suggestions are
/// deduplicated across workers, first occurrence wins, capped at
/// `max_suggestions`.
pub fn synthesize_round(round: &RoundResult, max_suggestions: usize) -> String {
    let mut text = String::new();

    for report in round {
        text.push_str(&format!("## {}\n", report.name));
        if let Some(error) = &report.error {
            text.push_str(&format!("(unavailable: {error})\n\n"));
            continue;
        }
        text.push_str(&format!("Score: {:.0}/100\n", report.normalized_score() * 100.0));
        text.push_str(&report.summary);
        text.push('\n');
        for comment in &report.comments {
            text.push_str(&format!("- {comment}\n"));
        }
        text.push('\n');
    }

    let mut seen = HashSet::new();
    let suggestions: Vec<&str> = round
        .iter()
        .filter(|report| !report.is_failed())
        .flat_map(|report| report.suggestions.iter())
        .map(String::as_str)
        .filter(|s| seen.insert(s.trim().to_lowercase()))
        .take(max_suggestions)
        .collect();

    if !suggestions.is_empty() {
        text.push_str("## Top suggestions\n");
        for suggestion in suggestions {
            text.push_str(&format!("- {suggestion}\n"));
        }
    }

    text
}

#[derive(Debug, Deserialize)]
struct RawQualityScore {
    overall_score: f64,
    #[serde(default)]
    dimension_scores: BTreeMap<String, f64>,
    #[serde(default)]
    critical_issues: u32,
    #[serde(default)]
    moderate_issues: u32,
    #[serde(default)]
    minor_issues: u32,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
}

const SCORE_SCHEMA: &str = r#"{
  "overall_score": <0-100>,
  "dimension_scores": {"<dimension>": <0-100>},
  "critical_issues": <count>,
  "moderate_issues": <count>,
  "minor_issues": <count>,
  "strengths": ["<what the document does well>"],
  "weaknesses": ["<where it falls short>"]
}"#;

/// Scores rounds through the completion backend.
pub struct ScoringService {
    completion: Arc<dyn CompletionService>,
    retry: RetryPolicy,
    max_suggestions: usize,
    max_tokens: u32,
}

impl ScoringService {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        retry: RetryPolicy,
        max_suggestions: usize,
        max_tokens: u32,
    ) -> Self {
        Self {
            completion,
            retry,
            max_suggestions,
            max_tokens,
        }
    }

    /// Deterministic synthesis of the round's reports.
    pub fn synthesize(&self, round: &RoundResult) -> String {
        synthesize_round(round, self.max_suggestions)
    }

    /// Produce a structured quality verdict for one iteration.
    ///
    /// Backend failures and unparseable responses both degrade to
    /// `QualityScore::neutral`, carrying the iteration index through.
    pub async fn score_document(&self, round: &RoundResult, iteration_index: u32) -> QualityScore {
        let prompt = format!(
            "You are the quality arbiter for a document review round. The reviewer \
             reports are below.\n\n\
             Respond with ONLY a JSON object matching this schema, no additional text:\n{}\n\n\
             REVIEWER REPORTS:\n{}",
            SCORE_SCHEMA,
            self.synthesize(round)
        );
        let request = CompletionRequest::new(prompt, ResourceTier::Standard)
            .with_temperature(SCORE_TEMPERATURE)
            .with_max_tokens(self.max_tokens);

        let response = match self
            .retry
            .complete_with_retry(self.completion.as_ref(), request)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    iteration = iteration_index,
                    error = %e,
                    "Scoring call failed, using neutral score"
                );
                return QualityScore::neutral(iteration_index);
            }
        };

        match serde_json::from_str::<RawQualityScore>(extract_json(&response)) {
            Ok(raw) => {
                let score = QualityScore {
                    overall_score: raw.overall_score.clamp(0.0, 100.0),
                    dimension_scores: raw.dimension_scores,
                    critical_issues: raw.critical_issues,
                    moderate_issues: raw.moderate_issues,
                    minor_issues: raw.minor_issues,
                    strengths: raw.strengths,
                    weaknesses: raw.weaknesses,
                    iteration_index,
                };
                debug!(
                    iteration = iteration_index,
                    overall = score.overall_score,
                    critical = score.critical_issues,
                    "Round scored"
                );
                score
            }
            Err(e) => {
                warn!(
                    iteration = iteration_index,
                    error = %e,
                    "Scoring response unparseable, using neutral score"
                );
                QualityScore::neutral(iteration_index)
            }
        }
    }
}
