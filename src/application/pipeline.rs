//! Single-pass analysis pipeline.
//!
//! Wires the classifier, cohort builder, round executor, feedback round,
//! and scoring service together. The convergence loop drives the same
//! steps one phase at a time; `analyze` runs them straight through for a
//! one-shot review.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::models::{
    Classification, Cohort, Document, EngineConfig, QualityScore, RoundResult, RunOptions, Tier,
};
use crate::services::classifier::Classifier;
use crate::services::cohort::CohortBuilder;
use crate::services::registry::CapabilityRegistry;
use crate::services::retry::RetryPolicy;
use crate::services::round::{CompletionParams, RoundContext, RoundExecutor, RoundPorts};
use crate::services::scoring::{global_confidence, ScoringService};
use crate::services::FeedbackRound;

/// Output of one single-pass analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub document_id: Uuid,
    pub classification: Classification,
    pub round: RoundResult,
    /// Deterministic synthesis of the round's reports
    pub synthesis: String,
    /// Mean normalized worker score in [0, 1]
    pub global_confidence: f64,
    /// Structured quality verdict for the pass
    pub quality: QualityScore,
    /// Workers whose calls failed, in cohort order
    pub failed_workers: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Classify, review, and score documents.
#[derive(Clone)]
pub struct AnalysisPipeline {
    classifier: Arc<Classifier>,
    cohorts: CohortBuilder,
    executor: RoundExecutor,
    feedback: FeedbackRound,
    scoring: Arc<ScoringService>,
}

impl AnalysisPipeline {
    pub fn new(
        classifier: Arc<Classifier>,
        cohorts: CohortBuilder,
        executor: RoundExecutor,
        feedback: FeedbackRound,
        scoring: Arc<ScoringService>,
    ) -> Self {
        Self {
            classifier,
            cohorts,
            executor,
            feedback,
            scoring,
        }
    }

    /// Standard wiring: the static registry, one retry policy for every
    /// backend call, and completion parameters from configuration.
    pub fn from_ports(ports: &RoundPorts, config: &EngineConfig) -> Self {
        let retry = RetryPolicy::from_settings(&config.retry);
        let registry = Arc::new(CapabilityRegistry::standard());
        let suggestible = registry
            .specs()
            .iter()
            .filter(|spec| spec.tier != Tier::Core)
            .map(|spec| spec.capability.clone())
            .collect();

        let classifier = Arc::new(Classifier::new(
            ports.completion.clone(),
            retry.clone(),
            config.engine.classifier_excerpt_chars,
            suggestible,
        ));
        let params = CompletionParams {
            temperature: config.completion.temperature,
            max_tokens: config.completion.max_tokens,
        };
        let executor = RoundExecutor::new(ports, retry.clone(), params, config.engine.max_in_flight);
        let feedback = FeedbackRound::new(executor.clone());
        let scoring = Arc::new(ScoringService::new(
            ports.completion.clone(),
            retry,
            config.engine.max_suggestions,
            config.completion.max_tokens,
        ));

        Self::new(
            classifier,
            CohortBuilder::new(registry),
            executor,
            feedback,
            scoring,
        )
    }

    /// Classify one document version.
    pub async fn classify(&self, document: &Document) -> Classification {
        self.classifier.classify(document).await
    }

    /// Select the cohort for a classification.
    pub fn build_cohort(&self, classification: &Classification, deep_mode: bool) -> Cohort {
        self.cohorts.build(classification, deep_mode)
    }

    /// Run the review round, plus the peer feedback round when enabled.
    pub async fn run_review(
        &self,
        cohort: &Cohort,
        ctx: &RoundContext,
        options: &RunOptions,
    ) -> RoundResult {
        let round = self.executor.run_round(cohort, ctx).await;
        if options.feedback_enabled && options.feedback_max_rounds > 0 {
            self.feedback
                .run_feedback_round(cohort, ctx, round, options.feedback_max_rounds)
                .await
        } else {
            round
        }
    }

    /// Deterministic synthesis of a round.
    pub fn synthesize(&self, round: &RoundResult) -> String {
        self.scoring.synthesize(round)
    }

    /// Structured quality verdict for a round.
    pub async fn score(&self, round: &RoundResult, iteration_index: u32) -> QualityScore {
        self.scoring.score_document(round, iteration_index).await
    }

    /// One-shot review: classify, review, synthesize, score.
    ///
    /// Infallible by construction. Every failure mode inside degrades to a
    /// structured field (fallback classification, per-worker `error`,
    /// neutral quality score) rather than an error return.
    pub async fn analyze(&self, document: Document, options: &RunOptions) -> Report {
        let document = Arc::new(document);
        let classification = self.classify(&document).await;
        let cohort = self.build_cohort(&classification, options.deep_mode);
        let ctx = RoundContext::new(document.clone(), classification.clone(), 1);
        let round = self.run_review(&cohort, &ctx, options).await;

        let synthesis = self.synthesize(&round);
        let confidence = global_confidence(&round);
        let quality = self.score(&round, 1).await;
        let failed_workers = round.failed_workers();

        info!(
            document_id = %document.id,
            category = %classification.category,
            cohort_size = cohort.len(),
            failed_workers = failed_workers.len(),
            confidence,
            overall_score = quality.overall_score,
            "Single-pass analysis completed"
        );

        Report {
            document_id: document.id,
            classification,
            round,
            synthesis,
            global_confidence: confidence,
            quality,
            failed_workers,
            generated_at: Utc::now(),
        }
    }
}
