//! Concurrent review round execution.
//!
//! A round fans one document out to every worker in the cohort, each through
//! the strategy matching its dispatch kind, and collects one report per
//! worker in cohort order. Failures are isolated: a worker that exhausts its
//! retries contributes a failed report, never an aborted round.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::models::{
    Classification, Cohort, Document, DispatchKind, ResourceTier, RoundResult, WorkerReport,
    WorkerSpec,
};
use crate::domain::ports::{
    CompletionRequest, CompletionService, SearchFindings, SearchProvider, ToolRunner,
};
use crate::services::response::{extract_json, truncate_chars};
use crate::services::retry::RetryPolicy;
use crate::services::scheduler::Scheduler;

/// Sampling parameters shared by all worker calls.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 4096,
        }
    }
}

/// External backends a round may reach.
#[derive(Clone)]
pub struct RoundPorts {
    pub completion: Arc<dyn CompletionService>,
    pub tools: Arc<dyn ToolRunner>,
    pub web_search: Arc<dyn SearchProvider>,
    pub academic_search: Arc<dyn SearchProvider>,
}

/// Everything one round needs to know about the document under review.
#[derive(Debug, Clone)]
pub struct RoundContext {
    pub document: Arc<Document>,
    pub classification: Classification,
    pub iteration_index: u32,
    /// Per-capability prompt augmentations, e.g. peer feedback digests
    pub augmentations: HashMap<String, String>,
}

impl RoundContext {
    pub fn new(document: Arc<Document>, classification: Classification, iteration_index: u32) -> Self {
        Self {
            document,
            classification,
            iteration_index,
            augmentations: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_augmentations(mut self, augmentations: HashMap<String, String>) -> Self {
        self.augmentations = augmentations;
        self
    }
}

/// Owned per-worker input, self-contained so it can cross a task spawn.
#[derive(Debug, Clone)]
pub struct WorkerInput {
    pub capability: String,
    pub focus: String,
    pub category: String,
    pub language: Option<String>,
    pub document_text: String,
    pub document_version: u32,
    pub tier: ResourceTier,
    /// Peer feedback digest to fold into the prompt, when present
    pub peer_feedback: Option<String>,
    /// Seed text for search-augmented dispatch
    pub query: String,
    /// Variables exposed to sandboxed verification code
    pub context_vars: HashMap<String, String>,
}

/// One dispatch kind's way of producing a report.
///
/// Strategies are infallible by contract: every failure mode is folded into
/// the returned report so the round itself never aborts.
#[async_trait]
pub trait WorkerStrategy: Send + Sync {
    async fn analyze(&self, input: WorkerInput) -> WorkerReport;
}

const REPORT_SCHEMA: &str = r#"{
  "summary": "<one-paragraph assessment>",
  "comments": ["<specific observation about the document>"],
  "score": <quality score from 0 to 100>,
  "suggestions": ["<concrete, actionable improvement>"]
}"#;

const VERIFICATION_FIELD_HINT: &str = "You may additionally include a \"verification_code\" field \
holding a short Python snippet that checks one factual or numeric claim from the document. \
It runs in a restricted sandbox with the document excerpt available as `document_excerpt`.";

/// Render the full review prompt for one worker.
fn compose_prompt(
    input: &WorkerInput,
    verification_hint: bool,
    findings: Option<&SearchFindings>,
) -> String {
    let mut prompt = format!(
        "You are the {} reviewer for a document under iterative review.\n\
         Focus: {}\n\
         Document category: {}",
        input.capability, input.focus, input.category
    );
    if let Some(language) = &input.language {
        prompt.push_str(&format!(" (language: {language})"));
    }
    prompt.push_str("\n\n");

    if let Some(findings) = findings {
        prompt.push_str("SEARCH FINDINGS:\n");
        prompt.push_str(&findings.text);
        if !findings.citations.is_empty() {
            prompt.push_str("\nCitations:\n");
            for citation in &findings.citations {
                prompt.push_str(&format!("- {citation}\n"));
            }
        }
        prompt.push_str("\nWeigh these findings against the document where relevant.\n\n");
    }

    if let Some(feedback) = &input.peer_feedback {
        prompt.push_str("PEER FEEDBACK FROM THE PREVIOUS ROUND:\n");
        prompt.push_str(feedback);
        prompt.push_str("\nRevise your assessment where the feedback exposes something you missed.\n\n");
    }

    prompt.push_str(&format!(
        "Review the document below strictly through the lens of your focus.\n\
         Respond with ONLY a JSON object matching this schema, no additional text:\n{REPORT_SCHEMA}\n"
    ));
    if verification_hint {
        prompt.push_str(VERIFICATION_FIELD_HINT);
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        "\nDOCUMENT (version {}):\n{}",
        input.document_version, input.document_text
    ));
    prompt
}

/// Worker response shape. Every field is optional so a sparse but valid
/// JSON object still parses.
#[derive(Debug, Deserialize)]
struct RawWorkerReport {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    comments: Vec<String>,
    #[serde(default = "default_raw_score")]
    score: f64,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    verification_code: Option<String>,
}

fn default_raw_score() -> f64 {
    50.0
}

struct ParsedReport {
    report: WorkerReport,
    verification_code: Option<String>,
}

/// Parse a worker response, degrading to a plain-text report when the
/// response is not valid JSON.
fn parse_worker_report(capability: &str, response: &str) -> ParsedReport {
    match serde_json::from_str::<RawWorkerReport>(extract_json(response)) {
        Ok(raw) => ParsedReport {
            report: WorkerReport {
                name: capability.to_string(),
                summary: raw.summary,
                comments: raw.comments,
                score: raw.score,
                suggestions: raw.suggestions,
                error: None,
            },
            verification_code: raw
                .verification_code
                .filter(|code| !code.trim().is_empty()),
        },
        Err(e) => {
            debug!(
                capability,
                error = %e,
                "Worker response was not valid JSON, keeping it as plain text"
            );
            ParsedReport {
                report: WorkerReport::new(
                    capability,
                    truncate_chars(response.trim(), 400),
                    default_raw_score(),
                ),
                verification_code: None,
            }
        }
    }
}

/// Plain completion call, parse, done.
struct StandardStrategy {
    completion: Arc<dyn CompletionService>,
    retry: RetryPolicy,
    params: CompletionParams,
}

impl StandardStrategy {
    async fn complete(&self, input: &WorkerInput, prompt: String) -> Result<String, WorkerReport> {
        let request = CompletionRequest::new(prompt, input.tier)
            .with_temperature(self.params.temperature)
            .with_max_tokens(self.params.max_tokens);
        self.retry
            .complete_with_retry(self.completion.as_ref(), request)
            .await
            .map_err(|e| WorkerReport::failed(&input.capability, e.to_string()))
    }
}

#[async_trait]
impl WorkerStrategy for StandardStrategy {
    async fn analyze(&self, input: WorkerInput) -> WorkerReport {
        let prompt = compose_prompt(&input, false, None);
        match self.complete(&input, prompt).await {
            Ok(text) => parse_worker_report(&input.capability, &text).report,
            Err(failed) => failed,
        }
    }
}

/// Completion call that may hand back verification code for the sandbox.
///
/// Sandbox failures degrade to a comment on the report; only the completion
/// call itself can fail the worker.
struct ToolAugmentedStrategy {
    completion: Arc<dyn CompletionService>,
    tools: Arc<dyn ToolRunner>,
    retry: RetryPolicy,
    params: CompletionParams,
}

#[async_trait]
impl WorkerStrategy for ToolAugmentedStrategy {
    async fn analyze(&self, input: WorkerInput) -> WorkerReport {
        let prompt = compose_prompt(&input, true, None);
        let request = CompletionRequest::new(prompt, input.tier)
            .with_temperature(self.params.temperature)
            .with_max_tokens(self.params.max_tokens);
        let text = match self
            .retry
            .complete_with_retry(self.completion.as_ref(), request)
            .await
        {
            Ok(text) => text,
            Err(e) => return WorkerReport::failed(&input.capability, e.to_string()),
        };

        let parsed = parse_worker_report(&input.capability, &text);
        let mut report = parsed.report;
        if let Some(code) = parsed.verification_code {
            match self.tools.execute(&code, &input.context_vars).await {
                Ok(outcome) if outcome.success => {
                    report
                        .comments
                        .push(format!("Verification passed: {}", outcome.output));
                }
                Ok(outcome) => {
                    report
                        .comments
                        .push(format!("Verification failed: {}", outcome.output));
                }
                Err(e) => {
                    debug!(capability = %input.capability, error = %e, "Sandbox unavailable, skipping verification");
                    report
                        .comments
                        .push(format!("Verification skipped: {e}"));
                }
            }
        }
        report
    }
}

/// Search first, then complete with findings folded into the prompt.
///
/// Serves both web and academic dispatch; the provider and label differ.
/// A failed or timed-out search degrades the worker to an unaugmented
/// analysis rather than failing it.
struct SearchAugmentedStrategy {
    completion: Arc<dyn CompletionService>,
    provider: Arc<dyn SearchProvider>,
    source_label: &'static str,
    retry: RetryPolicy,
    params: CompletionParams,
}

#[async_trait]
impl WorkerStrategy for SearchAugmentedStrategy {
    async fn analyze(&self, input: WorkerInput) -> WorkerReport {
        let findings = match timeout(self.retry.call_timeout, self.provider.search(&input.query))
            .await
        {
            Ok(Ok(findings)) => Some(findings),
            Ok(Err(e)) => {
                warn!(
                    capability = %input.capability,
                    source = self.source_label,
                    error = %e,
                    "Search failed, continuing without findings"
                );
                None
            }
            Err(_) => {
                warn!(
                    capability = %input.capability,
                    source = self.source_label,
                    "Search timed out, continuing without findings"
                );
                None
            }
        };

        let prompt = compose_prompt(&input, false, findings.as_ref());
        let request = CompletionRequest::new(prompt, input.tier)
            .with_temperature(self.params.temperature)
            .with_max_tokens(self.params.max_tokens);
        match self
            .retry
            .complete_with_retry(self.completion.as_ref(), request)
            .await
        {
            Ok(text) => parse_worker_report(&input.capability, &text).report,
            Err(e) => WorkerReport::failed(&input.capability, e.to_string()),
        }
    }
}

/// Static mapping from dispatch kind to strategy.
#[derive(Clone)]
pub struct DispatchTable {
    standard: Arc<dyn WorkerStrategy>,
    tool_augmented: Arc<dyn WorkerStrategy>,
    search_augmented: Arc<dyn WorkerStrategy>,
    academic_augmented: Arc<dyn WorkerStrategy>,
}

impl DispatchTable {
    pub fn new(ports: &RoundPorts, retry: RetryPolicy, params: CompletionParams) -> Self {
        Self {
            standard: Arc::new(StandardStrategy {
                completion: ports.completion.clone(),
                retry: retry.clone(),
                params,
            }),
            tool_augmented: Arc::new(ToolAugmentedStrategy {
                completion: ports.completion.clone(),
                tools: ports.tools.clone(),
                retry: retry.clone(),
                params,
            }),
            search_augmented: Arc::new(SearchAugmentedStrategy {
                completion: ports.completion.clone(),
                provider: ports.web_search.clone(),
                source_label: "web",
                retry: retry.clone(),
                params,
            }),
            academic_augmented: Arc::new(SearchAugmentedStrategy {
                completion: ports.completion.clone(),
                provider: ports.academic_search.clone(),
                source_label: "academic",
                retry,
                params,
            }),
        }
    }

    pub fn get(&self, kind: DispatchKind) -> Arc<dyn WorkerStrategy> {
        match kind {
            DispatchKind::Standard => self.standard.clone(),
            DispatchKind::ToolAugmented => self.tool_augmented.clone(),
            DispatchKind::SearchAugmented => self.search_augmented.clone(),
            DispatchKind::AcademicAugmented => self.academic_augmented.clone(),
        }
    }
}

/// Runs whole cohorts concurrently.
#[derive(Clone)]
pub struct RoundExecutor {
    table: DispatchTable,
    scheduler: Scheduler,
}

impl RoundExecutor {
    pub fn new(
        ports: &RoundPorts,
        retry: RetryPolicy,
        params: CompletionParams,
        max_in_flight: Option<usize>,
    ) -> Self {
        Self {
            table: DispatchTable::new(ports, retry, params),
            scheduler: Scheduler::from_limit(max_in_flight),
        }
    }

    /// Execute one round and return reports in cohort order.
    pub async fn run_round(&self, cohort: &Cohort, ctx: &RoundContext) -> RoundResult {
        let mut handles = Vec::with_capacity(cohort.len());
        for spec in cohort {
            let strategy = self.table.get(spec.dispatch);
            let input = build_worker_input(spec, ctx);
            handles.push(
                self.scheduler
                    .submit(async move { strategy.analyze(input).await })
                    .await,
            );
        }

        let joined = Scheduler::join_all(handles).await;
        let reports = cohort
            .iter()
            .zip(joined)
            .map(|(spec, result)| match result {
                Ok(report) => report,
                Err(e) => WorkerReport::failed(&spec.capability, e.to_string()),
            })
            .collect();

        let round = RoundResult::new(reports);
        info!(
            iteration = ctx.iteration_index,
            document_version = ctx.document.version,
            cohort_size = cohort.len(),
            failed = round.failed_count(),
            "Review round completed"
        );
        round
    }
}

fn build_worker_input(spec: &WorkerSpec, ctx: &RoundContext) -> WorkerInput {
    let document = &ctx.document;
    let query = if document.meta.title.trim().is_empty() {
        truncate_chars(document.text.trim(), 160).to_string()
    } else {
        document.meta.title.clone()
    };

    let mut context_vars = HashMap::new();
    context_vars.insert(
        "document_excerpt".to_string(),
        document.excerpt(2000).to_string(),
    );
    context_vars.insert("document_title".to_string(), document.meta.title.clone());

    WorkerInput {
        capability: spec.capability.clone(),
        focus: spec.focus.clone(),
        category: ctx.classification.category.clone(),
        language: document.meta.language.clone(),
        document_text: document.text.clone(),
        document_version: document.version,
        tier: spec.resource_tier(ctx.classification.complexity),
        peer_feedback: ctx.augmentations.get(&spec.capability).cloned(),
        query,
        context_vars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(capability: &str) -> WorkerInput {
        WorkerInput {
            capability: capability.to_string(),
            focus: "test focus".to_string(),
            category: "technical".to_string(),
            language: None,
            document_text: "body".to_string(),
            document_version: 1,
            tier: ResourceTier::Basic,
            peer_feedback: None,
            query: "q".to_string(),
            context_vars: HashMap::new(),
        }
    }

    #[test]
    fn test_parse_full_report() {
        let response = r#"{
            "summary": "Solid draft",
            "comments": ["intro is long"],
            "score": 82,
            "suggestions": ["tighten the intro"],
            "verification_code": "print(1 + 1)"
        }"#;
        let parsed = parse_worker_report("clarity", response);
        assert_eq!(parsed.report.name, "clarity");
        assert_eq!(parsed.report.summary, "Solid draft");
        assert!((parsed.report.score - 82.0).abs() < f64::EPSILON);
        assert_eq!(parsed.verification_code.as_deref(), Some("print(1 + 1)"));
        assert!(!parsed.report.is_failed());
    }

    #[test]
    fn test_parse_sparse_report_fills_defaults() {
        let parsed = parse_worker_report("clarity", r#"{"summary": "ok"}"#);
        assert_eq!(parsed.report.summary, "ok");
        assert!((parsed.report.score - 50.0).abs() < f64::EPSILON);
        assert!(parsed.report.comments.is_empty());
        assert!(parsed.verification_code.is_none());
    }

    #[test]
    fn test_parse_non_json_degrades_to_plain_text() {
        let parsed = parse_worker_report("clarity", "The document reads well overall.");
        assert_eq!(parsed.report.summary, "The document reads well overall.");
        assert!((parsed.report.score - 50.0).abs() < f64::EPSILON);
        assert!(!parsed.report.is_failed());
    }

    #[test]
    fn test_blank_verification_code_is_dropped() {
        let parsed = parse_worker_report("depth", r#"{"summary": "x", "verification_code": "  "}"#);
        assert!(parsed.verification_code.is_none());
    }

    #[test]
    fn test_prompt_includes_findings_and_feedback() {
        let mut worker = input("currency");
        worker.peer_feedback = Some("accuracy scored this 40".to_string());
        let findings = SearchFindings::new("rust 1.84 released", vec!["blog.rust-lang.org".to_string()]);
        let prompt = compose_prompt(&worker, false, Some(&findings));
        assert!(prompt.contains("SEARCH FINDINGS:"));
        assert!(prompt.contains("rust 1.84 released"));
        assert!(prompt.contains("- blog.rust-lang.org"));
        assert!(prompt.contains("PEER FEEDBACK FROM THE PREVIOUS ROUND:"));
        assert!(prompt.contains("accuracy scored this 40"));
        assert!(prompt.contains("DOCUMENT (version 1):"));
    }

    #[test]
    fn test_prompt_verification_hint_only_for_tool_dispatch() {
        let worker = input("technical_depth");
        let plain = compose_prompt(&worker, false, None);
        let augmented = compose_prompt(&worker, true, None);
        assert!(!plain.contains("verification_code"));
        assert!(augmented.contains("verification_code"));
    }
}
