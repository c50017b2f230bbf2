//! Common test utilities for integration tests
//!
//! Mock port implementations and fixture builders shared across the
//! integration test files.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use conclave::domain::models::{Document, EngineConfig};
use conclave::domain::ports::{
    CompletionError, CompletionRequest, CompletionService, RefinedDocument, RefinementError,
    RefinementService, SearchError, SearchFindings, SearchProvider, ToolError, ToolOutcome,
    ToolRunner,
};
use conclave::application::AnalysisPipeline;
use conclave::services::RoundPorts;

type CompletionHandler =
    dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync;

/// Completion backend driven by a routing closure over the request.
pub struct StubCompletion {
    handler: Box<CompletionHandler>,
    calls: AtomicU32,
}

impl StubCompletion {
    pub fn new(
        handler: impl Fn(&CompletionRequest) -> Result<String, CompletionError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for StubCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.handler)(&request)
    }
}

/// Tool runner returning the same outcome for every execution.
pub struct StaticTools {
    pub outcome: ToolOutcome,
}

impl StaticTools {
    pub fn passing(output: impl Into<String>) -> Self {
        Self {
            outcome: ToolOutcome::success(output),
        }
    }
}

#[async_trait]
impl ToolRunner for StaticTools {
    async fn execute(
        &self,
        _code: &str,
        _context_vars: &std::collections::HashMap<String, String>,
    ) -> Result<ToolOutcome, ToolError> {
        Ok(self.outcome.clone())
    }
}

/// Tool runner for tests that must never reach the sandbox.
pub struct UnavailableTools;

#[async_trait]
impl ToolRunner for UnavailableTools {
    async fn execute(
        &self,
        _code: &str,
        _context_vars: &std::collections::HashMap<String, String>,
    ) -> Result<ToolOutcome, ToolError> {
        Err(ToolError::Unavailable("not wired in this test".to_string()))
    }
}

/// Search provider returning the same findings for every query.
pub struct StaticSearch {
    pub findings: SearchFindings,
}

impl StaticSearch {
    pub fn with_findings(text: impl Into<String>, citations: Vec<String>) -> Self {
        Self {
            findings: SearchFindings::new(text, citations),
        }
    }
}

#[async_trait]
impl SearchProvider for StaticSearch {
    async fn search(&self, _query: &str) -> Result<SearchFindings, SearchError> {
        Ok(self.findings.clone())
    }
}

/// Search provider for tests that must never reach a search backend.
pub struct UnavailableSearch;

#[async_trait]
impl SearchProvider for UnavailableSearch {
    async fn search(&self, _query: &str) -> Result<SearchFindings, SearchError> {
        Err(SearchError::Unavailable(
            "not wired in this test".to_string(),
        ))
    }
}

type RefinementStep = Result<(String, Vec<String>), RefinementError>;

/// Refinement collaborator that replays a scripted sequence of outcomes.
///
/// Each successful step supplies the next document text and the improvement
/// descriptions. An exhausted script fails every further call.
pub struct ScriptedRefiner {
    steps: Mutex<VecDeque<RefinementStep>>,
    calls: AtomicU32,
}

impl ScriptedRefiner {
    pub fn new(steps: Vec<RefinementStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: AtomicU32::new(0),
        }
    }

    /// Refiner whose every call fails.
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    /// Refiner that appends a revision note for each call, indefinitely.
    pub fn improving(rounds: u32) -> Self {
        let steps = (1..=rounds)
            .map(|n| {
                Ok((
                    format!("Revised draft, pass {n}."),
                    vec![format!("Applied revision {n}")],
                ))
            })
            .collect();
        Self::new(steps)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RefinementService for ScriptedRefiner {
    async fn refine(
        &self,
        document: &Document,
        _feedback: &str,
        _supplementary: Option<&str>,
    ) -> Result<RefinedDocument, RefinementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().expect("script lock poisoned").pop_front();
        match step {
            Some(Ok((text, improvements))) => Ok(RefinedDocument {
                document: document.refined(text),
                improvements,
            }),
            Some(Err(e)) => Err(e),
            None => Err(RefinementError::Backend(
                "refinement unavailable".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Response builders
// ---------------------------------------------------------------------------

pub fn classification_json(category: &str, complexity: f64, suggested: &[&str]) -> String {
    serde_json::json!({
        "category": category,
        "confidence": 0.9,
        "complexity": complexity,
        "suggested_capabilities": suggested,
    })
    .to_string()
}

pub fn worker_json(score: f64) -> String {
    worker_json_with(
        score,
        &["The argument in section two is underdeveloped."],
        &["Expand section two with an example."],
    )
}

pub fn worker_json_with(score: f64, comments: &[&str], suggestions: &[&str]) -> String {
    serde_json::json!({
        "summary": "Review finished.",
        "comments": comments,
        "score": score,
        "suggestions": suggestions,
    })
    .to_string()
}

pub fn score_json(overall: f64, critical: u32) -> String {
    serde_json::json!({
        "overall_score": overall,
        "dimension_scores": {"clarity": overall},
        "critical_issues": critical,
        "moderate_issues": 1,
        "minor_issues": 2,
        "strengths": ["Readable prose"],
        "weaknesses": ["Thin evidence"],
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// Wiring helpers
// ---------------------------------------------------------------------------

pub fn round_ports(completion: Arc<dyn CompletionService>) -> RoundPorts {
    RoundPorts {
        completion,
        tools: Arc::new(UnavailableTools),
        web_search: Arc::new(UnavailableSearch),
        academic_search: Arc::new(UnavailableSearch),
    }
}

pub fn pipeline_with(completion: Arc<dyn CompletionService>) -> AnalysisPipeline {
    AnalysisPipeline::from_ports(&round_ports(completion), &EngineConfig::default())
}

/// Completion stub that classifies every document as plain technical prose,
/// lets workers report a fixed score, and pops one `(overall, critical)`
/// pair from the queue per arbiter call.
pub fn scripted_engine(round_scores: Vec<(f64, u32)>) -> Arc<StubCompletion> {
    let scores = Mutex::new(round_scores.into_iter().collect::<VecDeque<_>>());
    Arc::new(StubCompletion::new(move |request| {
        let prompt = request.prompt.as_str();
        if prompt.starts_with("Classify the document") {
            Ok(classification_json("technical", 0.4, &[]))
        } else if prompt.contains("You are the quality arbiter") {
            let (overall, critical) = scores
                .lock()
                .expect("score queue lock poisoned")
                .pop_front()
                .unwrap_or((50.0, 0));
            Ok(score_json(overall, critical))
        } else {
            Ok(worker_json(70.0))
        }
    }))
}

pub fn sample_document() -> Document {
    Document::new(
        "The pipeline ingests records in batches of one thousand. \
         Each batch is validated before it reaches the store.",
    )
    .with_title("Ingestion notes")
}
