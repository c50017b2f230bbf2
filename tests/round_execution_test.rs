//! Integration tests for round execution across dispatch kinds.
//!
//! Drives `RoundExecutor` and the pipeline review step through mock ports,
//! covering report ordering, per-worker failure isolation, tool and search
//! augmentation, and the peer feedback rerun.

mod common;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use conclave::domain::models::{Classification, Document, RunOptions};
use conclave::domain::ports::{CompletionError, CompletionService};
use conclave::services::{
    CapabilityRegistry, CohortBuilder, CompletionParams, RetryPolicy, RoundContext, RoundExecutor,
};

use common::{
    pipeline_with, round_ports, worker_json, worker_json_with, StaticSearch, StaticTools,
    StubCompletion,
};

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(0, Duration::from_millis(1), Duration::from_millis(2))
}

fn classification_with(suggested: &[&str]) -> Classification {
    Classification {
        category: "technical".to_string(),
        confidence: 0.9,
        complexity: 0.4,
        suggested_capabilities: suggested.iter().map(ToString::to_string).collect::<BTreeSet<_>>(),
    }
}

fn cohort_for(classification: &Classification) -> conclave::domain::models::Cohort {
    CohortBuilder::new(Arc::new(CapabilityRegistry::standard())).build(classification, false)
}

fn context(classification: Classification) -> RoundContext {
    let document = Document::new("Batching is described in section two.").with_title("Notes");
    RoundContext::new(Arc::new(document), classification, 1)
}

/// Extract the capability a worker prompt addresses.
fn capability_of(prompt: &str) -> Option<&str> {
    prompt
        .strip_prefix("You are the ")?
        .split(' ')
        .next()
}

#[tokio::test]
async fn test_reports_follow_cohort_order() {
    let classification = classification_with(&["terminology", "readability"]);
    let cohort = cohort_for(&classification);
    assert_eq!(cohort.len(), 5);

    let completion = Arc::new(StubCompletion::new(|request| {
        let score = match capability_of(&request.prompt) {
            Some("clarity") => 61.0,
            Some("structure") => 62.0,
            Some("accuracy") => 63.0,
            Some("terminology") => 64.0,
            Some("readability") => 65.0,
            other => panic!("unexpected worker prompt: {other:?}"),
        };
        Ok(worker_json(score))
    }));
    let executor = RoundExecutor::new(
        &round_ports(completion),
        fast_retry(),
        CompletionParams::default(),
        None,
    );

    let round = executor.run_round(&cohort, &context(classification)).await;

    let names: Vec<&str> = round.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        ["clarity", "structure", "accuracy", "terminology", "readability"]
    );
    let scores: Vec<f64> = round.iter().map(|r| r.score).collect();
    assert_eq!(scores, [61.0, 62.0, 63.0, 64.0, 65.0]);
}

#[tokio::test]
async fn test_failed_worker_does_not_poison_round() {
    let classification = classification_with(&["terminology", "readability"]);
    let cohort = cohort_for(&classification);
    assert_eq!(cohort.len(), 5);

    // The third worker exhausts its retries; the other four keep reporting.
    let completion = Arc::new(StubCompletion::new(|request| {
        if capability_of(&request.prompt) == Some("accuracy") {
            Err(CompletionError::InvalidRequest("prompt too long".to_string()))
        } else {
            Ok(worker_json(75.0))
        }
    }));
    let executor = RoundExecutor::new(
        &round_ports(completion),
        fast_retry(),
        CompletionParams::default(),
        None,
    );

    let round = executor.run_round(&cohort, &context(classification)).await;

    assert_eq!(round.len(), 5);
    assert_eq!(round.failed_count(), 1);
    let accuracy = round
        .iter()
        .find(|r| r.name == "accuracy")
        .expect("accuracy report present");
    assert!(accuracy.is_failed());
    assert!(round
        .iter()
        .filter(|r| r.name != "accuracy")
        .all(|r| !r.is_failed() && (r.score - 75.0).abs() < f64::EPSILON));
}

#[tokio::test]
async fn test_tool_dispatch_appends_verification_comment() {
    let classification = classification_with(&["technical_depth"]);
    let cohort = cohort_for(&classification);
    assert!(cohort.iter().any(|s| s.capability == "technical_depth"));

    let completion = Arc::new(StubCompletion::new(|request| {
        if capability_of(&request.prompt) == Some("technical_depth") {
            Ok(serde_json::json!({
                "summary": "Checked the arithmetic.",
                "comments": ["Throughput claim looks plausible."],
                "score": 72.0,
                "suggestions": [],
                "verification_code": "print(1000 * 60)",
            })
            .to_string())
        } else {
            Ok(worker_json(70.0))
        }
    }));
    let mut ports = round_ports(completion);
    ports.tools = Arc::new(StaticTools::passing("claim verified"));
    let executor = RoundExecutor::new(&ports, fast_retry(), CompletionParams::default(), None);

    let round = executor.run_round(&cohort, &context(classification)).await;

    let report = round
        .iter()
        .find(|r| r.name == "technical_depth")
        .expect("technical_depth report present");
    assert_eq!(
        report.comments.last().map(String::as_str),
        Some("Verification passed: claim verified")
    );
}

#[tokio::test]
async fn test_search_dispatch_folds_findings_into_prompt() {
    let classification = classification_with(&["currency"]);
    let cohort = cohort_for(&classification);

    let prompts = Arc::new(Mutex::new(Vec::<String>::new()));
    let captured = Arc::clone(&prompts);
    let completion = Arc::new(StubCompletion::new(move |request| {
        captured
            .lock()
            .expect("prompt capture lock poisoned")
            .push(request.prompt.clone());
        Ok(worker_json(70.0))
    }));
    let mut ports = round_ports(completion);
    ports.web_search = Arc::new(StaticSearch::with_findings(
        "The stable release shipped in December 2024.",
        vec!["https://releases.example.org/notes".to_string()],
    ));
    let executor = RoundExecutor::new(&ports, fast_retry(), CompletionParams::default(), None);

    let round = executor.run_round(&cohort, &context(classification)).await;
    assert_eq!(round.failed_count(), 0);

    let prompts = prompts.lock().expect("prompt capture lock poisoned");
    let currency_prompt = prompts
        .iter()
        .find(|p| capability_of(p) == Some("currency"))
        .expect("currency worker was prompted");
    assert!(currency_prompt.contains("SEARCH FINDINGS:"));
    assert!(currency_prompt.contains("The stable release shipped in December 2024."));
    assert!(currency_prompt.contains("https://releases.example.org/notes"));

    let clarity_prompt = prompts
        .iter()
        .find(|p| capability_of(p) == Some("clarity"))
        .expect("clarity worker was prompted");
    assert!(!clarity_prompt.contains("SEARCH FINDINGS:"));
}

#[tokio::test]
async fn test_verification_hint_reserved_for_tool_dispatch() {
    let classification = classification_with(&["technical_depth"]);
    let cohort = cohort_for(&classification);

    let prompts = Arc::new(Mutex::new(Vec::<String>::new()));
    let captured = Arc::clone(&prompts);
    let completion = Arc::new(StubCompletion::new(move |request| {
        captured
            .lock()
            .expect("prompt capture lock poisoned")
            .push(request.prompt.clone());
        Ok(worker_json(70.0))
    }));
    let executor = RoundExecutor::new(
        &round_ports(completion),
        fast_retry(),
        CompletionParams::default(),
        None,
    );

    executor.run_round(&cohort, &context(classification)).await;

    let prompts = prompts.lock().expect("prompt capture lock poisoned");
    for prompt in prompts.iter() {
        let hinted = prompt.contains("verification_code");
        match capability_of(prompt) {
            Some("technical_depth") => assert!(hinted),
            _ => assert!(!hinted),
        }
    }
}

#[tokio::test]
async fn test_feedback_round_replaces_first_round() {
    let completion = Arc::new(StubCompletion::new(|request| {
        let prompt = request.prompt.as_str();
        let capability = capability_of(prompt).expect("worker prompt");
        if prompt.contains("PEER FEEDBACK FROM THE PREVIOUS ROUND:") {
            // Reconsidered scores after seeing the other reviewers.
            assert!(
                !prompt.contains(&format!("{capability} finds a gap")),
                "peer digest must exclude the worker's own comments"
            );
            Ok(worker_json_with(80.0, &["Concern addressed."], &[]))
        } else {
            let comment = format!("{capability} finds a gap");
            Ok(worker_json_with(60.0, &[comment.as_str()], &["Tighten it."]))
        }
    }));
    let pipeline = pipeline_with(completion.clone());

    let classification = classification_with(&[]);
    let cohort = cohort_for(&classification);
    let ctx = context(classification);
    let options = RunOptions::default();
    assert!(options.feedback_enabled);

    let round = pipeline.run_review(&cohort, &ctx, &options).await;

    assert_eq!(round.len(), 3);
    assert!(round
        .iter()
        .all(|r| (r.score - 80.0).abs() < f64::EPSILON));
    // One first-pass call plus one feedback call per worker.
    assert_eq!(completion.calls(), 6);
}
