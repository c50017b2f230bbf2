//! Batch fan-out across documents.
//!
//! Runs a caller-supplied pipeline function over many documents with a
//! bounded number in flight. Document runs are fully isolated: one failing
//! (or panicking) run becomes a failed entry in the batch result and never
//! touches its neighbours.

use std::future::Future;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::EngineResult;
use crate::domain::models::Document;
use crate::services::scheduler::Scheduler;

/// Per-document outcome, in batch input order.
#[derive(Debug, Clone)]
pub struct DocumentResult<T> {
    pub document_id: Uuid,
    pub title: String,
    /// The pipeline's value, or a description of why this document failed
    pub outcome: Result<T, String>,
}

/// Aggregated result of one batch run.
#[derive(Debug, Clone)]
pub struct BatchResult<T> {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<DocumentResult<T>>,
}

/// Fans a pipeline out over documents with bounded concurrency.
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    max_concurrent: usize,
}

impl BatchCoordinator {
    /// A cap of 1 degenerates to strictly sequential processing.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run `pipeline_fn` for every document.
    ///
    /// Results come back in input order regardless of completion order.
    /// The returned counts always satisfy `successful + failed == total`.
    pub async fn run_batch<T, F, Fut>(
        &self,
        documents: Vec<Document>,
        pipeline_fn: F,
    ) -> BatchResult<T>
    where
        T: Send + 'static,
        F: Fn(Document) -> Fut,
        Fut: Future<Output = EngineResult<T>> + Send + 'static,
    {
        let scheduler = Scheduler::bounded(self.max_concurrent);
        let total = documents.len();
        info!(total, max_concurrent = self.max_concurrent, "Starting batch run");

        let mut identities = Vec::with_capacity(total);
        let mut handles = Vec::with_capacity(total);
        for document in documents {
            identities.push((document.id, document.meta.title.clone()));
            handles.push(scheduler.submit(pipeline_fn(document)).await);
        }

        let joined = Scheduler::join_all(handles).await;
        let mut results = Vec::with_capacity(total);
        let mut successful = 0;
        let mut failed = 0;
        for ((document_id, title), joined) in identities.into_iter().zip(joined) {
            let outcome = match joined {
                Ok(Ok(value)) => {
                    successful += 1;
                    Ok(value)
                }
                Ok(Err(e)) => {
                    warn!(document_id = %document_id, error = %e, "Document run failed");
                    failed += 1;
                    Err(e.to_string())
                }
                Err(e) => {
                    warn!(document_id = %document_id, error = %e, "Document run panicked");
                    failed += 1;
                    Err(e.to_string())
                }
            };
            results.push(DocumentResult {
                document_id,
                title,
                outcome,
            });
        }

        info!(total, successful, failed, "Batch run completed");
        BatchResult {
            total,
            successful,
            failed,
            results,
        }
    }
}
