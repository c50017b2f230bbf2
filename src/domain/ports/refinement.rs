//! Refinement port - interface for the document rewriting collaborator.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::Document;

/// A refinement result: the next document version plus what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedDocument {
    /// New document version
    pub document: Document,
    /// Human-readable descriptions of the improvements applied
    pub improvements: Vec<String>,
}

/// Errors from the refinement collaborator.
#[derive(Debug, Error)]
pub enum RefinementError {
    #[error("Refinement backend failed: {0}")]
    Backend(String),

    #[error("Refinement produced no output")]
    EmptyOutput,
}

/// Trait for the document refinement collaborator.
#[async_trait]
pub trait RefinementService: Send + Sync {
    /// Produce the next version of a document from actionable feedback.
    ///
    /// `supplementary` carries the one-time user-supplied context collected
    /// before iteration 1, when present.
    async fn refine(
        &self,
        document: &Document,
        feedback: &str,
        supplementary: Option<&str>,
    ) -> Result<RefinedDocument, RefinementError>;
}
