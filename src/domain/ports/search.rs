//! Search port - interface for web and academic search backends.

use async_trait::async_trait;
use thiserror::Error;

/// Findings returned by a search backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchFindings {
    /// Synthesized findings text
    pub text: String,
    /// Source citations backing the findings
    pub citations: Vec<String>,
}

impl SearchFindings {
    pub fn new(text: impl Into<String>, citations: Vec<String>) -> Self {
        Self {
            text: text.into(),
            citations,
        }
    }
}

/// Errors from a search backend.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend unavailable: {0}")]
    Unavailable(String),

    #[error("Query rejected: {0}")]
    QueryRejected(String),
}

/// Trait for search backends.
///
/// Both web search (`search_augmented` workers) and academic search
/// (`academic_augmented` workers) implement this interface; the engine is
/// wired with one instance per dispatch kind.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one search and return findings with citations.
    async fn search(&self, query: &str) -> Result<SearchFindings, SearchError>;
}
