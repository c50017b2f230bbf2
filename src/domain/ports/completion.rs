//! Completion port - interface for the text completion/classification backend.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::ResourceTier;

/// A single completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full prompt text
    pub prompt: String,
    /// Backend configuration class to use
    pub tier: ResourceTier,
    /// Sampling temperature
    pub temperature: f64,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, tier: ResourceTier) -> Self {
        Self {
            prompt: prompt.into(),
            tier,
            temperature: 0.0,
            max_tokens: 4096,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Errors from the completion backend, classified for retry decisions.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded - too many requests")]
    RateLimited,

    /// Server-side error (HTTP 5xx)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// The call did not complete within its budget
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Invalid request parameters (HTTP 400/404)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid or missing credentials (HTTP 401)
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Permission denied (HTTP 403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Response body did not match the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl CompletionError {
    /// Returns true if this error is transient and should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CompletionError::RateLimited
                | CompletionError::ServerError { .. }
                | CompletionError::Network(_)
                | CompletionError::Timeout { .. }
        )
    }

    /// Returns true if this is a permanent error that must not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            CompletionError::InvalidRequest(_)
                | CompletionError::AuthenticationFailed
                | CompletionError::Forbidden(_)
        )
    }
}

/// Trait for the opaque text-completion backend.
///
/// Covers every textual call the engine makes: classification, worker
/// analysis, scoring, and any substituted synthesis.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Run one completion and return the generated text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
