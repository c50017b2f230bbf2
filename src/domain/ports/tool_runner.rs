//! Tool runner port - interface for sandboxed verification code execution.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Result of one sandboxed execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    /// Whether the code ran to completion
    pub success: bool,
    /// Captured output on success, error description otherwise
    pub output: String,
}

impl ToolOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Errors from the sandbox service itself, as opposed to failures of the
/// submitted code (which come back as a `ToolOutcome` with `success: false`).
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Sandbox unavailable: {0}")]
    Unavailable(String),

    #[error("Code rejected by sandbox policy: {0}")]
    Rejected(String),
}

/// Trait for the restricted code-execution sandbox.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Execute verification code with the given context variables.
    async fn execute(
        &self,
        code: &str,
        context_vars: &HashMap<String, String>,
    ) -> Result<ToolOutcome, ToolError>;
}
