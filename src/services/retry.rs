//! Retry policy for completion calls.
//!
//! Transient errors (rate limits, server errors, network failures,
//! timeouts) are retried with exponential backoff up to a fixed attempt
//! ceiling. Permanent errors fail immediately.

use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::domain::models::RetrySettings;
use crate::domain::ports::{CompletionError, CompletionRequest, CompletionService};

/// Timeout and backoff policy for one class of external calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first failed call
    pub max_retries: u32,
    /// Backoff before the first retry
    pub initial_backoff: Duration,
    /// Backoff ceiling
    pub max_backoff: Duration,
    /// Per-attempt timeout
    pub call_timeout: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
            call_timeout: Duration::from_secs(120),
        }
    }

    /// Build a policy from configuration.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            call_timeout: Duration::from_secs(settings.call_timeout_secs),
        }
    }

    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Exponential backoff for a 0-indexed attempt: `initial * 2^attempt`,
    /// capped at the ceiling.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let backoff_ms = self.initial_backoff.as_millis() * (2_u128.pow(attempt));
        #[allow(clippy::cast_possible_truncation)]
        Duration::from_millis(backoff_ms.min(self.max_backoff.as_millis()) as u64)
    }

    /// Run one completion under this policy.
    ///
    /// Each attempt gets its own timeout; a timeout counts as a transient
    /// error. Permanent errors and errors that are neither transient nor
    /// permanent fail immediately without retry.
    pub async fn complete_with_retry(
        &self,
        service: &dyn CompletionService,
        request: CompletionRequest,
    ) -> Result<String, CompletionError> {
        let mut attempt = 0;
        loop {
            let error = match timeout(self.call_timeout, service.complete(request.clone())).await {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(err)) => err,
                Err(_) => CompletionError::Timeout {
                    seconds: self.call_timeout.as_secs(),
                },
            };

            if !error.is_transient() || attempt >= self.max_retries {
                return Err(error);
            }

            let backoff = self.backoff_delay(attempt);
            warn!(
                attempt = attempt + 1,
                max_retries = self.max_retries,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Retrying completion call after transient error"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}
