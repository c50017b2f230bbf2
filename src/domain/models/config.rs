//! Engine configuration model.
//!
//! All settings carry serde defaults so a partial YAML file or environment
//! override merges cleanly over the programmatic defaults.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Convergence loop and round settings
    #[serde(default)]
    pub engine: EngineSettings,

    /// Retry and timeout policy for external calls
    #[serde(default)]
    pub retry: RetrySettings,

    /// Completion backend settings
    #[serde(default)]
    pub completion: CompletionSettings,

    /// Checkpoint database settings
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Batch fan-out settings
    #[serde(default)]
    pub batch: BatchSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            retry: RetrySettings::default(),
            completion: CompletionSettings::default(),
            database: DatabaseSettings::default(),
            logging: LoggingSettings::default(),
            batch: BatchSettings::default(),
        }
    }
}

/// Convergence loop and round execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineSettings {
    /// Overall score that, with zero critical issues, stops the run
    #[serde(default = "default_target_score")]
    pub target_score: f64,

    /// Hard iteration budget per document
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Minimum score improvement between iterations before a plateau stop
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Whether tier-3 workers may join cohorts
    #[serde(default)]
    pub deep_mode: bool,

    /// Whether the peer feedback round runs after the first round
    #[serde(default = "default_feedback_enabled")]
    pub feedback_enabled: bool,

    /// Maximum number of feedback reruns per iteration
    #[serde(default = "default_feedback_max_rounds")]
    pub feedback_max_rounds: u32,

    /// Cap on concurrent worker calls within a round; `None` means up to
    /// cohort size
    #[serde(default)]
    pub max_in_flight: Option<usize>,

    /// Character budget for the classifier excerpt
    #[serde(default = "default_excerpt_chars")]
    pub classifier_excerpt_chars: usize,

    /// Cap on deduplicated suggestions in the synthesis text
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
}

const fn default_target_score() -> f64 {
    85.0
}

const fn default_max_iterations() -> u32 {
    5
}

const fn default_epsilon() -> f64 {
    1.0
}

const fn default_feedback_enabled() -> bool {
    true
}

const fn default_feedback_max_rounds() -> u32 {
    1
}

const fn default_excerpt_chars() -> usize {
    4000
}

const fn default_max_suggestions() -> usize {
    10
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            target_score: default_target_score(),
            max_iterations: default_max_iterations(),
            epsilon: default_epsilon(),
            deep_mode: false,
            feedback_enabled: default_feedback_enabled(),
            feedback_max_rounds: default_feedback_max_rounds(),
            max_in_flight: None,
            classifier_excerpt_chars: default_excerpt_chars(),
            max_suggestions: default_max_suggestions(),
        }
    }
}

/// Retry and timeout policy for external calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetrySettings {
    /// Additional attempts after the first failed call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry, in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling, in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Per-call timeout, in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_call_timeout_secs() -> u64 {
    120
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

/// Completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletionSettings {
    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key; required when the HTTP adapter is used
    #[serde(default)]
    pub api_key: String,

    /// Model for basic-tier calls
    #[serde(default = "default_model_basic")]
    pub model_basic: String,

    /// Model for standard-tier calls
    #[serde(default = "default_model_standard")]
    pub model_standard: String,

    /// Model for powerful-tier calls
    #[serde(default = "default_model_powerful")]
    pub model_powerful: String,

    /// Max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for worker calls
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model_basic() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_model_standard() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_model_powerful() -> String {
    "claude-opus-4-20250514".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_temperature() -> f64 {
    0.3
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            model_basic: default_model_basic(),
            model_standard: default_model_standard(),
            model_powerful: default_model_powerful(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Checkpoint database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseSettings {
    /// Path to the `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum pool connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".conclave/conclave.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Batch fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchSettings {
    /// Documents processed concurrently; 1 means sequential
    #[serde(default = "default_batch_max_concurrent")]
    pub max_concurrent: usize,
}

const fn default_batch_max_concurrent() -> usize {
    2
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent: default_batch_max_concurrent(),
        }
    }
}

/// Per-run options for the caller-facing boundaries.
///
/// A value of this type configures one `analyze` or iterative run. Derived
/// from `EngineSettings` with room for per-run overrides, including the
/// one-time supplementary information collected before iteration 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    /// Overall score that, with zero critical issues, stops the run
    pub target_score: f64,
    /// Hard iteration budget
    pub max_iterations: u32,
    /// Minimum improvement before a plateau stop
    pub epsilon: f64,
    /// Whether tier-3 workers may join cohorts
    pub deep_mode: bool,
    /// Whether the peer feedback round runs
    pub feedback_enabled: bool,
    /// Maximum feedback reruns per iteration
    pub feedback_max_rounds: u32,
    /// One-time user-supplied context forwarded to every refinement call
    pub supplementary_info: Option<String>,
}

impl RunOptions {
    /// Set the target score.
    #[must_use]
    pub fn with_target_score(mut self, target_score: f64) -> Self {
        self.target_score = target_score;
        self
    }

    /// Set the iteration budget.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the plateau epsilon.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Enable or disable deep mode.
    #[must_use]
    pub fn with_deep_mode(mut self, deep_mode: bool) -> Self {
        self.deep_mode = deep_mode;
        self
    }

    /// Enable or disable the feedback round.
    #[must_use]
    pub fn with_feedback(mut self, enabled: bool) -> Self {
        self.feedback_enabled = enabled;
        self
    }

    /// Attach supplementary information for refinement calls.
    #[must_use]
    pub fn with_supplementary_info(mut self, info: impl Into<String>) -> Self {
        self.supplementary_info = Some(info.into());
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for RunOptions {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            target_score: settings.target_score,
            max_iterations: settings.max_iterations,
            epsilon: settings.epsilon,
            deep_mode: settings.deep_mode,
            feedback_enabled: settings.feedback_enabled,
            feedback_max_rounds: settings.feedback_max_rounds,
            supplementary_info: None,
        }
    }
}
