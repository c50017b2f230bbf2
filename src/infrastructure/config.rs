//! Hierarchical configuration loading.
//!
//! Defaults merge under `.conclave/config.yaml`, then `.conclave/local.yaml`,
//! then `CONCLAVE_*` environment variables. Configuration is project-local so
//! several engines on one machine can run with different settings.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::EngineConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid target_score: {0}. Must be between 0 and 100")]
    InvalidTargetScore(f64),

    #[error("Invalid max_iterations: 0. Must be at least 1")]
    InvalidMaxIterations,

    #[error("Invalid epsilon: {0}. Must be non-negative")]
    InvalidEpsilon(f64),

    #[error("Invalid max_in_flight: 0. Must be at least 1 when set")]
    InvalidMaxInFlight,

    #[error("Invalid max_tokens: 0. Must be at least 1")]
    InvalidMaxTokens,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid batch max_concurrent: {0}. Must be at least 1")]
    InvalidMaxConcurrent(usize),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .conclave/config.yaml (project config)
    /// 3. .conclave/local.yaml (project local overrides, optional)
    /// 4. Environment variables (`CONCLAVE_*` prefix, highest priority)
    pub fn load() -> Result<EngineConfig> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Yaml::file(".conclave/config.yaml"))
            .merge(Yaml::file(".conclave/local.yaml"))
            .merge(Env::prefixed("CONCLAVE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<EngineConfig> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&config.engine.target_score) {
            return Err(ConfigError::InvalidTargetScore(config.engine.target_score));
        }

        if config.engine.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations);
        }

        if config.engine.epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(config.engine.epsilon));
        }

        if config.engine.max_in_flight == Some(0) {
            return Err(ConfigError::InvalidMaxInFlight);
        }

        if config.completion.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens);
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if config.batch.max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent(
                config.batch.max_concurrent,
            ));
        }

        Ok(())
    }
}
