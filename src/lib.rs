//! Conclave - Multi-Specialist Document Review Engine
//!
//! Conclave runs a document past a cohort of specialist reviewers, feeds
//! their findings back to each other, scores the round with an arbiter, and
//! iterates refinement until the score converges. Runs checkpoint at every
//! phase boundary so they can pause and resume without repeating work.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, error taxonomy, and the port traits
//!   the engine depends on
//! - **Service Layer** (`services`): Classification, cohort selection, round
//!   execution, feedback, and scoring
//! - **Application Layer** (`application`): Single-pass analysis, the
//!   iterative convergence loop, and batch fan-out
//! - **Adapters Layer** (`adapters`): SQLite checkpoint store and the
//!   Anthropic completion backend
//! - **Infrastructure Layer** (`infrastructure`): Configuration loading and
//!   logging setup
//!
//! # Example
//!
//! ```ignore
//! use conclave::application::ConvergenceLoop;
//! use conclave::domain::models::{Document, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let document = Document::new("Draft under review...");
//!     let outcome = convergence_loop
//!         .run_iterative(document, RunOptions::default())
//!         .await?;
//!     println!("stopped: {:?}", outcome.stop_reason());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{
    AnalysisPipeline, BatchCoordinator, BatchResult, ConvergenceLoop, DocumentResult,
    IterativeOutcome, Report,
};
pub use domain::errors::{EngineError, EngineResult, PersistenceError};
pub use domain::models::{
    Classification, Cohort, Document, EngineConfig, IterationRecord, QualityScore, RoundResult,
    RunOptions, StopReason, WorkerReport, WorkerSpec,
};
pub use domain::ports::{
    CheckpointStore, CompletionService, RefinementService, SearchProvider, ToolRunner,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CapabilityRegistry, RetryPolicy, RoundPorts};
