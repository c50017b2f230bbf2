//! Domain layer for the review engine.
//!
//! Core models, errors, and the ports the engine depends on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{EngineError, EngineResult, PersistenceError};
