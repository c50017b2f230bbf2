//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces the engine depends on. Implementations live in
//! the adapters layer or in the embedding application; the engine only
//! ever sees these traits:
//! - `CompletionService`: the text completion/classification backend
//! - `ToolRunner`: sandboxed verification code execution
//! - `SearchProvider`: web and academic search backends
//! - `RefinementService`: the document rewriting collaborator
//! - `CheckpointStore`: durable pause/resume and iteration history

pub mod checkpoint_store;
pub mod completion;
pub mod refinement;
pub mod search;
pub mod tool_runner;

pub use checkpoint_store::CheckpointStore;
pub use completion::{CompletionError, CompletionRequest, CompletionService};
pub use refinement::{RefinedDocument, RefinementError, RefinementService};
pub use search::{SearchError, SearchFindings, SearchProvider};
pub use tool_runner::{ToolError, ToolOutcome, ToolRunner};
