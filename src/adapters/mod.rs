//! Infrastructure adapters for external systems.

pub mod http;
pub mod memory;
pub mod sqlite;

pub use http::AnthropicCompletionService;
pub use memory::MemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;
