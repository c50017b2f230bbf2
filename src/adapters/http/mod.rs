//! HTTP backend adapters.

pub mod completion;

pub use completion::AnthropicCompletionService;
