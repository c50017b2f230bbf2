pub mod batch;
pub mod convergence;
pub mod pipeline;

pub use batch::{BatchCoordinator, BatchResult, DocumentResult};
pub use convergence::{ConvergenceLoop, IterativeOutcome};
pub use pipeline::{AnalysisPipeline, Report};
