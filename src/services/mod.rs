pub mod classifier;
pub mod cohort;
pub mod feedback;
pub mod registry;
pub(crate) mod response;
pub mod retry;
pub mod round;
pub mod scheduler;
pub mod scoring;

pub use classifier::Classifier;
pub use cohort::CohortBuilder;
pub use feedback::FeedbackRound;
pub use registry::CapabilityRegistry;
pub use retry::RetryPolicy;
pub use round::{CompletionParams, RoundContext, RoundExecutor, RoundPorts, WorkerStrategy};
pub use scheduler::{Scheduler, SchedulerError, TaskHandle};
pub use scoring::{global_confidence, synthesize_round, ScoringService};
