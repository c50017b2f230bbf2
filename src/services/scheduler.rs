//! Bounded task scheduling.
//!
//! Thin wrapper over `tokio::spawn` that optionally caps in-flight tasks
//! with a semaphore and always returns results in submission order, no
//! matter which task finishes first.

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Scheduling failures surfaced per task.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The spawned task panicked or was aborted before completing.
    #[error("Task panicked: {0}")]
    Panicked(String),
}

/// Handle to a submitted task, retaining submission order.
pub struct TaskHandle<T> {
    inner: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    async fn join(self) -> Result<T, SchedulerError> {
        self.inner
            .await
            .map_err(|e| SchedulerError::Panicked(e.to_string()))
    }
}

/// Spawns futures with an optional concurrency cap.
///
/// When bounded, `submit` waits for a permit before spawning, so callers
/// that submit in a loop get backpressure for free. The permit is released
/// when the task finishes.
#[derive(Debug, Clone)]
pub struct Scheduler {
    permits: Option<Arc<Semaphore>>,
}

impl Scheduler {
    /// Scheduler with no concurrency cap.
    pub fn unbounded() -> Self {
        Self { permits: None }
    }

    /// Scheduler allowing at most `max_in_flight` tasks at once.
    ///
    /// A cap of zero would deadlock the first submit, so it is bumped to 1.
    pub fn bounded(max_in_flight: usize) -> Self {
        Self {
            permits: Some(Arc::new(Semaphore::new(max_in_flight.max(1)))),
        }
    }

    /// Bounded when a limit is given, unbounded otherwise.
    pub fn from_limit(max_in_flight: Option<usize>) -> Self {
        match max_in_flight {
            Some(limit) => Self::bounded(limit),
            None => Self::unbounded(),
        }
    }

    /// Spawn a task, waiting for a permit first when bounded.
    pub async fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = match &self.permits {
            // acquire() only fails when the semaphore is closed, which we
            // never do, so a None permit just means "run unthrottled".
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        };

        let inner = tokio::spawn(async move {
            let _permit = permit;
            task.await
        });

        TaskHandle { inner }
    }

    /// Await all handles, preserving submission order.
    pub async fn join_all<T>(handles: Vec<TaskHandle<T>>) -> Vec<Result<T, SchedulerError>> {
        futures::future::join_all(handles.into_iter().map(TaskHandle::join)).await
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_follow_submission_order() {
        let scheduler = Scheduler::unbounded();
        let mut handles = Vec::new();

        // Later submissions finish first
        for (index, delay_ms) in [(0_usize, 30_u64), (1, 20), (2, 10)] {
            handles.push(
                scheduler
                    .submit(async move {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        index
                    })
                    .await,
            );
        }

        let results = Scheduler::join_all(handles).await;
        let values: Vec<usize> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_bounded_scheduler_caps_in_flight_tasks() {
        let scheduler = Scheduler::bounded(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..6 {
            let active = active.clone();
            let peak = peak.clone();
            handles.push(
                scheduler
                    .submit(async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await,
            );
        }

        let results = Scheduler::join_all(handles).await;
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(Result::is_ok));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_panicked_task_reports_error_without_poisoning_others() {
        let scheduler = Scheduler::unbounded();
        let ok = scheduler.submit(async { 7 }).await;
        let bad: TaskHandle<i32> = scheduler.submit(async { panic!("boom") }).await;
        let also_ok = scheduler.submit(async { 9 }).await;

        let results = Scheduler::join_all(vec![ok, bad, also_ok]).await;
        assert_eq!(results.len(), 3);
        assert_eq!(*results[0].as_ref().unwrap(), 7);
        assert!(matches!(results[1], Err(SchedulerError::Panicked(_))));
        assert_eq!(*results[2].as_ref().unwrap(), 9);
    }

    #[tokio::test]
    async fn test_join_all_on_no_handles_is_empty() {
        let results = Scheduler::join_all(Vec::<TaskHandle<()>>::new()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_zero_cap_is_bumped_to_one() {
        let scheduler = Scheduler::bounded(0);
        let handle = scheduler.submit(async { 42 }).await;
        let results = Scheduler::join_all(vec![handle]).await;
        assert_eq!(*results[0].as_ref().unwrap(), 42);
    }
}
