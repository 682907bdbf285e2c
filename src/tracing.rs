//! Tracing integration for observability.
//!
//! With the `tracing` feature enabled the pool opens a span per worker and
//! per task execution, and emits the metric events in [`metrics`]. The
//! [`TracedTask`] wrapper carries the submitter's span onto the worker thread.
//!
//! # Example
//!
//! ```rust,ignore
//! use rust_task_pool::prelude::*;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("rust_task_pool=debug".parse().unwrap()))
//!     .init();
//!
//! let pool = ThreadPool::with_workers(4)?;
//! pool.start()?;
//!
//! let _span = tracing::info_span!("request", id = 42).entered();
//! let future = pool.submit_traced(ClosureTask::new(|| "handled"));
//! ```

use crate::core::{Task, TypedBox};

/// A task wrapper that propagates tracing context across thread boundaries.
///
/// The span current at construction time is entered while the wrapped task
/// runs on its worker.
pub struct TracedTask<T: Task> {
    inner: T,
    #[cfg(feature = "tracing")]
    span: tracing::Span,
}

impl<T: Task> TracedTask<T> {
    /// Wrap `task`, capturing the current tracing span.
    pub fn new(task: T) -> Self {
        Self {
            inner: task,
            #[cfg(feature = "tracing")]
            span: tracing::Span::current(),
        }
    }

    /// Wrap `task` with a specific span.
    #[cfg(feature = "tracing")]
    pub fn with_span(task: T, span: tracing::Span) -> Self {
        Self { inner: task, span }
    }

    /// Unwrap the inner task.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Task> Task for TracedTask<T> {
    fn run(&mut self) -> TypedBox {
        #[cfg(feature = "tracing")]
        let _guard = self.span.enter();
        self.inner.run()
    }

    fn task_type(&self) -> &str {
        self.inner.task_type()
    }
}

/// Metric events for pool activity.
///
/// Field names follow the `counter.` / `gauge.` / `histogram.` convention
/// understood by tracing-to-metrics bridges.
#[cfg(feature = "tracing")]
pub mod metrics {
    use crate::pool::WorkerId;
    use std::time::Duration;

    /// Records an accepted submission.
    #[inline]
    pub fn record_submission(queue_depth: usize) {
        tracing::trace!(
            counter.tasks_submitted = 1,
            gauge.queue_depth = queue_depth as i64,
            "task submitted"
        );
    }

    /// Records a submission rejected because the queue stayed full.
    #[inline]
    pub fn record_rejection(queue_depth: usize) {
        tracing::debug!(
            counter.tasks_rejected = 1,
            gauge.queue_depth = queue_depth as i64,
            "task rejected"
        );
    }

    /// Records a completed task with its run and queue times.
    #[inline]
    pub fn record_completion(duration: Duration, queued_for: Duration) {
        tracing::trace!(
            counter.tasks_completed = 1,
            histogram.task_duration_ms = duration.as_millis() as u64,
            histogram.queue_wait_ms = queued_for.as_millis() as u64,
            "task completed"
        );
    }

    /// Records a task panic.
    #[inline]
    pub fn record_panic(duration: Duration) {
        tracing::trace!(
            counter.tasks_panicked = 1,
            histogram.task_duration_ms = duration.as_millis() as u64,
            "task panicked"
        );
    }

    /// Records an elastic worker exiting after idling.
    #[inline]
    pub fn record_worker_reclaimed(worker_id: WorkerId, remaining: usize) {
        tracing::debug!(
            counter.workers_reclaimed = 1,
            gauge.workers = remaining as i64,
            worker_id = worker_id,
            "worker reclaimed"
        );
    }

    /// Records pool startup.
    #[inline]
    pub fn record_pool_start(num_workers: usize, mode: &str) {
        tracing::info!(workers = num_workers, mode = mode, "task pool started");
    }

    /// Records pool shutdown.
    #[inline]
    pub fn record_pool_shutdown(tasks_completed: u64, tasks_panicked: u64) {
        tracing::info!(
            tasks_completed = tasks_completed,
            tasks_panicked = tasks_panicked,
            "task pool shutdown complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClosureTask;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_traced_task_runs_inner() {
        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = executed.clone();

        let task = ClosureTask::new(move || {
            executed_clone.store(true, Ordering::SeqCst);
            42u16
        });

        let mut traced = TracedTask::new(task);
        assert_eq!(traced.run().cast::<u16>(), 42);
        assert!(executed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_traced_task_preserves_task_type() {
        let task = ClosureTask::with_name(|| (), "Indexer");
        let traced = TracedTask::new(task);

        assert_eq!(traced.task_type(), "Indexer");
        assert_eq!(traced.into_inner().task_type(), "Indexer");
    }
}
