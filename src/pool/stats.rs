//! Pool-wide statistics.
//!
//! [`PoolCounters`] is updated by submitters and workers without taking the
//! pool lock; [`PoolStats`] is a point-in-time snapshot of it combined with
//! the pool's current sizes.

use crate::pool::config::PoolMode;
use chrono::{DateTime, Utc};
use crossbeam_utils::CachePadded;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Lock-free counters shared by the pool and its workers
#[derive(Debug, Default)]
pub struct PoolCounters {
    tasks_submitted: CachePadded<AtomicU64>,
    tasks_rejected: AtomicU64,
    tasks_completed: CachePadded<AtomicU64>,
    tasks_panicked: AtomicU64,
    tasks_abandoned: AtomicU64,
    workers_spawned: AtomicU64,
    workers_reclaimed: AtomicU64,
    peak_workers: AtomicUsize,
    busy_time_us: CachePadded<AtomicU64>,
}

impl PoolCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted submission
    pub fn record_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected submission
    pub fn record_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a task that ran to completion
    pub fn record_completed(&self, elapsed: Duration) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        self.add_busy_time(elapsed);
    }

    /// Record a task that panicked
    pub fn record_panicked(&self, elapsed: Duration) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
        self.add_busy_time(elapsed);
    }

    /// Record queued tasks discarded at shutdown
    pub fn record_abandoned(&self, count: usize) {
        self.tasks_abandoned
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a worker spawn and the resulting worker count
    pub fn record_worker_spawned(&self, current_workers: usize) {
        self.workers_spawned.fetch_add(1, Ordering::Relaxed);
        self.peak_workers
            .fetch_max(current_workers, Ordering::Relaxed);
    }

    /// Record an elastic worker exiting after idling
    pub fn record_worker_reclaimed(&self) {
        self.workers_reclaimed.fetch_add(1, Ordering::Relaxed);
    }

    fn add_busy_time(&self, elapsed: Duration) {
        self.busy_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// Total accepted submissions
    pub fn tasks_submitted(&self) -> u64 {
        self.tasks_submitted.load(Ordering::Relaxed)
    }

    /// Total rejected submissions
    pub fn tasks_rejected(&self) -> u64 {
        self.tasks_rejected.load(Ordering::Relaxed)
    }

    /// Total completed tasks
    pub fn tasks_completed(&self) -> u64 {
        self.tasks_completed.load(Ordering::Relaxed)
    }

    /// Total panicked tasks
    pub fn tasks_panicked(&self) -> u64 {
        self.tasks_panicked.load(Ordering::Relaxed)
    }

    /// Total tasks discarded at shutdown
    pub fn tasks_abandoned(&self) -> u64 {
        self.tasks_abandoned.load(Ordering::Relaxed)
    }

    /// Total workers spawned
    pub fn workers_spawned(&self) -> u64 {
        self.workers_spawned.load(Ordering::Relaxed)
    }

    /// Total workers reclaimed after idling
    pub fn workers_reclaimed(&self) -> u64 {
        self.workers_reclaimed.load(Ordering::Relaxed)
    }

    /// Highest worker count observed
    pub fn peak_workers(&self) -> usize {
        self.peak_workers.load(Ordering::Relaxed)
    }

    /// Total time spent running tasks
    pub fn busy_time(&self) -> Duration {
        Duration::from_micros(self.busy_time_us.load(Ordering::Relaxed))
    }
}

/// Snapshot of a pool's sizes and counters
#[derive(Clone, Debug, Serialize)]
pub struct PoolStats {
    /// Worker sizing policy
    pub mode: PoolMode,
    /// Whether the pool was running when the snapshot was taken
    pub running: bool,
    /// When the pool was last started
    pub started_at: Option<DateTime<Utc>>,
    /// Live workers
    pub current_workers: usize,
    /// Live workers waiting for tasks
    pub idle_workers: usize,
    /// Tasks waiting in the queue
    pub queued_tasks: usize,
    /// Highest worker count observed
    pub peak_workers: usize,
    /// Accepted submissions
    pub tasks_submitted: u64,
    /// Rejected submissions
    pub tasks_rejected: u64,
    /// Tasks that ran to completion
    pub tasks_completed: u64,
    /// Tasks that panicked
    pub tasks_panicked: u64,
    /// Queued tasks discarded at shutdown
    pub tasks_abandoned: u64,
    /// Workers spawned since creation
    pub workers_spawned: u64,
    /// Elastic workers that exited after idling
    pub workers_reclaimed: u64,
    /// Total time spent running tasks
    pub busy_time: Duration,
}

impl PoolStats {
    /// Tasks that have finished running, successfully or not
    pub fn tasks_finished(&self) -> u64 {
        self.tasks_completed + self.tasks_panicked
    }

    /// Share of submissions that were rejected, as a percentage (0.0 to 100.0)
    pub fn rejection_rate(&self) -> f64 {
        let attempts = self.tasks_submitted + self.tasks_rejected;
        if attempts == 0 {
            0.0
        } else {
            (self.tasks_rejected as f64 / attempts as f64) * 100.0
        }
    }

    /// Average run time of finished tasks
    pub fn average_task_time(&self) -> Duration {
        match self.tasks_finished() {
            0 => Duration::ZERO,
            finished => self.busy_time / finished as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(counters: &PoolCounters) -> PoolStats {
        PoolStats {
            mode: PoolMode::Fixed,
            running: true,
            started_at: None,
            current_workers: 4,
            idle_workers: 4,
            queued_tasks: 0,
            peak_workers: counters.peak_workers(),
            tasks_submitted: counters.tasks_submitted(),
            tasks_rejected: counters.tasks_rejected(),
            tasks_completed: counters.tasks_completed(),
            tasks_panicked: counters.tasks_panicked(),
            tasks_abandoned: counters.tasks_abandoned(),
            workers_spawned: counters.workers_spawned(),
            workers_reclaimed: counters.workers_reclaimed(),
            busy_time: counters.busy_time(),
        }
    }

    #[test]
    fn test_counters() {
        let counters = PoolCounters::new();
        counters.record_submitted();
        counters.record_submitted();
        counters.record_submitted();
        counters.record_rejected();
        counters.record_completed(Duration::from_millis(10));
        counters.record_panicked(Duration::from_millis(30));
        counters.record_abandoned(1);

        assert_eq!(counters.tasks_submitted(), 3);
        assert_eq!(counters.tasks_rejected(), 1);
        assert_eq!(counters.tasks_completed(), 1);
        assert_eq!(counters.tasks_panicked(), 1);
        assert_eq!(counters.tasks_abandoned(), 1);
        assert_eq!(counters.busy_time(), Duration::from_millis(40));
    }

    #[test]
    fn test_peak_workers_only_grows() {
        let counters = PoolCounters::new();
        counters.record_worker_spawned(1);
        counters.record_worker_spawned(5);
        counters.record_worker_spawned(3);

        assert_eq!(counters.workers_spawned(), 3);
        assert_eq!(counters.peak_workers(), 5);
    }

    #[test]
    fn test_derived_rates() {
        let counters = PoolCounters::new();
        for _ in 0..3 {
            counters.record_submitted();
        }
        counters.record_rejected();
        counters.record_completed(Duration::from_millis(10));
        counters.record_completed(Duration::from_millis(30));

        let stats = snapshot(&counters);
        assert_eq!(stats.tasks_finished(), 2);
        assert!((stats.rejection_rate() - 25.0).abs() < f64::EPSILON);
        assert_eq!(stats.average_task_time(), Duration::from_millis(20));
    }

    #[test]
    fn test_empty_stats() {
        let stats = snapshot(&PoolCounters::new());
        assert_eq!(stats.rejection_rate(), 0.0);
        assert_eq!(stats.average_task_time(), Duration::ZERO);
    }
}
