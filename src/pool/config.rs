//! Configuration for the task pool.

use crate::core::{PoolError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of workers started by [`ThreadPool::start`](crate::ThreadPool::start)
pub const DEFAULT_INITIAL_WORKERS: usize = 4;
/// Default worker ceiling in elastic mode
pub const DEFAULT_MAX_WORKERS: usize = 100;
/// Default queue capacity
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1024;
/// Default idle time after which elastic workers above the initial count exit
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
/// Default time a submitter waits for queue space
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(1);
/// Default interval at which idle elastic workers re-check their idle time
pub const DEFAULT_IDLE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Worker sizing policy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    /// Constant worker count for the life of the pool
    #[default]
    Fixed,
    /// Grow under load up to `max_workers`, shrink back after idling
    Elastic,
}

impl std::fmt::Display for PoolMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolMode::Fixed => write!(f, "fixed"),
            PoolMode::Elastic => write!(f, "elastic"),
        }
    }
}

/// Configuration for a task pool
///
/// # Example
///
/// ```rust
/// use rust_task_pool::{PoolConfig, PoolMode};
/// use std::time::Duration;
///
/// let config = PoolConfig::new(2)
///     .with_mode(PoolMode::Elastic)
///     .with_max_workers(6)
///     .with_idle_timeout(Duration::from_secs(10));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Worker sizing policy
    pub mode: PoolMode,
    /// Workers started by `start()`, and the floor for elastic reclamation
    pub initial_workers: usize,
    /// Worker ceiling, only used in elastic mode
    pub max_workers: usize,
    /// Maximum number of queued tasks
    pub max_queue_size: usize,
    /// Idle time after which surplus elastic workers exit
    pub idle_timeout: Duration,
    /// How long `submit()` waits for queue space before rejecting
    pub submit_timeout: Duration,
    /// How often idle elastic workers wake to check their idle time
    pub idle_poll_interval: Duration,
    /// Thread name prefix
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            mode: PoolMode::Fixed,
            initial_workers: DEFAULT_INITIAL_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            idle_poll_interval: DEFAULT_IDLE_POLL_INTERVAL,
            thread_name_prefix: "pool-worker".to_string(),
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with the given initial worker count
    #[must_use]
    pub fn new(initial_workers: usize) -> Self {
        Self {
            initial_workers,
            ..Default::default()
        }
    }

    /// Set the worker sizing policy
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_mode(mut self, mode: PoolMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the worker ceiling
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set the maximum queue size
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Set how long surplus elastic workers may idle before exiting
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the admission wait for a full queue
    ///
    /// Submitters under sustained overload get a rejected future after this
    /// long instead of blocking indefinitely.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    /// Set how often idle elastic workers re-check their idle time.
    ///
    /// Shorter intervals reclaim workers closer to `idle_timeout` at the cost
    /// of more wakeups.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_idle_poll_interval(mut self, interval: Duration) -> Self {
        self.idle_poll_interval = interval;
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.initial_workers == 0 {
            return Err(PoolError::invalid_config(
                "initial_workers",
                "Initial worker count must be greater than 0",
            ));
        }
        if self.max_workers == 0 {
            return Err(PoolError::invalid_config(
                "max_workers",
                "Worker ceiling must be greater than 0",
            ));
        }
        // Fixed pools never grow, so the ceiling only binds in elastic mode.
        if self.mode == PoolMode::Elastic && self.initial_workers > self.max_workers {
            return Err(PoolError::invalid_config(
                "initial_workers",
                format!(
                    "Initial worker count {} exceeds the ceiling of {}",
                    self.initial_workers, self.max_workers
                ),
            ));
        }
        if self.max_queue_size == 0 {
            return Err(PoolError::invalid_config(
                "max_queue_size",
                "Queue size must be greater than 0",
            ));
        }
        if self.idle_timeout.is_zero() {
            return Err(PoolError::invalid_config(
                "idle_timeout",
                "Idle timeout must be non-zero",
            ));
        }
        if self.idle_poll_interval.is_zero() {
            return Err(PoolError::invalid_config(
                "idle_poll_interval",
                "Idle poll interval must be non-zero",
            ));
        }
        Ok(())
    }
}
