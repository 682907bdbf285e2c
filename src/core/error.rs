//! Error types for the task pool

/// Result type for task pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur in the task pool
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// Pool is already running
    #[error("Task pool '{pool_name}' is already running with {worker_count} workers")]
    AlreadyRunning {
        /// Thread name prefix of the pool
        pool_name: String,
        /// Number of live worker threads
        worker_count: usize,
    },

    /// Pool is not running
    #[error("Task pool '{pool_name}' is not running")]
    NotRunning {
        /// Thread name prefix of the pool
        pool_name: String,
    },

    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker thread #{worker_id}: {message}")]
    SpawnError {
        /// ID of the worker that failed to spawn
        worker_id: usize,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// The queue stayed full for the whole admission wait
    #[error("Task submission timed out after {timeout_ms}ms: queue is full ({capacity} tasks)")]
    SubmissionTimeout {
        /// Admission wait in milliseconds
        timeout_ms: u64,
        /// Configured queue capacity
        capacity: usize,
    },

    /// The task body panicked on a worker
    #[error("Task #{task_id} ({task_type}) panicked: {message}")]
    TaskPanicked {
        /// ID of the task
        task_id: u64,
        /// Type name reported by the task
        task_type: String,
        /// Panic payload rendered as text
        message: String,
    },

    /// The task was still queued when the pool stopped
    #[error("Task #{task_id} was discarded before it could run")]
    TaskAbandoned {
        /// ID of the task
        task_id: u64,
    },

    /// Invalid configuration value
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// General error
    #[error("{0}")]
    Other(String),
}

impl PoolError {
    /// Create an already running error
    pub fn already_running(pool_name: impl Into<String>, worker_count: usize) -> Self {
        PoolError::AlreadyRunning {
            pool_name: pool_name.into(),
            worker_count,
        }
    }

    /// Create a not running error
    pub fn not_running(pool_name: impl Into<String>) -> Self {
        PoolError::NotRunning {
            pool_name: pool_name.into(),
        }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        worker_id: usize,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        PoolError::SpawnError {
            worker_id,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a submission timeout error
    pub fn submission_timeout(timeout_ms: u64, capacity: usize) -> Self {
        PoolError::SubmissionTimeout {
            timeout_ms,
            capacity,
        }
    }

    /// Create a task panicked error
    pub fn task_panicked(
        task_id: u64,
        task_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        PoolError::TaskPanicked {
            task_id,
            task_type: task_type.into(),
            message: message.into(),
        }
    }

    /// Create a task abandoned error
    pub fn task_abandoned(task_id: u64) -> Self {
        PoolError::TaskAbandoned { task_id }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PoolError::Other(msg.into())
    }

    /// Returns true if this error means the task never entered the queue.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PoolError::SubmissionTimeout { .. } | PoolError::NotRunning { .. }
        )
    }
}
