//! Worker thread implementation

use crate::core::{PoolError, Result};
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// Identity of a worker, unique within its pool
pub type WorkerId = usize;

/// Body run on a worker's thread
pub type WorkerBody = Box<dyn FnOnce(WorkerId) + Send + 'static>;

/// A worker: an identity bound to a thread body.
///
/// [`start`](Self::start) launches a named OS thread running the body. The
/// thread is detached from this value: dropping a `Worker` neither joins nor
/// stops its thread. The body itself decides when the thread ends.
pub struct Worker {
    id: WorkerId,
    name: String,
    created_at: Instant,
    body: Option<WorkerBody>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    /// Create a worker that will run `body` once started
    pub fn new<F>(id: WorkerId, name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(WorkerId) + Send + 'static,
    {
        Self {
            id,
            name: name.into(),
            created_at: Instant::now(),
            body: Some(Box::new(body)),
            thread: None,
        }
    }

    /// Launch the worker's thread.
    ///
    /// Starting an already started worker is a no-op.
    pub fn start(&mut self) -> Result<()> {
        let Some(body) = self.body.take() else {
            return Ok(());
        };

        let id = self.id;
        let thread = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || body(id))
            .map_err(|e| PoolError::spawn_with_source(id, "Cannot create worker thread", e))?;

        self.thread = Some(thread);
        Ok(())
    }

    /// Get worker ID
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Get the worker's thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time since the worker was created
    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Returns true once `start` has launched the thread
    pub fn is_started(&self) -> bool {
        self.thread.is_some()
    }

    /// Returns true if the worker's thread has returned
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| t.is_finished())
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("started", &self.is_started())
            .finish()
    }
}
