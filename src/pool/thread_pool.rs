//! Thread pool implementation

use crate::core::future::result_channel;
use crate::core::{
    BoxedTask, ClosureTask, PoolError, Result, ResultSender, Task, TaskFuture, TaskOutcome,
};
use crate::pool::config::{PoolConfig, PoolMode};
use crate::pool::stats::{PoolCounters, PoolStats};
use crate::pool::worker::{Worker, WorkerId};
use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A task waiting in the queue together with its result channel
struct QueuedTask {
    task: BoxedTask,
    sender: ResultSender,
    enqueued_at: Instant,
}

/// Everything guarded by the pool mutex
struct PoolState {
    config: PoolConfig,
    running: bool,
    /// Set while a `stop()` is waiting for workers and draining the queue
    stopping: bool,
    queue: VecDeque<QueuedTask>,
    workers: HashMap<WorkerId, Worker>,
    idle_workers: usize,
    started_at: Option<DateTime<Utc>>,
}

impl PoolState {
    fn current_workers(&self) -> usize {
        self.workers.len()
    }

    fn is_full(&self) -> bool {
        self.queue.len() >= self.config.max_queue_size
    }
}

/// State shared by the pool handle and every worker thread
struct Shared {
    state: Mutex<PoolState>,
    not_full: Condvar,
    not_empty: Condvar,
    all_exited: Condvar,
    next_worker_id: AtomicUsize,
    next_task_id: AtomicU64,
    counters: PoolCounters,
}

impl Shared {
    fn next_task_id(&self) -> u64 {
        self.next_task_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Spawn one worker and register it. Must be called with the pool lock held.
    fn spawn_worker(self: &Arc<Self>, state: &mut PoolState) -> Result<WorkerId> {
        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", state.config.thread_name_prefix, id);
        let shared = Arc::clone(self);

        // The new thread blocks on the pool lock until the caller releases
        // it, so it never observes a registry without its own entry.
        let mut worker = Worker::new(id, name, move |id| shared.run_worker(id));
        worker.start()?;

        state.workers.insert(id, worker);
        state.idle_workers += 1;
        self.counters.record_worker_spawned(state.current_workers());

        log::debug!(
            "worker {} spawned ({} workers, {} idle)",
            id,
            state.current_workers(),
            state.idle_workers
        );
        Ok(id)
    }

    /// Deregister an idle worker that is about to return from its thread.
    fn retire(&self, state: &mut PoolState, id: WorkerId) {
        state.workers.remove(&id);
        state.idle_workers = state.idle_workers.saturating_sub(1);
        debug_assert!(state.idle_workers <= state.current_workers());
        self.all_exited.notify_all();
    }

    /// Admission control: wait for queue space, then enqueue.
    fn enqueue(self: &Arc<Self>, task_id: u64, task: BoxedTask) -> Result<TaskFuture> {
        let mut state = self.state.lock();

        if !state.running {
            self.counters.record_rejected();
            log::warn!("task #{} rejected: pool is not running", task_id);
            return Err(PoolError::not_running(&state.config.thread_name_prefix));
        }

        let timeout = state.config.submit_timeout;
        // A timeout too large to represent as an Instant waits without limit.
        let deadline = Instant::now().checked_add(timeout);
        while state.is_full() {
            let timed_out = match deadline {
                Some(deadline) => self.not_full.wait_until(&mut state, deadline).timed_out(),
                None => {
                    self.not_full.wait(&mut state);
                    false
                }
            };

            if !state.running {
                self.counters.record_rejected();
                log::warn!("task #{} rejected: pool stopped during admission", task_id);
                return Err(PoolError::not_running(&state.config.thread_name_prefix));
            }
            if timed_out && state.is_full() {
                self.counters.record_rejected();
                log::warn!(
                    "task queue is full, task #{} rejected after {:?}",
                    task_id,
                    timeout
                );
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_rejection(state.queue.len());
                return Err(PoolError::submission_timeout(
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    state.config.max_queue_size,
                ));
            }
        }

        let (sender, future) = result_channel(task_id, task.task_type());
        state.queue.push_back(QueuedTask {
            task,
            sender,
            enqueued_at: Instant::now(),
        });
        self.counters.record_submitted();
        self.not_empty.notify_all();

        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_submission(state.queue.len());

        if state.config.mode == PoolMode::Elastic
            && state.queue.len() > state.idle_workers
            && state.current_workers() < state.config.max_workers
        {
            match self.spawn_worker(&mut state) {
                Ok(id) => log::debug!(
                    "pool grew to {} workers under load (worker {})",
                    state.current_workers(),
                    id
                ),
                // The task is already queued; existing workers will run it.
                Err(e) => log::error!("failed to grow pool: {}", e),
            }
        }

        Ok(future)
    }

    /// Dispatch loop run by every worker thread
    fn run_worker(self: Arc<Self>, id: WorkerId) {
        #[cfg(feature = "tracing")]
        let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", id = id);
        #[cfg(feature = "tracing")]
        let _guard = worker_span.enter();

        log::trace!("worker {} started", id);

        let _exit_guard = ExitGuard {
            shared: &self,
            id,
        };
        let mut last_active = Instant::now();
        let mut state = self.state.lock();
        loop {
            while state.queue.is_empty() {
                if !state.running {
                    self.retire(&mut state, id);
                    log::debug!("worker {} exiting: pool stopped", id);
                    return;
                }

                match state.config.mode {
                    PoolMode::Elastic => {
                        let poll_interval = state.config.idle_poll_interval;
                        let timed_out = self
                            .not_empty
                            .wait_for(&mut state, poll_interval)
                            .timed_out();

                        if timed_out
                            && last_active.elapsed() >= state.config.idle_timeout
                            && state.current_workers() > state.config.initial_workers
                        {
                            self.retire(&mut state, id);
                            self.counters.record_worker_reclaimed();
                            log::debug!(
                                "worker {} reclaimed after {:?} idle ({} workers left)",
                                id,
                                last_active.elapsed(),
                                state.current_workers()
                            );
                            #[cfg(feature = "tracing")]
                            crate::tracing::metrics::record_worker_reclaimed(
                                id,
                                state.current_workers(),
                            );
                            return;
                        }
                    }
                    PoolMode::Fixed => self.not_empty.wait(&mut state),
                }
            }

            // Stopped while tasks are still queued: leave them for stop().
            if !state.running {
                self.retire(&mut state, id);
                log::debug!("worker {} exiting: pool stopped", id);
                return;
            }

            state.idle_workers -= 1;
            let next = state.queue.pop_front();
            if !state.queue.is_empty() {
                self.not_empty.notify_all();
            }
            self.not_full.notify_all();

            if let Some(queued) = next {
                MutexGuard::unlocked(&mut state, || self.execute(id, queued));
            }

            state.idle_workers += 1;
            last_active = Instant::now();
        }
    }

    /// Run one task with panic protection and hand its outcome to the caller.
    ///
    /// Dropping the task and delivering the outcome both run user `Drop`
    /// code, so they happen under `catch_unwind` as well.
    fn execute(&self, worker_id: WorkerId, queued: QueuedTask) {
        let QueuedTask {
            mut task,
            sender,
            enqueued_at,
        } = queued;
        let task_id = sender.task_id();
        let task_type = task.task_type().to_string();

        #[cfg(feature = "tracing")]
        let task_span = tracing::span!(
            tracing::Level::DEBUG,
            "task_execution",
            task_id = task_id,
            task_type = task_type.as_str()
        );
        #[cfg(feature = "tracing")]
        let _task_guard = task_span.enter();

        let queued_for = enqueued_at.elapsed();
        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(move || {
            let value = task.run();
            drop(task);
            value
        }));
        let elapsed = start.elapsed();

        let outcome = match result {
            Ok(value) => {
                self.counters.record_completed(elapsed);
                log::trace!(
                    "worker {}: task #{} ({}) completed in {:?} after {:?} queued",
                    worker_id,
                    task_id,
                    task_type,
                    elapsed,
                    queued_for
                );
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_completion(elapsed, queued_for);

                if sender.is_orphaned() {
                    log::trace!("task #{} result discarded: future was dropped", task_id);
                }
                TaskOutcome::Completed(value)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                self.counters.record_panicked(elapsed);
                log::error!(
                    "worker {}: task #{} ({}) panicked: {}",
                    worker_id,
                    task_id,
                    task_type,
                    message
                );
                #[cfg(feature = "tracing")]
                crate::tracing::metrics::record_panic(elapsed);

                TaskOutcome::Panicked(message)
            }
        };

        // An orphaned result is dropped here, on the worker.
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sender.complete(outcome))) {
            log::error!(
                "worker {}: dropping the result of task #{} ({}) panicked: {}",
                worker_id,
                task_id,
                task_type,
                panic_message(payload.as_ref())
            );
        }
    }
}

/// Deregisters a worker whose thread unwinds out of the dispatch loop.
struct ExitGuard<'a> {
    shared: &'a Shared,
    id: WorkerId,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }

        let mut state = self.shared.state.lock();
        if state.workers.remove(&self.id).is_some() {
            state.idle_workers = state.idle_workers.min(state.current_workers());
            log::error!("worker {} terminated by a panic", self.id);
        }
        self.shared.all_exited.notify_all();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// A bounded worker-thread pool
///
/// Tasks enter a FIFO queue of at most `max_queue_size` entries. When the
/// queue is full, `submit` waits up to `submit_timeout` for space and then
/// gives up, returning a rejected [`TaskFuture`] instead of blocking forever.
///
/// # Worker Sizing
///
/// - [`PoolMode::Fixed`]: `initial_workers` threads for the life of the pool.
/// - [`PoolMode::Elastic`]: starts with `initial_workers`; a submission that
///   leaves more queued tasks than idle workers spawns one more worker, up to
///   `max_workers`. Workers above the initial count exit on their own after
///   idling for `idle_timeout`.
///
/// # Shutdown
///
/// [`stop`](Self::stop) (also run on drop) lets running tasks finish, waits
/// until every worker has deregistered itself, then discards tasks that were
/// still queued. Their futures report [`PoolError::TaskAbandoned`].
/// Calling `stop` from inside a task deadlocks: the task would wait for its
/// own worker.
///
/// # Example
///
/// ```rust
/// use rust_task_pool::prelude::*;
///
/// # fn main() -> Result<()> {
/// let pool = ThreadPool::with_workers(4)?;
/// pool.start()?;
///
/// let futures: Vec<_> = (1..=4u64)
///     .map(|n| pool.execute(move || n * n))
///     .collect();
///
/// let total: u64 = futures.into_iter().map(|f| f.get().cast::<u64>()).sum();
/// assert_eq!(total, 30);
///
/// pool.stop();
/// # Ok(())
/// # }
/// ```
pub struct ThreadPool {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ThreadPool")
            .field("config", &state.config)
            .field("running", &state.running)
            .field("current_workers", &state.current_workers())
            .field("idle_workers", &state.idle_workers)
            .field("queued_tasks", &state.queue.len())
            .finish()
    }
}

impl ThreadPool {
    /// Create a new pool with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(PoolConfig::default())
    }

    /// Create a fixed pool with the given number of workers
    pub fn with_workers(initial_workers: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(initial_workers))
    }

    /// Create a pool with custom configuration
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    config,
                    running: false,
                    stopping: false,
                    queue: VecDeque::new(),
                    workers: HashMap::new(),
                    idle_workers: 0,
                    started_at: None,
                }),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
                all_exited: Condvar::new(),
                next_worker_id: AtomicUsize::new(0),
                next_task_id: AtomicU64::new(1),
                counters: PoolCounters::new(),
            }),
        })
    }

    /// Apply a configuration change unless the pool is running.
    fn configure(&self, parameter: &str, apply: impl FnOnce(&mut PoolConfig)) {
        let mut state = self.shared.state.lock();
        if state.running {
            log::debug!("ignoring change to '{}': pool is running", parameter);
            return;
        }
        apply(&mut state.config);
    }

    /// Set the worker sizing policy. Ignored while running.
    pub fn set_mode(&self, mode: PoolMode) {
        self.configure("mode", |config| config.mode = mode);
    }

    /// Set the number of workers started by `start()`. Ignored while running.
    pub fn set_initial_workers(&self, count: usize) {
        self.configure("initial_workers", |config| config.initial_workers = count);
    }

    /// Set the maximum queue size. Ignored while running.
    pub fn set_max_queue_size(&self, size: usize) {
        self.configure("max_queue_size", |config| config.max_queue_size = size);
    }

    /// Set the worker ceiling. Ignored while running, and ignored unless the
    /// pool is already in elastic mode.
    pub fn set_max_workers(&self, count: usize) {
        self.configure("max_workers", |config| {
            if config.mode == PoolMode::Elastic {
                config.max_workers = count;
            } else {
                log::debug!("ignoring change to 'max_workers': pool is in fixed mode");
            }
        });
    }

    /// Set how long surplus elastic workers may idle. Ignored while running.
    pub fn set_idle_timeout(&self, timeout: Duration) {
        self.configure("idle_timeout", |config| config.idle_timeout = timeout);
    }

    /// Set the admission wait for a full queue. Ignored while running.
    pub fn set_submit_timeout(&self, timeout: Duration) {
        self.configure("submit_timeout", |config| config.submit_timeout = timeout);
    }

    /// Start the pool
    ///
    /// Spawns `initial_workers` workers in either mode. A stopped pool can be
    /// started again.
    ///
    /// # Errors
    ///
    /// - `PoolError::AlreadyRunning` - the pool is running
    /// - `PoolError::InvalidConfig` - a setter left the configuration invalid
    /// - `PoolError::SpawnError` - a worker thread could not be created; the
    ///   workers spawned so far are stopped again
    pub fn start(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.running {
            return Err(PoolError::already_running(
                &state.config.thread_name_prefix,
                state.current_workers(),
            ));
        }
        if state.stopping || !state.workers.is_empty() {
            return Err(PoolError::other("pool is still stopping"));
        }
        state.config.validate()?;

        state.running = true;
        state.started_at = Some(Utc::now());
        state.idle_workers = 0;

        for _ in 0..state.config.initial_workers {
            if let Err(e) = self.shared.spawn_worker(&mut state) {
                log::error!("failed to start pool: {}", e);
                drop(state);
                self.stop();
                return Err(e);
            }
        }

        log::info!(
            "task pool '{}' started: {} workers, {} mode, queue capacity {}",
            state.config.thread_name_prefix,
            state.current_workers(),
            state.config.mode,
            state.config.max_queue_size
        );
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_start(
            state.current_workers(),
            &state.config.mode.to_string(),
        );

        Ok(())
    }

    /// Submit a task to the pool
    ///
    /// Waits up to `submit_timeout` for queue space. If the queue stays full,
    /// or the pool is not running, the task is dropped and the returned
    /// future is rejected: [`TaskFuture::is_valid`] is false and
    /// [`TaskFuture::get`] returns an empty box without blocking.
    pub fn submit<T: Task + 'static>(&self, task: T) -> TaskFuture {
        self.submit_boxed(Box::new(task))
    }

    /// Submit an already boxed task
    pub fn submit_boxed(&self, task: BoxedTask) -> TaskFuture {
        let task_id = self.shared.next_task_id();
        let task_type = task.task_type().to_string();
        self.shared
            .enqueue(task_id, task)
            .unwrap_or_else(|reason| TaskFuture::rejected(task_id, task_type, reason))
    }

    /// Submit a closure as a task
    pub fn execute<F, T>(&self, f: F) -> TaskFuture
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit(ClosureTask::new(f))
    }

    /// Submit a task, reporting a rejection as an error.
    ///
    /// # Errors
    ///
    /// - `PoolError::NotRunning` - Pool is not running
    /// - `PoolError::SubmissionTimeout` - Queue stayed full for `submit_timeout`
    ///
    /// # Example
    ///
    /// ```
    /// use rust_task_pool::prelude::*;
    ///
    /// # fn main() -> Result<()> {
    /// let pool = ThreadPool::with_workers(2)?;
    ///
    /// // Not started yet
    /// assert!(matches!(
    ///     pool.try_execute(|| 1),
    ///     Err(PoolError::NotRunning { .. })
    /// ));
    ///
    /// pool.start()?;
    /// let future = pool.try_execute(|| 1)?;
    /// assert_eq!(future.get().cast::<i32>(), 1);
    /// # pool.stop();
    /// # Ok(())
    /// # }
    /// ```
    pub fn try_submit<T: Task + 'static>(&self, task: T) -> Result<TaskFuture> {
        let task_id = self.shared.next_task_id();
        self.shared.enqueue(task_id, Box::new(task))
    }

    /// Submit a closure, reporting a rejection as an error.
    pub fn try_execute<F, T>(&self, f: F) -> Result<TaskFuture>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.try_submit(ClosureTask::new(f))
    }

    /// Submit a task that runs inside the submitter's current tracing span.
    #[cfg(feature = "tracing")]
    pub fn submit_traced<T: Task + 'static>(&self, task: T) -> TaskFuture {
        self.submit(crate::tracing::TracedTask::new(task))
    }

    /// Check if the pool is running
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Get the worker sizing policy
    pub fn mode(&self) -> PoolMode {
        self.shared.state.lock().config.mode
    }

    /// Get a copy of the current configuration
    pub fn config(&self) -> PoolConfig {
        self.shared.state.lock().config.clone()
    }

    /// Number of live workers
    pub fn current_workers(&self) -> usize {
        self.shared.state.lock().current_workers()
    }

    /// Number of live workers waiting for a task
    pub fn idle_workers(&self) -> usize {
        self.shared.state.lock().idle_workers
    }

    /// Number of tasks waiting in the queue
    pub fn queued_tasks(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// IDs of the live workers, in ascending order
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        let mut ids: Vec<_> = self.shared.state.lock().workers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of the pool's sizes and counters
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        let counters = &self.shared.counters;
        PoolStats {
            mode: state.config.mode,
            running: state.running,
            started_at: state.started_at,
            current_workers: state.current_workers(),
            idle_workers: state.idle_workers,
            queued_tasks: state.queue.len(),
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

    /// Stop the pool and wait for every worker to exit
    ///
    /// # Graceful Shutdown
    ///
    /// 1. Stops accepting new tasks (sets running = false)
    /// 2. Wakes idle workers and blocked submitters
    /// 3. Waits until every worker has finished its current task and
    ///    deregistered itself
    /// 4. Discards tasks still in the queue; their futures resolve as abandoned
    ///
    /// Stopping a pool that is not running is a no-op.
    pub fn stop(&self) {
        let abandoned: VecDeque<QueuedTask> = {
            let mut state = self.shared.state.lock();
            if state.stopping {
                // Another thread owns this shutdown; wait for it to finish.
                while state.stopping {
                    self.shared.all_exited.wait(&mut state);
                }
                return;
            }
            if !state.running && state.workers.is_empty() && state.queue.is_empty() {
                return;
            }

            state.running = false;
            state.stopping = true;
            self.shared.not_empty.notify_all();
            self.shared.not_full.notify_all();

            while !state.workers.is_empty() {
                self.shared.all_exited.wait(&mut state);
            }
            state.idle_workers = 0;
            let abandoned = std::mem::take(&mut state.queue);
            state.stopping = false;
            self.shared.all_exited.notify_all();
            abandoned
        };

        if !abandoned.is_empty() {
            log::warn!(
                "task pool stopped with {} queued tasks; discarding them",
                abandoned.len()
            );
            self.shared.counters.record_abandoned(abandoned.len());
        }
        // Dropping the senders resolves the futures as abandoned.
        drop(abandoned);

        let counters = &self.shared.counters;
        log::info!(
            "task pool stopped: {} tasks completed, {} panicked, {} rejected",
            counters.tasks_completed(),
            counters.tasks_panicked(),
            counters.tasks_rejected()
        );
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pool_shutdown(
            counters.tasks_completed(),
            counters.tasks_panicked(),
        );
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
    }
}
