//! Result handles for submitted tasks
//!
//! Every accepted submission creates a one-shot channel: the queued task
//! keeps the [`ResultSender`], the caller receives the [`TaskFuture`]. The
//! two halves share one result slot and one [`WaitGate`], so no pool-wide
//! lock is involved in handing a result over.
//!
//! # Example
//!
//! ```rust
//! use rust_task_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = ThreadPool::new()?;
//! pool.start()?;
//!
//! let future = pool.execute(|| (1..=100u32).sum::<u32>());
//! assert!(future.is_valid());
//! assert_eq!(future.get().cast::<u32>(), 5050);
//! # pool.stop();
//! # Ok(())
//! # }
//! ```

use crate::core::error::{PoolError, Result};
use crate::core::typed_box::TypedBox;
use crate::core::wait_gate::WaitGate;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How a task ended
#[derive(Debug)]
pub enum TaskOutcome {
    /// The task ran and produced a value
    Completed(TypedBox),
    /// The task panicked; carries the panic message
    Panicked(String),
    /// The task was discarded before it ran
    Abandoned,
}

#[derive(Debug, Default)]
struct ResultSlot {
    outcome: Mutex<Option<TaskOutcome>>,
    gate: WaitGate,
}

impl ResultSlot {
    fn deliver(&self, outcome: TaskOutcome) {
        let abandoned = matches!(outcome, TaskOutcome::Abandoned);
        *self.outcome.lock() = Some(outcome);
        if abandoned {
            self.gate.close();
        } else {
            self.gate.release();
        }
    }

    fn is_ready(&self) -> bool {
        self.outcome.lock().is_some()
    }

    fn wait(&self) -> Option<TaskOutcome> {
        self.gate.acquire();
        self.outcome.lock().take()
    }
}

/// Create the two halves of a task's result channel.
pub(crate) fn result_channel(
    task_id: u64,
    task_type: impl Into<String>,
) -> (ResultSender, TaskFuture) {
    let slot = Arc::new(ResultSlot::default());
    let sender = ResultSender {
        task_id,
        slot: Some(Arc::clone(&slot)),
    };
    let future = TaskFuture {
        task_id,
        task_type: task_type.into(),
        state: FutureState::Pending(slot),
    };
    (sender, future)
}

/// Producer half of a task's result channel.
///
/// Completing consumes the sender, so a result is delivered at most once.
/// A sender dropped without completing marks its task as abandoned and
/// closes the gate, which releases any caller blocked in `get`.
pub struct ResultSender {
    task_id: u64,
    slot: Option<Arc<ResultSlot>>,
}

impl ResultSender {
    /// ID of the task this sender belongs to
    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    /// Returns true if the caller has dropped its future
    pub fn is_orphaned(&self) -> bool {
        self.slot
            .as_ref()
            .map_or(true, |slot| Arc::strong_count(slot) == 1)
    }

    /// Deliver the task's outcome and wake the caller.
    pub fn complete(mut self, outcome: TaskOutcome) {
        if let Some(slot) = self.slot.take() {
            slot.deliver(outcome);
        }
    }
}

impl Drop for ResultSender {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.deliver(TaskOutcome::Abandoned);
        }
    }
}

impl fmt::Debug for ResultSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSender")
            .field("task_id", &self.task_id)
            .field("delivered", &self.slot.is_none())
            .finish()
    }
}

enum FutureState {
    Pending(Arc<ResultSlot>),
    Rejected(PoolError),
}

/// Caller-held handle to a submitted task's result.
///
/// A handle is either *valid* (the task was queued) or *rejected* (the queue
/// stayed full for the whole admission wait, or the pool was not running).
/// [`get`](Self::get) on a rejected handle returns an empty [`TypedBox`]
/// immediately.
///
/// Dropping the handle early is fine: the task still runs and its result is
/// discarded.
pub struct TaskFuture {
    task_id: u64,
    task_type: String,
    state: FutureState,
}

impl TaskFuture {
    /// Build the handle for a submission that never entered the queue.
    pub(crate) fn rejected(task_id: u64, task_type: impl Into<String>, reason: PoolError) -> Self {
        Self {
            task_id,
            task_type: task_type.into(),
            state: FutureState::Rejected(reason),
        }
    }

    /// ID assigned to the task at submission
    pub fn task_id(&self) -> u64 {
        self.task_id
    }

    /// Type name reported by the task
    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    /// Returns true if the task was accepted into the queue
    pub fn is_valid(&self) -> bool {
        matches!(self.state, FutureState::Pending(_))
    }

    /// Why the submission was rejected, if it was
    pub fn rejection(&self) -> Option<&PoolError> {
        match &self.state {
            FutureState::Rejected(reason) => Some(reason),
            FutureState::Pending(_) => None,
        }
    }

    /// Returns true if `get` would not block
    pub fn is_ready(&self) -> bool {
        match &self.state {
            FutureState::Pending(slot) => slot.is_ready(),
            FutureState::Rejected(_) => true,
        }
    }

    /// Wait up to `timeout` for the outcome without consuming the handle.
    ///
    /// Returns true if `get` would now return without blocking.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match &self.state {
            FutureState::Pending(slot) => {
                if slot.gate.acquire_timeout(timeout) {
                    // Put the unit back for the eventual get().
                    slot.gate.release();
                }
                slot.is_ready()
            }
            FutureState::Rejected(_) => true,
        }
    }

    /// Block until the task has run and return its value.
    ///
    /// Returns an empty box without blocking if the submission was rejected,
    /// and an empty box if the task panicked or was discarded at shutdown.
    /// Use [`wait`](Self::wait) to tell those cases apart.
    pub fn get(self) -> TypedBox {
        match self.state {
            FutureState::Rejected(_) => TypedBox::empty(),
            FutureState::Pending(slot) => match slot.wait() {
                Some(TaskOutcome::Completed(value)) => value,
                _ => TypedBox::empty(),
            },
        }
    }

    /// Block until the task has run and return its value or what went wrong.
    ///
    /// # Errors
    ///
    /// - `PoolError::SubmissionTimeout` / `PoolError::NotRunning` - the task was rejected
    /// - `PoolError::TaskPanicked` - the task panicked on its worker
    /// - `PoolError::TaskAbandoned` - the pool stopped before the task ran
    pub fn wait(self) -> Result<TypedBox> {
        match self.state {
            FutureState::Rejected(reason) => Err(reason),
            FutureState::Pending(slot) => match slot.wait() {
                Some(TaskOutcome::Completed(value)) => Ok(value),
                Some(TaskOutcome::Panicked(message)) => Err(PoolError::task_panicked(
                    self.task_id,
                    self.task_type,
                    message,
                )),
                Some(TaskOutcome::Abandoned) | None => {
                    Err(PoolError::task_abandoned(self.task_id))
                }
            },
        }
    }
}

impl fmt::Debug for TaskFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskFuture")
            .field("task_id", &self.task_id)
            .field("task_type", &self.task_type)
            .field("valid", &self.is_valid())
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_complete_then_get() {
        let (sender, future) = result_channel(1, "SumTask");
        assert!(future.is_valid());
        assert!(!future.is_ready());

        sender.complete(TaskOutcome::Completed(TypedBox::new(5050u64)));
        assert!(future.is_ready());
        assert_eq!(future.get().cast::<u64>(), 5050);
    }

    #[test]
    fn test_get_blocks_until_completed() {
        let (sender, future) = result_channel(2, "Slow");

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            sender.complete(TaskOutcome::Completed(TypedBox::new("late")));
        });

        assert_eq!(future.get().cast::<&str>(), "late");
        worker.join().expect("worker panicked");
    }

    #[test]
    fn test_rejected_future_returns_empty_immediately() {
        let future = TaskFuture::rejected(3, "Rejected", PoolError::submission_timeout(1000, 1));
        assert!(!future.is_valid());
        assert!(future.is_ready());
        assert!(matches!(
            future.rejection(),
            Some(PoolError::SubmissionTimeout { .. })
        ));
        assert!(future.get().is_empty());
    }

    #[test]
    fn test_rejected_future_wait_reports_reason() {
        let future = TaskFuture::rejected(4, "Rejected", PoolError::not_running("pool"));
        assert!(matches!(future.wait(), Err(PoolError::NotRunning { .. })));
    }

    #[test]
    fn test_dropped_sender_abandons_task() {
        let (sender, future) = result_channel(5, "Dropped");
        drop(sender);

        assert!(future.is_ready());
        assert!(matches!(
            future.wait(),
            Err(PoolError::TaskAbandoned { task_id: 5 })
        ));
    }

    #[test]
    fn test_dropped_sender_unblocks_waiting_get() {
        let (sender, future) = result_channel(6, "Dropped");

        let dropper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            drop(sender);
        });

        assert!(future.get().is_empty());
        dropper.join().expect("dropper panicked");
    }

    #[test]
    fn test_panicked_outcome() {
        let (sender, future) = result_channel(7, "Boom");
        sender.complete(TaskOutcome::Panicked("boom".to_string()));

        match future.wait() {
            Err(PoolError::TaskPanicked {
                task_id,
                task_type,
                message,
            }) => {
                assert_eq!(task_id, 7);
                assert_eq!(task_type, "Boom");
                assert_eq!(message, "boom");
            }
            other => panic!("expected TaskPanicked, got {:?}", other),
        }
    }

    #[test]
    fn test_wait_timeout_does_not_consume_result() {
        let (sender, future) = result_channel(8, "Timed");
        assert!(!future.wait_timeout(Duration::from_millis(20)));

        sender.complete(TaskOutcome::Completed(TypedBox::new(1u8)));
        assert!(future.wait_timeout(Duration::from_millis(20)));
        assert_eq!(future.get().cast::<u8>(), 1);
    }

    #[test]
    fn test_wait_timeout_with_unbounded_duration() {
        let (sender, future) = result_channel(10, "Slow");

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            sender.complete(TaskOutcome::Completed(TypedBox::new(99u32)));
        });

        assert!(future.wait_timeout(Duration::MAX));
        assert_eq!(future.get().cast::<u32>(), 99);
        worker.join().expect("worker panicked");
    }

    #[test]
    fn test_orphaned_sender() {
        let (sender, future) = result_channel(9, "Orphan");
        assert!(!sender.is_orphaned());
        drop(future);
        assert!(sender.is_orphaned());
        sender.complete(TaskOutcome::Completed(TypedBox::new(())));
    }
}
