//! Task trait and related types

use crate::core::typed_box::TypedBox;
use std::fmt;
use std::marker::PhantomData;

/// A unit of work executed by the task pool.
///
/// A task owns whatever state it needs and produces one value, carried back
/// to the submitter in a [`TypedBox`].
///
/// # Example
///
/// ```rust
/// use rust_task_pool::{Task, TypedBox};
///
/// struct SumTask {
///     begin: u64,
///     end: u64,
/// }
///
/// impl Task for SumTask {
///     fn run(&mut self) -> TypedBox {
///         TypedBox::new((self.begin..=self.end).sum::<u64>())
///     }
///
///     fn task_type(&self) -> &str {
///         "SumTask"
///     }
/// }
/// ```
pub trait Task: Send {
    /// Execute the task and produce its result
    fn run(&mut self) -> TypedBox;

    /// Get the task's type name for logging and error reports
    fn task_type(&self) -> &str {
        "Task"
    }
}

impl fmt::Debug for dyn Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({})", self.task_type())
    }
}

/// A boxed task that can be sent across threads
pub type BoxedTask = Box<dyn Task>;

/// Helper to create a task from a closure
pub struct ClosureTask<F, T>
where
    F: FnOnce() -> T + Send,
    T: Send + 'static,
{
    closure: Option<F>,
    name: String,
    _output: PhantomData<fn() -> T>,
}

impl<F, T> ClosureTask<F, T>
where
    F: FnOnce() -> T + Send,
    T: Send + 'static,
{
    /// Create a new closure task
    pub fn new(closure: F) -> Self {
        Self::with_name(closure, "ClosureTask")
    }

    /// Create a new closure task with a custom name
    pub fn with_name<S: Into<String>>(closure: F, name: S) -> Self {
        Self {
            closure: Some(closure),
            name: name.into(),
            _output: PhantomData,
        }
    }
}

impl<F, T> Task for ClosureTask<F, T>
where
    F: FnOnce() -> T + Send,
    T: Send + 'static,
{
    fn run(&mut self) -> TypedBox {
        match self.closure.take() {
            Some(closure) => TypedBox::new(closure()),
            None => {
                log::warn!("{} already executed - returning an empty result", self.name);
                TypedBox::empty()
            }
        }
    }

    fn task_type(&self) -> &str {
        &self.name
    }
}
