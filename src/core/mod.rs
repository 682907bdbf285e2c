//! Core types and traits for the task pool

pub mod error;
pub mod future;
pub mod task;
pub mod typed_box;
pub mod wait_gate;

pub use error::{PoolError, Result};
pub use future::{ResultSender, TaskFuture, TaskOutcome};
pub use task::{BoxedTask, ClosureTask, Task};
pub use typed_box::TypedBox;
pub use wait_gate::WaitGate;
