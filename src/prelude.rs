//! Convenient re-exports for common types and traits

pub use crate::core::{
    BoxedTask, ClosureTask, PoolError, Result, Task, TaskFuture, TypedBox, WaitGate,
};
pub use crate::pool::{PoolConfig, PoolMode, PoolStats, ThreadPool};
