//! # Rust Task Pool
//!
//! A bounded worker-thread pool that hands each task's result back through a
//! type-erased future.
//!
//! ## Features
//!
//! - **Admission Control**: Bounded FIFO queue; submitters wait a configurable
//!   time for space and then receive a rejected future instead of blocking
//! - **Fixed or Elastic Sizing**: Elastic pools grow under load up to a
//!   ceiling and reclaim workers that stay idle
//! - **Typed Results**: Tasks return a [`TypedBox`] that the caller casts back
//!   to the concrete type
//! - **Panic Isolation**: A panicking task fails its own future and leaves the
//!   worker running
//! - **Clean Teardown**: `stop()` waits until every worker has exited
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_task_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = ThreadPool::with_workers(4)?;
//! pool.start()?;
//!
//! let future = pool.execute(|| (1..=100u64).sum::<u64>());
//! assert_eq!(future.get().cast::<u64>(), 5050);
//!
//! pool.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Elastic Pool Configuration
//!
//! ```rust
//! use rust_task_pool::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let config = PoolConfig::new(2)
//!     .with_mode(PoolMode::Elastic)
//!     .with_max_workers(6)
//!     .with_max_queue_size(64)
//!     .with_idle_timeout(Duration::from_secs(30))
//!     .with_submit_timeout(Duration::from_millis(500))
//!     .with_thread_name_prefix("compute");
//!
//! let pool = ThreadPool::with_config(config)?;
//! pool.start()?;
//! # pool.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Tasks
//!
//! ```rust
//! use rust_task_pool::prelude::*;
//!
//! struct WordCount {
//!     text: String,
//! }
//!
//! impl Task for WordCount {
//!     fn run(&mut self) -> TypedBox {
//!         TypedBox::new(self.text.split_whitespace().count())
//!     }
//!
//!     fn task_type(&self) -> &str {
//!         "WordCount"
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! # let pool = ThreadPool::with_workers(2)?;
//! # pool.start()?;
//! let future = pool.submit(WordCount {
//!     text: "the quick brown fox".to_string(),
//! });
//! assert_eq!(future.wait()?.cast::<usize>(), 4);
//! # pool.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Pool Statistics
//!
//! ```rust
//! use rust_task_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! # let pool = ThreadPool::with_workers(2)?;
//! # pool.start()?;
//! let futures: Vec<_> = (0..10).map(|i| pool.execute(move || i)).collect();
//! for future in futures {
//!     future.get();
//! }
//!
//! let stats = pool.stats();
//! println!(
//!     "{} workers, {} tasks completed, {:.1}% rejected",
//!     stats.current_workers,
//!     stats.tasks_completed,
//!     stats.rejection_rate()
//! );
//! # pool.stop();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pool;
pub mod prelude;
pub mod tracing;

pub use core::{
    BoxedTask, ClosureTask, PoolError, Result, Task, TaskFuture, TaskOutcome, TypedBox, WaitGate,
};
pub use pool::{PoolConfig, PoolMode, PoolStats, ThreadPool};
