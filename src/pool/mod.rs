//! Thread pool, worker and configuration types

pub mod config;
pub mod stats;
pub mod thread_pool;
pub mod worker;

pub use config::{PoolConfig, PoolMode};
pub use stats::{PoolCounters, PoolStats};
pub use thread_pool::ThreadPool;
pub use worker::{Worker, WorkerId};
