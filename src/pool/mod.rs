//! Worker pool and worker implementations

pub mod config;
pub mod stats;
pub mod worker;
pub mod worker_pool;

pub use config::PoolConfig;
pub use stats::PoolStats;
pub use worker::{ExitReason, WorkerId, WorkerStatSnapshot, WorkerStats};
pub use worker_pool::WorkerPool;
