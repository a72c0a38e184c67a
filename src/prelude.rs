//! Convenient re-exports for common types and traits

pub use crate::core::{BoxedJob, ClosureJob, Job, PayloadJob, PoolError, Result};
pub use crate::observer::{JobOutcome, LogObserver, NoopObserver, PoolEvent, PoolObserver};
pub use crate::pool::{ExitReason, PoolConfig, PoolStats, WorkerId, WorkerPool};
