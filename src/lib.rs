//! # Rust Worker Pool
//!
//! A bounded job queue serviced by a set of worker threads that can be resized
//! while the pool runs.
//!
//! ## Features
//!
//! - **Bounded Queue**: Fixed-capacity MPMC queue; submitters wait when it is full
//! - **Dynamic Scaling**: Add workers or remove the most recently added one at any time
//! - **Graceful Close**: Stop intake and let workers drain what is already queued
//! - **Synchronous Stop**: Signal every worker and block until all have exited
//! - **Observability**: Lifecycle events go to a pluggable observer (`log` by default)
//! - **Worker Statistics**: Per-worker and pool-wide job counters
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_worker_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! // Three workers sharing a queue of 100 jobs
//! let pool = WorkerPool::new(3, 100)?;
//!
//! for i in 0..10 {
//!     pool.execute(move || {
//!         println!("Job {} executing", i);
//!         Ok(())
//!     })?;
//! }
//!
//! // Drain the queue and wait for the workers
//! pool.close_and_wait();
//! assert_eq!(pool.total_jobs_processed(), 10);
//! # Ok(())
//! # }
//! ```
//!
//! ## Scaling
//!
//! ```rust
//! use rust_worker_pool::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(3, 10)?;
//!
//! // Removal is LIFO and does not wait for the worker's current job
//! assert_eq!(pool.remove_worker()?, WorkerId::new(3));
//!
//! // Ids are never reused
//! assert_eq!(pool.add_worker()?, WorkerId::new(4));
//! assert_eq!(pool.active_count(), 3);
//!
//! pool.stop_all();
//! assert!(matches!(pool.add_worker(), Err(PoolError::Closed)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Jobs
//!
//! ```rust
//! use rust_worker_pool::prelude::*;
//!
//! struct Resize {
//!     path: String,
//! }
//!
//! impl Job for Resize {
//!     fn execute(&mut self) -> Result<()> {
//!         println!("Resizing {}", self.path);
//!         Ok(())
//!     }
//!
//!     fn job_type(&self) -> &str {
//!         "Resize"
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::with_config(PoolConfig::new(2, 8).with_thread_name_prefix("resize"))?;
//! pool.submit(Resize {
//!     path: "cat.png".to_string(),
//! })?;
//! pool.close_and_wait();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod observer;
pub mod pool;
pub mod prelude;
pub mod queue;

pub use core::{BoxedJob, CancellationToken, ClosureJob, Job, PayloadJob, PoolError, Result};
pub use observer::{LogObserver, NoopObserver, PoolEvent, PoolObserver};
pub use pool::{PoolConfig, PoolStats, WorkerId, WorkerPool, WorkerStats};
