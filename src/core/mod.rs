//! Core types and traits for the worker pool

pub mod cancellation;
pub mod error;
pub mod job;
pub mod tracker;

pub use cancellation::CancellationToken;
pub use error::{PoolError, Result};
pub use job::{BoxedJob, ClosureJob, Job, PayloadJob};
pub use tracker::{CompletionGuard, CompletionTracker};
