//! Job queue shared between the pool and its workers.
//!
//! [`BoundedQueue`] is a fixed-capacity, multi-producer/multi-consumer FIFO
//! that can be closed exactly once. Closing stops new submissions and wakes any
//! producer blocked on a full queue, while jobs already enqueued stay available
//! to consumers until the queue is drained.

mod bounded;

pub use bounded::BoundedQueue;

use crate::core::BoxedJob;

/// Errors that can occur during queue operations.
///
/// Every variant hands the rejected job back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Queue is at capacity
    #[error("queue is full")]
    Full(BoxedJob),
    /// Queue is closed and not accepting new jobs
    #[error("queue is closed")]
    Closed(BoxedJob),
    /// Timed out waiting for space
    #[error("operation timed out")]
    Timeout(BoxedJob),
}

impl QueueError {
    /// Takes the rejected job back.
    pub fn into_job(self) -> BoxedJob {
        match self {
            QueueError::Full(job) | QueueError::Closed(job) | QueueError::Timeout(job) => job,
        }
    }
}

/// Result type for queue operations.
pub type QueueResult<T> = std::result::Result<T, QueueError>;
