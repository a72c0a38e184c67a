//! Error types for the worker pool

/// Result type for worker pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Errors that can occur in the worker pool
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool has been closed by `close` or `stop_all`
    #[error("Worker pool is closed")]
    Closed,

    /// `remove_worker` was called with no active workers
    #[error("No active workers in the pool")]
    NoActiveWorkers,

    /// Queue is full and the caller asked not to wait
    #[error("Job queue is full ({capacity} jobs queued)")]
    QueueFull {
        /// Queue capacity
        capacity: usize,
    },

    /// Job submission timed out waiting for queue space
    #[error("Job submission timed out after {timeout_ms}ms")]
    SubmissionTimeout {
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Failed to spawn a worker thread
    #[error("Failed to spawn worker #{worker_id}: {message}")]
    SpawnError {
        /// ID the worker would have had
        worker_id: u64,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// Job execution failed
    #[error("Job execution failed ({job_type}): {message}")]
    ExecutionError {
        /// Type name of the failed job
        job_type: String,
        /// Error message
        message: String,
    },

    /// General error
    #[error("{0}")]
    Other(String),
}

impl PoolError {
    /// Create a queue full error
    pub fn queue_full(capacity: usize) -> Self {
        PoolError::QueueFull { capacity }
    }

    /// Create a submission timeout error
    pub fn submission_timeout(timeout_ms: u64) -> Self {
        PoolError::SubmissionTimeout { timeout_ms }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        worker_id: u64,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        PoolError::SpawnError {
            worker_id,
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(job_type: impl Into<String>, message: impl Into<String>) -> Self {
        PoolError::ExecutionError {
            job_type: job_type.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PoolError::Other(msg.into())
    }

    /// Whether the error means the pool will never accept this call again
    pub fn is_closed(&self) -> bool {
        matches!(self, PoolError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PoolError::queue_full(100);
        assert!(matches!(err, PoolError::QueueFull { capacity: 100 }));

        let err = PoolError::execution("ReportJob", "disk full");
        assert!(matches!(err, PoolError::ExecutionError { .. }));

        assert!(PoolError::Closed.is_closed());
        assert!(!PoolError::NoActiveWorkers.is_closed());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(PoolError::Closed.to_string(), "Worker pool is closed");
        assert_eq!(
            PoolError::NoActiveWorkers.to_string(),
            "No active workers in the pool"
        );
        assert_eq!(
            PoolError::submission_timeout(250).to_string(),
            "Job submission timed out after 250ms"
        );
        assert_eq!(
            PoolError::invalid_config("queue_capacity", "must be greater than 0").to_string(),
            "Invalid configuration for 'queue_capacity': must be greater than 0"
        );
    }

    #[test]
    fn test_spawn_error_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::WouldBlock, "too many threads");
        let err = PoolError::spawn_with_source(7, "Cannot create thread", io_err);

        assert!(matches!(err, PoolError::SpawnError { worker_id: 7, .. }));
        assert!(err.to_string().contains("worker #7"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
