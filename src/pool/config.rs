//! Pool configuration

use crate::core::{PoolError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a worker pool
///
/// Can be built in code or loaded from JSON; missing fields take their
/// defaults.
///
/// ```rust
/// use rust_worker_pool::PoolConfig;
///
/// let config = PoolConfig::from_json(r#"{ "initial_workers": 3, "queue_capacity": 100 }"#)?;
/// assert_eq!(config.initial_workers, 3);
/// assert_eq!(config.thread_name_prefix, "worker");
/// # Ok::<(), rust_worker_pool::PoolError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of workers started at construction (may be 0)
    pub initial_workers: usize,
    /// Fixed capacity of the job queue (must be > 0)
    pub queue_capacity: usize,
    /// Worker threads are named `<prefix>-<id>`
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_workers: num_cpus::get(),
            // Bounded by default to prevent memory exhaustion
            queue_capacity: 10_000,
            thread_name_prefix: "worker".to_string(),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with the given worker count and queue capacity
    #[must_use]
    pub fn new(initial_workers: usize, queue_capacity: usize) -> Self {
        Self {
            initial_workers,
            queue_capacity,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PoolError::invalid_config("json", e.to_string()))
    }

    /// Set the number of initial workers
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_initial_workers(mut self, workers: usize) -> Self {
        self.initial_workers = workers;
        self
    }

    /// Set the queue capacity
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(PoolError::invalid_config(
                "queue_capacity",
                "Queue capacity must be greater than 0",
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(PoolError::invalid_config(
                "thread_name_prefix",
                "Thread name prefix must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.initial_workers, num_cpus::get());
        assert_eq!(config.queue_capacity, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = PoolConfig::new(2, 5)
            .with_initial_workers(4)
            .with_queue_capacity(50)
            .with_thread_name_prefix("ingest");

        assert_eq!(config.initial_workers, 4);
        assert_eq!(config.queue_capacity, 50);
        assert_eq!(config.thread_name_prefix, "ingest");
    }

    #[test]
    fn test_zero_workers_is_valid() {
        assert!(PoolConfig::new(0, 1).validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let err = PoolConfig::new(1, 0).validate().unwrap_err();
        assert!(matches!(
            err,
            PoolError::InvalidConfig { ref parameter, .. } if parameter == "queue_capacity"
        ));
    }

    #[test]
    fn test_empty_prefix_is_rejected() {
        let config = PoolConfig::new(1, 1).with_thread_name_prefix("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json() {
        let config = PoolConfig::from_json(
            r#"{ "initial_workers": 2, "queue_capacity": 5, "thread_name_prefix": "jobs" }"#,
        )
        .unwrap();
        assert_eq!(config, PoolConfig::new(2, 5).with_thread_name_prefix("jobs"));

        let err = PoolConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfig { .. }));
    }

    #[test]
    fn test_json_round_trip_keeps_fields() {
        let config = PoolConfig::new(3, 100);
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(PoolConfig::from_json(&json).unwrap(), config);
    }
}
