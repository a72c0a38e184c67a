//! Serializable pool snapshot

use crate::core::{PoolError, Result};
use crate::pool::WorkerId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time view of a pool
///
/// Values are read one after another, not atomically as a whole, so counters
/// may be slightly out of step with each other under load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStats {
    /// Ids of the active workers, oldest first
    pub active_workers: Vec<WorkerId>,
    /// Workers started but not yet exited, including removed ones
    pub outstanding_workers: usize,
    /// Jobs currently waiting in the queue
    pub queued_jobs: usize,
    /// Fixed queue capacity
    pub queue_capacity: usize,
    /// Whether the pool is closed
    pub is_closed: bool,
    /// Jobs accepted into the queue
    pub jobs_submitted: u64,
    /// Jobs refused (closed pool, full queue, timeout)
    pub jobs_rejected: u64,
    /// Jobs that ran and returned `Ok`
    pub jobs_processed: u64,
    /// Jobs that ran and returned an error
    pub jobs_failed: u64,
    /// Jobs that panicked
    pub jobs_panicked: u64,
    /// When the pool was built
    pub created_at: DateTime<Utc>,
    /// When the pool was closed
    pub closed_at: Option<DateTime<Utc>>,
}

impl PoolStats {
    /// Jobs that ran to an outcome
    pub fn jobs_completed(&self) -> u64 {
        self.jobs_processed + self.jobs_failed + self.jobs_panicked
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PoolError::other(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PoolStats {
        PoolStats {
            active_workers: vec![WorkerId::new(1), WorkerId::new(3)],
            outstanding_workers: 3,
            queued_jobs: 4,
            queue_capacity: 10,
            is_closed: false,
            jobs_submitted: 12,
            jobs_rejected: 1,
            jobs_processed: 6,
            jobs_failed: 1,
            jobs_panicked: 1,
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    #[test]
    fn test_jobs_completed() {
        assert_eq!(sample().jobs_completed(), 8);
    }

    #[test]
    fn test_to_json() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["active_workers"], serde_json::json!([1, 3]));
        assert_eq!(value["queued_jobs"], 4);
        assert!(value["closed_at"].is_null());
        assert!(value["created_at"].is_string());
    }
}
