//! Pool lifecycle events and pluggable observers.
//!
//! The pool never prints. Everything worth narrating (workers coming and
//! going, jobs starting and finishing, shutdown progress) is delivered as a
//! [`PoolEvent`] to a [`PoolObserver`]. The default [`LogObserver`] forwards
//! events to the `log` facade; tests can install a closure that records them.
//!
//! # Example
//!
//! ```rust
//! use rust_worker_pool::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! # fn main() -> Result<()> {
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let observer = Arc::new(move |event: &PoolEvent| sink.lock().unwrap().push(event.clone()));
//!
//! let pool = WorkerPool::with_observer(PoolConfig::new(1, 4), observer)?;
//! pool.stop_all();
//!
//! assert!(seen.lock().unwrap().contains(&PoolEvent::StopAllCompleted));
//! # Ok(())
//! # }
//! ```

use crate::pool::{ExitReason, WorkerId};
use std::time::Duration;

const LOG_TARGET: &str = "rust_worker_pool";

/// How a job run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// `execute` returned `Ok`
    Succeeded,
    /// `execute` returned an error
    Failed(String),
    /// `execute` panicked; the worker survived
    Panicked(String),
}

/// Something that happened inside a pool
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PoolEvent {
    /// A worker was started and appended to the active list
    WorkerAdded {
        /// Worker id
        worker: WorkerId,
    },
    /// The OS refused to spawn a worker thread
    WorkerSpawnFailed {
        /// Id the worker would have had
        worker: WorkerId,
        /// Spawn error message
        message: String,
    },
    /// A worker was asked to stop after its current job
    WorkerStopRequested {
        /// Worker id
        worker: WorkerId,
    },
    /// A worker thread left its loop
    WorkerExited {
        /// Worker id
        worker: WorkerId,
        /// Why it left
        reason: ExitReason,
    },
    /// A worker claimed a job
    JobStarted {
        /// Worker id
        worker: WorkerId,
        /// The job's type name
        job_type: String,
    },
    /// A worker finished running a job
    JobFinished {
        /// Worker id
        worker: WorkerId,
        /// The job's type name
        job_type: String,
        /// Wall time spent in `execute`
        elapsed: Duration,
        /// Result of the run
        outcome: JobOutcome,
    },
    /// The pool stopped accepting jobs and workers
    Closed,
    /// `stop_all` began signalling the active workers
    StopAllStarted {
        /// Number of workers being signalled
        active: usize,
    },
    /// Every worker ever started has exited
    StopAllCompleted,
}

/// Receiver of [`PoolEvent`]s
///
/// Called synchronously from the thread where the event happened, which may be
/// a worker thread. The pool lock is never held during the call, so an observer
/// may read pool state (`active_count`, `stats`, ...). Implementations should
/// still be quick: a worker does not claim its next job until they return.
pub trait PoolObserver: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &PoolEvent);
}

impl<F> PoolObserver for F
where
    F: Fn(&PoolEvent) + Send + Sync,
{
    fn on_event(&self, event: &PoolEvent) {
        self(event)
    }
}

/// Observer that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PoolObserver for NoopObserver {
    fn on_event(&self, _event: &PoolEvent) {}
}

/// Observer that writes events through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl PoolObserver for LogObserver {
    fn on_event(&self, event: &PoolEvent) {
        match event {
            PoolEvent::WorkerAdded { worker } => {
                log::info!(target: LOG_TARGET, "{} added to the pool", worker)
            }
            PoolEvent::WorkerSpawnFailed { worker, message } => {
                log::error!(target: LOG_TARGET, "{} failed to start: {}", worker, message)
            }
            PoolEvent::WorkerStopRequested { worker } => {
                log::info!(target: LOG_TARGET, "{} received stop signal", worker)
            }
            PoolEvent::WorkerExited { worker, reason } => {
                log::info!(target: LOG_TARGET, "{} exited: {}", worker, reason)
            }
            PoolEvent::JobStarted { worker, job_type } => {
                log::debug!(target: LOG_TARGET, "{} started {}", worker, job_type)
            }
            PoolEvent::JobFinished {
                worker,
                job_type,
                elapsed,
                outcome,
            } => match outcome {
                JobOutcome::Succeeded => log::debug!(
                    target: LOG_TARGET,
                    "{} finished {} in {:?}",
                    worker,
                    job_type,
                    elapsed
                ),
                JobOutcome::Failed(message) => log::warn!(
                    target: LOG_TARGET,
                    "{} job {} failed after {:?}: {}",
                    worker,
                    job_type,
                    elapsed,
                    message
                ),
                JobOutcome::Panicked(message) => log::error!(
                    target: LOG_TARGET,
                    "{} job {} panicked after {:?}: {}",
                    worker,
                    job_type,
                    elapsed,
                    message
                ),
            },
            PoolEvent::Closed => {
                log::info!(target: LOG_TARGET, "queue closed, no further jobs accepted")
            }
            PoolEvent::StopAllStarted { active } => {
                log::info!(target: LOG_TARGET, "stopping {} active workers", active)
            }
            PoolEvent::StopAllCompleted => {
                log::info!(target: LOG_TARGET, "all workers stopped")
            }
        }
    }
}
