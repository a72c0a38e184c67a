//! Resizable worker pool implementation

use crate::core::{BoxedJob, ClosureJob, CompletionTracker, Job, PoolError, Result};
use crate::observer::{LogObserver, PoolEvent, PoolObserver};
use crate::pool::config::PoolConfig;
use crate::pool::stats::PoolStats;
use crate::pool::worker::{Worker, WorkerContext, WorkerId, WorkerStats};
#[cfg(feature = "metrics")]
use crate::pool::worker::WorkerStatSnapshot;
use crate::queue::{BoundedQueue, QueueError};
use chrono::{DateTime, Utc};
#[cfg(feature = "metrics")]
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const LOG_TARGET: &str = "rust_worker_pool";

/// How long a submission may wait for queue space
#[derive(Debug, Clone, Copy)]
enum SubmitWait {
    Block,
    Timeout(Duration),
    NoWait,
}

/// Pool metadata guarded by the pool lock
#[derive(Debug)]
struct PoolState {
    /// Active workers, oldest first
    workers: Vec<Worker>,
    last_id: u64,
    closed: bool,
    stop_all_performed: bool,
    closed_at: Option<DateTime<Utc>>,
}

/// A pool of worker threads that can grow and shrink while it runs
///
/// # Locking
///
/// The active worker list and the closed flag live behind a single mutex that
/// is held only for metadata changes. It is never held while a job runs, while
/// a submitter waits for queue space, or while the observer is called, so an
/// observer may query the pool from inside `on_event`.
///
/// # Shutdown
///
/// - [`close`](Self::close) stops intake and returns immediately; workers
///   finish every queued job and exit on their own.
/// - [`stop_all`](Self::stop_all) additionally tells every worker to stop
///   after its current job and blocks until every worker ever started has
///   exited. Jobs still queued at that point are never run.
/// - [`close_and_wait`](Self::close_and_wait) closes and blocks until the queue
///   is drained and all workers have exited.
///
/// Dropping the pool performs [`close`](Self::close).
///
/// # Example
///
/// ```rust
/// use rust_worker_pool::prelude::*;
///
/// # fn main() -> Result<()> {
/// let pool = WorkerPool::new(3, 100)?;
///
/// for i in 1..=10 {
///     pool.execute(move || {
///         let _task = format!("task-{}", i);
///         Ok(())
///     })?;
/// }
///
/// pool.remove_worker()?;
/// pool.add_worker()?;
///
/// pool.stop_all();
/// assert!(matches!(pool.execute(|| Ok(())), Err(PoolError::Closed)));
/// # Ok(())
/// # }
/// ```
pub struct WorkerPool {
    state: Mutex<PoolState>,
    ctx: WorkerContext,
    jobs_submitted: AtomicU64,
    jobs_rejected: AtomicU64,
    created_at: DateTime<Utc>,
    #[cfg(feature = "metrics")]
    registry: DashMap<WorkerId, Arc<WorkerStats>>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WorkerPool")
            .field("active_workers", &state.workers.len())
            .field("closed", &state.closed)
            .field("queue", &self.ctx.queue)
            .field("jobs_submitted", &self.jobs_submitted.load(Ordering::Relaxed))
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool with `workers` initial workers and a queue of `capacity`
    pub fn new(workers: usize, capacity: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(workers, capacity))
    }

    /// Create a pool from a configuration, logging events through `log`
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        Self::with_observer(config, Arc::new(LogObserver))
    }

    /// Create a pool that reports its events to `observer`
    ///
    /// Initial workers are started best effort: a worker that cannot be
    /// spawned is reported (observer and `log`) and construction carries on
    /// with the rest.
    pub fn with_observer(config: PoolConfig, observer: Arc<dyn PoolObserver>) -> Result<Self> {
        config.validate()?;

        let pool = Self {
            state: Mutex::new(PoolState {
                workers: Vec::with_capacity(config.initial_workers),
                last_id: 0,
                closed: false,
                stop_all_performed: false,
                closed_at: None,
            }),
            ctx: WorkerContext {
                queue: Arc::new(BoundedQueue::new(config.queue_capacity)),
                tracker: CompletionTracker::new(),
                observer,
                totals: Arc::new(WorkerStats::new()),
                thread_name_prefix: config.thread_name_prefix,
            },
            jobs_submitted: AtomicU64::new(0),
            jobs_rejected: AtomicU64::new(0),
            created_at: Utc::now(),
            #[cfg(feature = "metrics")]
            registry: DashMap::new(),
        };

        for _ in 0..config.initial_workers {
            if let Err(e) = pool.add_worker() {
                log::warn!(target: LOG_TARGET, "failed to add initial worker: {}", e);
            }
        }

        Ok(pool)
    }

    /// Submit a job, waiting for queue space if the queue is full
    ///
    /// # Errors
    ///
    /// [`PoolError::Closed`] if the pool is closed, or becomes closed while
    /// this call waits for space. If a slot frees up at the same moment the
    /// pool closes, the wait may still end with the job accepted; such a job
    /// is processed like any other queued before the close.
    pub fn submit<J: Job + 'static>(&self, job: J) -> Result<()> {
        self.enqueue(Box::new(job), SubmitWait::Block)
    }

    /// Submit a closure as a job
    pub fn execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.submit(ClosureJob::new(f))
    }

    /// Submit without waiting
    ///
    /// # Errors
    ///
    /// - `PoolError::Closed` - Pool is closed
    /// - `PoolError::QueueFull` - Queue is at capacity
    pub fn try_submit<J: Job + 'static>(&self, job: J) -> Result<()> {
        self.enqueue(Box::new(job), SubmitWait::NoWait)
    }

    /// Execute a closure without waiting for queue space
    pub fn try_execute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.try_submit(ClosureJob::new(f))
    }

    /// Submit, waiting at most `timeout` for queue space
    ///
    /// # Errors
    ///
    /// - `PoolError::Closed` - Pool is closed
    /// - `PoolError::SubmissionTimeout` - No space freed up in time
    pub fn submit_timeout<J: Job + 'static>(&self, job: J, timeout: Duration) -> Result<()> {
        self.enqueue(Box::new(job), SubmitWait::Timeout(timeout))
    }

    /// Execute a closure, waiting at most `timeout` for queue space
    pub fn execute_timeout<F>(&self, f: F, timeout: Duration) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.submit_timeout(ClosureJob::new(f), timeout)
    }

    fn enqueue(&self, job: BoxedJob, wait: SubmitWait) -> Result<()> {
        let result = self.try_enqueue(job, wait);
        let counter = if result.is_ok() {
            &self.jobs_submitted
        } else {
            &self.jobs_rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }

    fn try_enqueue(&self, job: BoxedJob, wait: SubmitWait) -> Result<()> {
        let queue = &self.ctx.queue;

        // Fast path under the lock; only a full queue makes us wait
        let job = {
            let state = self.state.lock();
            if state.closed {
                return Err(PoolError::Closed);
            }
            match queue.try_send(job) {
                Ok(()) => return Ok(()),
                Err(QueueError::Full(job)) => job,
                Err(_) => return Err(PoolError::Closed),
            }
        };

        let sent = match wait {
            SubmitWait::Block => queue.send(job),
            SubmitWait::Timeout(timeout) => queue.send_timeout(job, timeout),
            SubmitWait::NoWait => Err(QueueError::Full(job)),
        };

        sent.map_err(|e| match e {
            QueueError::Full(_) => PoolError::queue_full(queue.capacity()),
            QueueError::Closed(_) => PoolError::Closed,
            QueueError::Timeout(_) => {
                let timeout_ms = match wait {
                    SubmitWait::Timeout(timeout) => timeout.as_millis() as u64,
                    _ => 0,
                };
                PoolError::submission_timeout(timeout_ms)
            }
        })
    }

    /// Start one more worker on the shared queue
    ///
    /// Returns the new worker's id, always higher than any id handed out
    /// before.
    ///
    /// # Errors
    ///
    /// - `PoolError::Closed` - Pool is closed
    /// - `PoolError::SpawnError` - The OS refused to create the thread
    pub fn add_worker(&self) -> Result<WorkerId> {
        let (id, started) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(PoolError::Closed);
            }

            state.last_id += 1;
            let id = WorkerId::new(state.last_id);

            let started = Worker::start(id, &self.ctx).map(|worker| {
                #[cfg(feature = "metrics")]
                self.registry.insert(id, worker.stats());
                state.workers.push(worker);
            });
            (id, started)
        };

        match started {
            Ok(()) => {
                self.ctx.observer.on_event(&PoolEvent::WorkerAdded { worker: id });
                Ok(id)
            }
            Err(e) => {
                self.ctx.observer.on_event(&PoolEvent::WorkerSpawnFailed {
                    worker: id,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Ask the most recently added worker to stop
    ///
    /// Returns as soon as the signal is sent; the worker may still be finishing
    /// its current job.
    ///
    /// # Errors
    ///
    /// `PoolError::NoActiveWorkers` if there is no active worker.
    pub fn remove_worker(&self) -> Result<WorkerId> {
        let worker = self
            .state
            .lock()
            .workers
            .pop()
            .ok_or(PoolError::NoActiveWorkers)?;
        worker.stop();
        Ok(worker.id())
    }

    /// Stop accepting jobs and workers; queued jobs are still processed
    ///
    /// Idempotent and non-blocking.
    pub fn close(&self) {
        let closed_now = self.close_locked(&mut self.state.lock());
        if closed_now {
            self.ctx.observer.on_event(&PoolEvent::Closed);
        }
    }

    /// Close, stop every worker after its current job, and wait for all of them
    ///
    /// Waits for every worker the pool ever started, including ones removed
    /// earlier that are still finishing a job. Safe to call repeatedly or
    /// concurrently: the workers are signalled once and every caller returns
    /// only after the last worker has exited.
    pub fn stop_all(&self) {
        let (closed_now, first_caller, stopped) = {
            let mut state = self.state.lock();
            let closed_now = self.close_locked(&mut state);
            if state.stop_all_performed {
                (closed_now, false, Vec::new())
            } else {
                state.stop_all_performed = true;
                (closed_now, true, std::mem::take(&mut state.workers))
            }
        };

        if closed_now {
            self.ctx.observer.on_event(&PoolEvent::Closed);
        }
        if first_caller {
            self.ctx.observer.on_event(&PoolEvent::StopAllStarted {
                active: stopped.len(),
            });
            for worker in &stopped {
                worker.stop();
            }
        }

        self.ctx.tracker.wait();

        for worker in stopped {
            let id = worker.id();
            if let Err(e) = worker.join() {
                log::warn!(target: LOG_TARGET, "{} did not exit cleanly: {}", id, e);
            }
        }

        if first_caller {
            self.ctx.observer.on_event(&PoolEvent::StopAllCompleted);
        }
    }

    /// Close and wait until the queue is drained and every worker has exited
    ///
    /// Unlike [`stop_all`](Self::stop_all) no worker is interrupted, so every
    /// job accepted before the close runs. With no active workers left this
    /// waits only for removed workers still finishing a job.
    pub fn close_and_wait(&self) {
        self.close();
        self.ctx.tracker.wait();
    }

    /// Returns `true` only for the call that closed the pool; that caller
    /// emits `PoolEvent::Closed` once the lock is released
    fn close_locked(&self, state: &mut PoolState) -> bool {
        if state.closed {
            return false;
        }
        state.closed = true;
        state.closed_at = Some(Utc::now());
        self.ctx.queue.close();
        true
    }

    /// Ids of the active workers, oldest first
    pub fn active_workers(&self) -> Vec<WorkerId> {
        self.state.lock().workers.iter().map(Worker::id).collect()
    }

    /// Number of active workers
    pub fn active_count(&self) -> usize {
        self.state.lock().workers.len()
    }

    /// Workers started and not yet exited, removed ones included
    pub fn outstanding_workers(&self) -> usize {
        self.ctx.tracker.outstanding()
    }

    /// Whether `close` or `stop_all` has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Jobs waiting in the queue (approximate)
    pub fn queue_len(&self) -> usize {
        self.ctx.queue.len()
    }

    /// Fixed queue capacity
    pub fn queue_capacity(&self) -> usize {
        self.ctx.queue.capacity()
    }

    /// Get total number of jobs accepted
    pub fn total_jobs_submitted(&self) -> u64 {
        self.jobs_submitted.load(Ordering::Relaxed)
    }

    /// Get total jobs processed across all workers, past and present
    pub fn total_jobs_processed(&self) -> u64 {
        self.ctx.totals.get_jobs_processed()
    }

    /// Get total jobs failed across all workers, past and present
    pub fn total_jobs_failed(&self) -> u64 {
        self.ctx.totals.get_jobs_failed()
    }

    /// Get total jobs panicked across all workers, past and present
    pub fn total_jobs_panicked(&self) -> u64 {
        self.ctx.totals.get_jobs_panicked()
    }

    /// Statistics of one worker, active or already removed
    #[cfg(feature = "metrics")]
    pub fn worker_stats(&self, id: WorkerId) -> Option<WorkerStatSnapshot> {
        self.registry.get(&id).map(|stats| stats.snapshot())
    }

    /// Snapshot of the pool
    pub fn stats(&self) -> PoolStats {
        let (active_workers, is_closed, closed_at) = {
            let state = self.state.lock();
            (
                state.workers.iter().map(Worker::id).collect(),
                state.closed,
                state.closed_at,
            )
        };

        PoolStats {
            active_workers,
            outstanding_workers: self.ctx.tracker.outstanding(),
            queued_jobs: self.ctx.queue.len(),
            queue_capacity: self.ctx.queue.capacity(),
            is_closed,
            jobs_submitted: self.jobs_submitted.load(Ordering::Relaxed),
            jobs_rejected: self.jobs_rejected.load(Ordering::Relaxed),
            jobs_processed: self.ctx.totals.get_jobs_processed(),
            jobs_failed: self.ctx.totals.get_jobs_failed(),
            jobs_panicked: self.ctx.totals.get_jobs_panicked(),
            created_at: self.created_at,
            closed_at,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}
