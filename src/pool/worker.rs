//! Worker thread implementation

use crate::core::{
    BoxedJob, CancellationToken, CompletionGuard, CompletionTracker, PoolError, Result,
};
use crate::observer::{JobOutcome, PoolEvent, PoolObserver};
use crate::queue::BoundedQueue;
use crossbeam_channel::select;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::{debug, span, Level};

/// Identifier of a worker, unique within its pool and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Wrap a raw id
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {}", self.0)
    }
}

/// Why a worker left its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    /// Its stop signal fired
    Stopped,
    /// The queue was closed and had no jobs left
    QueueDrained,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Stopped => write!(f, "stop signal"),
            ExitReason::QueueDrained => write!(f, "queue closed and drained"),
        }
    }
}

/// Statistics for a worker thread
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Total number of jobs processed
    pub jobs_processed: AtomicU64,
    /// Total number of jobs that failed
    pub jobs_failed: AtomicU64,
    /// Total number of jobs that panicked
    pub jobs_panicked: AtomicU64,
    /// Total time spent processing jobs (microseconds)
    pub total_processing_time_us: AtomicU64,
}

impl WorkerStats {
    /// Create new worker statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment jobs processed counter
    pub fn increment_processed(&self) {
        self.jobs_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment jobs failed counter
    pub fn increment_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment jobs panicked counter
    pub fn increment_panicked(&self) {
        self.jobs_panicked.fetch_add(1, Ordering::Relaxed);
    }

    /// Add processing time
    pub fn add_processing_time(&self, microseconds: u64) {
        self.total_processing_time_us
            .fetch_add(microseconds, Ordering::Relaxed);
    }

    /// Get total jobs processed
    pub fn get_jobs_processed(&self) -> u64 {
        self.jobs_processed.load(Ordering::Relaxed)
    }

    /// Get total jobs failed
    pub fn get_jobs_failed(&self) -> u64 {
        self.jobs_failed.load(Ordering::Relaxed)
    }

    /// Get total jobs panicked
    pub fn get_jobs_panicked(&self) -> u64 {
        self.jobs_panicked.load(Ordering::Relaxed)
    }

    /// Jobs that ran to an outcome, whatever it was
    pub fn get_jobs_completed(&self) -> u64 {
        self.get_jobs_processed() + self.get_jobs_failed() + self.get_jobs_panicked()
    }

    /// Get average processing time per job in microseconds
    pub fn get_average_processing_time_us(&self) -> f64 {
        let total = self.total_processing_time_us.load(Ordering::Relaxed);
        let count = self.get_jobs_completed();
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> WorkerStatSnapshot {
        WorkerStatSnapshot {
            jobs_processed: self.get_jobs_processed(),
            jobs_failed: self.get_jobs_failed(),
            jobs_panicked: self.get_jobs_panicked(),
            total_processing_time_us: self.total_processing_time_us.load(Ordering::Relaxed),
            average_processing_time_us: self.get_average_processing_time_us(),
        }
    }

    fn record(&self, outcome: &JobOutcome, elapsed_us: u64) {
        match outcome {
            JobOutcome::Succeeded => self.increment_processed(),
            JobOutcome::Failed(_) => self.increment_failed(),
            JobOutcome::Panicked(_) => self.increment_panicked(),
        }
        self.add_processing_time(elapsed_us);
    }
}

/// Serializable copy of [`WorkerStats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerStatSnapshot {
    /// Jobs that returned `Ok`
    pub jobs_processed: u64,
    /// Jobs that returned an error
    pub jobs_failed: u64,
    /// Jobs that panicked
    pub jobs_panicked: u64,
    /// Total time spent in jobs (microseconds)
    pub total_processing_time_us: u64,
    /// Mean time per job (microseconds)
    pub average_processing_time_us: f64,
}

/// Everything a worker shares with its pool
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub(crate) queue: Arc<BoundedQueue>,
    pub(crate) tracker: CompletionTracker,
    pub(crate) observer: Arc<dyn PoolObserver>,
    pub(crate) totals: Arc<WorkerStats>,
    pub(crate) thread_name_prefix: String,
}

/// A worker thread that claims jobs from the shared queue
///
/// The worker runs until its [`stop`](Worker::stop) signal fires or the queue is
/// closed and drained. A job in progress is always finished first. Dropping a
/// `Worker` detaches its thread without stopping it.
pub(crate) struct Worker {
    id: WorkerId,
    token: CancellationToken,
    stats: Arc<WorkerStats>,
    observer: Arc<dyn PoolObserver>,
    thread: Option<thread::JoinHandle<()>>,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("stop_requested", &self.token.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl Worker {
    /// Register with the completion tracker, then spawn the worker thread
    ///
    /// Registration happens on the caller's thread, so a waiter that starts
    /// after this returns always accounts for the new worker. If the spawn
    /// fails the registration is released again.
    pub(crate) fn start(id: WorkerId, ctx: &WorkerContext) -> Result<Self> {
        let token = CancellationToken::new();
        let stats = Arc::new(WorkerStats::new());
        let guard = ctx.tracker.register();

        let thread = {
            let token = token.clone();
            let stats = Arc::clone(&stats);
            let queue = Arc::clone(&ctx.queue);
            let observer = Arc::clone(&ctx.observer);
            let totals = Arc::clone(&ctx.totals);
            thread::Builder::new()
                .name(format!("{}-{}", ctx.thread_name_prefix, id.get()))
                .spawn(move || Self::run(id, token, queue, stats, totals, observer, guard))
                .map_err(|e| PoolError::spawn_with_source(id.get(), e.to_string(), e))?
        };

        Ok(Self {
            id,
            token,
            stats,
            observer: Arc::clone(&ctx.observer),
            thread: Some(thread),
        })
    }

    /// Get worker ID
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Get worker statistics
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Ask the worker to exit after its current job
    ///
    /// Idempotent. Returns `true` only for the call that delivered the signal.
    pub fn stop(&self) -> bool {
        let fired = self.token.cancel();
        if fired {
            self.observer
                .on_event(&PoolEvent::WorkerStopRequested { worker: self.id });
        }
        fired
    }

    /// Whether the worker thread has left its loop
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Join the worker thread
    pub fn join(mut self) -> Result<()> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| PoolError::other(format!("{} panicked", self.id)))?;
        }
        Ok(())
    }

    /// Main worker loop
    ///
    /// Blocks on whichever comes first: a job or the stop signal. The signal is
    /// also polled before every wait so a stop is never lost behind a steady
    /// stream of ready jobs.
    fn run(
        id: WorkerId,
        token: CancellationToken,
        queue: Arc<BoundedQueue>,
        stats: Arc<WorkerStats>,
        totals: Arc<WorkerStats>,
        observer: Arc<dyn PoolObserver>,
        guard: CompletionGuard,
    ) {
        #[cfg(feature = "tracing")]
        let worker_span = span!(Level::DEBUG, "worker", id = id.get());
        #[cfg(feature = "tracing")]
        let _span_guard = worker_span.enter();

        #[cfg(feature = "tracing")]
        debug!("worker started");

        let reason = loop {
            if token.is_cancelled() {
                break ExitReason::Stopped;
            }

            let next = select! {
                recv(token.receiver()) -> _ => None,
                recv(queue.receiver()) -> job => Some(job),
            };

            match next {
                None => break ExitReason::Stopped,
                Some(Ok(mut job)) => {
                    Self::execute_job(id, &mut job, &stats, &totals, observer.as_ref())
                }
                Some(Err(_)) => break ExitReason::QueueDrained,
            }
        };

        #[cfg(feature = "tracing")]
        debug!(
            jobs_processed = stats.get_jobs_processed(),
            jobs_failed = stats.get_jobs_failed(),
            reason = %reason,
            "worker shutting down"
        );

        observer.on_event(&PoolEvent::WorkerExited { worker: id, reason });
        drop(guard);
    }

    /// Execute a single job with panic protection
    fn execute_job(
        id: WorkerId,
        job: &mut BoxedJob,
        stats: &WorkerStats,
        totals: &WorkerStats,
        observer: &dyn PoolObserver,
    ) {
        let job_type = job.job_type().to_string();

        #[cfg(feature = "tracing")]
        let job_span = span!(Level::DEBUG, "job_execution", job_type = %job_type);
        #[cfg(feature = "tracing")]
        let _job_guard = job_span.enter();

        observer.on_event(&PoolEvent::JobStarted {
            worker: id,
            job_type: job_type.clone(),
        });

        let start = Instant::now();
        let panic_result = catch_unwind(AssertUnwindSafe(|| job.execute()));
        let elapsed = start.elapsed();

        let outcome = match panic_result {
            Ok(Ok(())) => JobOutcome::Succeeded,
            Ok(Err(e)) => JobOutcome::Failed(e.to_string()),
            Err(panic_info) => {
                let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                JobOutcome::Panicked(message)
            }
        };

        #[cfg(feature = "tracing")]
        {
            let duration_ms = elapsed.as_millis() as u64;
            match &outcome {
                JobOutcome::Succeeded => debug!(duration_ms, "job completed"),
                JobOutcome::Failed(error) => {
                    tracing::warn!(error = %error, duration_ms, "job failed")
                }
                JobOutcome::Panicked(message) => {
                    tracing::error!(panic_message = %message, duration_ms, "job panicked")
                }
            }
        }

        let elapsed_us = elapsed.as_micros() as u64;
        stats.record(&outcome, elapsed_us);
        totals.record(&outcome, elapsed_us);

        observer.on_event(&PoolEvent::JobFinished {
            worker: id,
            job_type,
            elapsed,
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ClosureJob;
    use crate::observer::NoopObserver;
    use std::time::Duration;

    fn context(capacity: usize) -> WorkerContext {
        WorkerContext {
            queue: Arc::new(BoundedQueue::new(capacity)),
            tracker: CompletionTracker::new(),
            observer: Arc::new(NoopObserver),
            totals: Arc::new(WorkerStats::new()),
            thread_name_prefix: "test-worker".to_string(),
        }
    }

    #[test]
    fn test_worker_creation() {
        let ctx = context(4);
        let worker = Worker::start(WorkerId::new(1), &ctx).expect("Failed to start worker");
        assert_eq!(worker.id(), WorkerId::new(1));
        assert_eq!(ctx.tracker.outstanding(), 1);

        // Close queue to trigger worker shutdown
        ctx.queue.close();
        worker.join().expect("Failed to join worker");
        assert_eq!(ctx.tracker.outstanding(), 0);
    }

    #[test]
    fn test_worker_job_execution() {
        let ctx = context(4);
        let worker = Worker::start(WorkerId::new(1), &ctx).expect("Failed to start worker");
        let stats = worker.stats();

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        ctx.queue
            .send(Box::new(ClosureJob::new(move || {
                let _ = done_tx.send(());
                Ok(())
            })))
            .expect("Failed to send job");

        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("job should run");

        ctx.queue.close();
        worker.join().expect("Failed to join worker");

        assert_eq!(stats.get_jobs_processed(), 1);
        assert_eq!(stats.get_jobs_failed(), 0);
        assert_eq!(ctx.totals.get_jobs_processed(), 1);
    }

    #[test]
    fn test_worker_panic_handling() {
        let ctx = context(4);
        let worker = Worker::start(WorkerId::new(1), &ctx).expect("Failed to start worker");
        let stats = worker.stats();

        ctx.queue
            .send(Box::new(ClosureJob::new(|| {
                panic!("Intentional panic for testing");
            })))
            .expect("Failed to send panicking job");
        ctx.queue
            .send(Box::new(ClosureJob::new(|| Err(PoolError::other("bad input")))))
            .expect("Failed to send failing job");
        ctx.queue
            .send(Box::new(ClosureJob::new(|| Ok(()))))
            .expect("Failed to send normal job");

        // Closing lets the worker drain all three jobs and exit
        ctx.queue.close();
        worker.join().expect("Failed to join worker");

        assert_eq!(stats.get_jobs_panicked(), 1);
        assert_eq!(stats.get_jobs_failed(), 1);
        assert_eq!(stats.get_jobs_processed(), 1);
        assert_eq!(stats.get_jobs_completed(), 3);
    }

    #[test]
    fn test_stop_idle_worker_is_prompt() {
        let ctx = context(4);
        let worker = Worker::start(WorkerId::new(1), &ctx).expect("Failed to start worker");

        thread::sleep(Duration::from_millis(20));
        assert!(worker.stop());
        assert!(!worker.stop());
        assert!(worker.token.is_cancelled());

        assert!(ctx.tracker.wait_timeout(Duration::from_secs(1)));
        assert!(!ctx.queue.is_closed());
    }

    #[test]
    fn test_stop_finishes_current_job_first() {
        let ctx = context(4);
        let worker = Worker::start(WorkerId::new(1), &ctx).expect("Failed to start worker");
        let stats = worker.stats();

        let (started_tx, started_rx) = crossbeam_channel::bounded(1);
        ctx.queue
            .send(Box::new(ClosureJob::new(move || {
                let _ = started_tx.send(());
                thread::sleep(Duration::from_millis(100));
                Ok(())
            })))
            .unwrap();
        ctx.queue.send(Box::new(ClosureJob::new(|| Ok(())))).unwrap();

        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        worker.stop();
        ctx.tracker.wait();

        // The running job completed, the queued one was left behind
        assert_eq!(stats.get_jobs_processed(), 1);
        assert_eq!(ctx.queue.len(), 1);
    }

    #[test]
    fn test_worker_stats_snapshot() {
        let stats = WorkerStats::new();
        stats.record(&JobOutcome::Succeeded, 100);
        stats.record(&JobOutcome::Failed("x".into()), 300);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.jobs_processed, 1);
        assert_eq!(snapshot.jobs_failed, 1);
        assert_eq!(snapshot.total_processing_time_us, 400);
        assert_eq!(snapshot.average_processing_time_us, 200.0);
    }

    #[test]
    fn test_worker_id_display() {
        assert_eq!(WorkerId::new(3).to_string(), "worker 3");
        assert!(WorkerId::new(2) < WorkerId::new(3));
    }
}
