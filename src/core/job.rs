//! Job trait and related types

use crate::core::error::{PoolError, Result};
use std::fmt;

/// A unit of work executed by exactly one worker
///
/// The pool never inspects what a job computes. It only guarantees that a
/// dequeued job runs to completion on the worker that claimed it.
pub trait Job: Send {
    /// Execute the job
    ///
    /// # Errors
    ///
    /// Returns an error if the job execution fails. The error is counted and
    /// reported, it never affects the pool.
    fn execute(&mut self) -> Result<()>;

    /// Get the job's type name for logging and statistics
    fn job_type(&self) -> &str {
        "Job"
    }
}

impl fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({})", self.job_type())
    }
}

/// A boxed job that can be sent across threads
pub type BoxedJob = Box<dyn Job>;

/// Helper to create a job from a closure
pub struct ClosureJob<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    closure: Option<F>,
    name: String,
}

impl<F> ClosureJob<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    /// Create a new closure job
    pub fn new(closure: F) -> Self {
        Self {
            closure: Some(closure),
            name: "ClosureJob".to_string(),
        }
    }

    /// Create a new closure job with a custom name
    pub fn with_name<S: Into<String>>(closure: F, name: S) -> Self {
        Self {
            closure: Some(closure),
            name: name.into(),
        }
    }
}

impl<F> Job for ClosureJob<F>
where
    F: FnOnce() -> Result<()> + Send,
{
    fn execute(&mut self) -> Result<()> {
        match self.closure.take() {
            Some(closure) => closure(),
            None => Err(PoolError::execution(
                self.name.clone(),
                "closure already executed",
            )),
        }
    }

    fn job_type(&self) -> &str {
        &self.name
    }
}

/// A value payload paired with the function that processes it
///
/// ```rust
/// use rust_worker_pool::core::{Job, PayloadJob};
///
/// let mut job = PayloadJob::new("task-1".to_string(), |task: String| {
///     assert_eq!(task, "task-1");
///     Ok(())
/// });
/// assert_eq!(job.payload(), Some(&"task-1".to_string()));
/// job.execute().unwrap();
/// ```
pub struct PayloadJob<T, F>
where
    T: Send,
    F: FnOnce(T) -> Result<()> + Send,
{
    payload: Option<T>,
    handler: Option<F>,
    name: String,
}

impl<T, F> PayloadJob<T, F>
where
    T: Send,
    F: FnOnce(T) -> Result<()> + Send,
{
    /// Create a payload job
    pub fn new(payload: T, handler: F) -> Self {
        Self {
            payload: Some(payload),
            handler: Some(handler),
            name: "PayloadJob".to_string(),
        }
    }

    /// Set the name reported as this job's type
    #[must_use]
    pub fn named<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// The payload, while the job has not run yet
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }
}

impl<T, F> Job for PayloadJob<T, F>
where
    T: Send,
    F: FnOnce(T) -> Result<()> + Send,
{
    fn execute(&mut self) -> Result<()> {
        match (self.payload.take(), self.handler.take()) {
            (Some(payload), Some(handler)) => handler(payload),
            _ => Err(PoolError::execution(
                self.name.clone(),
                "payload already processed",
            )),
        }
    }

    fn job_type(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_job() {
        let mut job = ClosureJob::new(|| Ok(()));

        assert_eq!(job.job_type(), "ClosureJob");
        assert!(job.execute().is_ok());
    }

    #[test]
    fn test_closure_job_runs_once() {
        let mut job = ClosureJob::with_name(|| Ok(()), "Once");
        assert!(job.execute().is_ok());

        let second = job.execute();
        assert!(matches!(second, Err(PoolError::ExecutionError { .. })));
    }

    #[test]
    fn test_payload_job_hands_over_payload() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut job = PayloadJob::new(String::from("task-3"), move |task| {
            tx.send(task).map_err(|e| PoolError::other(e.to_string()))
        })
        .named("StringTask");

        assert_eq!(job.job_type(), "StringTask");
        job.execute().unwrap();
        assert_eq!(rx.try_recv().unwrap(), "task-3");
        assert!(job.payload().is_none());
        assert!(job.execute().is_err());
    }

    #[test]
    fn test_boxed_job_debug() {
        let job: BoxedJob = Box::new(ClosureJob::with_name(|| Ok(()), "Report"));
        assert_eq!(format!("{:?}", job), "Job(Report)");
    }
}
