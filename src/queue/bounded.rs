//! Bounded FIFO queue with capacity limit.

use super::{QueueError, QueueResult};
use crate::core::{BoxedJob, CancellationToken};
use crossbeam_channel::{self as channel, Receiver, Select, Sender, TrySendError};
use parking_lot::RwLock;
use std::time::Duration;

/// A bounded FIFO queue with configurable capacity.
///
/// The queue keeps the only long-lived [`Sender`]. [`close`](Self::close) drops
/// it, so consumers see the channel disconnect once the remaining jobs have been
/// received, and fires a close signal that releases producers blocked on a full
/// queue.
///
/// # Example
///
/// ```rust
/// use rust_worker_pool::queue::{BoundedQueue, QueueError};
/// use rust_worker_pool::core::ClosureJob;
///
/// let queue = BoundedQueue::new(2);
///
/// // Fill the queue
/// queue.send(Box::new(ClosureJob::new(|| Ok(())))).unwrap();
/// queue.send(Box::new(ClosureJob::new(|| Ok(())))).unwrap();
///
/// // Queue is now full - try_send will fail
/// match queue.try_send(Box::new(ClosureJob::new(|| Ok(())))) {
///     Err(QueueError::Full(_)) => println!("Queue is full"),
///     _ => panic!("expected Full error"),
/// }
/// ```
pub struct BoundedQueue {
    sender: RwLock<Option<Sender<BoxedJob>>>,
    receiver: Receiver<BoxedJob>,
    closed: CancellationToken,
    capacity: usize,
}

impl std::fmt::Debug for BoundedQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.receiver.len())
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}

impl BoundedQueue {
    /// Creates a new bounded queue with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        let (sender, receiver) = channel::bounded(capacity);
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            closed: CancellationToken::new(),
            capacity,
        }
    }

    /// Returns the maximum capacity of this queue.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of jobs waiting to be claimed.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Whether no job is waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Consumer side of the queue.
    ///
    /// `recv` on it fails only once the queue is closed and drained.
    pub fn receiver(&self) -> &Receiver<BoxedJob> {
        &self.receiver
    }

    /// Enqueues a job, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// [`QueueError::Closed`] if the queue is closed before or while waiting.
    pub fn send(&self, job: BoxedJob) -> QueueResult<()> {
        let (sender, job) = match self.try_send_inner(job)? {
            Some(pending) => pending,
            None => return Ok(()),
        };
        self.wait_for_space(&sender, job, None)
    }

    /// Enqueues a job without blocking.
    ///
    /// # Errors
    ///
    /// [`QueueError::Full`] if the queue is at capacity, [`QueueError::Closed`]
    /// if it is closed.
    pub fn try_send(&self, job: BoxedJob) -> QueueResult<()> {
        match self.try_send_inner(job)? {
            Some((_, job)) => Err(QueueError::Full(job)),
            None => Ok(()),
        }
    }

    /// Enqueues a job, waiting at most `timeout` for space.
    ///
    /// # Errors
    ///
    /// [`QueueError::Timeout`] if no space became available in time,
    /// [`QueueError::Closed`] if the queue is closed before or while waiting.
    pub fn send_timeout(&self, job: BoxedJob, timeout: Duration) -> QueueResult<()> {
        let (sender, job) = match self.try_send_inner(job)? {
            Some(pending) => pending,
            None => return Ok(()),
        };
        self.wait_for_space(&sender, job, Some(timeout))
    }

    /// Closes the queue for further writes. Returns `true` for the call that
    /// actually closed it.
    pub fn close(&self) -> bool {
        let first = self.closed.cancel();
        self.sender.write().take();
        first
    }

    /// Attempts a non-blocking send. `Ok(None)` means the job was enqueued,
    /// `Ok(Some(..))` hands back a sender and the job because the queue is full.
    fn try_send_inner(&self, job: BoxedJob) -> QueueResult<Option<(Sender<BoxedJob>, BoxedJob)>> {
        let sender = match self.sender.read().as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(QueueError::Closed(job)),
        };
        match sender.try_send(job) {
            Ok(()) => Ok(None),
            Err(TrySendError::Full(job)) => Ok(Some((sender, job))),
            Err(TrySendError::Disconnected(job)) => Err(QueueError::Closed(job)),
        }
    }

    /// Blocks until the job is accepted, the queue closes, or the timeout expires.
    fn wait_for_space(
        &self,
        sender: &Sender<BoxedJob>,
        job: BoxedJob,
        timeout: Option<Duration>,
    ) -> QueueResult<()> {
        let closed = self.closed.receiver();
        let mut select = Select::new();
        let send_index = select.send(sender);
        select.recv(closed);

        let operation = match timeout {
            Some(timeout) => match select.select_timeout(timeout) {
                Ok(operation) => operation,
                Err(_) => return Err(QueueError::Timeout(job)),
            },
            None => select.select(),
        };

        if operation.index() == send_index {
            operation
                .send(sender, job)
                .map_err(|e| QueueError::Closed(e.into_inner()))
        } else {
            // The close signal never carries a message, only disconnects
            let _ = operation.recv(closed);
            Err(QueueError::Closed(job))
        }
    }
}
