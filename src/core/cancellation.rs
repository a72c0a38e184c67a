//! Once-only cancellation signal
//!
//! A [`CancellationToken`] can be polled with [`is_cancelled`](CancellationToken::is_cancelled)
//! and waited on inside a `crossbeam_channel::select!` through
//! [`receiver`](CancellationToken::receiver): the channel never carries a message,
//! it disconnects when the token fires, which wakes every waiter at once.
//!
//! # Example
//!
//! ```rust
//! use rust_worker_pool::CancellationToken;
//! use std::thread;
//!
//! let token = CancellationToken::new();
//! let waiter = token.clone();
//!
//! let handle = thread::spawn(move || {
//!     // Blocks until the token fires
//!     let _ = waiter.receiver().recv();
//!     waiter.is_cancelled()
//! });
//!
//! assert!(token.cancel());
//! assert!(!token.cancel()); // second call has no effect
//! assert!(handle.join().unwrap());
//! ```

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Inner {
    cancelled: AtomicBool,
    trigger: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl std::fmt::Debug for Inner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.cancelled.load(Ordering::Relaxed))
            .finish()
    }
}

/// A thread-safe, idempotent, fire-once cancellation signal
///
/// Clones share the same state.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Create a new, unfired token
    pub fn new() -> Self {
        let (trigger, receiver) = crossbeam_channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                receiver,
            }),
        }
    }

    /// Fire the token
    ///
    /// Safe to call any number of times from any number of threads. Returns
    /// `true` only for the single call that actually fired it.
    pub fn cancel(&self) -> bool {
        if self
            .inner
            .cancelled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        // Dropping the only sender disconnects the channel for all receivers
        drop(self.inner.trigger.lock().take());
        true
    }

    /// Check whether the token has fired, without blocking
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Channel that becomes disconnected once the token fires
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.receiver
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_cancellation_token_creation() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.receiver().try_recv().is_err());
    }

    #[test]
    fn test_cancellation_token_cancel() {
        let token = CancellationToken::new();
        assert!(token.cancel());
        assert!(token.is_cancelled());
        assert!(matches!(
            token.receiver().recv_timeout(Duration::from_millis(10)),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn test_cancellation_token_clone() {
        let token = CancellationToken::new();
        let clone = token.clone();

        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_concurrent_cancellation_fires_once() {
        let token = CancellationToken::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let token = token.clone();
                let fired = Arc::clone(&fired);
                thread::spawn(move || {
                    if token.cancel() {
                        fired.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_blocked_receiver_wakes_on_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();

        let handle = thread::spawn(move || waiter.receiver().recv().is_err());

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(handle.join().unwrap());
    }
}
