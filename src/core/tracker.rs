//! Completion tracking for worker threads
//!
//! Every worker registers before its thread starts and holds the returned
//! [`CompletionGuard`] for the lifetime of its loop. Dropping the guard
//! deregisters it, including on unwind.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    outstanding: Mutex<usize>,
    drained: Condvar,
}

/// Shared count of running workers with blocking wait-for-zero
#[derive(Clone, Debug, Default)]
pub struct CompletionTracker {
    inner: Arc<Inner>,
}

impl CompletionTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unit of outstanding work
    pub fn register(&self) -> CompletionGuard {
        *self.inner.outstanding.lock() += 1;
        CompletionGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Number of registrations not yet released
    pub fn outstanding(&self) -> usize {
        *self.inner.outstanding.lock()
    }

    /// Block until every registration has been released
    ///
    /// Any number of threads may wait at the same time.
    pub fn wait(&self) {
        let mut outstanding = self.inner.outstanding.lock();
        while *outstanding > 0 {
            self.inner.drained.wait(&mut outstanding);
        }
    }

    /// Like [`wait`](Self::wait) with an upper bound. Returns `true` if the
    /// count reached zero in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut outstanding = self.inner.outstanding.lock();
        while *outstanding > 0 {
            if self
                .inner
                .drained
                .wait_until(&mut outstanding, deadline)
                .timed_out()
            {
                return *outstanding == 0;
            }
        }
        true
    }
}

/// Registration handle; releases on drop
#[derive(Debug)]
pub struct CompletionGuard {
    inner: Arc<Inner>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let mut outstanding = self.inner.outstanding.lock();
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.inner.drained.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_register_and_release() {
        let tracker = CompletionTracker::new();
        let a = tracker.register();
        let b = tracker.register();
        assert_eq!(tracker.outstanding(), 2);

        drop(a);
        assert_eq!(tracker.outstanding(), 1);
        drop(b);
        assert_eq!(tracker.outstanding(), 0);
    }

    #[test]
    fn test_wait_returns_immediately_when_empty() {
        let tracker = CompletionTracker::new();
        tracker.wait();
        assert!(tracker.wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn test_wait_blocks_until_released() {
        let tracker = CompletionTracker::new();
        let guard = tracker.register();

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            drop(guard);
        });

        let start = Instant::now();
        tracker.wait();
        assert!(start.elapsed() >= Duration::from_millis(40));
        assert_eq!(tracker.outstanding(), 0);
        releaser.join().unwrap();
    }

    #[test]
    fn test_multiple_waiters() {
        let tracker = CompletionTracker::new();
        let guard = tracker.register();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let tracker = tracker.clone();
                thread::spawn(move || tracker.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        drop(guard);

        for waiter in waiters {
            waiter.join().unwrap();
        }
    }

    #[test]
    fn test_wait_timeout_expires() {
        let tracker = CompletionTracker::new();
        let _guard = tracker.register();
        assert!(!tracker.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn test_guard_released_on_panic() {
        let tracker = CompletionTracker::new();
        let guard = tracker.register();

        let result = thread::spawn(move || {
            let _guard = guard;
            panic!("worker died");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(tracker.outstanding(), 0);
    }
}
