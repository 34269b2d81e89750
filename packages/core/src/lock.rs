//! The lock collaborator interface.
//!
//! The river never implements synchronization itself. Callers attach any
//! [`Lock`] to a subtree with [`Builder::lock`](crate::Builder::lock), and
//! every channel or rivulet access inside that subtree is bracketed by one
//! `acquire()` and one `release()`.

use std::sync::Arc;

#[cfg(any(test, feature = "test-utils"))]
use std::sync::atomic::{AtomicU64, Ordering};

/// Interface for a lock.
///
/// Implementations may block in `acquire()`; the river has no opinion on
/// that and offers no timeout or cancellation.
pub trait Lock: Send + Sync {
    /// Acquires the lock.
    fn acquire(&self);

    /// Releases the lock.
    fn release(&self);
}

/// A lock shared between a builder and every link it guards.
pub type SharedLock = Arc<dyn Lock>;

/// Holds an optional lock for the duration of one access.
pub(crate) struct LockGuard<'a> {
    lock: Option<&'a dyn Lock>,
}

impl<'a> LockGuard<'a> {
    pub(crate) fn acquire(lock: Option<&'a dyn Lock>) -> Self {
        if let Some(lock) = lock {
            lock.acquire();
        }
        Self { lock }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Some(lock) = self.lock {
            lock.release();
        }
    }
}

/// A lock that only counts how often it was acquired and released.
///
/// Useful for asserting the one-acquire-per-access contract in tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct CountingLock {
    acquired: AtomicU64,
    released: AtomicU64,
}

#[cfg(any(test, feature = "test-utils"))]
impl CountingLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire_count(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Lock for CountingLock {
    fn acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
