//! Cooperative spin-yield lock
//!
//! A single `held` flag polled by every waiter. There is no queue: whoever
//! gets its turn first after a release takes the lock, so fairness is only
//! as good as the round-robin order. Blocking driver calls wrap their bus
//! access in a `Lock` to stay scheduler-friendly.
//!
//! A coroutine stopped while holding a lock leaves it held.
//!
//! Like the scheduler it serves, a `Lock` is per thread under `std` and is
//! not `Sync` there.

use core::cell::Cell;

use crate::scheduler;

/// Mutual exclusion between coroutines
#[derive(Debug)]
pub struct Lock {
    held: Cell<bool>,
}

// SAFETY: coroutines only switch at explicit yield points on a single core;
// interrupt handlers must not use a `Lock`.
#[cfg(not(any(test, feature = "std")))]
unsafe impl Sync for Lock {}

impl Lock {
    pub const fn new() -> Self {
        Self {
            held: Cell::new(false),
        }
    }

    /// Wait until the lock is free, then take it
    pub fn acquire(&self) {
        while self.held.get() {
            scheduler::wait_turn();
        }
        self.held.set(true);
    }

    /// Take the lock if it is free
    pub fn try_acquire(&self) -> bool {
        if self.held.get() {
            false
        } else {
            self.held.set(true);
            true
        }
    }

    /// Free the lock and yield so a waiter can pick it up right away
    pub fn release(&self) {
        self.release_noyield();
        scheduler::yield_now();
    }

    /// Free the lock without yielding
    ///
    /// For call sites that are about to yield anyway.
    pub fn release_noyield(&self) {
        self.held.set(false);
    }

    pub fn is_held(&self) -> bool {
        self.held.get()
    }

    /// [`acquire`](Self::acquire) and release again when the guard drops
    pub fn lock(&self) -> LockGuard<'_> {
        self.acquire();
        LockGuard { lock: self }
    }
}

impl Default for Lock {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a [`Lock`] until dropped; the drop is a yielding `release()`
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    lock: &'a Lock,
}

impl LockGuard<'_> {
    /// Release without the trailing yield
    pub fn unlock_noyield(self) {
        self.lock.release_noyield();
        core::mem::forget(self);
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
