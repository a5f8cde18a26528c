//! Millisecond tick source
//!
//! Timed waits in the runtime only need "how many milliseconds have passed".
//! The counter is expected to wrap at `u32::MAX`; consumers compare with
//! `wrapping_sub` so the wrap after ~49.7 days is harmless.

use portable_atomic::{AtomicU32, Ordering};

/// Monotonic millisecond counter
pub trait TickSource {
    /// Current tick count in milliseconds (wrapping)
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `since` (wrap-safe)
    fn elapsed_since(&self, since: u32) -> u32 {
        self.now_ms().wrapping_sub(since)
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Tick counter advanced from a periodic timer interrupt
///
/// Boards without a time driver put one of these in a `static` and call
/// [`TickCounter::increment`] from their 1 kHz SysTick handler. Only the
/// interrupt writes; readers just load.
#[derive(Debug)]
pub struct TickCounter {
    ticks: AtomicU32,
}

impl TickCounter {
    /// Create a counter starting at zero
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU32::new(0),
        }
    }

    /// Advance by one millisecond (call from the timer ISR)
    pub fn increment(&self) {
        self.advance(1);
    }

    /// Advance by `ms` milliseconds
    pub fn advance(&self, ms: u32) {
        self.ticks.fetch_add(ms, Ordering::Relaxed);
    }

    /// Force the counter to a value (testing and wrap checks)
    pub fn set(&self, ms: u32) {
        self.ticks.store(ms, Ordering::Relaxed);
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for TickCounter {
    fn now_ms(&self) -> u32 {
        self.ticks.load(Ordering::Relaxed)
    }
}
