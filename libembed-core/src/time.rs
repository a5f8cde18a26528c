//! Tick-based waits
//!
//! Every wait loops on `wait_turn()`, so other coroutines keep running
//! while the caller is blocked. Elapsed time is computed with
//! `wrapping_sub`; a wait across the `u32` wrap of the tick counter still
//! ends on time.

use libembed_hal::TickSource;

use crate::fault::Fault;
use crate::scheduler;

/// Block the caller cooperatively for at least `ms` milliseconds
pub fn delay_ms<T: TickSource + ?Sized>(tick: &T, ms: u32) {
    let start = tick.now_ms();
    while tick.elapsed_since(start) < ms {
        scheduler::wait_turn();
    }
}

/// Block the caller cooperatively until `condition` returns `true`
pub fn yield_until<F: FnMut() -> bool>(mut condition: F) {
    while !condition() {
        scheduler::wait_turn();
    }
}

/// Like [`yield_until`], giving up after `timeout_ms`
///
/// The condition is checked once more after the timeout expired, so a
/// condition that became true on the last turn still succeeds.
pub fn wait_for<T, F>(tick: &T, timeout_ms: u32, mut condition: F) -> Result<(), Fault>
where
    T: TickSource + ?Sized,
    F: FnMut() -> bool,
{
    let start = tick.now_ms();
    loop {
        if condition() {
            return Ok(());
        }
        if tick.elapsed_since(start) >= timeout_ms {
            return Err(Fault::timeout("condition not met in time"));
        }
        scheduler::wait_turn();
    }
}
