//! Scheduler loop
//!
//! Drives passes over the registry and provides the free-standing yield
//! used from anywhere inside a coroutine's call stack.

use super::{registry, runtime};

/// Run one pass over the coroutines registered right now
///
/// Coroutines started during the pass get their first turn in the next
/// one. Returns `false` without doing anything when called from inside a
/// coroutine, since passes do not nest.
pub fn run_pass() -> bool {
    let runtime = runtime();
    if runtime.in_pass.get() {
        warn!("nested scheduler pass ignored");
        return false;
    }

    runtime.in_pass.set(true);
    let len = registry::snapshot_len(runtime);
    for index in 0..len {
        runtime.cursor.set(index);
        if let Some(coroutine) = registry::entry(runtime, index) {
            coroutine.run_or_resume();
        }
    }
    runtime.in_pass.set(false);

    registry::sweep(runtime);
    runtime.passes.set(runtime.passes.get().wrapping_add(1));
    true
}

/// Run `count` passes back to back
pub fn run_passes(count: u32) {
    for _ in 0..count {
        run_pass();
    }
}

/// Hand the processor to the scheduler for good
///
/// Terminal call of the program's startup code. When no coroutine is
/// registered the loop keeps spinning, so an interrupt-driven `start()`
/// elsewhere is still picked up.
pub fn enter_scheduler() -> ! {
    info!("entering scheduler with {} coroutines", registry::active_count());
    loop {
        if !run_pass() {
            yield_now();
        }
    }
}

/// Suspend the running coroutine until its next turn
///
/// Does nothing when called outside any coroutine.
pub fn yield_now() {
    if let Some(current) = runtime().current.get() {
        current.control().suspend();
    }
}

/// Let the rest of the system make progress while the caller waits
///
/// Yields inside a coroutine; from the root context it runs a pass.
pub(crate) fn wait_turn() {
    if in_coroutine() {
        yield_now();
    } else {
        run_pass();
    }
}

/// Whether the caller is running inside a coroutine
pub fn in_coroutine() -> bool {
    runtime().current.get().is_some()
}

/// Name of the running coroutine
pub fn current_name() -> Option<&'static str> {
    runtime().current.get().map(|current| current.name())
}

/// Number of completed passes (wraps)
pub fn passes() -> u32 {
    runtime().passes.get()
}
