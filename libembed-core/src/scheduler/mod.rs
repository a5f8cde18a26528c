//! Round-robin coroutine scheduler
//!
//! The scheduler owns the registry of started coroutines and the pointer to
//! the one currently running. A pass visits every coroutine registered when
//! the pass began, in registration order, and gives each runnable one a
//! single turn.

pub mod executor;
mod registry;

pub use executor::{
    current_name, enter_scheduler, in_coroutine, passes, run_pass, run_passes, yield_now,
};
pub use registry::active_count;

pub(crate) use executor::wait_turn;
pub(crate) use registry::{deregister, register};

use core::cell::{Cell, RefCell};

use heapless::Vec;
use libembed_hal::DebugSink;

use crate::config::MAX_COROUTINES;
use crate::coroutine::Schedulable;

/// Scheduler-owned state
pub(crate) struct Runtime {
    registry: RefCell<Vec<&'static dyn Schedulable, MAX_COROUTINES>>,
    /// Coroutine whose turn is in progress
    pub(crate) current: Cell<Option<&'static dyn Schedulable>>,
    /// Receiver of formatted trace lines
    pub(crate) sink: Cell<Option<&'static dyn DebugSink>>,
    in_pass: Cell<bool>,
    /// Registry index of the turn in progress
    cursor: Cell<usize>,
    /// A coroutine was stopped during the running pass
    sweep_pending: Cell<bool>,
    passes: Cell<u32>,
}

impl Runtime {
    const fn new() -> Self {
        Self {
            registry: RefCell::new(Vec::new()),
            current: Cell::new(None),
            sink: Cell::new(None),
            in_pass: Cell::new(false),
            cursor: Cell::new(0),
            sweep_pending: Cell::new(false),
            passes: Cell::new(0),
        }
    }
}

/// The runtime of this execution context
///
/// Host builds keep one runtime per thread so independent tests never share
/// a registry.
#[cfg(any(test, feature = "std"))]
pub(crate) fn runtime() -> &'static Runtime {
    std::thread_local! {
        static RUNTIME: &'static Runtime = std::boxed::Box::leak(std::boxed::Box::new(Runtime::new()));
    }
    RUNTIME.with(|runtime| *runtime)
}

#[cfg(not(any(test, feature = "std")))]
pub(crate) fn runtime() -> &'static Runtime {
    use crate::cell::CoopCell;

    // SAFETY: bare-metal builds run the scheduler on a single core and
    // interrupt handlers never touch the runtime.
    static RUNTIME: CoopCell<Runtime> = unsafe { CoopCell::new(Runtime::new()) };
    &RUNTIME
}

/// Forget every registration on this thread's runtime
#[cfg(test)]
pub(crate) fn reset() {
    let runtime = runtime();
    runtime.registry.borrow_mut().clear();
    runtime.current.set(None);
    runtime.sink.set(None);
    runtime.in_pass.set(false);
    runtime.cursor.set(0);
    runtime.sweep_pending.set(false);
    runtime.passes.set(0);
}
