//! Non-generic coroutine bookkeeping
//!
//! Everything the scheduler and `yield_now()` touch lives here, so the
//! suspend path is the same machine code for every coroutine type.

use core::cell::{Cell, UnsafeCell};

use super::state::{CoroutineState, ExitReason, Landing};
use crate::arch::{Checkpoint, ContextSwitch, Native};
use crate::fault::Fault;

pub(crate) struct Control {
    /// Registered with the scheduler
    active: Cell<bool>,
    /// Registered but skipped
    paused: Cell<bool>,
    /// Entry point has been invoked since the last start
    was_called: Cell<bool>,
    started_once: Cell<bool>,
    exit: Cell<ExitReason>,
    landing: Cell<Landing>,
    fault: Cell<Option<Fault>>,
    resumptions: Cell<u32>,
    /// Where the scheduler continues when this coroutine yields or exits
    yield_point: UnsafeCell<Checkpoint>,
    /// Where this coroutine continues when the scheduler resumes it
    resume_point: UnsafeCell<Checkpoint>,
}

impl Control {
    pub(crate) const fn new() -> Self {
        Self {
            active: Cell::new(false),
            paused: Cell::new(false),
            was_called: Cell::new(false),
            started_once: Cell::new(false),
            exit: Cell::new(ExitReason::None),
            landing: Cell::new(Landing::Yielded),
            fault: Cell::new(None),
            resumptions: Cell::new(0),
            yield_point: UnsafeCell::new(Checkpoint::empty()),
            resume_point: UnsafeCell::new(Checkpoint::empty()),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.get()
    }

    /// Whether the scheduler should give this coroutine a turn
    pub(crate) fn is_runnable(&self) -> bool {
        self.active.get() && !self.paused.get()
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.set(paused);
    }

    pub(crate) fn exit_reason(&self) -> ExitReason {
        self.exit.get()
    }

    pub(crate) fn fault(&self) -> Option<Fault> {
        self.fault.get()
    }

    pub(crate) fn resumptions(&self) -> u32 {
        self.resumptions.get()
    }

    pub(crate) fn state(&self) -> CoroutineState {
        if self.active.get() {
            if self.paused.get() {
                CoroutineState::Paused
            } else {
                CoroutineState::Active
            }
        } else {
            match self.exit.get() {
                ExitReason::Returned => CoroutineState::Returned,
                ExitReason::Faulted => CoroutineState::Faulted,
                ExitReason::None if self.started_once.get() => CoroutineState::Stopped,
                ExitReason::None => CoroutineState::NotStarted,
            }
        }
    }

    /// Flags for a fresh registration
    pub(crate) fn activate(&self) {
        self.exit.set(ExitReason::None);
        self.fault.set(None);
        self.active.set(true);
        self.paused.set(false);
        self.started_once.set(true);
    }

    /// Flags for a deregistration; the next start runs from the entry point
    pub(crate) fn deactivate(&self) {
        self.active.set(false);
        self.paused.set(false);
        self.was_called.set(false);
    }

    /// Mark the entry point as called; returns `true` on the first call
    pub(crate) fn begin_turn(&self) -> bool {
        self.resumptions.set(self.resumptions.get().wrapping_add(1));
        !self.was_called.replace(true)
    }

    /// Discriminant stored by the coroutine side before it switched back
    pub(crate) fn landing(&self) -> Landing {
        self.landing.get()
    }

    pub(crate) fn record_exit(&self, reason: ExitReason) {
        self.exit.set(reason);
    }

    pub(crate) fn yield_point(&self) -> *mut Checkpoint {
        self.yield_point.get()
    }

    pub(crate) fn resume_point(&self) -> *mut Checkpoint {
        self.resume_point.get()
    }

    /// Coroutine side: save the resume checkpoint and return to the scheduler
    pub(crate) fn suspend(&self) {
        self.landing.set(Landing::Yielded);
        // SAFETY: only called by the coroutine currently being run, so the
        // yield checkpoint was captured by `run_or_resume` on this turn.
        unsafe { Native::switch(self.resume_point(), self.yield_point()) };
    }

    /// Coroutine side, once the entry point is done: never returns
    pub(crate) fn finish(&self, outcome: Result<(), Fault>) -> ! {
        match outcome {
            Ok(()) => self.landing.set(Landing::Returned),
            Err(fault) => {
                self.fault.set(Some(fault));
                self.landing.set(Landing::Faulted);
            }
        }
        loop {
            // SAFETY: as in `suspend`. The resume checkpoint written here is
            // never restored because finishing clears `was_called`.
            unsafe { Native::switch(self.resume_point(), self.yield_point()) };
        }
    }
}
