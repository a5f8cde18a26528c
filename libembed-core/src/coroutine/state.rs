//! Coroutine lifecycle states

/// Why a coroutine stopped running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExitReason {
    /// Still running, never exited, or stopped from outside
    #[default]
    None,
    /// Entry point returned `Ok(())`
    Returned,
    /// Entry point returned an error (or panicked, with `std`)
    Faulted,
}

/// Observable lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoroutineState {
    /// Constructed, never started
    NotStarted,
    /// Registered and resumed by the scheduler
    Active,
    /// Registered but skipped until resumed
    Paused,
    /// Deregistered by `stop()` before it exited
    Stopped,
    /// Entry point finished normally
    Returned,
    /// Entry point failed
    Faulted,
}

impl CoroutineState {
    /// Whether the scheduler still holds the coroutine
    pub fn is_registered(self) -> bool {
        matches!(self, CoroutineState::Active | CoroutineState::Paused)
    }

    /// Whether the entry point has exited
    pub fn has_exited(self) -> bool {
        matches!(self, CoroutineState::Returned | CoroutineState::Faulted)
    }
}

/// How control came back to the scheduler from a coroutine turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Landing {
    Yielded,
    Returned,
    Faulted,
}
