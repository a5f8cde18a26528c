//! Faults and the coroutine fault boundary
//!
//! Code running inside a coroutine reports failures with ordinary
//! `Result<_, Fault>` values and `?`. The boundary around each entry point
//! turns an `Err` into the coroutine's `Faulted` exit; nothing crosses into
//! the scheduler loop or into other coroutines.
//!
//! Outside any coroutine there is no boundary. A fault reaching the root
//! context goes to [`unhandled`], which reports it and halts.

use core::fmt;

/// Category of a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// Requested feature is not supported on this device
    Unsupported,
    /// Fatal low-level peripheral error (overrun, bus error, ...)
    LowLevel,
    /// A timed wait expired
    Timeout,
    /// A fixed-size runtime table is full
    Capacity,
    /// A panic was caught at the coroutine boundary (`std` builds only)
    Panic,
    /// Raised by application code
    Application,
}

impl FaultKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            FaultKind::Unsupported => "unsupported on this device",
            FaultKind::LowLevel => "low-level error",
            FaultKind::Timeout => "timeout",
            FaultKind::Capacity => "capacity exceeded",
            FaultKind::Panic => "panic",
            FaultKind::Application => "application fault",
        }
    }
}

/// A failure raised inside a coroutine body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fault {
    kind: FaultKind,
    message: &'static str,
}

impl Fault {
    pub const fn new(kind: FaultKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    pub const fn unsupported(message: &'static str) -> Self {
        Self::new(FaultKind::Unsupported, message)
    }

    pub const fn low_level(message: &'static str) -> Self {
        Self::new(FaultKind::LowLevel, message)
    }

    pub const fn timeout(message: &'static str) -> Self {
        Self::new(FaultKind::Timeout, message)
    }

    pub const fn capacity(message: &'static str) -> Self {
        Self::new(FaultKind::Capacity, message)
    }

    pub const fn application(message: &'static str) -> Self {
        Self::new(FaultKind::Application, message)
    }

    pub const fn kind(&self) -> FaultKind {
        self.kind
    }

    pub const fn message(&self) -> &'static str {
        self.message
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl core::error::Error for Fault {}

/// Terminal handler for a fault with no enclosing coroutine
///
/// Reports through the trace layer and halts. With `std` it panics instead,
/// so host programs and tests see the failure.
pub fn unhandled(fault: Fault) -> ! {
    error!("Uncaught fault: {}", fault);
    halt(fault)
}

#[cfg(any(test, feature = "std"))]
fn halt(fault: Fault) -> ! {
    panic!("uncaught fault: {}", fault)
}

#[cfg(not(any(test, feature = "std")))]
fn halt(_fault: Fault) -> ! {
    loop {
        core::hint::spin_loop();
    }
}

/// Unwrap a root-context result or halt through [`unhandled`]
pub trait OrHalt<T> {
    fn or_halt(self) -> T;
}

impl<T> OrHalt<T> for Result<T, Fault> {
    fn or_halt(self) -> T {
        match self {
            Ok(value) => value,
            Err(fault) => unhandled(fault),
        }
    }
}

/// Run a coroutine body and collapse its outcome into `Ok` / `Err(fault)`
///
/// With `std`, a panic unwinding out of the body is caught here and
/// reported as a [`FaultKind::Panic`] fault.
#[cfg(any(test, feature = "std"))]
pub(crate) fn boundary<F>(body: F) -> Result<(), Fault>
where
    F: FnOnce() -> Result<(), Fault>,
{
    match std::panic::catch_unwind(core::panic::AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(_) => Err(Fault::new(FaultKind::Panic, "panicked inside coroutine")),
    }
}

#[cfg(not(any(test, feature = "std")))]
pub(crate) fn boundary<F>(body: F) -> Result<(), Fault>
where
    F: FnOnce() -> Result<(), Fault>,
{
    body()
}
