//! Coroutines
//!
//! A [`Coroutine`] bundles an entry point, its argument, a private stack and
//! the lifecycle state machine:
//!
//! ```text
//! NotStarted ──start──▶ Active ◀──pause/resume──▶ Paused
//!                         │
//!          ┌──────────────┼───────────────┐
//!          ▼              ▼               ▼
//!       Stopped        Returned        Faulted
//! ```
//!
//! Every terminal state can be left again with `start()`, which runs the
//! entry point from the beginning.

mod control;
mod routine;
mod state;

pub use routine::{Coroutine, EntryPoint};
pub use state::{CoroutineState, ExitReason};

pub(crate) use control::Control;

/// Type-erased view of a coroutine held by the scheduler registry
pub(crate) trait Schedulable {
    fn control(&self) -> &Control;

    fn name(&self) -> &'static str;

    /// Give the coroutine one turn: first activation or resumption
    fn run_or_resume(&'static self);
}
