//! Cooperative coroutine runtime for bare-metal microcontrollers
//!
//! A single-threaded, preemption-free scheduler. Every coroutine owns a
//! statically sized stack and runs until it explicitly yields, returns or
//! faults:
//!
//! - Private, fixed-size stacks ([`stack::StackRegion`])
//! - Per-architecture context switching ([`arch`])
//! - Coroutine lifecycle state machine ([`coroutine::Coroutine`])
//! - Round-robin scheduler loop ([`scheduler::enter_scheduler`])
//! - Cooperative spin-yield lock ([`lock::Lock`])
//! - Fault containment at the coroutine boundary ([`fault`])
//! - Tick-based waits that keep other coroutines running ([`time`])
//!
//! ```ignore
//! static TICKS: TickCounter = TickCounter::new();
//!
//! fn blink(_: &Coroutine<&'static Led, 1024>, led: &&'static Led) -> Result<(), Fault> {
//!     loop {
//!         led.toggle();
//!         time::delay_ms(&TICKS, 300);
//!     }
//! }
//!
//! let green = GREEN.init(Coroutine::new("green", blink, &LED_GREEN));
//! green.start()?;
//! scheduler::enter_scheduler();
//! ```

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod trace;

pub mod arch;
#[cfg_attr(any(test, feature = "std"), allow(dead_code))]
mod cell;
pub mod config;
pub mod coroutine;
pub mod fault;
pub mod lock;
pub mod scheduler;
pub mod stack;
pub mod time;

pub use coroutine::{Coroutine, CoroutineState, EntryPoint, ExitReason};
pub use fault::{Fault, FaultKind, OrHalt};
pub use lock::{Lock, LockGuard};
pub use scheduler::{enter_scheduler, run_pass, yield_now};
pub use stack::StackRegion;
pub use trace::{clear_sink, set_sink, Level};
