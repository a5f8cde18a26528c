//! libembed Hardware Abstraction Layer
//!
//! This crate defines the small set of hardware services the coroutine
//! runtime consumes. Chip-specific HALs implement them; the runtime in
//! `libembed-core` never touches a peripheral register itself.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (libembed-blink, etc.)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  libembed-core (coroutines, lock, time) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  libembed-hal (this crate - traits)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │ libembed-hal- │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`tick::TickSource`] - Monotonic millisecond counter for timed waits
//! - [`debug::DebugSink`] - Line-oriented text output for trace logging

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod debug;
pub mod tick;

// Re-export key traits at crate root for convenience
pub use debug::{DebugSink, NullSink};
pub use tick::{TickCounter, TickSource};
