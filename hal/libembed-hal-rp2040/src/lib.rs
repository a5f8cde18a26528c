//! RP2040 implementations of the libembed hardware traits
//!
//! - [`tick::EmbassyTick`] - millisecond tick read from the embassy-rp time driver
//! - [`tick::start_systick`] - 1 kHz SysTick driving a [`libembed_hal::TickCounter`]
//! - [`serial::CoopSerial`] - scheduler-friendly serial writer, usable as the debug sink

#![no_std]

pub mod serial;
pub mod tick;

pub use serial::CoopSerial;
pub use tick::{start_systick, systick_reload, EmbassyTick};
