//! Millisecond tick sources
//!
//! Two options: reuse the embassy-rp time driver (TIMER peripheral, already
//! running once `embassy_rp::init` has been called), or program the Cortex-M
//! SysTick for 1 kHz and count its interrupts in a `TickCounter`.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;
use embassy_time::Instant;
use libembed_core::Fault;
use libembed_hal::TickSource;

/// Largest value the 24-bit SysTick reload register holds
pub const SYST_MAX_RELOAD: u32 = 0x00FF_FFFF;

/// Tick source backed by the embassy-rp time driver
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyTick;

impl TickSource for EmbassyTick {
    fn now_ms(&self) -> u32 {
        // Truncation gives the wrapping counter the runtime expects
        Instant::now().as_millis() as u32
    }
}

/// Reload value for a 1 kHz SysTick at `core_clock_hz`
///
/// Fails when one millisecond is less than two core cycles or more than the
/// 24-bit reload register can count.
pub fn systick_reload(core_clock_hz: u32) -> Result<u32, Fault> {
    (core_clock_hz / 1_000)
        .checked_sub(1)
        .filter(|reload| (1..=SYST_MAX_RELOAD).contains(reload))
        .ok_or(Fault::unsupported("core clock outside SysTick range"))
}

/// Configure SysTick to fire every millisecond
///
/// The application's `SysTick` exception handler must call
/// [`TickCounter::increment`](libembed_hal::TickCounter::increment).
/// SysTick is left untouched when [`systick_reload`] rejects the clock.
pub fn start_systick(syst: &mut SYST, core_clock_hz: u32) -> Result<(), Fault> {
    let reload = systick_reload(core_clock_hz)?;
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(reload);
    syst.clear_current();
    syst.enable_counter();
    syst.enable_interrupt();
    #[cfg(feature = "defmt")]
    defmt::info!("SysTick running, reload {}", reload);
    Ok(())
}
