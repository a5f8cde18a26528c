//! libembed-blink - Coroutine blink demo
//!
//! Two coroutines blink two LEDs at independent rates while a third one
//! reports a heartbeat over UART0. Every wait is a cooperative delay, so
//! the three share the core without an executor or interrupts beyond the
//! millisecond tick.
//!
//! Wiring (Raspberry Pi Pico):
//! - Green LED: GPIO25 (on-board)
//! - Orange LED: GPIO15
//! - UART0 TX: GPIO0

#![no_std]
#![no_main]

use core::cell::RefCell;

use cortex_m_rt::{entry, exception};
use defmt::{info, warn};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{Blocking, Config as UartConfig, UartTx};
use embedded_hal::digital::StatefulOutputPin;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use libembed_core::fault::unhandled;
use libembed_core::{enter_scheduler, scheduler, time, Coroutine, Fault, OrHalt};
use libembed_hal::{TickCounter, TickSource};
use libembed_hal_rp2040::{start_systick, CoopSerial, EmbassyTick};

mod config {
    include!(concat!(env!("OUT_DIR"), "/blink_config.rs"));
}

use config::{GREEN_PERIOD_MS, HEARTBEAT_PERIOD_MS, ORANGE_PERIOD_MS, UART_BAUD_RATE, USE_SYSTICK};

/// Blinkers only toggle a pin and delay
const BLINK_STACK: usize = 1024;
/// The heartbeat formats text
const HEARTBEAT_STACK: usize = 2048;

type Led = Output<'static>;
type Serial = CoopSerial<UartTx<'static, UART0, Blocking>>;

/// Advanced by the SysTick exception
static TICKS: TickCounter = TickCounter::new();
static EMBASSY_TICK: EmbassyTick = EmbassyTick;

struct Blinker<P> {
    led: RefCell<P>,
    period_ms: u32,
    tick: &'static dyn TickSource,
}

struct Heartbeat {
    serial: &'static Serial,
    tick: &'static dyn TickSource,
    period_ms: u32,
    /// Paused and resumed every ten beats
    orange: &'static Coroutine<Blinker<Led>, BLINK_STACK>,
}

static GREEN: StaticCell<Coroutine<Blinker<Led>, BLINK_STACK>> = StaticCell::new();
static ORANGE: StaticCell<Coroutine<Blinker<Led>, BLINK_STACK>> = StaticCell::new();
static HEARTBEAT: StaticCell<Coroutine<Heartbeat, HEARTBEAT_STACK>> = StaticCell::new();
static SERIAL: StaticCell<Serial> = StaticCell::new();

fn blink<P: StatefulOutputPin>(
    _: &Coroutine<Blinker<P>, BLINK_STACK>,
    blinker: &Blinker<P>,
) -> Result<(), Fault> {
    loop {
        blinker
            .led
            .borrow_mut()
            .toggle()
            .map_err(|_| Fault::low_level("led toggle failed"))?;
        time::delay_ms(blinker.tick, blinker.period_ms);
    }
}

fn heartbeat(_: &Coroutine<Heartbeat, HEARTBEAT_STACK>, hb: &Heartbeat) -> Result<(), Fault> {
    let mut beats: u32 = 0;
    loop {
        time::delay_ms(hb.tick, hb.period_ms);
        beats = beats.wrapping_add(1);
        write!(
            hb.serial,
            "heartbeat {} uptime {} ms passes {} coroutines {}\r\n",
            beats,
            hb.tick.now_ms(),
            scheduler::passes(),
            scheduler::active_count()
        )?;

        if beats % 10 == 0 {
            hb.orange.toggle_pause();
            info!("orange blinker paused: {}", hb.orange.is_paused());
        }
    }
}

#[entry]
fn main() -> ! {
    info!("libembed-blink starting...");

    let p = embassy_rp::init(Default::default());

    let tick: &'static dyn TickSource = if USE_SYSTICK {
        let Some(mut core) = cortex_m::Peripherals::take() else {
            unhandled(Fault::unsupported("core peripherals already taken"));
        };
        start_systick(&mut core.SYST, embassy_rp::clocks::clk_sys_freq()).or_halt();
        &TICKS
    } else {
        &EMBASSY_TICK
    };

    let mut uart_config = UartConfig::default();
    uart_config.baudrate = UART_BAUD_RATE;
    let serial: &'static Serial = SERIAL.init(CoopSerial::new(UartTx::new_blocking(
        p.UART0,
        p.PIN_0,
        uart_config,
    )));
    #[cfg(feature = "sink")]
    libembed_core::set_sink(serial);

    let green: &'static _ = GREEN.init(Coroutine::new(
        "green",
        blink::<Led>,
        Blinker {
            led: RefCell::new(Output::new(p.PIN_25, Level::Low)),
            period_ms: GREEN_PERIOD_MS,
            tick,
        },
    ));
    let orange: &'static _ = ORANGE.init(Coroutine::new(
        "orange",
        blink::<Led>,
        Blinker {
            led: RefCell::new(Output::new(p.PIN_15, Level::Low)),
            period_ms: ORANGE_PERIOD_MS,
            tick,
        },
    ));
    let beat: &'static _ = HEARTBEAT.init(Coroutine::new(
        "heartbeat",
        heartbeat,
        Heartbeat {
            serial,
            tick,
            period_ms: HEARTBEAT_PERIOD_MS,
            orange,
        },
    ));

    green.start().or_halt();
    orange.start().or_halt();
    if let Err(fault) = beat.start() {
        warn!("heartbeat not started: {}", fault);
    }

    info!(
        "blinking green every {} ms, orange every {} ms",
        GREEN_PERIOD_MS, ORANGE_PERIOD_MS
    );
    enter_scheduler()
}

#[exception]
fn SysTick() {
    TICKS.increment();
}
