//! Trace logging
//!
//! State transitions of the runtime are reported through the macros below.
//! Two backends exist, each behind a feature:
//!
//! - `defmt`: forwards to the matching `defmt` macro
//! - `sink`: formats one line with `core::fmt` and hands it to the
//!   [`DebugSink`] registered with [`set_sink`]
//!
//! With neither feature enabled the macros only type-check their
//! arguments and generate no code.

use core::fmt::{self, Write};

use heapless::String;
use libembed_hal::DebugSink;

use crate::config::{TRACE_LINE_CAPACITY, TRACE_ORIGIN_WIDTH};

macro_rules! __emit {
    ($defmt:ident, $level:ident, $($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$defmt!($($arg)*);
        #[cfg(feature = "sink")]
        $crate::trace::emit(
            $crate::trace::Level::$level,
            module_path!(),
            format_args!($($arg)*),
        );
        #[cfg(not(any(feature = "defmt", feature = "sink")))]
        let _ = || {
            let _ = format_args!($($arg)*);
        };
    }};
}

macro_rules! trace {
    ($($arg:tt)*) => { __emit!(trace, Trace, $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { __emit!(info, Info, $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { __emit!(warn, Warn, $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { __emit!(error, Error, $($arg)*) };
}

/// Severity of a trace line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Trace,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Label printed between brackets at the start of a line
    pub const fn label(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Register the sink that receives formatted trace lines
///
/// Lines are only produced when the `sink` feature is enabled; without it
/// the registration is kept but never used.
pub fn set_sink(sink: &'static dyn DebugSink) {
    crate::scheduler::runtime().sink.set(Some(sink));
}

/// Remove the registered sink
pub fn clear_sink() {
    crate::scheduler::runtime().sink.set(None);
}

#[cfg_attr(not(feature = "sink"), allow(dead_code))]
pub(crate) fn emit(level: Level, origin: &str, args: fmt::Arguments<'_>) {
    if let Some(sink) = crate::scheduler::runtime().sink.get() {
        let line = format_line(level, origin, args);
        sink.write_str(&line);
    }
}

/// Format `[LEVEL]\t<origin>()<padding><message>\r\n`
///
/// Only the last path segment of `origin` is printed. Messages longer than
/// the line capacity are truncated; the terminator is always kept.
#[cfg_attr(not(any(test, feature = "sink")), allow(dead_code))]
pub(crate) fn format_line(
    level: Level,
    origin: &str,
    args: fmt::Arguments<'_>,
) -> String<TRACE_LINE_CAPACITY> {
    let origin = origin.rsplit("::").next().unwrap_or(origin);
    let padding = TRACE_ORIGIN_WIDTH.saturating_sub(origin.len() + 2).max(1);

    let mut line = Truncating {
        buf: String::new(),
        limit: TRACE_LINE_CAPACITY - 2,
    };
    let _ = write!(line, "[{}]\t{}()", level.label(), origin);
    for _ in 0..padding {
        let _ = line.write_char(' ');
    }
    let _ = line.write_fmt(args);

    let mut buf = line.buf;
    let _ = buf.push_str("\r\n");
    buf
}

/// Writer that silently drops whatever does not fit
#[cfg_attr(not(any(test, feature = "sink")), allow(dead_code))]
struct Truncating {
    buf: String<TRACE_LINE_CAPACITY>,
    limit: usize,
}

impl Write for Truncating {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.buf.len() + c.len_utf8() > self.limit {
                break;
            }
            let _ = self.buf.push(c);
        }
        Ok(())
    }
}
