//! Debug output abstraction
//!
//! The runtime emits optional trace lines (coroutine started, yielded,
//! faulted, ...). Where they end up is decided by the board: a UART, a
//! USB virtual COM port, RTT, or nothing at all.

/// Sink for formatted debug lines
///
/// Each call receives one complete line including its line terminator.
/// Implementations must not call back into the trace layer.
pub trait DebugSink {
    /// Write a string to the debug output
    fn write_str(&self, line: &str);
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DebugSink for NullSink {
    fn write_str(&self, _line: &str) {}
}

impl<T: DebugSink + ?Sized> DebugSink for &T {
    fn write_str(&self, line: &str) {
        (**self).write_str(line)
    }
}
