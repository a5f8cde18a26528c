//! Scheduler-friendly serial output
//!
//! Wraps any blocking `embedded_io::Write` (typically a blocking
//! `embassy_rp::uart::UartTx`). Writers are serialised with a cooperative
//! [`Lock`] and the transfer yields between chunks, so a long message
//! never stalls the other coroutines for more than one chunk.

use core::cell::RefCell;
use core::fmt;

use embedded_io::Write;
use heapless::String;
use libembed_core::{yield_now, Fault, Lock};
use libembed_hal::DebugSink;

/// Bytes written per turn
pub const CHUNK_SIZE: usize = 16;

/// Capacity of one formatted message
pub const MESSAGE_CAPACITY: usize = 128;

pub struct CoopSerial<W> {
    port: RefCell<W>,
    lock: Lock,
}

// SAFETY: single core, cooperative switching only at yield points, and the
// port is never borrowed across one.
unsafe impl<W: Send> Sync for CoopSerial<W> {}

impl<W: Write> CoopSerial<W> {
    pub const fn new(port: W) -> Self {
        Self {
            port: RefCell::new(port),
            lock: Lock::new(),
        }
    }

    /// Write all of `bytes`, yielding after every chunk
    pub fn write_all(&self, bytes: &[u8]) -> Result<(), Fault> {
        let _guard = self.lock.lock();
        for chunk in bytes.chunks(CHUNK_SIZE) {
            self.port
                .borrow_mut()
                .write_all(chunk)
                .map_err(|_| Fault::low_level("serial write failed"))?;
            yield_now();
        }
        self.flush()
    }

    /// Format into a bounded buffer, then write it
    ///
    /// Output longer than [`MESSAGE_CAPACITY`] is rejected as a capacity
    /// fault before anything is sent.
    pub fn write_fmt(&self, args: fmt::Arguments<'_>) -> Result<(), Fault> {
        let mut message: String<MESSAGE_CAPACITY> = String::new();
        fmt::write(&mut message, args).map_err(|_| Fault::capacity("serial message too long"))?;
        self.write_all(message.as_bytes())
    }

    fn flush(&self) -> Result<(), Fault> {
        self.port
            .borrow_mut()
            .flush()
            .map_err(|_| Fault::low_level("serial flush failed"))
    }
}

impl<W: Write> DebugSink for CoopSerial<W> {
    /// Trace lines are written in one go without yielding. A line emitted
    /// while a coroutine owns the port is dropped.
    fn write_str(&self, line: &str) {
        if !self.lock.try_acquire() {
            return;
        }
        let _ = self.port.borrow_mut().write_all(line.as_bytes());
        let _ = self.flush();
        self.lock.release_noyield();
    }
}
