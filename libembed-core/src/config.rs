//! Compile-time configuration
//!
//! These values size the static data structures of the runtime. There is
//! no allocator, so every limit is fixed when the firmware is built.

/// Maximum number of coroutines registered with the scheduler at once
pub const MAX_COROUTINES: usize = 16;

/// Stack size suggested for coroutines that only toggle pins and delay
///
/// Coroutines that format text or call deep driver stacks need more.
pub const DEFAULT_STACK_SIZE: usize = 1024;

/// Required alignment of every coroutine stack (bytes)
pub const STACK_ALIGN: usize = 16;

/// Capacity of one formatted trace line, terminator included
pub const TRACE_LINE_CAPACITY: usize = 128;

/// Width the origin column of a trace line is padded to
pub const TRACE_ORIGIN_WIDTH: usize = 24;

/// Default timeout for blocking I/O helpers (milliseconds)
pub const DEFAULT_IO_TIMEOUT_MS: u32 = 1000;
