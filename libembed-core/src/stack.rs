//! Private coroutine stacks
//!
//! Each coroutine embeds one [`StackRegion`]. The region is a plain byte
//! array; once the owning coroutine has started it is pinned in memory by
//! the `'static` borrow the scheduler holds, so addresses recorded in
//! checkpoints stay valid.
//!
//! Overflowing a region is undefined behaviour. Nothing checks at runtime;
//! choosing a large enough `N` is the caller's job. [`StackRegion::fill`]
//! and [`StackRegion::untouched`] help to measure the real usage.

use core::cell::UnsafeCell;

use crate::config::STACK_ALIGN;

#[repr(C, align(16))]
struct Aligned<const N: usize>([u8; N]);

// Keep the attribute above in sync with the configured alignment
const _: () = assert!(core::mem::align_of::<Aligned<0>>() == STACK_ALIGN);

/// Fixed-size stack owned by a single coroutine
pub struct StackRegion<const N: usize> {
    bytes: UnsafeCell<Aligned<N>>,
}

impl<const N: usize> StackRegion<N> {
    /// Create a zero-filled region
    pub const fn new() -> Self {
        Self {
            bytes: UnsafeCell::new(Aligned([0; N])),
        }
    }

    /// Size of the region in bytes
    pub const fn len(&self) -> usize {
        N
    }

    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Lowest address of the region
    pub fn start(&self) -> *mut u8 {
        self.bytes.get().cast::<u8>()
    }

    /// One past the highest address of the region
    pub fn end(&self) -> *mut u8 {
        self.start().wrapping_add(N)
    }

    /// Whether `addr` lies inside the region
    pub fn contains(&self, addr: *const u8) -> bool {
        let addr = addr as usize;
        addr >= self.start() as usize && addr < self.end() as usize
    }

    /// Zero the whole region
    pub fn clear(&mut self) {
        self.fill(0);
    }

    /// Paint the whole region with `pattern`
    pub fn fill(&mut self, pattern: u8) {
        self.bytes.get_mut().0.fill(pattern);
    }

    /// Number of bytes at the far end of the stack that still hold `pattern`
    ///
    /// Stacks grow downwards on every supported target, so the untouched
    /// part is counted from [`start`](Self::start) upwards. Paint the
    /// region with [`fill`](Self::fill) before starting the coroutine.
    pub fn untouched(&self, pattern: u8) -> usize {
        let base = self.start();
        let mut count = 0;
        while count < N {
            // SAFETY: `count < N` keeps the read inside the region. The
            // owning coroutine writes through its stack pointer only while it
            // runs, never concurrently with this read.
            let byte = unsafe { core::ptr::read_volatile(base.add(count)) };
            if byte != pattern {
                break;
            }
            count += 1;
        }
        count
    }

    /// Write `guard` into the lowest byte of the region
    ///
    /// A stack that overflows its region clobbers this byte first.
    pub fn set_guard(&mut self, guard: u8) {
        if let Some(first) = self.bytes.get_mut().0.first_mut() {
            *first = guard;
        }
    }

    /// Whether the lowest byte still holds `guard`
    pub fn guard_intact(&self, guard: u8) -> bool {
        // SAFETY: a non-empty region has a byte at `start`, and the owner
        // never writes it concurrently with this read.
        N > 0 && unsafe { core::ptr::read_volatile(self.start()) } == guard
    }

    /// Bytes used at the deepest point so far (see [`untouched`](Self::untouched))
    pub fn high_water_mark(&self, pattern: u8) -> usize {
        N - self.untouched(pattern)
    }
}

impl<const N: usize> Default for StackRegion<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_span_the_buffer() {
        let stack = StackRegion::<256>::new();
        assert_eq!(stack.len(), 256);
        assert_eq!(stack.end() as usize - stack.start() as usize, 256);
        assert_eq!(stack.start() as usize % STACK_ALIGN, 0);
    }

    #[test]
    fn test_contains() {
        let stack = StackRegion::<64>::new();
        assert!(stack.contains(stack.start()));
        assert!(stack.contains(stack.start().wrapping_add(63)));
        assert!(!stack.contains(stack.end()));
    }

    #[test]
    fn test_fill_and_untouched() {
        let mut stack = StackRegion::<128>::new();
        stack.fill(0xAA);
        assert_eq!(stack.untouched(0xAA), 128);
        assert_eq!(stack.high_water_mark(0xAA), 0);

        // Simulate a stack that reached 40 bytes deep
        unsafe { stack.end().sub(40).write(0x00) };
        assert_eq!(stack.untouched(0xAA), 88);
        assert_eq!(stack.high_water_mark(0xAA), 40);
    }

    #[test]
    fn test_guard_byte() {
        let mut stack = StackRegion::<64>::new();
        stack.fill(0xAA);
        stack.set_guard(0x5A);
        assert!(stack.guard_intact(0x5A));
        assert_eq!(stack.untouched(0x5A), 1);

        unsafe { stack.start().write(0x00) };
        assert!(!stack.guard_intact(0x5A));
        assert!(!StackRegion::<0>::new().guard_intact(0));
    }

    #[test]
    fn test_clear_zeroes() {
        let mut stack = StackRegion::<32>::new();
        stack.fill(0x55);
        stack.clear();
        assert_eq!(stack.untouched(0), 32);
    }
}
