//! Uniprocessor interior mutability

use core::ops::Deref;

/// Wrapper that lets `Cell`/`RefCell` based state live in a `static`
///
/// The runtime has exactly one thread of execution and switches only at
/// explicit yield points, so no two accesses can overlap. Interrupt
/// handlers must not reach anything stored in a `CoopCell`.
pub(crate) struct CoopCell<T> {
    inner: T,
}

unsafe impl<T> Sync for CoopCell<T> {}

impl<T> CoopCell<T> {
    /// Caller guarantees the value is only used from one core and never
    /// from interrupt context.
    pub(crate) const unsafe fn new(value: T) -> Self {
        Self { inner: value }
    }
}

impl<T> Deref for CoopCell<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}
