//! Architecture-specific context switching
//!
//! The scheduler needs exactly two machine-level operations:
//!
//! - [`ContextSwitch::switch`]: save the running execution into one
//!   [`Checkpoint`] and continue from another one
//! - [`ContextSwitch::hop_to_stack`]: save the running execution, move the
//!   stack pointer onto a fresh coroutine stack and call a trampoline there
//!
//! A checkpoint is only a stack pointer. The callee-saved registers and the
//! return address are pushed onto the stack being left, so restoring the
//! stack pointer restores everything else. The hop is therefore needed once
//! per coroutine activation; every later suspend and resume is a `switch`.
//!
//! Everything above this module is architecture-agnostic and uses the
//! [`Native`] implementation selected for the build target.

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "arm")]
mod cortex_m;
#[cfg(target_arch = "riscv32")]
mod riscv32;
#[cfg(all(target_arch = "x86_64", not(windows)))]
mod x86_64;

#[cfg(target_arch = "aarch64")]
pub use aarch64::AArch64 as Native;
#[cfg(target_arch = "arm")]
pub use cortex_m::CortexM as Native;
#[cfg(target_arch = "riscv32")]
pub use riscv32::RiscV32 as Native;
#[cfg(all(target_arch = "x86_64", not(windows)))]
pub use x86_64::X86_64 as Native;

#[cfg(not(any(
    target_arch = "aarch64",
    target_arch = "arm",
    target_arch = "riscv32",
    all(target_arch = "x86_64", not(windows)),
)))]
compile_error!("libembed-core has no context switch implementation for this target");

use crate::config::STACK_ALIGN;

/// Function started on a fresh coroutine stack
///
/// It receives the opaque pointer handed to [`ContextSwitch::hop_to_stack`]
/// and must never return; it leaves by switching to another checkpoint.
pub type Trampoline = unsafe extern "C" fn(*mut ()) -> !;

/// Saved execution point
///
/// Holds the stack pointer captured by the last [`ContextSwitch::switch`]
/// or [`ContextSwitch::hop_to_stack`] that saved into it.
#[repr(C)]
#[derive(Debug)]
pub struct Checkpoint {
    sp: *mut u8,
}

impl Checkpoint {
    pub const fn empty() -> Self {
        Self {
            sp: core::ptr::null_mut(),
        }
    }

    /// Stack pointer at the moment of capture (null if never captured)
    pub fn stack_pointer(&self) -> *mut u8 {
        self.sp
    }

    pub fn is_empty(&self) -> bool {
        self.sp.is_null()
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::empty()
    }
}

/// Machine-level primitives for one target architecture
///
/// # Safety
///
/// Implementations must save and restore every callee-saved register of the
/// platform ABI, and `hop_to_stack` must leave the saved checkpoint in the
/// same layout `switch` restores from.
pub unsafe trait ContextSwitch {
    /// Whether pushes move the stack pointer towards lower addresses
    const STACK_GROWS_DOWN: bool = true;

    /// Read the live stack pointer register
    fn current_stack_pointer() -> *mut u8;

    /// Move `sp` by `offset` bytes in the direction the stack grows
    fn offset_stack_pointer(sp: *mut u8, offset: usize) -> *mut u8 {
        if Self::STACK_GROWS_DOWN {
            sp.wrapping_sub(offset)
        } else {
            sp.wrapping_add(offset)
        }
    }

    /// First stack pointer for a region spanning `start..end`
    ///
    /// The result is the region edge the stack grows away from, moved
    /// inwards until it satisfies [`STACK_ALIGN`].
    fn initial_stack_pointer(start: *mut u8, end: *mut u8) -> *mut u8 {
        if Self::STACK_GROWS_DOWN {
            let misalignment = end as usize % STACK_ALIGN;
            Self::offset_stack_pointer(end, misalignment)
        } else {
            let misalignment = (STACK_ALIGN - start as usize % STACK_ALIGN) % STACK_ALIGN;
            Self::offset_stack_pointer(start, misalignment)
        }
    }

    /// Save the current execution into `save`, then continue on
    /// `stack_pointer` by calling `entry(arg)`
    ///
    /// Returns when some later `switch` restores `save`.
    ///
    /// # Safety
    ///
    /// `stack_pointer` must be aligned and point into memory that stays
    /// valid and unused by anything else while `entry` runs. `save` must stay
    /// valid until it is restored.
    unsafe fn hop_to_stack(
        save: *mut Checkpoint,
        stack_pointer: *mut u8,
        entry: Trampoline,
        arg: *mut (),
    );

    /// Save the current execution into `save` and resume `restore`
    ///
    /// Returns when some later `switch` restores `save`.
    ///
    /// # Safety
    ///
    /// `restore` must hold a checkpoint captured by `switch` or
    /// `hop_to_stack` whose stack is still intact.
    unsafe fn switch(save: *mut Checkpoint, restore: *const Checkpoint);
}
