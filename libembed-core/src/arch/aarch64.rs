//! AArch64 (AAPCS64)
//!
//! Callee-saved: x19-x29, x30 (link register) and the low halves of
//! v8-v15. The checkpoint frame is 160 bytes so sp stays 16-byte aligned.

use core::arch::{asm, naked_asm};

use super::{Checkpoint, ContextSwitch, Trampoline};

/// Host builds and tests on 64-bit ARM
pub struct AArch64;

unsafe impl ContextSwitch for AArch64 {
    fn current_stack_pointer() -> *mut u8 {
        let sp: *mut u8;
        // SAFETY: reads a register, touches no memory
        unsafe { asm!("mov {}, sp", out(reg) sp, options(nomem, nostack, preserves_flags)) };
        sp
    }

    unsafe fn hop_to_stack(
        save: *mut Checkpoint,
        stack_pointer: *mut u8,
        entry: Trampoline,
        arg: *mut (),
    ) {
        unsafe { launch(save, stack_pointer, entry, arg) }
    }

    unsafe fn switch(save: *mut Checkpoint, restore: *const Checkpoint) {
        unsafe { switch_context(save, restore) }
    }
}

// x0 = save, x1 = restore
#[unsafe(naked)]
unsafe extern "C" fn switch_context(_save: *mut Checkpoint, _restore: *const Checkpoint) {
    naked_asm!(
        "sub sp, sp, #0xa0",
        "stp x19, x20, [sp, #0x00]",
        "stp x21, x22, [sp, #0x10]",
        "stp x23, x24, [sp, #0x20]",
        "stp x25, x26, [sp, #0x30]",
        "stp x27, x28, [sp, #0x40]",
        "stp x29, x30, [sp, #0x50]",
        "stp d8, d9, [sp, #0x60]",
        "stp d10, d11, [sp, #0x70]",
        "stp d12, d13, [sp, #0x80]",
        "stp d14, d15, [sp, #0x90]",
        "mov x2, sp",
        "str x2, [x0]",
        "ldr x2, [x1]",
        "mov sp, x2",
        "ldp x19, x20, [sp, #0x00]",
        "ldp x21, x22, [sp, #0x10]",
        "ldp x23, x24, [sp, #0x20]",
        "ldp x25, x26, [sp, #0x30]",
        "ldp x27, x28, [sp, #0x40]",
        "ldp x29, x30, [sp, #0x50]",
        "ldp d8, d9, [sp, #0x60]",
        "ldp d10, d11, [sp, #0x70]",
        "ldp d12, d13, [sp, #0x80]",
        "ldp d14, d15, [sp, #0x90]",
        "add sp, sp, #0xa0",
        "ret",
    )
}

// x0 = save, x1 = stack pointer (16-byte aligned), x2 = entry, x3 = arg
#[unsafe(naked)]
unsafe extern "C" fn launch(
    _save: *mut Checkpoint,
    _stack_pointer: *mut u8,
    _entry: Trampoline,
    _arg: *mut (),
) {
    naked_asm!(
        "sub sp, sp, #0xa0",
        "stp x19, x20, [sp, #0x00]",
        "stp x21, x22, [sp, #0x10]",
        "stp x23, x24, [sp, #0x20]",
        "stp x25, x26, [sp, #0x30]",
        "stp x27, x28, [sp, #0x40]",
        "stp x29, x30, [sp, #0x50]",
        "stp d8, d9, [sp, #0x60]",
        "stp d10, d11, [sp, #0x70]",
        "stp d12, d13, [sp, #0x80]",
        "stp d14, d15, [sp, #0x90]",
        "mov x4, sp",
        "str x4, [x0]",
        "mov sp, x1",
        "mov x0, x3",
        "blr x2",
        "brk #0x1",
    )
}
