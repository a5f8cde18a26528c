//! 32-bit ARM, Cortex-M in Thumb mode
//!
//! Callee-saved: r4-r11 and lr, plus d8-d15 on hard-float targets. Only
//! instructions available on ARMv6-M are used: `push`/`pop` take low
//! registers only, so r8-r11 travel through r4-r7.
//!
//! Checkpoint layout, from the saved stack pointer upwards:
//! [d8-d15,] r8, r9, r10, r11, r4, r5, r6, r7, lr.

use core::arch::{asm, naked_asm};

use super::{Checkpoint, ContextSwitch, Trampoline};

/// Cortex-M0/M0+/M3/M4/M7 and other 32-bit ARM cores
pub struct CortexM;

unsafe impl ContextSwitch for CortexM {
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

// r0 = save, r1 = restore
#[cfg(not(target_abi = "eabihf"))]
#[unsafe(naked)]
unsafe extern "C" fn switch_context(_save: *mut Checkpoint, _restore: *const Checkpoint) {
    naked_asm!(
        "push {{r4-r7, lr}}",
        "mov r4, r8",
        "mov r5, r9",
        "mov r6, r10",
        "mov r7, r11",
        "push {{r4-r7}}",
        "mov r2, sp",
        "str r2, [r0]",
        "ldr r2, [r1]",
        "mov sp, r2",
        "pop {{r4-r7}}",
        "mov r8, r4",
        "mov r9, r5",
        "mov r10, r6",
        "mov r11, r7",
        "pop {{r4-r7, pc}}",
    )
}

#[cfg(target_abi = "eabihf")]
#[unsafe(naked)]
unsafe extern "C" fn switch_context(_save: *mut Checkpoint, _restore: *const Checkpoint) {
    naked_asm!(
        "push {{r4-r7, lr}}",
        "mov r4, r8",
        "mov r5, r9",
        "mov r6, r10",
        "mov r7, r11",
        "push {{r4-r7}}",
        "vpush {{d8-d15}}",
        "mov r2, sp",
        "str r2, [r0]",
        "ldr r2, [r1]",
        "mov sp, r2",
        "vpop {{d8-d15}}",
        "pop {{r4-r7}}",
        "mov r8, r4",
        "mov r9, r5",
        "mov r10, r6",
        "mov r11, r7",
        "pop {{r4-r7, pc}}",
    )
}

// r0 = save, r1 = stack pointer (8-byte aligned), r2 = entry, r3 = arg
#[cfg(not(target_abi = "eabihf"))]
#[unsafe(naked)]
unsafe extern "C" fn launch(
    _save: *mut Checkpoint,
    _stack_pointer: *mut u8,
    _entry: Trampoline,
    _arg: *mut (),
) {
    naked_asm!(
        "push {{r4-r7, lr}}",
        "mov r4, r8",
        "mov r5, r9",
        "mov r6, r10",
        "mov r7, r11",
        "push {{r4-r7}}",
        "mov r4, sp",
        "str r4, [r0]",
        "mov sp, r1",
        "mov r0, r3",
        "blx r2",
        "udf #0",
    )
}

#[cfg(target_abi = "eabihf")]
#[unsafe(naked)]
unsafe extern "C" fn launch(
    _save: *mut Checkpoint,
    _stack_pointer: *mut u8,
    _entry: Trampoline,
    _arg: *mut (),
) {
    naked_asm!(
        "push {{r4-r7, lr}}",
        "mov r4, r8",
        "mov r5, r9",
        "mov r6, r10",
        "mov r7, r11",
        "push {{r4-r7}}",
        "vpush {{d8-d15}}",
        "mov r4, sp",
        "str r4, [r0]",
        "mov sp, r1",
        "mov r0, r3",
        "blx r2",
        "udf #0",
    )
}
