//! RISC-V 32 (ILP32, soft-float)
//!
//! Callee-saved: ra, s0-s11. The 52 bytes of registers sit in a 64-byte
//! frame to keep sp 16-byte aligned.

use core::arch::{asm, naked_asm};

use super::{Checkpoint, ContextSwitch, Trampoline};

#[cfg(target_feature = "f")]
compile_error!("libembed-core does not save fs0-fs11; hard-float RISC-V targets are not supported");

/// RV32IMC/RV32IMAC microcontrollers (ESP32-C3, GD32VF103, ...)
pub struct RiscV32;

unsafe impl ContextSwitch for RiscV32 {
    fn current_stack_pointer() -> *mut u8 {
        let sp: *mut u8;
        // SAFETY: reads a register, touches no memory
        unsafe { asm!("mv {}, sp", out(reg) sp, options(nomem, nostack, preserves_flags)) };
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

// a0 = save, a1 = restore
#[unsafe(naked)]
unsafe extern "C" fn switch_context(_save: *mut Checkpoint, _restore: *const Checkpoint) {
    naked_asm!(
        "addi sp, sp, -64",
        "sw ra, 0(sp)",
        "sw s0, 4(sp)",
        "sw s1, 8(sp)",
        "sw s2, 12(sp)",
        "sw s3, 16(sp)",
        "sw s4, 20(sp)",
        "sw s5, 24(sp)",
        "sw s6, 28(sp)",
        "sw s7, 32(sp)",
        "sw s8, 36(sp)",
        "sw s9, 40(sp)",
        "sw s10, 44(sp)",
        "sw s11, 48(sp)",
        "sw sp, 0(a0)",
        "lw sp, 0(a1)",
        "lw ra, 0(sp)",
        "lw s0, 4(sp)",
        "lw s1, 8(sp)",
        "lw s2, 12(sp)",
        "lw s3, 16(sp)",
        "lw s4, 20(sp)",
        "lw s5, 24(sp)",
        "lw s6, 28(sp)",
        "lw s7, 32(sp)",
        "lw s8, 36(sp)",
        "lw s9, 40(sp)",
        "lw s10, 44(sp)",
        "lw s11, 48(sp)",
        "addi sp, sp, 64",
        "ret",
    )
}

// a0 = save, a1 = stack pointer (16-byte aligned), a2 = entry, a3 = arg
#[unsafe(naked)]
unsafe extern "C" fn launch(
    _save: *mut Checkpoint,
    _stack_pointer: *mut u8,
    _entry: Trampoline,
    _arg: *mut (),
) {
    naked_asm!(
        "addi sp, sp, -64",
        "sw ra, 0(sp)",
        "sw s0, 4(sp)",
        "sw s1, 8(sp)",
        "sw s2, 12(sp)",
        "sw s3, 16(sp)",
        "sw s4, 20(sp)",
        "sw s5, 24(sp)",
        "sw s6, 28(sp)",
        "sw s7, 32(sp)",
        "sw s8, 36(sp)",
        "sw s9, 40(sp)",
        "sw s10, 44(sp)",
        "sw s11, 48(sp)",
        "sw sp, 0(a0)",
        "mv sp, a1",
        "mv a0, a3",
        "jalr a2",
        "unimp",
    )
}
