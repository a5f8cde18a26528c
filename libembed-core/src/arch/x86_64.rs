//! x86-64 (System V ABI)
//!
//! Callee-saved: rbx, rbp, r12-r15. Checkpoint layout, from the saved
//! stack pointer upwards: r15, r14, r13, r12, rbx, rbp, return address.

use core::arch::{asm, naked_asm};

use super::{Checkpoint, ContextSwitch, Trampoline};

/// Host builds and tests on x86-64 Linux/macOS
pub struct X86_64;

unsafe impl ContextSwitch for X86_64 {
    fn current_stack_pointer() -> *mut u8 {
        let sp: *mut u8;
        // SAFETY: reads a register, touches no memory
        unsafe { asm!("mov {}, rsp", out(reg) sp, options(nomem, nostack, preserves_flags)) };
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

// rdi = save, rsi = restore
#[unsafe(naked)]
unsafe extern "C" fn switch_context(_save: *mut Checkpoint, _restore: *const Checkpoint) {
    naked_asm!(
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov [rdi], rsp",
        "mov rsp, [rsi]",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbx",
        "pop rbp",
        "ret",
    )
}

// rdi = save, rsi = stack pointer (16-byte aligned), rdx = entry, rcx = arg
#[unsafe(naked)]
unsafe extern "C" fn launch(
    _save: *mut Checkpoint,
    _stack_pointer: *mut u8,
    _entry: Trampoline,
    _arg: *mut (),
) {
    naked_asm!(
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov [rdi], rsp",
        "mov rsp, rsi",
        "mov rdi, rcx",
        // Pushes the return address, so entry sees rsp = 8 (mod 16)
        "call rdx",
        "ud2",
    )
}
