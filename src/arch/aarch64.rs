// The MIT License (MIT)

// Copyright (c) 2015 Rustcc developers

// Permission is hereby granted, free of charge, to any person obtaining a copy of
// this software and associated documentation files (the "Software"), to deal in
// the Software without restriction, including without limitation the rights to
// use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software is furnished to do so,
// subject to the following conditions:

// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS
// FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR
// COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER
// IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
// CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! AArch64 (AAPCS64) context switch.
//!
//! Saves the callee-saved general registers (`x19`-`x28`), the frame
//! pointer `x29`, and the link register `x30`, plus the stack pointer
//! itself. NEON/FP register state and the signal mask are not preserved,
//! matching the runtime's documented contract.

use crate::stack::Stack;
use std::arch::global_asm;

const SAVED_BYTES: usize = 96; // 6 register pairs

#[repr(C)]
pub(crate) struct Context {
    sp: u64,
}

pub(crate) fn empty() -> Context {
    Context { sp: 0 }
}

pub(crate) fn new(entry: super::EntryFn, data: *mut (), stack: &Stack) -> Context {
    let top = (stack.end() as usize) & !0xF;
    let frame = (top - SAVED_BYTES) as *mut u64;
    unsafe {
        frame.add(0).write(data as u64); // x19: entry fn argument
        frame.add(1).write(entry as usize as u64); // x20: entry fn pointer
        frame.add(2).write(0); // x21
        frame.add(3).write(0); // x22
        frame.add(4).write(0); // x23
        frame.add(5).write(0); // x24
        frame.add(6).write(0); // x25
        frame.add(7).write(0); // x26
        frame.add(8).write(0); // x27
        frame.add(9).write(0); // x28
        frame.add(10).write(0); // x29 (fp)
        frame.add(11).write(corowire_trampoline_aarch64 as usize as u64); // x30 (lr)
    }
    Context { sp: frame as u64 }
}

pub(crate) unsafe fn swap(out: &mut Context, into: &Context) {
    corowire_swap_aarch64(&mut out.sp, &into.sp);
}

extern "C" {
    fn corowire_swap_aarch64(save_sp: *mut u64, load_sp: *const u64);
    fn corowire_trampoline_aarch64();
}

global_asm!(
    ".text",
    ".global corowire_swap_aarch64",
    "corowire_swap_aarch64:",
    "sub sp, sp, #96",
    "stp x19, x20, [sp, #0]",
    "stp x21, x22, [sp, #16]",
    "stp x23, x24, [sp, #32]",
    "stp x25, x26, [sp, #48]",
    "stp x27, x28, [sp, #64]",
    "stp x29, x30, [sp, #80]",
    "mov x8, sp",
    "str x8, [x0]",
    "ldr x8, [x1]",
    "mov sp, x8",
    "ldp x19, x20, [sp, #0]",
    "ldp x21, x22, [sp, #16]",
    "ldp x23, x24, [sp, #32]",
    "ldp x25, x26, [sp, #48]",
    "ldp x27, x28, [sp, #64]",
    "ldp x29, x30, [sp, #80]",
    "add sp, sp, #96",
    "ret",
    ".global corowire_trampoline_aarch64",
    "corowire_trampoline_aarch64:",
    "mov x0, x19",
    "blr x20",
    "brk #1",
);
