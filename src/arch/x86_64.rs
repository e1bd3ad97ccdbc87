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

//! x86-64 System V context switch.
//!
//! Only the callee-saved register set (`rbp`, `rbx`, `r12`-`r15`) plus the
//! stack pointer is preserved across a switch; everything else is either
//! caller-saved (and therefore already on the stack per the calling
//! convention) or explicitly excluded by the runtime's contract (SSE/x87
//! state, the signal mask).

use crate::stack::Stack;
use std::arch::global_asm;

/// A saved machine context is, in this backend, nothing more than a stack
/// pointer: the callee-saved registers live on the stack itself, pushed
/// and popped by [`corowire_swap_x86_64`].
#[repr(C)]
pub(crate) struct Context {
    rsp: u64,
}

pub(crate) fn empty() -> Context {
    Context { rsp: 0 }
}

pub(crate) fn new(entry: super::EntryFn, data: *mut (), stack: &Stack) -> Context {
    // Reserve seven 8-byte slots below a 16-byte-aligned top of stack: the
    // six registers corowire_swap_x86_64 will `pop` (two of which double as
    // the entry point and its argument on this first swap-in), and the fake
    // return address that lands in the trampoline.
    let top = (stack.end() as usize) & !0xF;
    let frame = (top - 7 * 8) as *mut u64;
    unsafe {
        frame.add(0).write(0); // r15
        frame.add(1).write(0); // r14
        frame.add(2).write(entry as usize as u64); // r13: entry fn pointer
        frame.add(3).write(data as u64); // r12: entry fn argument
        frame.add(4).write(0); // rbx
        frame.add(5).write(0); // rbp
        frame.add(6).write(corowire_trampoline_x86_64 as usize as u64); // return address
    }
    Context { rsp: frame as u64 }
}

pub(crate) unsafe fn swap(out: &mut Context, into: &Context) {
    corowire_swap_x86_64(&mut out.rsp, &into.rsp);
}

extern "C" {
    fn corowire_swap_x86_64(save_rsp: *mut u64, load_rsp: *const u64);
    fn corowire_trampoline_x86_64();
}

global_asm!(
    ".text",
    ".global corowire_swap_x86_64",
    "corowire_swap_x86_64:",
    "pushq %rbp",
    "pushq %rbx",
    "pushq %r12",
    "pushq %r13",
    "pushq %r14",
    "pushq %r15",
    "movq %rsp, (%rdi)",
    "movq (%rsi), %rsp",
    "popq %r15",
    "popq %r14",
    "popq %r13",
    "popq %r12",
    "popq %rbx",
    "popq %rbp",
    "ret",
    ".global corowire_trampoline_x86_64",
    "corowire_trampoline_x86_64:",
    // r12 = data argument, r13 = entry fn pointer, loaded by the pops above.
    "movq %r12, %rdi",
    "callq *%r13",
    // entry is `-> !`; trap if it ever returns anyway.
    "ud2",
    options(att_syntax)
);
