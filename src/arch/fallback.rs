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

//! Generic POSIX fallback context switch for architectures without a
//! hand-written register-switch backend, built on `ucontext.h` via `libc`.
//! Semantically equivalent to the register-switch backends: a coroutine's
//! machine state is saved and restored wholesale, FP/signal-mask state
//! included or not at the platform's whim (POSIX leaves the signal mask
//! undefined across `swapcontext` on some platforms, which is consistent
//! with this runtime's "do not rely on it" contract).

use crate::stack::Stack;
use libc::ucontext_t;
use std::cell::Cell;
use std::mem::MaybeUninit;
use std::ptr;

thread_local! {
    static PENDING: Cell<Option<(super::EntryFn, *mut ())>> = Cell::new(None);
}

pub(crate) struct Context {
    ucx: Box<ucontext_t>,
    pending: Cell<Option<(super::EntryFn, *mut ())>>,
}

pub(crate) fn empty() -> Context {
    Context {
        ucx: unsafe { Box::new(MaybeUninit::zeroed().assume_init()) },
        pending: Cell::new(None),
    }
}

pub(crate) fn new(entry: super::EntryFn, data: *mut (), stack: &Stack) -> Context {
    unsafe {
        let mut ucx: Box<ucontext_t> = Box::new(MaybeUninit::zeroed().assume_init());
        if libc::getcontext(&mut *ucx as *mut ucontext_t) != 0 {
            panic!("getcontext failed while priming a coroutine context");
        }
        ucx.uc_stack.ss_sp = stack.start() as *mut libc::c_void;
        ucx.uc_stack.ss_size = stack.len();
        ucx.uc_stack.ss_flags = 0;
        ucx.uc_link = ptr::null_mut();
        libc::makecontext(&mut *ucx as *mut ucontext_t, trampoline, 0);
        Context {
            ucx,
            pending: Cell::new(Some((entry, data))),
        }
    }
}

pub(crate) unsafe fn swap(out: &mut Context, into: &Context) {
    if let Some(pair) = into.pending.take() {
        PENDING.with(|p| p.set(Some(pair)));
    }
    libc::swapcontext(
        &mut *out.ucx as *mut ucontext_t,
        &*into.ucx as *const ucontext_t,
    );
}

extern "C" fn trampoline() {
    let (entry, data) = PENDING
        .with(|p| p.take())
        .expect("fallback trampoline entered with no pending entry point");
    entry(data);
}
