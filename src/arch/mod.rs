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

//! Architecture-specific saved machine context and the register-level
//! context switch.
//!
//! Each backend stores the callee-saved register set plus the stack
//! pointer needed to resume a suspended coroutine. Floating point and
//! the signal mask are never saved — handlers must not carry SSE/x87
//! state or a blocked signal set across a yield.

use crate::stack::Stack;

#[cfg(target_arch = "x86_64")]
#[path = "x86_64.rs"]
mod imp;

#[cfg(target_arch = "aarch64")]
#[path = "aarch64.rs"]
mod imp;

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[path = "fallback.rs"]
mod imp;

pub(crate) use imp::Context;

/// The function a freshly primed [`Context`] begins executing at. Receives
/// the raw `data` pointer handed to [`Context::new`] and never returns —
/// the trampoline installed by the coroutine layer ends by switching away.
pub(crate) type EntryFn = extern "C" fn(data: *mut ()) -> !;

impl Context {
    /// Build a context that, when first switched into, starts running
    /// `entry(data)` on `stack`.
    pub(crate) fn new(entry: EntryFn, data: *mut (), stack: &Stack) -> Context {
        imp::new(entry, data, stack)
    }

    /// An empty context, never valid to switch into until primed by [`Context::new`]
    /// or overwritten by a [`Context::swap`].
    pub(crate) fn empty() -> Context {
        imp::empty()
    }

    /// Save the currently running machine state into `out`, then load and
    /// resume `into`. Returns once something later swaps back into `out`.
    pub(crate) fn swap(out: &mut Context, into: &Context) {
        debug_assert!(
            out as *const _ != into as *const _,
            "swapping a context into itself"
        );
        unsafe { imp::swap(out, into) }
    }
}
