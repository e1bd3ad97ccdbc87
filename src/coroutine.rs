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

//! Stackful coroutines: symmetric context switching, a per-task deferred
//! cleanup stack, and the auto-registering scratch-allocation helpers.
//!
//! This is the Rust expression of spec.md §4.1. Rust naming note (not a
//! semantic change): `yield` is a reserved word, so the "yield" operation
//! from spec.md is exposed as [`Coroutine::suspend`]; "free" is exposed
//! both as an explicit [`Coroutine::free`] and implicitly via `Drop`, so a
//! coroutine dropped without an explicit call (an early return, a panic
//! unwind) still runs its deferred actions LIFO.

use std::cell::{Cell, UnsafeCell};
use std::ffi::CString;
use std::fmt;

use crate::arch::Context;
use crate::deferred::DeferredStack;
use crate::error::CoroutineError;
use crate::options::RuntimeConfig;
use crate::stack::Stack;

/// Per-I/O-thread storage of the two saved machine contexts used by every
/// context switch that thread performs. One `Switcher` is shared by every
/// `Coroutine` the thread creates; none of it is ever touched from a
/// second thread (spec.md §5: no locks, no atomics).
pub struct Switcher {
    /// The I/O thread's own context, saved by `resume` and restored by
    /// `suspend`/the trampoline's completion path.
    caller: UnsafeCell<Context>,
    /// A coroutine's context, saved the moment it suspends, then copied
    /// into the coroutine's own slot by `resume` before returning.
    callee: UnsafeCell<Context>,
}

impl Switcher {
    pub fn new() -> Switcher {
        Switcher {
            caller: UnsafeCell::new(Context::empty()),
            callee: UnsafeCell::new(Context::empty()),
        }
    }
}

impl Default for Switcher {
    fn default() -> Switcher {
        Switcher::new()
    }
}

/// fresh -> running <-> suspended -> ended -> free (spec.md §4.1 state
/// machine); `reset` takes `ended` back to `fresh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Running,
    Suspended,
    Ended,
}

type Handler = dyn FnOnce(&Coroutine) -> i32;

/// One in-progress (or recyclable) task: an owned stack, a saved machine
/// context, and an ordered deferred-cleanup sequence.
///
/// Always lives in a `Box` (see [`Coroutine::new`]): the trampoline that
/// starts the handler running is handed a raw pointer to this struct's
/// heap location, which must stay fixed for the coroutine's lifetime.
pub struct Coroutine {
    switcher: *const Switcher,
    context: UnsafeCell<Context>,
    stack: Stack,
    deferred: UnsafeCell<DeferredStack>,
    yield_value: Cell<i32>,
    state: Cell<State>,
    name: Option<String>,
    handler: Cell<Option<Box<Handler>>>,
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("name", &self.name)
            .field("state", &self.state.get())
            .finish()
    }
}

impl Coroutine {
    /// Allocate a header + stack in one block and prime a saved context so
    /// the first [`Coroutine::resume`] begins execution at a trampoline
    /// that runs `handler(coro)`, stores its return value as the final
    /// `yield_value`, marks the coroutine ended, and switches back to the
    /// caller. Never partially constructs: a failed stack allocation
    /// leaves nothing behind to free.
    pub fn new<F>(
        switcher: &Switcher,
        config: &RuntimeConfig,
        handler: F,
    ) -> Result<Box<Coroutine>, CoroutineError>
    where
        F: FnOnce(&Coroutine) -> i32 + 'static,
    {
        let stack = Stack::new(config.stack_size).map_err(CoroutineError::StackAllocation)?;
        let coro = Box::new(Coroutine {
            switcher: switcher as *const Switcher,
            context: UnsafeCell::new(Context::empty()),
            stack,
            deferred: UnsafeCell::new(DeferredStack::new()),
            yield_value: Cell::new(0),
            state: Cell::new(State::Fresh),
            name: config.name.clone(),
            handler: Cell::new(Some(Box::new(handler) as Box<Handler>)),
        });
        coro.prime();
        log::debug!("coroutine {:?} constructed", coro.name);
        Ok(coro)
    }

    /// Re-prime a saved context pointing at `self`'s (now-fixed) heap
    /// address. Shared by `new` and `reset`.
    fn prime(&self) {
        let data = self as *const Coroutine as *mut ();
        let ctx = Context::new(trampoline, data, &self.stack);
        unsafe {
            *self.context.get() = ctx;
        }
    }

    /// Run all pending deferred actions in LIFO order, discard them, clear
    /// `ended`, and re-prime the saved context as in `new`. Recycles a
    /// coroutine across connections without re-allocating its stack.
    pub fn reset<F>(&self, handler: F)
    where
        F: FnOnce(&Coroutine) -> i32 + 'static,
    {
        unsafe {
            (*self.deferred.get()).unwind_all();
        }
        self.state.set(State::Fresh);
        self.yield_value.set(0);
        self.handler.set(Some(Box::new(handler) as Box<Handler>));
        self.prime();
        log::debug!("coroutine {:?} reset", self.name);
    }

    /// Precondition: `!ended`. Saves the current thread's context into the
    /// switcher, loads the coroutine's context, and runs until the
    /// coroutine yields or ends. Returns the resulting `yield_value`.
    pub fn resume(&self) -> i32 {
        assert!(
            self.state.get() != State::Ended,
            "resume called on an ended coroutine {:?}",
            self.name
        );
        self.state.set(State::Running);
        let switcher = unsafe { &*self.switcher };
        unsafe {
            Context::swap(&mut *switcher.caller.get(), &*self.context.get());
        }
        if self.state.get() != State::Ended {
            unsafe {
                let callee = std::mem::replace(&mut *switcher.callee.get(), Context::empty());
                *self.context.get() = callee;
            }
            self.state.set(State::Suspended);
        }
        self.yield_value.get()
    }

    /// Stores `v` as the value observed by the coroutine's in-flight
    /// `suspend` call, then resumes.
    pub fn resume_value(&self, v: i32) -> i32 {
        self.yield_value.set(v);
        self.resume()
    }

    /// The `yield` operation from spec.md §4.1, renamed because `yield` is
    /// a Rust keyword. Callable only from within the coroutine itself:
    /// saves its context into the switcher, restores the caller's, and
    /// returns to whoever last resumed it. When control later returns
    /// here, the return value is whatever `resume_value` last stored.
    pub fn suspend(&self, v: i32) -> i32 {
        debug_assert!(
            self.state.get() == State::Running,
            "suspend called outside a running coroutine"
        );
        self.yield_value.set(v);
        self.switch_to_caller();
        self.yield_value.get()
    }

    fn switch_to_caller(&self) {
        let switcher = unsafe { &*self.switcher };
        unsafe {
            Context::swap(&mut *switcher.callee.get(), &*switcher.caller.get());
        }
    }

    /// Append a unary deferred action: `f(data1)`, run when the coroutine
    /// ends, is `free`d, or a generation including this registration is
    /// rolled back. O(1) amortized.
    pub fn defer(&self, f: fn(*mut ()), data: *mut ()) {
        unsafe {
            (*self.deferred.get()).push_unary(f, data);
        }
    }

    /// Append a binary deferred action: `f(data1, data2)`.
    pub fn defer2(&self, f: fn(*mut (), *mut ()), data1: *mut (), data2: *mut ()) {
        unsafe {
            (*self.deferred.get()).push_binary(f, data1, data2);
        }
    }

    /// Snapshot the current number of deferred actions, for a later
    /// [`Coroutine::deferred_run`].
    pub fn deferred_generation(&self) -> usize {
        unsafe { (*self.deferred.get()).generation() }
    }

    /// Execute and pop actions down to `generation`, in LIFO order. Lets a
    /// handler set up a temporary cleanup region, do work, and roll it
    /// back without ending the coroutine.
    pub fn deferred_run(&self, generation: usize) {
        unsafe {
            (*self.deferred.get()).unwind_to(generation);
        }
    }

    /// Run remaining deferred actions (LIFO) and release the coroutine's
    /// storage. Consuming `self` makes a double-free impossible at the
    /// type level; a coroutine simply dropped without calling this runs
    /// the same teardown via `Drop`.
    pub fn free(self: Box<Self>) {
        // Drop does the work; this exists so callers can spell spec.md's
        // `free(coro)` directly instead of relying on scope-exit.
        drop(self);
    }

    /// `true` once the handler has returned. Per spec.md, this flips
    /// exactly once and `resume` is prohibited afterward; `reset` is the
    /// only legal transition back out.
    pub fn is_ended(&self) -> bool {
        self.state.get() == State::Ended
    }

    /// The coroutine's owned stack size in bytes, for diagnostics and
    /// tests.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    // -- Auto-registering scratch allocation helpers ------------------
    //
    // Each of these performs an allocation and immediately defers its
    // release, so ordinary handler code never has to remember to free
    // request-scoped scratch memory by hand.

    /// Allocate `size` bytes, deferring `libc::free` (well, `Vec`'s own
    /// deallocation) until the coroutine ends, resets, or rolls back past
    /// this registration.
    pub fn malloc(&self, size: usize) -> *mut u8 {
        self.malloc_with(size, default_destructor)
    }

    /// As [`Coroutine::malloc`], but the deferred action calls `destructor`
    /// rather than the default dealloc, for buffers that need custom
    /// teardown logic.
    ///
    /// The allocation is boxed as a `Vec<u8>` so the returned byte pointer
    /// and the pointer handed to `destructor` can both be derived from one
    /// thin heap pointer (a `Box<[u8]>`'s pointer is fat; a boxed `Vec`'s
    /// is not).
    pub fn malloc_with(&self, size: usize, destructor: fn(*mut ())) -> *mut u8 {
        let vec: Box<Vec<u8>> = Box::new(vec![0u8; size]);
        let raw = Box::into_raw(vec);
        self.defer(destructor, raw as *mut ());
        unsafe { (*raw).as_mut_ptr() }
    }

    /// Copy `s` into a fresh NUL-terminated buffer, deferring its release.
    pub fn strdup(&self, s: &str) -> *mut std::os::raw::c_char {
        self.strndup(s, s.len())
    }

    /// As [`Coroutine::strdup`], truncated to at most `n` bytes of `s`.
    pub fn strndup(&self, s: &str, n: usize) -> *mut std::os::raw::c_char {
        let truncated = &s.as_bytes()[..n.min(s.len())];
        let cstring = CString::new(truncated).unwrap_or_else(|_| {
            // Embedded NUL: truncate at the first one, matching C strndup's
            // effective behavior of stopping at the first NUL it meets.
            let stop = truncated.iter().position(|&b| b == 0).unwrap_or(truncated.len());
            CString::new(&truncated[..stop]).expect("no NUL remains after truncation")
        });
        let ptr = cstring.into_raw();
        self.defer(free_cstring, ptr as *mut ());
        ptr
    }

    /// Format `args` per `fmt`-style rules via `format_args!` at the call
    /// site (Rust has no variadic `printf`); returns a NUL-terminated
    /// buffer whose release is deferred, mirroring spec.md's `printf`
    /// helper.
    pub fn printf(&self, formatted: fmt::Arguments<'_>) -> *mut std::os::raw::c_char {
        self.strdup(&fmt::format(formatted))
    }
}

fn default_destructor(data: *mut ()) {
    unsafe {
        drop(Box::from_raw(data as *mut Vec<u8>));
    }
}

fn free_cstring(data: *mut ()) {
    unsafe {
        drop(CString::from_raw(data as *mut std::os::raw::c_char));
    }
}

impl Drop for Coroutine {
    fn drop(&mut self) {
        unsafe {
            (*self.deferred.get()).unwind_all();
        }
        log::debug!("coroutine {:?} freed", self.name);
    }
}

/// The function every primed [`Context`] begins executing at. Takes the
/// coroutine's own address (stashed as the `data` pointer), runs the
/// registered handler, stores its result, marks the coroutine ended, and
/// switches back to whoever resumed it. Never returns.
extern "C" fn trampoline(data: *mut ()) -> ! {
    let coro = unsafe { &*(data as *const Coroutine) };
    let handler = coro
        .handler
        .take()
        .expect("coroutine trampoline entered without a handler");
    let result = handler(coro);
    coro.yield_value.set(result);
    coro.state.set(State::Ended);
    coro.switch_to_caller();
    unreachable!("resumed an ended coroutine");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn resume_runs_handler_and_returns_its_value() {
        let switcher = Switcher::new();
        let coro = Coroutine::new(&switcher, &RuntimeConfig::default(), |_me| 42).unwrap();
        assert_eq!(coro.resume(), 42);
        assert!(coro.is_ended());
    }

    #[test]
    fn resume_yield_duality_transmits_values_both_ways() {
        let switcher = Switcher::new();
        let coro = Coroutine::new(&switcher, &RuntimeConfig::default(), |me| {
            let from_caller = me.suspend(1);
            assert_eq!(from_caller, 10);
            let from_caller_2 = me.suspend(2);
            assert_eq!(from_caller_2, 20);
            3
        })
        .unwrap();

        assert_eq!(coro.resume(), 1);
        assert_eq!(coro.resume_value(10), 2);
        assert_eq!(coro.resume_value(20), 3);
        assert!(coro.is_ended());
    }

    #[test]
    #[should_panic(expected = "resume called on an ended coroutine")]
    fn resume_after_ended_panics() {
        let switcher = Switcher::new();
        let coro = Coroutine::new(&switcher, &RuntimeConfig::default(), |_me| 0).unwrap();
        coro.resume();
        coro.resume();
    }

    #[test]
    fn reset_reruns_deferred_actions_and_allows_resume_again() {
        let switcher = Switcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let coro = Coroutine::new(&switcher, &RuntimeConfig::default(), {
            let log = log.clone();
            move |me| {
                let raw = Rc::into_raw(log) as *mut ();
                fn run(data: *mut ()) {
                    let log = unsafe { Rc::from_raw(data as *const RefCell<Vec<i32>>) };
                    log.borrow_mut().push(1);
                }
                me.defer(run, raw);
                0
            }
        })
        .unwrap();
        coro.resume();
        assert!(coro.is_ended());
        assert_eq!(*log.borrow(), Vec::<i32>::new());

        coro.reset(|_me| 99);
        assert!(!coro.is_ended());
        assert_eq!(coro.resume(), 99);
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn defer_lifo_runs_in_reverse_registration_order() {
        let switcher = Switcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_for_handler = log.clone();
        let coro = Coroutine::new(&switcher, &RuntimeConfig::default(), move |me| {
            for id in 1..=3 {
                defer_push(me, log_for_handler.clone(), id);
            }
            0
        })
        .unwrap();
        coro.resume();
        assert_eq!(*log.borrow(), vec![3, 2, 1]);
    }

    fn defer_push(me: &Coroutine, log: Rc<RefCell<Vec<i32>>>, id: i32) {
        struct Entry {
            log: Rc<RefCell<Vec<i32>>>,
            id: i32,
        }
        fn run(data: *mut ()) {
            let entry = unsafe { Box::from_raw(data as *mut Entry) };
            entry.log.borrow_mut().push(entry.id);
        }
        let entry = Box::new(Entry { log, id });
        me.defer(run, Box::into_raw(entry) as *mut ());
    }

    #[test]
    fn malloc_is_freed_exactly_once_on_free() {
        static mut FREE_COUNT: usize = 0;
        fn counting_destructor(data: *mut ()) {
            unsafe {
                FREE_COUNT += 1;
            }
            default_destructor(data);
        }

        let switcher = Switcher::new();
        let coro = Coroutine::new(&switcher, &RuntimeConfig::default(), |me| {
            let _buf = me.malloc_with(64, counting_destructor);
            0
        })
        .unwrap();
        coro.resume();
        drop(coro);
        unsafe {
            assert_eq!(FREE_COUNT, 1);
        }
    }

    #[test]
    fn strdup_roundtrips_the_string() {
        let switcher = Switcher::new();
        let coro = Coroutine::new(&switcher, &RuntimeConfig::default(), |me| {
            let ptr = me.strdup("hello");
            let back = unsafe { std::ffi::CStr::from_ptr(ptr) };
            assert_eq!(back.to_str().unwrap(), "hello");
            0
        })
        .unwrap();
        coro.resume();
    }
}
