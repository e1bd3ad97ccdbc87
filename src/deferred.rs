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

//! The deferred-cleanup stack: a dense, growable sequence of cleanup
//! actions run LIFO on rollback or teardown.
//!
//! Capacity is retained across [`DeferredStack::clear`] so a recycled
//! coroutine (see `Coroutine::reset`) does not re-allocate this vector per
//! connection. Each action is either unary (`fn(data1)`) or binary
//! (`fn(data1, data2)`), matching spec.md's `(function, data1, data2)`
//! triple; the function pointers are safe `fn` items, not `unsafe fn` —
//! any unsafety in dereferencing `data1`/`data2` lives inside the
//! registered callback, which is the caller's responsibility.

enum Action {
    Unary(fn(*mut ()), *mut ()),
    Binary(fn(*mut (), *mut ()), *mut (), *mut ()),
}

impl Action {
    fn run(self) {
        match self {
            Action::Unary(f, data1) => f(data1),
            Action::Binary(f, data1, data2) => f(data1, data2),
        }
    }
}

/// LIFO stack of pending [`Action`]s for one coroutine.
#[derive(Default)]
pub(crate) struct DeferredStack {
    actions: Vec<Action>,
}

impl DeferredStack {
    pub(crate) fn new() -> DeferredStack {
        DeferredStack {
            actions: Vec::new(),
        }
    }

    /// Append a unary action. O(1) amortized.
    pub(crate) fn push_unary(&mut self, f: fn(*mut ()), data1: *mut ()) {
        self.actions.push(Action::Unary(f, data1));
    }

    /// Append a binary action. O(1) amortized.
    pub(crate) fn push_binary(&mut self, f: fn(*mut (), *mut ()), data1: *mut (), data2: *mut ()) {
        self.actions.push(Action::Binary(f, data1, data2));
    }

    /// Snapshot the current depth, for a later [`DeferredStack::unwind_to`].
    pub(crate) fn generation(&self) -> usize {
        self.actions.len()
    }

    /// Run and pop actions down to `generation`, most-recently-registered
    /// first. No-op if already at or below `generation`.
    pub(crate) fn unwind_to(&mut self, generation: usize) {
        while self.actions.len() > generation {
            if let Some(action) = self.actions.pop() {
                action.run();
            }
        }
    }

    /// Run every pending action LIFO and drop them, but keep the backing
    /// storage so a subsequent `reset` does not re-allocate.
    pub(crate) fn unwind_all(&mut self) {
        self.unwind_to(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    // A small helper action that pushes `id` onto a shared log when run.
    struct Logged {
        log: *const RefCell<Vec<i32>>,
        id: i32,
    }

    fn run_logged(data1: *mut ()) {
        let boxed = unsafe { Box::from_raw(data1 as *mut Logged) };
        unsafe { (*boxed.log).borrow_mut().push(boxed.id) };
    }

    fn defer_logged(stack: &mut DeferredStack, log: &RefCell<Vec<i32>>, id: i32) {
        let logged = Box::new(Logged {
            log: log as *const RefCell<Vec<i32>>,
            id,
        });
        stack.push_unary(run_logged, Box::into_raw(logged) as *mut ());
    }

    #[test]
    fn lifo_order_on_full_unwind() {
        let log = RefCell::new(Vec::new());
        let mut stack = DeferredStack::new();
        defer_logged(&mut stack, &log, 1);
        defer_logged(&mut stack, &log, 2);
        defer_logged(&mut stack, &log, 3);
        stack.unwind_all();
        assert_eq!(*log.borrow(), vec![3, 2, 1]);
    }

    #[test]
    fn generation_rollback_runs_only_the_new_region() {
        let log = RefCell::new(Vec::new());
        let mut stack = DeferredStack::new();
        defer_logged(&mut stack, &log, 1);
        let gen = stack.generation();
        defer_logged(&mut stack, &log, 2);
        defer_logged(&mut stack, &log, 3);
        stack.unwind_to(gen);
        assert_eq!(*log.borrow(), vec![3, 2]);
        assert_eq!(stack.generation(), gen);

        stack.unwind_all();
        assert_eq!(*log.borrow(), vec![3, 2, 1]);
    }

    #[test]
    fn empty_stack_unwind_is_noop() {
        let mut stack = DeferredStack::new();
        stack.unwind_all();
        assert_eq!(stack.generation(), 0);
    }

    #[test]
    fn binary_action_receives_both_arguments() {
        fn combine(data1: *mut (), data2: *mut ()) {
            let sum = unsafe { &*(data1 as *const RefCell<i32>) };
            let addend = data2 as usize as i32;
            *sum.borrow_mut() += addend;
        }
        let total = RefCell::new(0);
        let mut stack = DeferredStack::new();
        stack.push_binary(
            combine,
            &total as *const RefCell<i32> as *mut (),
            7usize as *mut (),
        );
        stack.unwind_all();
        assert_eq!(*total.borrow(), 7);
    }
}
