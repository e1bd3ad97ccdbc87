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

//! Stack allocation for coroutines.
//!
//! A [`Stack`] is one `mmap`'d region with a guard page at the low address
//! (the end a downward-growing stack overflows into first). The name is a
//! vestige of the segmented-stack era; there is nothing segmented here.

use std::io;
use std::ptr;

/// Minimum stack size honored by [`Stack::new`]; smaller requests are
/// rounded up. The response framer relies on this floor: it builds HTTP
/// headers directly on the coroutine stack, and needs room for its scratch
/// buffer plus the header buffer to coexist with the handler's own frames.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// An `mmap`-backed stack with a `PROT_NONE` guard page at its low end.
pub struct Stack {
    base: *mut libc::c_void,
    len: usize,
    page_size: usize,
}

// The mapping is only ever touched from the owning OS thread while its
// coroutine is suspended or running; it is moved, not shared, across
// threads.
unsafe impl Send for Stack {}

impl Stack {
    /// Map a new stack of at least `requested` bytes, rounded up to a whole
    /// number of pages and to [`MIN_STACK_SIZE`].
    pub fn new(requested: usize) -> io::Result<Stack> {
        let page_size = page_size();
        let size = round_up(requested.max(MIN_STACK_SIZE), page_size);
        // One extra page, reserved as the guard below the usable region.
        let mapped_len = size + page_size;

        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                mapped_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let guard_ok = unsafe { libc::mprotect(base, page_size, libc::PROT_NONE) == 0 };
        if !guard_ok {
            let err = io::Error::last_os_error();
            unsafe {
                libc::munmap(base, mapped_len);
            }
            return Err(err);
        }

        Ok(Stack {
            base,
            len: mapped_len,
            page_size,
        })
    }

    /// Low end of the *usable* region (i.e. just past the guard page).
    pub fn start(&self) -> *mut u8 {
        unsafe { (self.base as *mut u8).add(self.page_size) }
    }

    /// One byte past the high end of the usable region; stacks on every
    /// platform we target grow downward from here.
    pub fn end(&self) -> *mut u8 {
        unsafe { (self.base as *mut u8).add(self.len) }
    }

    /// Usable size in bytes (excludes the guard page).
    pub fn len(&self) -> usize {
        self.len - self.page_size
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base, self.len);
        }
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("base", &self.base)
            .field("len", &self.len)
            .finish()
    }
}

fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        4096
    } else {
        size as usize
    }
}

fn round_up(n: usize, multiple: usize) -> usize {
    (n + multiple - 1) / multiple * multiple
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_minimum() {
        let stack = Stack::new(1).unwrap();
        assert!(stack.len() >= MIN_STACK_SIZE);
    }

    #[test]
    fn end_is_above_start() {
        let stack = Stack::new(64 * 1024).unwrap();
        assert!((stack.end() as usize) > (stack.start() as usize));
        assert_eq!(stack.end() as usize - stack.start() as usize, stack.len());
    }

    #[test]
    fn respects_larger_request() {
        let stack = Stack::new(128 * 1024).unwrap();
        assert!(stack.len() >= 128 * 1024);
    }
}
