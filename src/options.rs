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

//! Coroutine spawn configuration.
//!
//! `RuntimeConfig` is plain data the embedding I/O thread populates from
//! its own configuration layer; this crate never reads files or the
//! environment itself — "configuration loading" proper stays an external
//! concern per SPEC_FULL.md §2.

use crate::stack::MIN_STACK_SIZE;

/// Default stack size for a new coroutine: generous enough that the
/// response framer's header scratch buffer (see `framer::headers`) always
/// fits alongside a handler's own call frames, per spec.md §4.1's hard
/// "scratch + headers always fits" requirement.
const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Per-coroutine configuration, analogous to the teacher's `Options`.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Requested stack size in bytes. Rounded up to [`MIN_STACK_SIZE`] and
    /// to a whole number of pages by [`crate::stack::Stack::new`].
    pub stack_size: usize,

    /// Name used only for diagnostics (log lines, panic messages).
    pub name: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> RuntimeConfig {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
            name: None,
        }
    }
}

impl RuntimeConfig {
    /// `RuntimeConfig::default()` with `stack_size` floored to
    /// [`MIN_STACK_SIZE`] rather than silently left below it.
    pub fn new() -> RuntimeConfig {
        Default::default()
    }
}
