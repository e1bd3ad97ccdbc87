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

//! Fluent configuration for spawning a [`Coroutine`], mirroring the
//! teacher's `Builder`/`Options` pair but targeting the single-`Switcher`
//! model of this crate instead of a clonable-handle scheduler.

use crate::coroutine::Coroutine;
use crate::error::CoroutineError;
use crate::options::RuntimeConfig;
use crate::Switcher;

/// Builds a [`Coroutine`] with non-default stack size and/or a name used
/// only for diagnostics.
///
/// ```ignore
/// let switcher = Switcher::new();
/// let coro = Builder::new()
///     .name("conn-42".to_string())
///     .stack_size(128 * 1024)
///     .spawn(&switcher, |_me| 0)?;
/// ```
pub struct Builder {
    config: RuntimeConfig,
}

impl Builder {
    /// Base configuration for a coroutine-to-be, from which configuration
    /// methods can be chained.
    pub fn new() -> Builder {
        Builder {
            config: RuntimeConfig::default(),
        }
    }

    /// Name the coroutine-to-be. Used for identification only in log
    /// lines and panic messages.
    pub fn name(mut self, name: String) -> Builder {
        self.config.name = Some(name);
        self
    }

    /// Set the size of the stack for the new coroutine.
    pub fn stack_size(mut self, size: usize) -> Builder {
        self.config.stack_size = size;
        self
    }

    /// Allocate the coroutine's stack and prime it to run `handler` on
    /// first [`Coroutine::resume`].
    pub fn spawn<F>(self, switcher: &Switcher, handler: F) -> Result<Box<Coroutine>, CoroutineError>
    where
        F: FnOnce(&Coroutine) -> i32 + 'static,
    {
        Coroutine::new(switcher, &self.config, handler)
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}
