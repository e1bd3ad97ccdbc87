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

//! Stackful coroutine runtime and streaming HTTP response framer.
//!
//! The crate is two layers:
//!
//! - [`coroutine`]: a single-threaded, cooperative, stackful task with a
//!   per-task deferred-cleanup stack and a handful of auto-registering
//!   scratch-allocation helpers. One [`Switcher`] per I/O thread holds the
//!   two machine contexts every context switch on that thread swaps
//!   between.
//! - [`framer`]: an HTTP/1.x response assembler built on top of it, which
//!   streams whole, chunked, or server-sent-event bodies without ever
//!   buffering a complete response, yielding back to the owning
//!   coroutine's caller between frames.
//!
//! Everything the framer needs from its environment — routing, the MIME
//! database, the status table, the template engine, the date formatter,
//! and the socket primitives — is expressed as a trait in [`framer`] with
//! one dependency-light default implementation, so the crate is runnable
//! and testable standalone; embedders are free to supply their own.

mod arch;
pub mod builder;
pub mod coroutine;
mod deferred;
pub mod error;
pub mod framer;
pub mod options;
pub mod stack;

pub use builder::Builder;
pub use coroutine::{Coroutine, Switcher};
pub use error::{CoroutineError, FramerError};
pub use options::RuntimeConfig;
