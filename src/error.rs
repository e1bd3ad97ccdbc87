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

//! Typed errors surfaced at the two points spec.md calls out as fallible:
//! coroutine construction and header assembly. Everything else that
//! spec.md documents as "log and continue" (deferred-action allocation
//! failure, double-send, debug-only framing overflow) stays exactly that —
//! a `log::warn!`/`log::error!` call, not a `Result`.

use thiserror::Error;

/// Failure constructing or recycling a [`crate::coroutine::Coroutine`].
#[derive(Debug, Error)]
pub enum CoroutineError {
    /// The stack (or header) allocation failed. The OS error is preserved
    /// for diagnostics; the coroutine is never partially constructed.
    #[error("failed to allocate coroutine stack: {0}")]
    StackAllocation(#[from] std::io::Error),
}

/// Failure assembling or emitting a framed HTTP response.
#[derive(Debug, Error)]
pub enum FramerError {
    /// The header buffer was too small for the assembled response. Per
    /// spec.md §4.2/§7, the caller's remedy is to fall back to the default
    /// error response, whose fixed template cannot itself overflow.
    #[error("header buffer of {capacity} bytes is too small for the response headers")]
    HeaderBufferOverflow { capacity: usize },

    /// A chunk or event body could not be framed (e.g. a chunk length that
    /// does not fit the framer's hex-length contract). Per spec.md §7 this
    /// is unrecoverable within the connection: the coroutine yields
    /// `ABORT` and the caller must close it.
    #[error("response frame could not be encoded: {0}")]
    Unrepresentable(&'static str),

    /// The underlying `send`/`writev` collaborator failed.
    #[error("I/O error while sending response: {0}")]
    Io(#[from] std::io::Error),
}
