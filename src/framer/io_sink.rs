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

//! The socket primitives the framer drives, and the yield protocol between
//! a suspended coroutine and the I/O thread that resumes it (spec.md §4.3
//! and §6's "yield protocol").

use std::io::{self, IoSlice};

use crate::coroutine::Coroutine;

/// The value a coroutine yields at a framer frame boundary. The I/O
/// thread interprets it per spec.md §6: `MayResume` means "schedule for
/// re-arm, typically writability"; `Abort` means "destroy the coroutine".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YieldSignal {
    MayResume,
    Abort,
}

/// Wire value for [`YieldSignal`], since the coroutine runtime itself is
/// payload-type-agnostic and only ever carries a plain `i32`.
impl YieldSignal {
    pub const MAY_RESUME: i32 = 0;
    pub const ABORT: i32 = -1;
}

impl From<YieldSignal> for i32 {
    fn from(signal: YieldSignal) -> i32 {
        match signal {
            YieldSignal::MayResume => YieldSignal::MAY_RESUME,
            YieldSignal::Abort => YieldSignal::ABORT,
        }
    }
}

/// The socket collaborator the framer is generic over: `send`/`writev` as
/// named in spec.md §4.3. An implementation is expected to behave as
/// blocking from the handler's point of view — internally suspending the
/// coroutine on `EWOULDBLOCK`/`EAGAIN` and relying on the I/O thread to
/// resume it once the socket is writable again.
pub trait IoSink {
    fn send(&mut self, coro: &Coroutine, bytes: &[u8], flags: i32) -> io::Result<usize>;

    fn writev(&mut self, coro: &Coroutine, iovecs: &[IoSlice<'_>]) -> io::Result<usize>;
}

/// A dependency-light default [`IoSink`] over a raw file descriptor,
/// standing in for the socket-send collaborator spec.md treats as
/// external. Retries `send`/`writev` across `EWOULDBLOCK`/`EAGAIN` by
/// suspending the coroutine with [`YieldSignal::MayResume`] and trusting
/// the I/O thread to resume it once the descriptor is writable — exactly
/// the contract spec.md §4.3 describes.
pub struct RawFdSink {
    fd: std::os::raw::c_int,
}

impl RawFdSink {
    pub fn new(fd: std::os::raw::c_int) -> RawFdSink {
        RawFdSink { fd }
    }
}

impl IoSink for RawFdSink {
    fn send(&mut self, coro: &Coroutine, bytes: &[u8], flags: i32) -> io::Result<usize> {
        loop {
            let rc = unsafe {
                libc::send(
                    self.fd,
                    bytes.as_ptr() as *const libc::c_void,
                    bytes.len(),
                    flags,
                )
            };
            if rc >= 0 {
                return Ok(rc as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                coro.suspend(YieldSignal::MayResume.into());
                continue;
            }
            return Err(err);
        }
    }

    fn writev(&mut self, coro: &Coroutine, iovecs: &[IoSlice<'_>]) -> io::Result<usize> {
        loop {
            // `std::io::IoSlice` is `#[repr(transparent)]` over `libc::iovec`
            // on every unix target; this cast is the same trick mio/socket2
            // use rather than copying every slice into a fresh iovec.
            let rc = unsafe {
                libc::writev(
                    self.fd,
                    iovecs.as_ptr() as *const libc::iovec,
                    iovecs.len() as libc::c_int,
                )
            };
            if rc >= 0 {
                return Ok(rc as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                coro.suspend(YieldSignal::MayResume.into());
                continue;
            }
            return Err(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yield_signal_round_trips_through_i32() {
        assert_eq!(i32::from(YieldSignal::MayResume), YieldSignal::MAY_RESUME);
        assert_eq!(i32::from(YieldSignal::Abort), YieldSignal::ABORT);
    }
}
