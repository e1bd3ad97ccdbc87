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

//! HTTP/1.x response framing: whole, chunked, and server-sent-event
//! emission modes over a bounded header buffer, driven from inside a
//! [`crate::coroutine::Coroutine`] (spec.md §4.2).
//!
//! The framer never heap-allocates its header buffer and never panics on
//! a malformed response: overflow, a missing MIME type, or a failing
//! stream callback all fall back through [`default_error_response`]
//! rather than propagating out of the coroutine, per spec.md §7.

pub mod buffer;
pub mod clock;
pub mod headers;
pub mod io_sink;
pub mod status;
pub mod template;

pub use buffer::{BodyBuffer, ScratchBuffer};
pub use clock::{Clock, FixedClock, SystemClock};
pub use headers::HeaderWriter;
pub use io_sink::{IoSink, RawFdSink, YieldSignal};
pub use status::{StandardStatusTable, StatusTable};
pub use template::{MustacheLikeTemplate, TemplateEngine, DEFAULT_ERROR_TEMPLATE};

use std::io::IoSlice;

use bitflags::bitflags;

use crate::coroutine::Coroutine;
use crate::error::FramerError;

/// Size of the fixed, stack-resident buffer header assembly writes into.
/// Chosen so it comfortably holds a handful of additional headers plus
/// the fixed ones (status line, framing, type, connection, date,
/// expires, CORS, server) without ever touching the heap.
pub const HEADER_BUFFER_SIZE: usize = 4096;

/// Sanity bound on a single chunk's body length. Exceeding it is the
/// "Unrepresentable chunk length" error kind from spec.md §7: the
/// coroutine yields `ABORT` and the connection is closed rather than
/// emitting a malformed chunk.
pub const MAX_CHUNK_BODY: usize = 64 * 1024 * 1024;

bitflags! {
    /// Flag bitset on a [`ResponseContext`] (spec.md §6).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResponseFlags: u32 {
        /// Emit `HTTP/1.0` in the status line instead of `HTTP/1.1`.
        const HTTP_1_0 = 1 << 0;
        /// Emit `Connection: keep-alive` instead of `Connection: close`.
        const KEEP_ALIVE = 1 << 1;
        /// Use chunked transfer encoding.
        const CHUNKED = 1 << 2;
        /// Omit `Content-Length` (and don't use chunked either).
        const NO_CONTENT_LENGTH = 1 << 3;
        /// Headers already on the wire; further header-emitting calls
        /// are quietly ignored.
        const SENT_HEADERS = 1 << 4;
        /// Emit four permissive CORS headers.
        const ALLOW_CORS = 1 << 5;
    }
}

impl Default for ResponseFlags {
    fn default() -> ResponseFlags {
        ResponseFlags::empty()
    }
}

/// The HTTP request method, as far as the framer needs to know it: only
/// whether a response to this method carries a body on the wire. Full
/// request parsing is out of scope (spec.md §1 Non-goals); this is the
/// one bit of it the framer's whole-response path depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMethod {
    #[default]
    Get,
    Post,
    Head,
    Other,
}

impl RequestMethod {
    fn carries_response_body(self) -> bool {
        matches!(self, RequestMethod::Get | RequestMethod::Post)
    }
}

/// Product string and per-response bookkeeping the framer needs from its
/// embedder. Carries no per-request state; share one across a connection
/// or a whole process.
#[derive(Debug, Clone)]
pub struct FramerConfig {
    /// Value of the final `Server:` header line. A user-supplied `Server`
    /// header is always dropped in favor of this one (spec.md §6).
    pub server: String,
}

impl Default for FramerConfig {
    fn default() -> FramerConfig {
        FramerConfig {
            server: "corowire".to_string(),
        }
    }
}

/// A stream callback: invoked once by [`respond`], filling `body` and
/// returning a status-like code. A return of 400 or greater aborts the
/// normal response and falls back to [`default_error_response`] with
/// that code (spec.md §4.2 "Whole response").
pub type StreamCallback = Box<dyn FnOnce(&mut BodyBuffer) -> u16>;

/// The handler-owned view the framer operates on: spec.md §3's "Response
/// Context". Holds the body buffer, the optional stream callback, MIME
/// and framing bookkeeping, additional headers, the flag bitset, and the
/// collaborators (`config`/`clock`/`status_table`/`template`) the I/O
/// layer supplies before the coroutine runs.
pub struct ResponseContext<'cfg> {
    pub body: BodyBuffer,
    pub stream: Option<StreamCallback>,
    pub mime: Option<String>,
    pub content_length_hint: Option<usize>,
    pub headers: Vec<(String, String)>,
    pub flags: ResponseFlags,
    pub request_method: RequestMethod,
    config: &'cfg FramerConfig,
    clock: &'cfg dyn Clock,
    status_table: &'cfg dyn StatusTable,
    template: &'cfg dyn TemplateEngine,
}

impl<'cfg> ResponseContext<'cfg> {
    pub fn new(
        config: &'cfg FramerConfig,
        clock: &'cfg dyn Clock,
        status_table: &'cfg dyn StatusTable,
        template: &'cfg dyn TemplateEngine,
    ) -> ResponseContext<'cfg> {
        ResponseContext {
            body: BodyBuffer::new(),
            stream: None,
            mime: None,
            content_length_hint: None,
            headers: Vec::new(),
            flags: ResponseFlags::empty(),
            request_method: RequestMethod::Get,
            config,
            clock,
            status_table,
            template,
        }
    }
}

/// `MSG_MORE` hints to the kernel that more data is coming right behind
/// this write, so it can coalesce into fewer packets; only meaningful on
/// Linux, a no-op flag value elsewhere.
#[cfg(target_os = "linux")]
const MORE_DATA_FLAG: i32 = libc::MSG_MORE;
#[cfg(not(target_os = "linux"))]
const MORE_DATA_FLAG: i32 = 0;

const EVENT_PREFIX: &[u8] = b"event: ";
const DATA_PREFIX: &[u8] = b"data: ";
const CRLF: &[u8] = b"\r\n";
const CRLF_CRLF: &[u8] = b"\r\n\r\n";

/// Assembles response headers into `buf`, in the fixed order spec.md
/// §4.2 specifies. Returns the header length, excluding the trailing NUL
/// [`HeaderWriter::finish`] writes after it.
pub fn assemble_headers(
    buf: &mut [u8],
    ctx: &ResponseContext,
    status: u16,
) -> Result<usize, FramerError> {
    let mut w = HeaderWriter::new(buf);

    // 1. Status line.
    let version = if ctx.flags.contains(ResponseFlags::HTTP_1_0) {
        "HTTP/1.0"
    } else {
        "HTTP/1.1"
    };
    w.write_line(&format!(
        "{} {} {}",
        version,
        status,
        ctx.status_table.name(status)
    ))?;

    // 2. Framing.
    if ctx.flags.contains(ResponseFlags::CHUNKED) {
        w.write_header("Transfer-Encoding", "chunked")?;
    } else if !ctx.flags.contains(ResponseFlags::NO_CONTENT_LENGTH) {
        let content_length = ctx.content_length_hint.unwrap_or_else(|| ctx.body.len());
        w.write_header("Content-Length", &content_length.to_string())?;
    }

    // 3. Content-Type.
    if let Some(mime) = &ctx.mime {
        w.write_header("Content-Type", mime)?;
    }

    // 4. Connection.
    w.write_header(
        "Connection",
        if ctx.flags.contains(ResponseFlags::KEEP_ALIVE) {
            "keep-alive"
        } else {
            "close"
        },
    )?;

    // 5. Additional headers, only for success-ish statuses (or 401,
    // which needs to carry WWW-Authenticate). `Server` is always
    // dropped; note whether the user already supplied Date/Expires so
    // steps 6-7 don't double them up.
    let emit_additional = status < 400 || status == 401;
    let mut user_overrode_date = false;
    let mut user_overrode_expires = false;
    if emit_additional {
        for (key, value) in &ctx.headers {
            if key.eq_ignore_ascii_case("server") {
                continue;
            }
            if key.eq_ignore_ascii_case("date") {
                user_overrode_date = true;
            }
            if key.eq_ignore_ascii_case("expires") {
                user_overrode_expires = true;
            }
            w.write_header(key, value)?;
        }
    }

    // 6. Date.
    if !user_overrode_date {
        let date = ctx.clock.http_date();
        w.write_header("Date", std::str::from_utf8(&date).unwrap_or_default())?;
    }

    // 7. Expires.
    if !user_overrode_expires {
        let expires = ctx.clock.http_date();
        w.write_header("Expires", std::str::from_utf8(&expires).unwrap_or_default())?;
    }

    // 8. CORS.
    if ctx.flags.contains(ResponseFlags::ALLOW_CORS) {
        w.write_header("Access-Control-Allow-Origin", "*")?;
        w.write_header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")?;
        w.write_header("Access-Control-Allow-Headers", "Content-Type, Authorization")?;
        w.write_header("Access-Control-Max-Age", "86400")?;
    }

    // 9. Server.
    w.write_header("Server", &ctx.config.server)?;

    // 10. Blank line + trailing NUL (excluded from the returned length).
    w.finish()
}

fn send_headers_if_needed(
    ctx: &mut ResponseContext,
    coro: &Coroutine,
    io: &mut dyn IoSink,
    status: u16,
    send_flags: i32,
) -> Result<(), FramerError> {
    if ctx.flags.contains(ResponseFlags::SENT_HEADERS) {
        log::debug!("double-send of headers ignored for status {status}");
        return Ok(());
    }
    let mut header_buf = [0u8; HEADER_BUFFER_SIZE];
    let header_len = assemble_headers(&mut header_buf, ctx, status)?;
    ctx.flags.insert(ResponseFlags::SENT_HEADERS);
    io.send(coro, &header_buf[..header_len], send_flags)?;
    Ok(())
}

/// Emission mode 1: whole response (spec.md §4.2). If no MIME type is
/// set, falls back to [`default_error_response`]. Otherwise, if a stream
/// callback is registered, invokes it once (clearing it first to prevent
/// re-entry on failure); a result of 400 or greater also falls back to
/// the default error response. Otherwise assembles headers into a fixed
/// buffer and sends `[headers, body]` via a vectored write for methods
/// that carry a body, or just the headers otherwise.
pub fn respond(
    ctx: &mut ResponseContext,
    coro: &Coroutine,
    io: &mut dyn IoSink,
    status: u16,
) -> Result<YieldSignal, FramerError> {
    if ctx.mime.is_none() {
        return default_error_response(ctx, coro, io, status);
    }

    // A final `respond` after chunked mode was selected just sends the
    // terminating zero-length chunk.
    if ctx.flags.contains(ResponseFlags::CHUNKED) && ctx.flags.contains(ResponseFlags::SENT_HEADERS) {
        ctx.body.reset();
        return send_chunk(ctx, coro, io);
    }

    if let Some(stream) = ctx.stream.take() {
        let result_status = stream(&mut ctx.body);
        if result_status >= 400 {
            return default_error_response(ctx, coro, io, result_status);
        }
    }

    if ctx.flags.contains(ResponseFlags::SENT_HEADERS) {
        log::debug!("double-send of headers ignored for status {status}");
        return Ok(YieldSignal::MayResume);
    }

    let mut header_buf = [0u8; HEADER_BUFFER_SIZE];
    let header_len = assemble_headers(&mut header_buf, ctx, status)?;
    ctx.flags.insert(ResponseFlags::SENT_HEADERS);

    if ctx.request_method.carries_response_body() {
        let iovecs = [
            IoSlice::new(&header_buf[..header_len]),
            IoSlice::new(ctx.body.bytes()),
        ];
        io.writev(coro, &iovecs)?;
    } else {
        io.send(coro, &header_buf[..header_len], 0)?;
    }
    Ok(YieldSignal::MayResume)
}

/// Emission mode 2, part one: sets the `CHUNKED` flag, builds headers
/// (which will include `Transfer-Encoding: chunked`), and sends them
/// with a flag hinting more data follows.
pub fn set_chunked(
    ctx: &mut ResponseContext,
    coro: &Coroutine,
    io: &mut dyn IoSink,
    status: u16,
) -> Result<(), FramerError> {
    ctx.flags.insert(ResponseFlags::CHUNKED);
    send_headers_if_needed(ctx, coro, io, status, MORE_DATA_FLAG)
}

/// Emission mode 2, part two: formats the current body buffer as one
/// chunk (`hex(len) CRLF bytes CRLF`, a three-iovec vectored write),
/// clears the buffer, and yields [`YieldSignal::MayResume`] so the I/O
/// thread can await writability before the next chunk. An empty body
/// emits the terminator `0\r\n\r\n`. A chunk body past
/// [`MAX_CHUNK_BODY`] is the "unrepresentable chunk length" error kind:
/// the coroutine yields [`YieldSignal::Abort`] instead and an error is
/// returned.
pub fn send_chunk(
    ctx: &mut ResponseContext,
    coro: &Coroutine,
    io: &mut dyn IoSink,
) -> Result<YieldSignal, FramerError> {
    if ctx.body.len() > MAX_CHUNK_BODY {
        coro.suspend(YieldSignal::Abort.into());
        return Err(FramerError::Unrepresentable(
            "chunk body exceeds the representable chunk length",
        ));
    }

    let chunk_header = format!("{:x}\r\n", ctx.body.len());
    let iovecs = [
        IoSlice::new(chunk_header.as_bytes()),
        IoSlice::new(ctx.body.bytes()),
        IoSlice::new(CRLF),
    ];
    io.writev(coro, &iovecs)?;
    ctx.body.reset();
    coro.suspend(YieldSignal::MayResume.into());
    Ok(YieldSignal::MayResume)
}

/// Emission mode 3, part one: sets MIME `text/event-stream`, flag
/// `NO_CONTENT_LENGTH`, and sends headers.
pub fn set_event_stream(
    ctx: &mut ResponseContext,
    coro: &Coroutine,
    io: &mut dyn IoSink,
    status: u16,
) -> Result<(), FramerError> {
    ctx.mime = Some("text/event-stream".to_string());
    ctx.flags.insert(ResponseFlags::NO_CONTENT_LENGTH);
    send_headers_if_needed(ctx, coro, io, status, 0)
}

/// Emission mode 3, part two: emits up to six iovecs — an optional
/// `event: NAME\r\n`, an optional `data: BYTES`, and a terminating
/// `\r\n\r\n` — then clears the buffer and yields
/// [`YieldSignal::MayResume`].
pub fn send_event(
    ctx: &mut ResponseContext,
    coro: &Coroutine,
    io: &mut dyn IoSink,
    event_name: Option<&str>,
) -> Result<YieldSignal, FramerError> {
    let mut iovecs: Vec<IoSlice> = Vec::with_capacity(6);
    if let Some(name) = event_name {
        iovecs.push(IoSlice::new(EVENT_PREFIX));
        iovecs.push(IoSlice::new(name.as_bytes()));
        iovecs.push(IoSlice::new(CRLF));
    }
    let body = ctx.body.bytes();
    if !body.is_empty() {
        iovecs.push(IoSlice::new(DATA_PREFIX));
        iovecs.push(IoSlice::new(body));
    }
    iovecs.push(IoSlice::new(CRLF_CRLF));

    io.writev(coro, &iovecs)?;
    ctx.body.reset();
    coro.suspend(YieldSignal::MayResume.into());
    Ok(YieldSignal::MayResume)
}

/// Sets MIME `text/html`, renders the fixed error template with
/// `{short_message, long_message}` bound to the status's name and
/// description, then dispatches through the whole-response path
/// (spec.md §4.2 "Default error response"). The stream callback is
/// always cleared first, breaking the recursion a failing callback would
/// otherwise cause by routing back through this same function.
pub fn default_error_response(
    ctx: &mut ResponseContext,
    coro: &Coroutine,
    io: &mut dyn IoSink,
    status: u16,
) -> Result<YieldSignal, FramerError> {
    ctx.stream = None;
    ctx.mime = Some("text/html".to_string());
    let short_message = ctx.status_table.name(status).to_string();
    let long_message = ctx.status_table.description(status).to_string();
    let rendered = ctx.template.render(
        DEFAULT_ERROR_TEMPLATE,
        &[
            ("short_message", &short_message),
            ("long_message", &long_message),
        ],
    );
    ctx.body.set(rendered);
    ctx.content_length_hint = None;

    if ctx.flags.contains(ResponseFlags::SENT_HEADERS) {
        log::debug!("double-send of headers ignored for default error status {status}");
        return Ok(YieldSignal::MayResume);
    }
    let mut header_buf = [0u8; HEADER_BUFFER_SIZE];
    let header_len = assemble_headers(&mut header_buf, ctx, status)?;
    ctx.flags.insert(ResponseFlags::SENT_HEADERS);
    if ctx.request_method.carries_response_body() {
        let iovecs = [
            IoSlice::new(&header_buf[..header_len]),
            IoSlice::new(ctx.body.bytes()),
        ];
        io.writev(coro, &iovecs)?;
    } else {
        io.send(coro, &header_buf[..header_len], 0)?;
    }
    Ok(YieldSignal::MayResume)
}
