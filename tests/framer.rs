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

//! Integration tests for the response framer, exercising the six worked
//! scenarios from spec.md §8 end-to-end through an actual coroutine.

use std::cell::RefCell;
use std::io;
use std::io::IoSlice;
use std::rc::Rc;

use corowire::coroutine::{Coroutine, Switcher};
use corowire::framer::{
    self, Clock, FixedClock, FramerConfig, IoSink, MustacheLikeTemplate, ResponseContext,
    ResponseFlags, StandardStatusTable, YieldSignal,
};
use corowire::options::RuntimeConfig;

/// Captures every byte handed to `send`/`writev`, in order, standing in
/// for a real socket.
#[derive(Clone, Default)]
struct RecordingSink {
    written: Rc<RefCell<Vec<u8>>>,
}

impl RecordingSink {
    fn new() -> RecordingSink {
        RecordingSink::default()
    }

    fn contents(&self) -> Vec<u8> {
        self.written.borrow().clone()
    }
}

impl IoSink for RecordingSink {
    fn send(&mut self, _coro: &Coroutine, bytes: &[u8], _flags: i32) -> io::Result<usize> {
        self.written.borrow_mut().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn writev(&mut self, _coro: &Coroutine, iovecs: &[IoSlice<'_>]) -> io::Result<usize> {
        let mut total = 0;
        for iov in iovecs {
            self.written.borrow_mut().extend_from_slice(iov);
            total += iov.len();
        }
        Ok(total)
    }
}

/// Drives `body` (a handler closure, typically capturing a `RecordingSink`
/// and running framer calls against a coroutine-local `ResponseContext`)
/// to completion, resuming until the coroutine ends.
fn run_to_completion<F>(body: F) -> i32
where
    F: FnOnce(&Coroutine) -> i32 + 'static,
{
    let switcher = Switcher::new();
    let coro = Coroutine::new(&switcher, &RuntimeConfig::default(), body).unwrap();
    let mut last = coro.resume();
    while !coro.is_ended() {
        last = coro.resume();
    }
    last
}

fn fixed_clock() -> FixedClock {
    FixedClock::new("Sun, 06 Nov 1994 08:49:37 GMT")
}

/// Scenario 1: simple 200.
#[test]
fn scenario_simple_200() {
    let sink = RecordingSink::new();
    let sink_for_handler = sink.clone();
    run_to_completion(move |coro| {
        let config = FramerConfig::default();
        let clock = fixed_clock();
        let status_table = StandardStatusTable;
        let template = MustacheLikeTemplate;
        let mut ctx = ResponseContext::new(&config, &clock, &status_table, &template);
        ctx.mime = Some("text/plain".to_string());
        ctx.flags.insert(ResponseFlags::KEEP_ALIVE);
        ctx.body.extend_from_slice(b"hi");

        let mut sink = sink_for_handler;
        framer::respond(&mut ctx, coro, &mut sink, 200).unwrap();
        0
    });

    let output = String::from_utf8(sink.contents()).unwrap();
    assert!(output.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(output.contains("Content-Length: 2\r\n"));
    assert!(output.contains("Content-Type: text/plain\r\n"));
    assert!(output.contains("Connection: keep-alive\r\n"));
    assert_eq!(output.matches("Server:").count(), 1);
    let (head, body) = output.split_once("\r\n\r\n").unwrap();
    assert!(head.ends_with("Server: corowire"));
    assert_eq!(body, "hi");
}

/// Scenario 2: 404 default error.
#[test]
fn scenario_404_default_error() {
    let sink = RecordingSink::new();
    let sink_for_handler = sink.clone();
    run_to_completion(move |coro| {
        let config = FramerConfig::default();
        let clock = fixed_clock();
        let status_table = StandardStatusTable;
        let template = MustacheLikeTemplate;
        let mut ctx = ResponseContext::new(&config, &clock, &status_table, &template);
        // No MIME set: respond() must fall back to the default error page.
        let mut sink = sink_for_handler;
        framer::respond(&mut ctx, coro, &mut sink, 404).unwrap();
        0
    });

    let output = String::from_utf8(sink.contents()).unwrap();
    assert!(output.contains("Content-Type: text/html\r\n"));
    assert!(output.contains("Not Found"));
    assert!(output.contains("The requested resource could not be found on this server."));
}

/// Scenario 3: chunked stream of three frames "A", "BB", "CCC".
#[test]
fn scenario_chunked_stream_of_three_frames() {
    let sink = RecordingSink::new();
    let sink_for_handler = sink.clone();
    let yields = Rc::new(RefCell::new(Vec::new()));
    let yields_for_handler = yields.clone();

    run_to_completion(move |coro| {
        let config = FramerConfig::default();
        let clock = fixed_clock();
        let status_table = StandardStatusTable;
        let template = MustacheLikeTemplate;
        let mut ctx = ResponseContext::new(&config, &clock, &status_table, &template);
        ctx.mime = Some("text/plain".to_string());
        let mut sink = sink_for_handler;

        framer::set_chunked(&mut ctx, coro, &mut sink, 200).unwrap();
        for chunk in [&b"A"[..], &b"BB"[..], &b"CCC"[..]] {
            ctx.body.extend_from_slice(chunk);
            let signal = framer::send_chunk(&mut ctx, coro, &mut sink).unwrap();
            yields_for_handler.borrow_mut().push(signal);
        }
        framer::respond(&mut ctx, coro, &mut sink, 200).unwrap();
        0
    });

    let output = sink.contents();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("Transfer-Encoding: chunked\r\n"));
    assert!(text.contains("1\r\nA\r\n"));
    assert!(text.contains("2\r\nBB\r\n"));
    assert!(text.contains("3\r\nCCC\r\n"));
    assert!(text.ends_with("0\r\n\r\n"));
    assert!(yields.borrow().iter().all(|s| *s == YieldSignal::MayResume));
}

/// Scenario 4: SSE frame.
#[test]
fn scenario_sse_frame() {
    let sink = RecordingSink::new();
    let sink_for_handler = sink.clone();
    run_to_completion(move |coro| {
        let config = FramerConfig::default();
        let clock = fixed_clock();
        let status_table = StandardStatusTable;
        let template = MustacheLikeTemplate;
        let mut ctx = ResponseContext::new(&config, &clock, &status_table, &template);
        let mut sink = sink_for_handler;

        framer::set_event_stream(&mut ctx, coro, &mut sink, 200).unwrap();
        ctx.body.extend_from_slice(b"t=1");
        framer::send_event(&mut ctx, coro, &mut sink, Some("ping")).unwrap();
        0
    });

    let output = sink.contents();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("Content-Type: text/event-stream\r\n"));
    assert!(!text.contains("Content-Length:"));
    assert!(text.ends_with("event: ping\r\ndata: t=1\r\n\r\n"));
}

/// Scenario 5: CORS + user Date override.
#[test]
fn scenario_cors_and_user_date_override() {
    let sink = RecordingSink::new();
    let sink_for_handler = sink.clone();
    run_to_completion(move |coro| {
        let config = FramerConfig::default();
        let clock = fixed_clock();
        let status_table = StandardStatusTable;
        let template = MustacheLikeTemplate;
        let mut ctx = ResponseContext::new(&config, &clock, &status_table, &template);
        ctx.mime = Some("text/plain".to_string());
        ctx.flags.insert(ResponseFlags::ALLOW_CORS);
        ctx.headers.push(("Date".to_string(), "X".to_string()));
        let mut sink = sink_for_handler;

        framer::respond(&mut ctx, coro, &mut sink, 200).unwrap();
        0
    });

    let output = String::from_utf8(sink.contents()).unwrap();
    assert!(output.contains("Access-Control-Allow-Origin: *\r\n"));
    assert!(output.contains("Access-Control-Allow-Methods:"));
    assert!(output.contains("Access-Control-Allow-Headers:"));
    assert!(output.contains("Access-Control-Max-Age:"));
    assert_eq!(output.matches("Date:").count(), 1);
    assert!(output.contains("Date: X\r\n"));
}

/// Scenario 6: deferred actions run LIFO on free, exercised through the
/// same `Coroutine` the framer runs inside.
#[test]
fn scenario_defer_lifo_on_free() {
    let switcher = Switcher::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    let log_for_handler = log.clone();
    let coro = Coroutine::new(&switcher, &RuntimeConfig::default(), move |me| {
        for id in [1, 2, 3] {
            struct Entry {
                log: Rc<RefCell<Vec<i32>>>,
                id: i32,
            }
            fn run(data: *mut ()) {
                let entry = unsafe { Box::from_raw(data as *mut Entry) };
                entry.log.borrow_mut().push(entry.id);
            }
            let entry = Box::new(Entry {
                log: log_for_handler.clone(),
                id,
            });
            me.defer(run, Box::into_raw(entry) as *mut ());
        }
        0
    })
    .unwrap();
    coro.resume();
    drop(coro);
    assert_eq!(*log.borrow(), vec![3, 2, 1]);
}

/// Header well-formedness / overflow safety: a header buffer too small
/// for the assembled response reports overflow and writes nothing past
/// its capacity.
#[test]
fn header_overflow_is_reported_without_writing_past_capacity() {
    let config = FramerConfig::default();
    let clock = fixed_clock();
    let status_table = StandardStatusTable;
    let template = MustacheLikeTemplate;
    let mut ctx = ResponseContext::new(&config, &clock, &status_table, &template);
    ctx.mime = Some("text/plain".to_string());

    let mut tiny = [0u8; 8];
    let result = framer::assemble_headers(&mut tiny, &ctx, 200);
    assert!(result.is_err());
}

/// `Content-Length` is present iff neither `CHUNKED` nor
/// `NO_CONTENT_LENGTH` is set.
#[test]
fn content_length_present_iff_not_chunked_or_streamed() {
    let config = FramerConfig::default();
    let clock = fixed_clock();
    let status_table = StandardStatusTable;
    let template = MustacheLikeTemplate;

    let mut plain = ResponseContext::new(&config, &clock, &status_table, &template);
    plain.mime = Some("text/plain".to_string());
    plain.body.extend_from_slice(b"abc");
    let mut buf = [0u8; HEADER_BUF];
    let len = framer::assemble_headers(&mut buf, &plain, 200).unwrap();
    let text = std::str::from_utf8(&buf[..len]).unwrap();
    assert!(text.contains("Content-Length: 3\r\n"));

    let mut chunked = ResponseContext::new(&config, &clock, &status_table, &template);
    chunked.mime = Some("text/plain".to_string());
    chunked.flags.insert(ResponseFlags::CHUNKED);
    let len = framer::assemble_headers(&mut buf, &chunked, 200).unwrap();
    let text = std::str::from_utf8(&buf[..len]).unwrap();
    assert!(!text.contains("Content-Length:"));
    assert!(text.contains("Transfer-Encoding: chunked\r\n"));

    let mut streamed = ResponseContext::new(&config, &clock, &status_table, &template);
    streamed.mime = Some("text/event-stream".to_string());
    streamed.flags.insert(ResponseFlags::NO_CONTENT_LENGTH);
    let len = framer::assemble_headers(&mut buf, &streamed, 200).unwrap();
    let text = std::str::from_utf8(&buf[..len]).unwrap();
    assert!(!text.contains("Content-Length:"));
    assert!(!text.contains("Transfer-Encoding:"));
}

const HEADER_BUF: usize = 4096;
