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

//! Stand-in for the "string-buffer utility" spec.md treats as an external
//! collaborator, used via `reset`/`length`/`bytes`.

/// A reusable byte buffer a [`crate::framer::ResponseContext`] accumulates
/// a response body (or one chunk/event) into.
pub trait ScratchBuffer {
    fn reset(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn bytes(&self) -> &[u8];
}

/// Default [`ScratchBuffer`]: a `Vec<u8>` that keeps its capacity across
/// `reset`, so a chunked/event-stream response does not re-allocate per
/// frame.
#[derive(Debug, Default)]
pub struct BodyBuffer {
    data: Vec<u8>,
}

impl BodyBuffer {
    pub fn new() -> BodyBuffer {
        BodyBuffer { data: Vec::new() }
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn set(&mut self, bytes: Vec<u8>) {
        self.data = bytes;
    }
}

impl ScratchBuffer for BodyBuffer {
    fn reset(&mut self) {
        self.data.clear();
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }
}
