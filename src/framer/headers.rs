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

//! Bounded-buffer HTTP header assembly (spec.md §4.2).
//!
//! [`HeaderWriter`] never heap-allocates: it writes into a caller-provided
//! `&mut [u8]` (in practice, scratch space on the coroutine's own stack,
//! per spec.md's "scratch + headers always fits" requirement) and reports
//! overflow instead of growing.

use crate::error::FramerError;

/// A bounded, non-growing byte sink for header assembly.
pub struct HeaderWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> HeaderWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> HeaderWriter<'a> {
        HeaderWriter { buf, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), FramerError> {
        let end = self.len + bytes.len();
        if end > self.buf.len() {
            return Err(FramerError::HeaderBufferOverflow {
                capacity: self.buf.len(),
            });
        }
        self.buf[self.len..end].copy_from_slice(bytes);
        self.len = end;
        Ok(())
    }

    pub fn write_line(&mut self, line: &str) -> Result<(), FramerError> {
        self.write(line.as_bytes())?;
        self.write(b"\r\n")
    }

    pub fn write_header(&mut self, key: &str, value: &str) -> Result<(), FramerError> {
        self.write(key.as_bytes())?;
        self.write(b": ")?;
        self.write(value.as_bytes())?;
        self.write(b"\r\n")
    }

    /// Writes the terminating blank line plus a trailing NUL (spec.md
    /// §9's documented open question, preserved verbatim): the NUL is
    /// written but excluded from the returned length, so callers must not
    /// treat the return value as a C-string length.
    pub fn finish(mut self) -> Result<usize, FramerError> {
        self.write(b"\r\n")?;
        let header_len = self.len;
        self.write(b"\0")?;
        Ok(header_len)
    }

    /// The assembled bytes so far, for tests and for handing the headers
    /// to `writev` alongside the body.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_reported_and_nothing_is_written_past_capacity() {
        let mut buf = [0u8; 8];
        let mut writer = HeaderWriter::new(&mut buf);
        let err = writer.write_line("way too long for eight bytes");
        assert!(matches!(err, Err(FramerError::HeaderBufferOverflow { capacity: 8 })));
    }

    #[test]
    fn finish_excludes_the_nul_from_the_returned_length() {
        let mut buf = [0u8; 64];
        let len = {
            let mut writer = HeaderWriter::new(&mut buf);
            writer.write_header("X-Test", "1").unwrap();
            writer.finish().unwrap()
        };
        assert_eq!(&buf[len - 2..len], b"\r\n");
        assert_eq!(buf[len], 0);
    }
}
