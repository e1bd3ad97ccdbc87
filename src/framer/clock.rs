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

//! Stand-in for the date-formatting helper spec.md treats as an external
//! collaborator: produces the 29-byte RFC 1123 strings used for the
//! `Date`/`Expires` headers.

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Produces the RFC 1123 timestamp string used for `Date` and `Expires`.
/// Every implementation must return exactly 29 bytes, per spec.md §6.
pub trait Clock {
    fn http_date(&self) -> [u8; 29];
}

/// Default [`Clock`], backed by `libc::time`/`libc::gmtime_r` (already in
/// the dependency graph; no new crate needed for a collaborator this
/// narrow).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn http_date(&self) -> [u8; 29] {
        let mut tm: libc::tm = unsafe { std::mem::zeroed() };
        unsafe {
            let now = libc::time(std::ptr::null_mut());
            libc::gmtime_r(&now, &mut tm);
        }
        format_rfc1123(&tm)
    }
}

fn format_rfc1123(tm: &libc::tm) -> [u8; 29] {
    let weekday = WEEKDAYS[(tm.tm_wday.rem_euclid(7)) as usize];
    let month = MONTHS[(tm.tm_mon.rem_euclid(12)) as usize];
    let year = 1900 + tm.tm_year;
    let formatted = format!(
        "{}, {:02} {} {:04} {:02}:{:02}:{:02} GMT",
        weekday, tm.tm_mday, month, year, tm.tm_hour, tm.tm_min, tm.tm_sec
    );
    let bytes = formatted.as_bytes();
    debug_assert_eq!(bytes.len(), 29, "RFC 1123 date must be exactly 29 bytes");
    // Fixed-width fields (%02/%04) make this always exactly 29 bytes; if it
    // ever isn't, zero-pad rather than panic on a length mismatch.
    let mut out = [0u8; 29];
    let n = bytes.len().min(29);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// A [`Clock`] that always reports the same fixed instant, for
/// deterministic tests of header assembly.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub [u8; 29]);

impl Clock for FixedClock {
    fn http_date(&self) -> [u8; 29] {
        self.0
    }
}

impl FixedClock {
    pub fn new(rfc1123: &str) -> FixedClock {
        let bytes = rfc1123.as_bytes();
        assert_eq!(bytes.len(), 29, "fixed date must be exactly 29 bytes");
        let mut out = [0u8; 29];
        out.copy_from_slice(bytes);
        FixedClock(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_produces_29_bytes() {
        let date = SystemClock.http_date();
        assert_eq!(date.len(), 29);
        assert!(std::str::from_utf8(&date).unwrap().ends_with("GMT"));
    }

    #[test]
    fn fixed_clock_round_trips() {
        let clock = FixedClock::new("Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(
            std::str::from_utf8(&clock.http_date()).unwrap(),
            "Sun, 06 Nov 1994 08:49:37 GMT"
        );
    }
}
