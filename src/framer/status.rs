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

//! Stand-in for the status-code table spec.md treats as an external
//! collaborator: maps a numeric status to its reason phrase and the
//! longer description used in the default error template.

/// Maps an HTTP status code to a short name (the reason phrase) and a
/// longer human-readable description.
pub trait StatusTable {
    fn name(&self, code: u16) -> &'static str;
    fn description(&self, code: u16) -> &'static str;
}

/// Default [`StatusTable`] covering the codes this crate's worked
/// examples and default error path exercise. An embedder with a fuller
/// MIME/status database is expected to supply its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardStatusTable;

impl StatusTable for StandardStatusTable {
    fn name(&self, code: u16) -> &'static str {
        match code {
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            304 => "Not Modified",
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Payload Too Large",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            _ => "Unknown Status",
        }
    }

    fn description(&self, code: u16) -> &'static str {
        match code {
            200 => "The request succeeded.",
            201 => "The request succeeded and a new resource was created.",
            202 => "The request has been accepted for processing.",
            204 => "The request succeeded; there is no content to send.",
            301 => "The resource has moved permanently to a new URL.",
            302 => "The resource is temporarily available at a different URL.",
            304 => "The resource has not been modified since the last request.",
            400 => "The server could not understand the request.",
            401 => "Authentication is required to access this resource.",
            403 => "You do not have permission to access this resource.",
            404 => "The requested resource could not be found on this server.",
            405 => "The request method is not supported for this resource.",
            408 => "The server timed out waiting for the request.",
            413 => "The request payload is larger than the server is willing to process.",
            429 => "Too many requests have been sent in a given amount of time.",
            500 => "The server encountered an unexpected condition.",
            501 => "The server does not support the functionality required to fulfill the request.",
            502 => "The server, while acting as a gateway, received an invalid response.",
            503 => "The server is currently unable to handle the request.",
            504 => "The server, while acting as a gateway, timed out waiting for a response.",
            _ => "An unexpected error occurred.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_distinct_names() {
        let table = StandardStatusTable;
        assert_eq!(table.name(200), "OK");
        assert_eq!(table.name(404), "Not Found");
        assert_eq!(table.name(500), "Internal Server Error");
    }

    #[test]
    fn unknown_code_falls_back() {
        let table = StandardStatusTable;
        assert_eq!(table.name(999), "Unknown Status");
        assert_eq!(table.description(999), "An unexpected error occurred.");
    }
}
