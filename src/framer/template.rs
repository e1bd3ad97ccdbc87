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

//! Stand-in for the template engine spec.md treats as an external
//! collaborator, used only via `render(template, variables) -> bytes`.

/// Renders a template string against a set of named variables, producing
/// the response body bytes. The only consumer inside this crate is the
/// default error response (spec.md §4.2), which renders
/// `{short_message, long_message}`.
pub trait TemplateEngine {
    fn render(&self, template: &str, vars: &[(&str, &str)]) -> Vec<u8>;
}

/// A minimal `{key}`-substitution engine: enough to satisfy the
/// default-error-response requirement without pulling in a full template
/// crate for two placeholders.
#[derive(Debug, Default, Clone, Copy)]
pub struct MustacheLikeTemplate;

impl TemplateEngine for MustacheLikeTemplate {
    fn render(&self, template: &str, vars: &[(&str, &str)]) -> Vec<u8> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        loop {
            match rest.find('{') {
                None => {
                    out.push_str(rest);
                    break;
                }
                Some(start) => {
                    out.push_str(&rest[..start]);
                    rest = &rest[start..];
                    match rest.find('}') {
                        None => {
                            out.push_str(rest);
                            break;
                        }
                        Some(end) => {
                            let key = &rest[1..end];
                            match vars.iter().find(|(k, _)| *k == key) {
                                Some((_, v)) => out.push_str(v),
                                None => out.push_str(&rest[..=end]),
                            }
                            rest = &rest[end + 1..];
                        }
                    }
                }
            }
        }
        out.into_bytes()
    }
}

/// The crate's default error page: `short_message` is the status name
/// (e.g. `"Not Found"`), `long_message` its description.
pub const DEFAULT_ERROR_TEMPLATE: &str = concat!(
    "<!DOCTYPE html><html><head><title>{short_message}</title></head>",
    "<body><h1>{short_message}</h1><p>{long_message}</p></body></html>"
);
