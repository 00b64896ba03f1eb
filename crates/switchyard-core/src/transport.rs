//! Transport boundary types.
//!
//! The host (an HTTP server, a test, anything else) turns whatever it
//! received into an [`ActionRequest`], lets the dispatcher fill a
//! [`ResponseSink`], and writes the sink back out. Nothing in here knows
//! about sockets or HTTP libraries.

use crate::config::{DispatchConfig, HeaderNames};
use bytes::Bytes;
use std::fmt;

/// One inbound call as seen by the dispatcher and by request-level handlers.
#[derive(Debug, Clone, Default)]
pub struct ActionRequest {
    /// Every request parameter in arrival order, repeats included.
    parameters: Vec<(String, String)>,
    /// Every header occurrence in arrival order.
    headers: Vec<(String, String)>,
    remote_addr: Option<String>,
    body: Bytes,
}

impl ActionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    pub fn with_parameters<I, K, V>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.parameters
            .extend(parameters.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Name of the requested action.
    pub fn action(&self) -> Option<&str> {
        self.parameter(DispatchConfig::ACTION_PARAM)
    }

    /// Name of the requested module, if the caller gave one.
    pub fn module(&self) -> Option<&str> {
        self.parameter(DispatchConfig::MODULE_PARAM)
    }

    /// Raw JSON text of the structured parameters.
    pub fn params_text(&self) -> Option<&str> {
        self.parameter(DispatchConfig::PARAMS_PARAM)
    }

    /// First value of a request parameter.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a request parameter.
    pub fn parameter_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.parameters
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Distinct parameter names in first-seen order.
    pub fn parameter_names(&self) -> Vec<&str> {
        distinct_names(self.parameters.iter().map(|(k, _)| k.as_str()), false)
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    /// First value of a header, matched case-insensitively.
    pub fn header<'a>(&'a self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Distinct header names in first-seen order, compared case-insensitively.
    pub fn header_names(&self) -> Vec<&str> {
        distinct_names(self.headers.iter().map(|(k, _)| k.as_str()), true)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Network address of the caller, as reported by the host.
    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

fn distinct_names<'a>(names: impl Iterator<Item = &'a str>, ignore_case: bool) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for name in names {
        let known = seen.iter().any(|s| {
            if ignore_case {
                s.eq_ignore_ascii_case(name)
            } else {
                *s == name
            }
        });
        if !known {
            seen.push(name);
        }
    }
    seen
}

/// Response being built for one call.
#[derive(Debug, Clone)]
pub struct ResponseSink {
    status: u16,
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink {
    pub fn new() -> Self {
        Self {
            status: DispatchConfig::OK_STATUS,
            content_type: None,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    pub fn set_content_disposition(&mut self, disposition: impl Into<String>) {
        self.set_header(HeaderNames::CONTENT_DISPOSITION, disposition);
    }

    /// Set a header, replacing any earlier value with the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Append raw bytes to the body.
    pub fn write(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Acquire the text writer for this response.
    ///
    /// Set the content type first; the writer only appends to the body.
    pub fn writer(&mut self) -> TextWriter<'_> {
        TextWriter {
            sink: self,
            buffer: String::new(),
            closed: false,
        }
    }

    /// Split into status, content type, headers and body.
    pub fn into_parts(self) -> (u16, Option<String>, Vec<(String, String)>, Bytes) {
        (
            self.status,
            self.content_type,
            self.headers,
            Bytes::from(self.body),
        )
    }
}

/// Text output stream borrowed from a [`ResponseSink`].
///
/// Text is buffered and committed to the sink body when the writer is closed
/// or dropped, whichever comes first.
pub struct TextWriter<'a> {
    sink: &'a mut ResponseSink,
    buffer: String,
    closed: bool,
}

impl TextWriter<'_> {
    pub fn print(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn println(&mut self, text: &str) {
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    /// Content type already set on the underlying response.
    pub fn content_type(&self) -> Option<&str> {
        self.sink.content_type()
    }

    /// Text written so far and not yet committed.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Commit buffered text to the response.
    pub fn close(mut self) {
        self.commit();
    }

    fn commit(&mut self) {
        if !self.closed {
            self.sink.write(self.buffer.as_bytes());
            self.buffer.clear();
            self.closed = true;
        }
    }
}

impl fmt::Write for TextWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.push_str(s);
        Ok(())
    }
}

impl Drop for TextWriter<'_> {
    fn drop(&mut self) {
        self.commit();
    }
}
