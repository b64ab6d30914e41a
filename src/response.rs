use std::fmt;

use http::StatusCode;

use crate::{Headers, Uri};

/// A response, as built by [`parse_response()`](crate::parse_response).
///
/// Besides status, headers and body, the response keeps the diagnostic
/// details of the exchange: how long the header block was, the raw header
/// text and the full raw output as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: Headers,
    pub(crate) header_len: usize,
    pub(crate) raw_headers: String,
    pub(crate) raw_body: Vec<u8>,
    pub(crate) raw_output: Vec<u8>,
    pub(crate) content_type: Option<String>,
    pub(crate) url: Option<Uri>,
    pub(crate) request_header: Option<String>,
}

impl Response {
    /// The status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of a response header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Content type as reported by the transport, or the `content-type` header.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .or_else(|| self.headers.get("content-type"))
    }

    /// The response body.
    ///
    /// Empty for `HEAD` requests.
    pub fn body(&self) -> &[u8] {
        &self.raw_body
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.raw_body).into_owned()
    }

    /// Byte length of the header block, including the terminating blank line.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    /// The header block (status line and header fields) without trailing whitespace.
    pub fn raw_headers(&self) -> &str {
        &self.raw_headers
    }

    /// Body bytes exactly as they followed the header block.
    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    /// Everything the transport returned: header block and body.
    pub fn raw_output(&self) -> &[u8] {
        &self.raw_output
    }

    /// The url that was requested to produce this response.
    pub fn url(&self) -> Option<&Uri> {
        self.url.as_ref()
    }

    /// The request header block as sent, if the transport reported it.
    pub fn request_header(&self) -> Option<&str> {
        self.request_header.as_deref()
    }

    /// Tell if the status is 3xx.
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    pub(crate) fn with_url(mut self, url: Uri) -> Self {
        self.url = Some(url);
        self
    }

    pub(crate) fn with_content_type(mut self, content_type: Option<String>) -> Self {
        if content_type.is_some() {
            self.content_type = content_type;
        }
        self
    }

    pub(crate) fn with_request_header(mut self, request_header: Option<String>) -> Self {
        self.request_header = request_header;
        self
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}
