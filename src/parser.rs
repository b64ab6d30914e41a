use http::StatusCode;

use crate::util::{find, log_data, trim_end};
use crate::{Error, Headers, Response};

/// Blank-line separators that end a header block, all treated the same.
const SEPARATORS: [&[u8]; 3] = [b"\r\n\r\n", b"\r\r", b"\n\n"];

/// Build a [`Response`] from the raw output of a transport.
///
/// * `status` - status code reported by the transport. When `None`, it is read
///   from the status line of the header block.
/// * `raw` - header block followed by body, exactly as received.
/// * `header_len` - length of the header block, if the transport measured it.
///   Without it (or if it's out of bounds) the split is made at the first blank
///   line, which is any of `\r\n\r\n`, `\r\r` or `\n\n`.
///
/// Header lines without a `:` are ignored, which covers the status line.
///
/// ```
/// use ricochet::parse_response;
///
/// let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nhello";
/// let response = parse_response(None, raw, None).unwrap();
///
/// assert_eq!(response.status(), 200);
/// assert_eq!(response.header("content-type"), Some("text/plain"));
/// assert_eq!(response.body(), b"hello");
/// assert_eq!(response.header_len(), 45);
/// ```
pub fn parse_response(
    status: Option<StatusCode>,
    raw: &[u8],
    header_len: Option<usize>,
) -> Result<Response, Error> {
    let (head, body, header_len) = match header_len {
        Some(n) if n > 0 && n <= raw.len() => (trim_end(&raw[..n]), &raw[n..], n),
        _ => split_at_blank_line(raw),
    };

    log_data(head);

    let raw_headers = String::from_utf8_lossy(head).into_owned();

    let status = match status {
        Some(v) => v,
        None => parse_status(&raw_headers)?,
    };

    let headers = parse_headers(&raw_headers);

    Ok(Response {
        status,
        headers,
        header_len,
        raw_headers,
        raw_body: body.to_vec(),
        raw_output: raw.to_vec(),
        content_type: None,
        url: None,
        request_header: None,
    })
}

/// Split at the earliest separator. Without one, everything is header.
fn split_at_blank_line(raw: &[u8]) -> (&[u8], &[u8], usize) {
    let earliest = SEPARATORS
        .iter()
        .filter_map(|sep| find(raw, sep).map(|pos| (pos, sep.len())))
        .min_by_key(|(pos, _)| *pos);

    match earliest {
        Some((pos, len)) => (&raw[..pos], &raw[pos + len..], pos + len),
        None => (trim_end(raw), &[], raw.len()),
    }
}

fn lines(head: &str) -> impl Iterator<Item = &str> {
    head.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l))
}

fn parse_headers(head: &str) -> Headers {
    let mut headers = Headers::new();

    for line in lines(head) {
        let Some((name, value)) = line.split_once(": ") else {
            continue;
        };

        if let Err(e) = headers.append(name.trim(), value.trim()) {
            debug!("Ignore header line {:?}: {}", line, e);
        }
    }

    headers
}

/// Status from the last status line.
///
/// There can be several, like a `100 Continue` before the final response.
fn parse_status(head: &str) -> Result<StatusCode, Error> {
    let line = lines(head)
        .filter(|l| l.starts_with("HTTP/"))
        .last()
        .ok_or(Error::NoStatus)?;

    let code = line.split_whitespace().nth(1).ok_or(Error::NoStatus)?;

    StatusCode::from_bytes(code.as_bytes())
        .map_err(|_| Error::HttpParseFail(format!("bad status line: {}", line)))
}
