//! Plain `http://` transport over a blocking [`TcpStream`].
//!
//! One connection per exchange, always `connection: close`. The response is
//! read until the server closes, or until `content-length` bytes of body have
//! arrived. The header block length is measured with `httparse` as soon as the
//! whole block is in.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use http::{header, HeaderName, StatusCode, Version};

use crate::util::{log_data, trim_end};
use crate::Error;

use super::{Errno, Exchange, Outcome, Transport};

/// Max number of headers to parse from an HTTP response
const MAX_RESPONSE_HEADERS: usize = 128;

// libcurl codes for the non-transient failures.
const UNSUPPORTED_PROTOCOL: u32 = 1;
const COULDNT_RESOLVE_HOST: u32 = 6;
const WEIRD_SERVER_REPLY: u32 = 8;
const PARTIAL_FILE: u32 = 18;
const SEND_ERROR: u32 = 55;

/// Blocking transport for plain HTTP/1.1.
///
/// There is no TLS, `https` urls fail with [`Errno::Other`].
#[derive(Debug, Default)]
pub struct TcpTransport {
    _priv: (),
}

impl TcpTransport {
    /// Create a new transport.
    pub fn new() -> Self {
        TcpTransport::default()
    }
}

impl Transport for TcpTransport {
    fn execute(&mut self, exchange: &Exchange) -> Outcome {
        let scheme = exchange.url.scheme();
        if scheme != "http" {
            return Outcome::failed(
                Errno::Other(UNSUPPORTED_PROTOCOL),
                format!("Protocol \"{}\" not supported", scheme),
            );
        }

        let deadline = Instant::now() + exchange.timeout;

        let prelude = write_prelude(exchange);
        log_data(&prelude);

        let mut outcome = match connect(exchange, deadline) {
            Ok(mut stream) => match send(&mut stream, &prelude, exchange, deadline) {
                Ok(()) => receive(&mut stream, exchange, deadline),
                Err(o) => o,
            },
            Err(o) => o,
        };

        outcome.request_header = Some(String::from_utf8_lossy(trim_end(&prelude)).into_owned());

        outcome
    }
}

fn write_prelude(exchange: &Exchange) -> Vec<u8> {
    let url = &exchange.url;

    let has = |name: HeaderName| {
        exchange
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(name.as_str()))
    };

    let mut s = format!(
        "{} {} {:?}\r\n",
        exchange.method,
        url.path_and_query(),
        Version::HTTP_11
    );

    let mut line = |name: &str, value: &str| {
        s.push_str(name);
        s.push_str(": ");
        s.push_str(value);
        s.push_str("\r\n");
    };

    if !has(header::HOST) {
        line("host", &host_header(url.host(), url.port()));
    }

    if let Some(agent) = &exchange.user_agent {
        if !has(header::USER_AGENT) {
            line("user-agent", agent);
        }
    }

    if let Some(creds) = &exchange.credentials {
        if !has(header::AUTHORIZATION) {
            let auth = format!("Basic {}", BASE64_STANDARD.encode(creds));
            line("authorization", &auth);
        }
    }

    if !has(header::CONNECTION) {
        line("connection", "close");
    }

    for (name, value) in &exchange.headers {
        // Empty value means the header is switched off.
        if value.is_empty() {
            continue;
        }
        line(name, value);
    }

    if let Some(body) = &exchange.body {
        if !has(header::CONTENT_LENGTH) {
            line("content-length", &body.len().to_string());
        }
    }

    s.push_str("\r\n");

    s.into_bytes()
}

/// The host header carries the port only when it isn't the scheme default.
fn host_header(host: &str, port: Option<u16>) -> String {
    match port {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn timed_out(what: &str) -> Outcome {
    Outcome::failed(
        Errno::OperationTimedOut,
        format!("Operation timed out while {}", what),
    )
}

fn connect(exchange: &Exchange, deadline: Instant) -> Result<TcpStream, Outcome> {
    let url = &exchange.url;
    let host = url.host().trim_start_matches('[').trim_end_matches(']');
    let port = url.port_or_default().unwrap_or(80);

    let addrs: Vec<SocketAddr> = match (host, port).to_socket_addrs() {
        Ok(v) => v.collect(),
        Err(e) => {
            return Err(Outcome::failed(
                Errno::Other(COULDNT_RESOLVE_HOST),
                format!("Could not resolve host: {}: {}", host, e),
            ))
        }
    };

    let mut last_error = None;

    for addr in addrs {
        let budget = exchange.connect_timeout.min(remaining(deadline));
        if budget.is_zero() {
            return Err(timed_out("connecting"));
        }

        match TcpStream::connect_timeout(&addr, budget) {
            Ok(stream) => {
                debug!("Connected to {}", addr);
                return Ok(stream);
            }
            Err(e) => {
                debug!("Failed to connect to {}: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(match last_error {
        Some(e) if is_timeout(&e) => timed_out("connecting"),
        Some(e) => Outcome::failed(
            Errno::CouldNotConnect,
            format!("Failed to connect to {} port {}: {}", host, port, e),
        ),
        None => Outcome::failed(
            Errno::Other(COULDNT_RESOLVE_HOST),
            format!("Could not resolve host: {}", host),
        ),
    })
}

fn send(
    stream: &mut TcpStream,
    prelude: &[u8],
    exchange: &Exchange,
    deadline: Instant,
) -> Result<(), Outcome> {
    let budget = remaining(deadline);
    if budget.is_zero() {
        return Err(timed_out("sending"));
    }

    let result = write_request(stream, prelude, exchange.body.as_deref(), budget);

    match result {
        Ok(()) => Ok(()),
        Err(e) if is_timeout(&e) => Err(timed_out("sending")),
        Err(e) => Err(Outcome::failed(
            Errno::Other(SEND_ERROR),
            format!("Failed sending data to the peer: {}", e),
        )),
    }
}

fn write_request(
    stream: &mut TcpStream,
    prelude: &[u8],
    body: Option<&[u8]>,
    budget: Duration,
) -> io::Result<()> {
    stream.set_write_timeout(Some(budget))?;
    stream.write_all(prelude)?;
    if let Some(body) = body {
        stream.write_all(body)?;
    }
    stream.flush()
}

fn read_some(stream: &mut TcpStream, buf: &mut [u8], budget: Duration) -> io::Result<usize> {
    stream.set_read_timeout(Some(budget))?;
    stream.read(buf)
}

/// What we learn from the response header block.
#[derive(Debug)]
struct Head {
    header_len: usize,
    status: StatusCode,
    content_type: Option<String>,
    location: Option<String>,
    total_len: Option<usize>,
}

fn receive(stream: &mut TcpStream, exchange: &Exchange, deadline: Instant) -> Outcome {
    let mut output = Vec::new();
    let mut head: Option<Head> = None;
    let mut buf = [0_u8; 8192];

    loop {
        if let Some(total) = head.as_ref().and_then(|h| h.total_len) {
            if output.len() >= total {
                output.truncate(total);
                break;
            }
        }

        let budget = remaining(deadline);
        if budget.is_zero() {
            return finish(exchange, output, head, timed_out("receiving"));
        }

        let n = match read_some(stream, &mut buf, budget) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) => {
                return finish(exchange, output, head, timed_out("receiving"));
            }
            Err(e) => {
                let failed = Outcome::failed(
                    Errno::ReceiveError,
                    format!("Failure when receiving data from the peer: {}", e),
                );
                return finish(exchange, output, head, failed);
            }
        };

        if n == 0 {
            break;
        }

        output.extend_from_slice(&buf[..n]);

        if head.is_none() {
            match parse_head(&output, exchange) {
                Ok(h) => head = h,
                Err(e) => {
                    let failed = Outcome::failed(Errno::Other(WEIRD_SERVER_REPLY), e.to_string());
                    return finish(exchange, output, None, failed);
                }
            }
        }
    }

    if output.is_empty() {
        return Outcome::failed(Errno::GotNothing, "Empty reply from server");
    }

    let result = match &head {
        None => Outcome::failed(
            Errno::Other(WEIRD_SERVER_REPLY),
            "Incomplete response header block",
        ),
        Some(Head {
            total_len: Some(total),
            ..
        }) if output.len() < *total => Outcome::failed(
            Errno::Other(PARTIAL_FILE),
            format!(
                "Transfer closed with {} bytes remaining to read",
                total - output.len()
            ),
        ),
        Some(_) => Outcome::default(),
    };

    finish(exchange, output, head, result)
}

/// Find the end of the header block, skipping interim 1xx responses.
fn parse_head(output: &[u8], exchange: &Exchange) -> Result<Option<Head>, Error> {
    let mut start = 0;

    loop {
        let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
        let mut res = httparse::Response::new(&mut headers);

        let n = match res.parse(&output[start..])? {
            httparse::Status::Complete(n) => n,
            httparse::Status::Partial => return Ok(None),
        };

        let code = res.code.unwrap_or_default();
        let status = StatusCode::from_u16(code)
            .map_err(|_| Error::HttpParseFail(format!("bad status code: {}", code)))?;

        if status.is_informational() {
            debug!("Skip interim {} response", status);
            start += n;
            continue;
        }

        let lookup = |name: HeaderName| {
            res.headers
                .iter()
                .rev()
                .find(|h| h.name.eq_ignore_ascii_case(name.as_str()))
                .and_then(|h| std::str::from_utf8(h.value).ok())
                .map(|v| v.trim().to_string())
        };

        let header_len = start + n;

        let no_body = exchange.no_body
            || status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED;

        let body_len = if no_body {
            Some(0)
        } else {
            lookup(header::CONTENT_LENGTH).and_then(|v| v.parse::<usize>().ok())
        };

        debug!("Response {} with {} bytes header", status, header_len);

        return Ok(Some(Head {
            header_len,
            status,
            content_type: lookup(header::CONTENT_TYPE),
            location: lookup(header::LOCATION),
            total_len: body_len.map(|b| header_len + b),
        }));
    }
}

fn finish(exchange: &Exchange, output: Vec<u8>, head: Option<Head>, result: Outcome) -> Outcome {
    let mut outcome = Outcome {
        output,
        ..result
    };

    let Some(head) = head else {
        return outcome;
    };

    if head.status.is_redirection() {
        if let Some(location) = &head.location {
            match exchange.url.resolve(location) {
                Ok(uri) => outcome.redirect_url = Some(uri.to_string()),
                Err(e) => debug!("Ignore bad location {:?}: {}", location, e),
            }
        }
    }

    outcome.status = Some(head.status);
    outcome.header_len = Some(head.header_len);
    outcome.content_type = head.content_type;

    outcome
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use http::Method;

    use super::*;
    use crate::util::find;
    use crate::Uri;

    fn exchange(method: Method, url: &str) -> Exchange {
        Exchange {
            method,
            url: Uri::parse(url).unwrap(),
            headers: vec![],
            body: None,
            no_body: false,
            credentials: None,
            user_agent: None,
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(5),
            follow_location: false,
        }
    }

    fn read_request(stream: &mut TcpStream) -> Vec<u8> {
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        let mut data = Vec::new();
        let mut buf = [0; 1024];

        loop {
            if let Some(pos) = find(&data, b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&data[..pos]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length: "))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if data.len() >= pos + 4 + len {
                    return data;
                }
            }

            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                return data;
            }
            data.extend_from_slice(&buf[..n]);
        }
    }

    /// Serve one connection. Returns port and a handle giving back the request.
    fn serve<F>(respond: F) -> (u16, thread::JoinHandle<String>)
    where
        F: FnOnce(&mut TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            respond(&mut stream);
            String::from_utf8(request).unwrap()
        });

        (port, handle)
    }

    fn reply(response: &'static [u8]) -> impl FnOnce(&mut TcpStream) + Send + 'static {
        move |stream: &mut TcpStream| stream.write_all(response).unwrap()
    }

    const OK: &[u8] = b"HTTP/1.1 200 OK\r\n\
        Content-Type: text/plain\r\n\
        Content-Length: 5\r\n\
        \r\n\
        hello";

    #[test]
    fn get_request() {
        let (port, handle) = serve(reply(OK));

        let url = format!("http://127.0.0.1:{}/path?q=1", port);
        let mut ex = exchange(Method::GET, &url);
        ex.user_agent = Some("ricochet-test".into());
        ex.headers.push(("X-Foo".into(), "bar".into()));

        let outcome = TcpTransport::new().execute(&ex);
        let request = handle.join().unwrap();

        assert_eq!(outcome.errno, Errno::None);
        assert_eq!(outcome.status, Some(StatusCode::OK));
        assert_eq!(outcome.output, OK);
        assert_eq!(outcome.header_len, Some(OK.len() - 5));
        assert_eq!(outcome.content_type.as_deref(), Some("text/plain"));
        assert_eq!(outcome.redirect_url, None);

        assert_eq!(
            request,
            format!(
                "GET /path?q=1 HTTP/1.1\r\n\
                host: 127.0.0.1:{}\r\n\
                user-agent: ricochet-test\r\n\
                connection: close\r\n\
                X-Foo: bar\r\n\
                \r\n",
                port
            )
        );
        assert_eq!(
            outcome.request_header.as_deref(),
            Some(request.trim_end())
        );
    }

    #[test]
    fn prelude_request_line_stays_one_line() {
        let mut ex = exchange(Method::GET, "http://h.test/");
        ex.url = ex
            .url
            .with_path("/x HTTP/1.1\r\nX-Injected: 1\r\n")
            .unwrap()
            .with_query("a b\r\nc")
            .unwrap();

        let prelude = String::from_utf8(write_prelude(&ex)).unwrap();
        let request_line = prelude.split("\r\n").next().unwrap();

        assert_eq!(
            request_line,
            "GET /x%20HTTP/1.1%0D%0AX-Injected:%201%0D%0A?a%20b%0D%0Ac HTTP/1.1"
        );
        assert!(!prelude.to_lowercase().contains("\r\nx-injected"));
    }

    #[test]
    fn post_with_body_and_auth() {
        let (port, handle) = serve(reply(OK));

        let url = format!("http://127.0.0.1:{}/form", port);
        let mut ex = exchange(Method::POST, &url);
        ex.credentials = Some("user:pass".into());
        ex.body = Some(b"a=1&b=2".to_vec());
        ex.headers.push(("Connection".into(), "close".into()));
        ex.headers.push(("Expect".into(), "".into()));

        let outcome = TcpTransport::new().execute(&ex);
        let request = handle.join().unwrap();

        assert_eq!(outcome.errno, Errno::None);
        assert_eq!(
            request,
            format!(
                "POST /form HTTP/1.1\r\n\
                host: 127.0.0.1:{}\r\n\
                authorization: Basic dXNlcjpwYXNz\r\n\
                Connection: close\r\n\
                content-length: 7\r\n\
                \r\n\
                a=1&b=2",
                port
            )
        );
    }

    #[test]
    fn head_stops_after_header() {
        const RES: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n";
        let (port, handle) = serve(reply(RES));

        let mut ex = exchange(Method::HEAD, &format!("http://127.0.0.1:{}/", port));
        ex.no_body = true;

        let outcome = TcpTransport::new().execute(&ex);
        handle.join().unwrap();

        assert_eq!(outcome.errno, Errno::None);
        assert_eq!(outcome.output, RES);
        assert_eq!(outcome.header_len, Some(RES.len()));
    }

    #[test]
    fn interim_100_counts_as_header() {
        const RES: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n\
            HTTP/1.1 201 Created\r\nContent-Length: 2\r\n\r\nok";
        let (port, handle) = serve(reply(RES));

        let outcome = TcpTransport::new().execute(&exchange(
            Method::GET,
            &format!("http://127.0.0.1:{}/", port),
        ));
        handle.join().unwrap();

        assert_eq!(outcome.status, Some(StatusCode::CREATED));
        assert_eq!(outcome.header_len, Some(RES.len() - 2));
    }

    #[test]
    fn redirect_location_resolved() {
        const RES: &[u8] = b"HTTP/1.1 302 Found\r\nLocation: ../next?x=1\r\nContent-Length: 0\r\n\r\n";
        let (port, handle) = serve(reply(RES));

        let url = format!("http://127.0.0.1:{}/a/b/c", port);
        let outcome = TcpTransport::new().execute(&exchange(Method::GET, &url));
        handle.join().unwrap();

        assert_eq!(outcome.status, Some(StatusCode::FOUND));
        assert_eq!(
            outcome.redirect_url,
            Some(format!("http://127.0.0.1:{}/a/next?x=1", port))
        );
    }

    #[test]
    fn empty_reply() {
        let (port, handle) = serve(|_| {});

        let outcome = TcpTransport::new().execute(&exchange(
            Method::GET,
            &format!("http://127.0.0.1:{}/", port),
        ));
        handle.join().unwrap();

        assert_eq!(outcome.errno, Errno::GotNothing);
        assert!(outcome.output.is_empty());
    }

    #[test]
    fn connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let outcome = TcpTransport::new().execute(&exchange(
            Method::GET,
            &format!("http://127.0.0.1:{}/", port),
        ));

        assert_eq!(outcome.errno, Errno::CouldNotConnect);
        assert!(outcome.is_transient());
    }

    #[test]
    fn receive_timeout() {
        let (port, handle) = serve(|_| thread::sleep(Duration::from_millis(800)));

        let mut ex = exchange(Method::GET, &format!("http://127.0.0.1:{}/", port));
        ex.timeout = Duration::from_millis(200);

        let outcome = TcpTransport::new().execute(&ex);
        handle.join().unwrap();

        assert_eq!(outcome.errno, Errno::OperationTimedOut);
    }

    #[test]
    fn partial_body() {
        const RES: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc";
        let (port, handle) = serve(reply(RES));

        let outcome = TcpTransport::new().execute(&exchange(
            Method::GET,
            &format!("http://127.0.0.1:{}/", port),
        ));
        handle.join().unwrap();

        assert_eq!(outcome.errno, Errno::Other(PARTIAL_FILE));
        assert_eq!(outcome.output, RES);
        assert_eq!(outcome.status, Some(StatusCode::OK));
    }

    #[test]
    fn https_unsupported() {
        let outcome =
            TcpTransport::new().execute(&exchange(Method::GET, "https://example.test/"));
        assert_eq!(outcome.errno, Errno::Other(UNSUPPORTED_PROTOCOL));
        assert!(!outcome.is_transient());
    }

    #[test]
    fn host_header_port() {
        assert_eq!(host_header("h.test", None), "h.test");
        assert_eq!(host_header("h.test", Some(8080)), "h.test:8080");
    }
}
