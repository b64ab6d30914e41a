//! Blocking HTTP client with retries and redirects.
//!
//! A [`Client`] owns a [`Transport`] and a fixed [`Config`]. Sending a request
//! goes through these steps:
//!
//! * **Exchange** - The [`Request`] is translated to an [`Exchange`]: the
//!   `POST` header defaults, [`Config::extra_headers()`] and the request's
//!   own headers are layered in that order, credentials are taken from the
//!   uri user info (or the config) and the timeouts are set.
//! * **Attempt** - The transport executes the exchange. An outcome with a
//!   transient [`Errno`] is retried after a [`Backoff`] pause, until
//!   [`Config::max_attempts()`] is spent.
//! * **Parse** - The raw output is turned into a [`Response`].
//! * **Redirect** - A 3xx response is followed to the redirect target with a
//!   fresh attempt budget, up to [`Config::max_redirects()`] hops.
//!
//! ```text
//!                  ┌──────────────────┐
//!          ┌──────▶│     Exchange     │
//!          │       └──────────────────┘
//!          │                 │
//!          │                 ▼
//!          │       ┌──────────────────┐  transient  ┌──────────────────┐
//!          │       │     Attempt      │────────────▶│     Backoff      │
//!          │       └──────────────────┘◀────────────└──────────────────┘
//!          │                 │
//!          │                 ▼
//!          │       ┌──────────────────┐
//!          │       │      Parse       │
//!          │       └──────────────────┘
//!          │                 │
//!          │                 ▼
//!  ┌──────────────────┐ 3xx  │
//!  │     Redirect     │◀─────┤
//!  └──────────────────┘      ▼
//!                        Response
//! ```
//!
//! # Example
//!
//! ```
//! use ricochet::{Client, Config, Errno, Exchange, Outcome, Request, Transport};
//!
//! // A transport that fails once, then answers.
//! struct Flaky(u32);
//!
//! impl Transport for Flaky {
//!     fn execute(&mut self, _: &Exchange) -> Outcome {
//!         self.0 += 1;
//!         if self.0 == 1 {
//!             return Outcome::failed(Errno::CouldNotConnect, "Connection refused");
//!         }
//!         Outcome {
//!             output: b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nhi".to_vec(),
//!             ..Default::default()
//!         }
//!     }
//! }
//!
//! let mut client = Client::new(Flaky(0), Config::new())
//!     // Don't sleep between attempts.
//!     .with_backoff(|_attempt: u32| {});
//!
//! let response = client.send(Request::get("http://example.test/").unwrap()).unwrap();
//!
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.text(), "hi");
//! assert_eq!(client.transport().0, 2);
//! ```

use http::Method;

use crate::transport::{Errno, Exchange, Outcome, Transport};
use crate::{parse_response, Error, Headers, Request, Response, Uri};

mod backoff;
pub use backoff::{Backoff, RandomBackoff};

mod config;
pub use config::{Config, RedirectAuthHeaders};

#[cfg(test)]
mod test;

/// Sends requests through a transport, retrying and following redirects.
///
/// One client handles one request at a time. Besides the one-shot
/// [`send()`](Client::send), it can be used as a session: a request is set with
/// [`set_request()`](Client::set_request) and run with [`execute()`](Client::execute),
/// after which the last response and transport error can be inspected.
pub struct Client<T, B = RandomBackoff> {
    transport: T,
    backoff: B,
    config: Config,
    request: Option<Request>,
    response: Option<Response>,
    errno: Errno,
    message: String,
}

impl<T: Transport> Client<T> {
    /// Create a client with the default [`RandomBackoff`].
    pub fn new(transport: T, config: Config) -> Self {
        Client {
            transport,
            backoff: RandomBackoff::default(),
            config,
            request: None,
            response: None,
            errno: Errno::None,
            message: String::new(),
        }
    }
}

impl<T: Transport, B: Backoff> Client<T, B> {
    /// Replace the backoff between attempts.
    pub fn with_backoff<B2: Backoff>(self, backoff: B2) -> Client<T, B2> {
        Client {
            transport: self.transport,
            backoff,
            config: self.config,
            request: self.request,
            response: self.response,
            errno: self.errno,
            message: self.message,
        }
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Set the request for [`execute()`](Client::execute).
    pub fn set_request(&mut self, request: Request) {
        self.request = Some(request);
    }

    /// The current request.
    ///
    /// After following redirects, this is the request for the last hop.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// The last response received, also when the exchange ended in an error.
    pub fn last_response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Errno of the last transport attempt.
    pub fn last_errno(&self) -> Errno {
        self.errno
    }

    /// Error message of the last transport attempt.
    pub fn last_message(&self) -> &str {
        &self.message
    }

    /// Set the request and execute it.
    pub fn send(&mut self, request: Request) -> Result<Response, Error> {
        self.set_request(request);
        self.execute()
    }

    /// Execute the current request.
    ///
    /// Fails with [`Error::NoRequest`] if there isn't one.
    pub fn execute(&mut self) -> Result<Response, Error> {
        let mut request = self.request.clone().ok_or(Error::NoRequest)?;

        self.response = None;
        self.errno = Errno::None;
        self.message.clear();

        let following = self.config.follow_redirects && self.config.max_redirects > 0;
        let mut redirects = 0;
        let mut keep_auth = true;

        loop {
            let (response, redirect_url) = self.execute_hop(&request, keep_auth)?;

            if !following || !response.is_redirect() {
                return Ok(response);
            }

            let Some(target) = redirect_target(request.uri(), &response, redirect_url) else {
                return Ok(response);
            };

            if redirects == self.config.max_redirects {
                return Err(Error::TooManyRedirects(redirects));
            }
            redirects += 1;

            keep_auth = keep_auth
                && self
                    .config
                    .redirect_auth_headers
                    .keeps(request.uri(), &target);

            debug!("Redirect ({}): {} -> {}", redirects, request.uri(), target);

            request = request.with_uri(target)?;
            self.request = Some(request.clone());
        }
    }

    /// One request, without redirects. Returns the response and the redirect url
    /// the transport reported.
    fn execute_hop(
        &mut self,
        request: &Request,
        keep_auth: bool,
    ) -> Result<(Response, Option<String>), Error> {
        let exchange = exchange_for(&self.config, request, keep_auth)?;
        let max_attempts = self.config.attempts();

        let mut attempt = 1;

        let outcome = loop {
            debug!("{} {} (attempt {})", exchange.method, exchange.url, attempt);

            let outcome = self.transport.execute(&exchange);

            self.errno = outcome.errno;
            self.message.clone_from(&outcome.message);

            if outcome.is_transient() && attempt < max_attempts {
                debug!(
                    "Attempt {} of {} failed: {} {}",
                    attempt, max_attempts, outcome.errno, outcome.message
                );
                self.backoff.pause(attempt);
                attempt += 1;
                continue;
            }

            break outcome;
        };

        let Outcome {
            status,
            content_type,
            output,
            header_len,
            redirect_url,
            errno,
            message,
            request_header,
        } = outcome;

        let response = if output.is_empty() {
            None
        } else {
            let parsed = parse_response(status, &output, header_len).map(|r| {
                r.with_url(exchange.url.clone())
                    .with_content_type(content_type)
                    .with_request_header(request_header)
            });

            match parsed {
                Ok(r) => Some(r),
                // Output of a failed attempt is only kept when it parses.
                Err(e) if errno != Errno::None => {
                    debug!("Unparsable output: {}", e);
                    None
                }
                Err(e) => return Err(e),
            }
        };

        self.response.clone_from(&response);

        if errno != Errno::None {
            return Err(Error::Transport { errno, message });
        }

        let Some(response) = response else {
            self.errno = Errno::GotNothing;
            self.message = "no data returned".to_string();
            return Err(Error::Transport {
                errno: self.errno,
                message: self.message.clone(),
            });
        };

        Ok((response, redirect_url))
    }
}

/// Where a 3xx response points. The transport's redirect url wins over the
/// `location` header. Both are resolved against the current uri.
fn redirect_target(current: &Uri, response: &Response, redirect_url: Option<String>) -> Option<Uri> {
    let location = redirect_url.or_else(|| response.header("location").map(|s| s.to_string()))?;

    match current.resolve(&location) {
        Ok(uri) if uri.is_absolute() => Some(uri),
        Ok(uri) => {
            debug!("Redirect target not absolute: {}", uri);
            None
        }
        Err(e) => {
            debug!("Bad redirect target {:?}: {}", location, e);
            None
        }
    }
}

/// Translate a request to transport options.
fn exchange_for(config: &Config, request: &Request, keep_auth: bool) -> Result<Exchange, Error> {
    let mut headers = Headers::new();

    if request.has_body() {
        headers.insert("Content-Type", &config.content_type)?;
        headers.insert("Connection", "close")?;
        // Switch off expect: 100-continue.
        headers.insert("Expect", "")?;
    }

    let mut extra = Headers::new();
    for (name, value) in &config.extra_headers {
        extra.append(name, value)?;
    }

    overlay(&mut headers, &extra)?;
    overlay(&mut headers, request.headers())?;

    let uri = request.uri();

    let credentials = if keep_auth {
        uri.credentials().or_else(|| config.credentials.clone())
    } else {
        headers.remove("authorization");
        None
    };

    let is_head = *request.method() == Method::HEAD;

    Ok(Exchange {
        method: request.method().clone(),
        url: uri.without_user_info(),
        headers: headers
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect(),
        body: request.has_body().then(|| request.body().to_vec()),
        no_body: is_head,
        credentials,
        user_agent: config.user_agent.clone(),
        connect_timeout: config.connect_timeout,
        timeout: config.timeout,
        follow_location: false,
    })
}

/// Headers named in `layer` replace all earlier values of that name.
fn overlay(headers: &mut Headers, layer: &Headers) -> Result<(), Error> {
    for name in layer.names() {
        headers.remove(name);
    }
    for (name, value) in layer.iter() {
        headers.append(name, value)?;
    }
    Ok(())
}
