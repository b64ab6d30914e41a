//! Blocking HTTP/1.1 client with transient-error retries and bounded redirects.
//!
//! The crate is split in two halves:
//!
//! * **Values** - [`Uri`], [`Headers`], [`Request`] and [`Response`] are immutable
//!   value types. Every "mutator" returns a new value.
//! * **Execution** - a [`Client`] drives a [`Transport`] through a retry/redirect
//!   loop and turns the raw bytes it gets back into a [`Response`].
//!
//! The transport is the seam towards the network. A [`TcpTransport`] for plain
//! `http://` is provided, other adapters (TLS, platform libraries) implement
//! [`Transport`] themselves.
//!
//! # Example
//!
//! ```no_run
//! use ricochet::{Client, Config, Request, TcpTransport};
//!
//! let config = Config::new()
//!     .max_attempts(3)
//!     .user_agent("ricochet/0.1");
//!
//! let mut client = Client::new(TcpTransport::new(), config);
//!
//! let request = Request::get("http://example.test/index.html").unwrap();
//! let response = client.send(request).unwrap();
//!
//! assert_eq!(response.status(), 200);
//! println!("{}", response.text());
//! ```
//!
//! # Retries
//!
//! A transport outcome is _transient_ when its [`Errno`] is one of could-not-connect,
//! receive-error, operation-timed-out or got-nothing-back. Transient outcomes are
//! retried, with a randomized [`Backoff`] in between, until
//! [`Config::max_attempts()`] is spent. Any other transport error fails immediately.
//!
//! # Redirects
//!
//! 3xx responses are followed when [`Config::follow_redirects()`] is enabled, up to
//! [`Config::max_redirects()`] hops. Every hop gets a fresh attempt budget.
//!
//! # Out of scope:
//!
//! * Connection pooling / keep-alive
//! * HTTP/2
//! * Cookie jars
//! * Caching, content negotiation
//! * Chunked/streaming bodies
//!
//! # The http crate
//!
//! Methods and status codes come from the [http crate](https://crates.io/crates/http),
//! which is re-exported as [`ricochet::http`](crate::http).

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![deny(missing_docs)]

#[macro_use]
extern crate log;

mod error;
pub use error::Error;

mod headers;
pub use headers::Headers;

mod parser;
pub use parser::parse_response;

mod request;
pub use request::Request;

mod response;
pub use response::Response;

mod uri;
pub use uri::Uri;

mod util;

pub mod client;
pub use client::{Backoff, Client, Config, RandomBackoff, RedirectAuthHeaders};

pub mod transport;
#[cfg(feature = "tcp")]
pub use transport::TcpTransport;
pub use transport::{Errno, Exchange, Outcome, Transport};

pub use http;
