//! The seam towards the network.
//!
//! A [`Transport`] executes exactly one HTTP exchange: it gets fully specified
//! options in an [`Exchange`] and answers with an [`Outcome`], which is the
//! raw output plus whatever it could tell about the exchange (status, header
//! length, redirect url) and a low-level [`Errno`].
//!
//! Transports never follow redirects or retry on their own, that is what
//! the [`Client`](crate::Client) does.

use std::fmt;
use std::time::Duration;

use http::{Method, StatusCode};

use crate::Uri;

#[cfg(feature = "tcp")]
mod tcp;
#[cfg(feature = "tcp")]
pub use tcp::TcpTransport;

/// Executes a single HTTP exchange.
pub trait Transport {
    /// Run the exchange to completion or to its timeout.
    ///
    /// Failures are reported through [`Outcome::errno`], never by panicking.
    fn execute(&mut self, exchange: &Exchange) -> Outcome;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn execute(&mut self, exchange: &Exchange) -> Outcome {
        (**self).execute(exchange)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&mut self, exchange: &Exchange) -> Outcome {
        (**self).execute(exchange)
    }
}

/// Options for one exchange, translated from a [`Request`](crate::Request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Request method.
    pub method: Method,
    /// Absolute url, without user info.
    pub url: Uri,
    /// Headers to send, in order.
    ///
    /// A header with an empty value means "do not send this header", like
    /// `Expect:` to switch off `expect: 100-continue`.
    pub headers: Vec<(String, String)>,
    /// Request body, for `POST`.
    pub body: Option<Vec<u8>>,
    /// Do not read a response body (`HEAD`).
    pub no_body: bool,
    /// Basic auth `user:password`.
    pub credentials: Option<String>,
    /// User agent.
    pub user_agent: Option<String>,
    /// Budget for establishing the connection.
    pub connect_timeout: Duration,
    /// Budget for the entire exchange, including connecting.
    pub timeout: Duration,
    /// Whether the transport may follow redirects itself. Always `false`
    /// when coming from the client.
    pub follow_location: bool,
}

/// What a transport reports back from one exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Status code, if the transport got that far.
    pub status: Option<StatusCode>,
    /// Response content type.
    pub content_type: Option<String>,
    /// Raw output, header block followed by body.
    pub output: Vec<u8>,
    /// Byte length of the header block, if the transport measured it.
    pub header_len: Option<usize>,
    /// Absolute url a 3xx response points to.
    pub redirect_url: Option<String>,
    /// Low level error, [`Errno::None`] on success.
    pub errno: Errno,
    /// Error message to go with the errno.
    pub message: String,
    /// The request header block as sent.
    pub request_header: Option<String>,
}

impl Outcome {
    /// Outcome for an exchange that failed without output.
    pub fn failed(errno: Errno, message: impl Into<String>) -> Self {
        Outcome {
            errno,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Tell if the outcome is worth retrying.
    pub fn is_transient(&self) -> bool {
        self.errno.is_transient()
    }
}

/// Low level transport error codes.
///
/// The numeric [`code()`](Errno::code) follows libcurl's `CURLcode` so that
/// adapters on top of curl can pass errors through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Errno {
    /// No error.
    #[default]
    None,
    /// Failed to connect to host or proxy.
    CouldNotConnect,
    /// Failure receiving network data.
    ReceiveError,
    /// The configured timeout was reached.
    OperationTimedOut,
    /// The server closed without returning anything.
    GotNothing,
    /// Any other error, with its code.
    Other(u32),
}

impl Errno {
    /// Tell if this is one of the transient errors that are retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Errno::CouldNotConnect
                | Errno::ReceiveError
                | Errno::OperationTimedOut
                | Errno::GotNothing
        )
    }

    /// Numeric code.
    pub fn code(&self) -> u32 {
        match self {
            Errno::None => 0,
            Errno::CouldNotConnect => 7,
            Errno::ReceiveError => 56,
            Errno::OperationTimedOut => 28,
            Errno::GotNothing => 52,
            Errno::Other(n) => *n,
        }
    }

    /// Map a numeric code back to an errno.
    pub fn from_code(code: u32) -> Errno {
        match code {
            0 => Errno::None,
            7 => Errno::CouldNotConnect,
            56 => Errno::ReceiveError,
            28 => Errno::OperationTimedOut,
            52 => Errno::GotNothing,
            n => Errno::Other(n),
        }
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Errno::None => write!(f, "no error"),
            Errno::CouldNotConnect => write!(f, "could not connect"),
            Errno::ReceiveError => write!(f, "receive error"),
            Errno::OperationTimedOut => write!(f, "operation timed out"),
            Errno::GotNothing => write!(f, "got nothing"),
            Errno::Other(n) => write!(f, "error {}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(Errno::CouldNotConnect.is_transient());
        assert!(Errno::ReceiveError.is_transient());
        assert!(Errno::OperationTimedOut.is_transient());
        assert!(Errno::GotNothing.is_transient());

        assert!(!Errno::None.is_transient());
        assert!(!Errno::Other(6).is_transient());
        assert!(!Errno::Other(35).is_transient());
    }

    #[test]
    fn codes_map_back() {
        for errno in [
            Errno::None,
            Errno::CouldNotConnect,
            Errno::ReceiveError,
            Errno::OperationTimedOut,
            Errno::GotNothing,
            Errno::Other(6),
        ] {
            assert_eq!(Errno::from_code(errno.code()), errno);
        }
    }

    #[test]
    fn failed_outcome() {
        let o = Outcome::failed(Errno::OperationTimedOut, "Operation timed out");
        assert!(o.is_transient());
        assert!(o.output.is_empty());
        assert_eq!(o.status, None);
    }
}
