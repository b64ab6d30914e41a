use std::fmt;

use http::Method;

use crate::transport::Errno;

/// Error type for ricochet
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
#[non_exhaustive]
pub enum Error {
    BadUri(String),
    UnsupportedScheme(String),
    BadPort(i64),
    NotAbsolute(String),
    UnsupportedMethod(Method),
    BadHeader(String),
    BodyNotAllowed(Method),
    Transport { errno: Errno, message: String },
    NoRequest,
    NoStatus,
    HttpParseFail(String),
    TooManyRedirects(u32),
}

impl Error {
    /// Whether the error was raised while building a value (uri, request, header).
    ///
    /// These are never retried.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Error::BadUri(_)
                | Error::UnsupportedScheme(_)
                | Error::BadPort(_)
                | Error::NotAbsolute(_)
                | Error::UnsupportedMethod(_)
                | Error::BadHeader(_)
                | Error::BodyNotAllowed(_)
        )
    }

    /// Whether the error came from the transport.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// The transport errno, if this is a transport error.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::Transport { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

impl From<httparse::Error> for Error {
    fn from(value: httparse::Error) -> Self {
        Error::HttpParseFail(value.to_string())
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadUri(v) => write!(f, "bad uri: {}", v),
            Error::UnsupportedScheme(v) => write!(f, "unsupported scheme: {}", v),
            Error::BadPort(v) => write!(f, "port out of range 1-65535: {}", v),
            Error::NotAbsolute(v) => write!(f, "uri is not an absolute http(s) url: {}", v),
            Error::UnsupportedMethod(m) => write!(f, "unsupported method: {}", m),
            Error::BadHeader(v) => write!(f, "bad header: {}", v),
            Error::BodyNotAllowed(m) => write!(f, "{} request cannot have a body", m),
            Error::Transport { errno, message } => {
                if message.is_empty() {
                    write!(f, "transport error ({}): {}", errno.code(), errno)
                } else {
                    write!(f, "transport error ({}): {}", errno.code(), message)
                }
            }
            Error::NoRequest => write!(f, "no request to send"),
            Error::NoStatus => write!(f, "response has no status"),
            Error::HttpParseFail(v) => write!(f, "http parse fail: {}", v),
            Error::TooManyRedirects(n) => write!(f, "stopped after {} redirects", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_errors() {
        assert!(Error::BadPort(0).is_construction());
        assert!(Error::UnsupportedMethod(Method::PUT).is_construction());
        assert!(!Error::NoRequest.is_construction());
        assert!(!Error::TooManyRedirects(3).is_construction());
    }

    #[test]
    fn transport_error_carries_errno() {
        let err = Error::Transport {
            errno: Errno::GotNothing,
            message: "Empty reply from server".into(),
        };

        assert!(err.is_transport());
        assert_eq!(err.errno(), Some(Errno::GotNothing));
        assert_eq!(
            err.to_string(),
            "transport error (52): Empty reply from server"
        );
    }

    #[test]
    fn transport_error_without_message() {
        let err = Error::Transport {
            errno: Errno::CouldNotConnect,
            message: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "transport error (7): could not connect"
        );
    }

    #[test]
    fn from_httparse_error() {
        let error: Error = httparse::Error::HeaderName.into();
        assert!(matches!(error, Error::HttpParseFail(_)));
    }
}
