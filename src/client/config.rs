use std::time::Duration;

use crate::Uri;

/// Client configuration.
///
/// Fixed when the [`Client`](crate::Client) is created, it is never changed by
/// sending requests.
///
/// ```
/// use std::time::Duration;
/// use ricochet::Config;
///
/// let config = Config::new()
///     .follow_redirects(false)
///     .timeout(Duration::from_secs(30))
///     .header("Accept", "application/json");
///
/// assert_eq!(config.max_attempts, 5);
/// assert_eq!(config.extra_headers.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Follow 3xx responses. Defaults to `true`.
    pub follow_redirects: bool,

    /// Attempts per request (and per redirect hop) when the transport reports
    /// transient errors. Defaults to 5, never less than 1.
    pub max_attempts: u32,

    /// Max number of redirects to follow before failing with
    /// [`Error::TooManyRedirects`](crate::Error::TooManyRedirects).
    /// Defaults to 10. 0 means 3xx responses are returned as is.
    pub max_redirects: u32,

    /// Whether to keep credentials when following redirects.
    pub redirect_auth_headers: RedirectAuthHeaders,

    /// Budget for connecting. Defaults to 5 seconds.
    pub connect_timeout: Duration,

    /// Budget for one attempt, connecting included. Defaults to 10 seconds.
    pub timeout: Duration,

    /// Default `content-type` of `POST` bodies.
    ///
    /// Defaults to `application/x-www-form-urlencoded`.
    pub content_type: String,

    /// Headers sent with every request.
    ///
    /// They override the `POST` defaults, and are in turn overridden by the
    /// headers of the request itself.
    pub extra_headers: Vec<(String, String)>,

    /// User agent.
    pub user_agent: Option<String>,

    /// Basic auth `user:password` for requests without user info in the uri.
    pub credentials: Option<String>,
}

impl Config {
    /// Config with defaults.
    pub fn new() -> Self {
        Config::default()
    }

    /// Set `follow_redirects`.
    pub fn follow_redirects(mut self, v: bool) -> Self {
        self.follow_redirects = v;
        self
    }

    /// Set `max_attempts`. 0 is treated as 1.
    pub fn max_attempts(mut self, v: u32) -> Self {
        self.max_attempts = v.max(1);
        self
    }

    /// Set `max_redirects`.
    pub fn max_redirects(mut self, v: u32) -> Self {
        self.max_redirects = v;
        self
    }

    /// Set `redirect_auth_headers`.
    pub fn redirect_auth_headers(mut self, v: RedirectAuthHeaders) -> Self {
        self.redirect_auth_headers = v;
        self
    }

    /// Set `connect_timeout`.
    pub fn connect_timeout(mut self, v: Duration) -> Self {
        self.connect_timeout = v;
        self
    }

    /// Set `timeout`.
    pub fn timeout(mut self, v: Duration) -> Self {
        self.timeout = v;
        self
    }

    /// Set `content_type`.
    pub fn content_type(mut self, v: impl Into<String>) -> Self {
        self.content_type = v.into();
        self
    }

    /// Add a header to `extra_headers`.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Set `user_agent`.
    pub fn user_agent(mut self, v: impl Into<String>) -> Self {
        self.user_agent = Some(v.into());
        self
    }

    /// Set `credentials` as `user:password`.
    pub fn credentials(mut self, v: impl Into<String>) -> Self {
        self.credentials = Some(v.into());
        self
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            max_attempts: 5,
            max_redirects: 10,
            redirect_auth_headers: RedirectAuthHeaders::Never,
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
            content_type: "application/x-www-form-urlencoded".to_string(),
            extra_headers: vec![],
            user_agent: None,
            credentials: None,
        }
    }
}

/// Strategy for preserving credentials during redirects.
///
/// Credentials are the user info of the uri, [`Config::credentials()`] and any
/// `authorization` header of the request.
///
/// * `Never`: Never send credentials to a redirect target. This is the default.
/// * `SameHost`: Keep credentials when the redirect is to the same host and uses the
///   same scheme (or switches to a more secure one, i.e., from HTTP to HTTPS,
///   but not the reverse).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum RedirectAuthHeaders {
    /// Never send credentials after a redirect. This is the default.
    #[default]
    Never,
    /// Keep credentials when the redirect is to the same host. Both hosts must use
    /// the same scheme (or switch to a more secure one, i.e we can redirect from `http` to `https`,
    /// but not the reverse).
    SameHost,
}

impl RedirectAuthHeaders {
    pub(crate) fn keeps(&self, from: &Uri, to: &Uri) -> bool {
        match self {
            RedirectAuthHeaders::Never => false,
            RedirectAuthHeaders::SameHost => {
                if from.host() != to.host() {
                    return false;
                }
                if from.scheme() == to.scheme() {
                    from.port_or_default() == to.port_or_default()
                } else {
                    to.scheme() == "https"
                }
            }
        }
    }
}
