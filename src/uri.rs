//! Immutable URI value.
//!
//! Only the `http` and `https` schemes are accepted. The components are
//! normalized on every construction, which makes the string form canonical:
//! `Uri::parse(&uri.to_string())` always gives back an equal value.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::Error;

/// Never valid raw in any component.
const INVALID: &AsciiSet = &CONTROLS.add(b' ');

const USER_ENCODE_SET: &AsciiSet = &INVALID
    .add(b'%')
    .add(b':')
    .add(b'@')
    .add(b'/')
    .add(b'?')
    .add(b'#');

const PASSWORD_ENCODE_SET: &AsciiSet = &INVALID
    .add(b'%')
    .add(b'@')
    .add(b'/')
    .add(b'?')
    .add(b'#');

const PATH_ENCODE_SET: &AsciiSet = &INVALID.add(b'?').add(b'#');

const QUERY_ENCODE_SET: &AsciiSet = &INVALID.add(b'#');

const FRAGMENT_ENCODE_SET: &AsciiSet = INVALID;

/// An immutable URI.
///
/// All `with_*` methods return a new `Uri`, the receiver is never altered.
///
/// ```
/// use ricochet::Uri;
///
/// let uri = Uri::parse("HTTP://User@EXAMPLE.com:80/a?b#c").unwrap();
///
/// assert_eq!(uri.scheme(), "http");
/// assert_eq!(uri.host(), "example.com");
/// assert_eq!(uri.port(), None);
/// assert_eq!(uri.to_string(), "http://User@example.com/a?b#c");
///
/// let moved = uri.with_port(8080).unwrap();
/// assert_eq!(moved.to_string(), "http://User@example.com:8080/a?b#c");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Uri {
    scheme: String,
    user_info: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: String,
    fragment: String,
}

/// Default port for a (lower-cased) scheme.
pub(crate) fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

impl Uri {
    /// Parse a raw uri string.
    ///
    /// Accepts absolute urls as well as relative references. A non-empty scheme
    /// must be `http` or `https` (case-insensitive).
    pub fn parse(raw: &str) -> Result<Uri, Error> {
        if let Some(c) = raw.chars().find(|c| c.is_ascii_control() || *c == ' ') {
            return Err(Error::BadUri(format!("invalid character {:?} in {}", c, raw)));
        }

        let (rest, fragment) = match raw.split_once('#') {
            Some((r, f)) => (r, f),
            None => (raw, ""),
        };

        let (rest, query) = match rest.split_once('?') {
            Some((r, q)) => (r, q),
            None => (rest, ""),
        };

        let (scheme, rest) = split_scheme(rest);

        let mut uri = Uri {
            scheme: scheme.to_string(),
            query: query.to_string(),
            fragment: fragment.to_string(),
            ..Default::default()
        };

        if let Some(after) = rest.strip_prefix("//") {
            let (authority, path) = match after.find('/') {
                Some(i) => after.split_at(i),
                None => (after, ""),
            };

            let (user_info, host_port) = match authority.rsplit_once('@') {
                Some((u, h)) => (u, h),
                None => ("", authority),
            };

            let (host, port) = split_port(host_port)?;

            uri.user_info = user_info.to_string();
            uri.host = host.to_string();
            uri.port = port;
            uri.path = path.to_string();
        } else {
            uri.path = rest.to_string();
        }

        uri.normalized()
    }

    /// The scheme, lower-cased. Empty for relative references.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The `user[:password]` part of the authority. Empty if absent.
    pub fn user_info(&self) -> &str {
        &self.user_info
    }

    /// The host, lower-cased. Empty if absent.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port.
    ///
    /// This is `None` when the uri has no port, or when the port is the default
    /// for the scheme.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Explicit port, falling back on the scheme default.
    pub fn port_or_default(&self) -> Option<u16> {
        self.port.or_else(|| default_port(&self.scheme))
    }

    /// The path. Possibly empty.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The query without the leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The fragment without the leading `#`.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// The `user-info@host:port` authority string. Empty if absent.
    pub fn authority(&self) -> String {
        let mut s = String::new();
        if !self.user_info.is_empty() {
            s.push_str(&self.user_info);
            s.push('@');
        }
        s.push_str(&self.host);
        if let Some(port) = self.port {
            s.push(':');
            s.push_str(&port.to_string());
        }
        s
    }

    /// Path and query as used in an HTTP/1.1 request line.
    pub fn path_and_query(&self) -> String {
        let mut s = if self.path.is_empty() {
            "/".to_string()
        } else {
            self.path.clone()
        };
        if !self.query.is_empty() {
            s.push('?');
            s.push_str(&self.query);
        }
        s
    }

    /// Tell if this is an absolute `http(s)` url, i.e. has both scheme and host.
    pub fn is_absolute(&self) -> bool {
        !self.scheme.is_empty() && !self.host.is_empty()
    }

    /// New uri with another scheme. Only `http` and `https` are accepted.
    ///
    /// A port that equals the new scheme's default is dropped.
    pub fn with_scheme(&self, scheme: &str) -> Result<Uri, Error> {
        if scheme.is_empty() {
            return Err(Error::UnsupportedScheme(scheme.to_string()));
        }
        let mut uri = self.clone();
        uri.scheme = scheme.to_string();
        uri.normalized()
    }

    /// New uri with user info.
    ///
    /// The user and password are taken literally and percent-encoded where needed.
    pub fn with_user_info(&self, user: &str, password: Option<&str>) -> Result<Uri, Error> {
        let mut user_info = encode(user, USER_ENCODE_SET);
        if let Some(password) = password {
            user_info.push(':');
            user_info.push_str(&encode(password, PASSWORD_ENCODE_SET));
        }
        let mut uri = self.clone();
        uri.user_info = user_info;
        uri.normalized()
    }

    /// New uri with another host.
    ///
    /// The host is a name or a bracketed ip literal, without port.
    pub fn with_host(&self, host: &str) -> Result<Uri, Error> {
        let mut uri = self.clone();
        uri.host = host.to_string();
        uri.normalized()
    }

    /// New uri with another port.
    ///
    /// The port must be in the range 1-65535. Use [`Uri::without_port()`] to clear it.
    pub fn with_port<P: Into<i64>>(&self, port: P) -> Result<Uri, Error> {
        let port: i64 = port.into();
        let port = check_port(port)?;
        let mut uri = self.clone();
        uri.port = Some(port);
        uri.normalized()
    }

    /// New uri without an explicit port.
    pub fn without_port(&self) -> Uri {
        let mut uri = self.clone();
        uri.port = None;
        uri
    }

    /// User info percent-decoded into `user:password`, if there is any.
    pub(crate) fn credentials(&self) -> Option<String> {
        if self.user_info.is_empty() {
            None
        } else {
            Some(decode(&self.user_info))
        }
    }

    /// New uri without user info.
    pub fn without_user_info(&self) -> Uri {
        let mut uri = self.clone();
        uri.user_info.clear();
        uri
    }

    /// New uri with another path.
    ///
    /// Existing escapes are kept. Whitespace, control characters, `?` and `#`
    /// are percent-encoded.
    pub fn with_path(&self, path: &str) -> Result<Uri, Error> {
        let mut uri = self.clone();
        uri.path = encode(path, PATH_ENCODE_SET);
        uri.normalized()
    }

    /// New uri with another query. A leading `?` is not part of the query.
    pub fn with_query(&self, query: &str) -> Result<Uri, Error> {
        let mut uri = self.clone();
        uri.query = encode(query, QUERY_ENCODE_SET);
        uri.normalized()
    }

    /// New uri with another fragment. A leading `#` is not part of the fragment.
    pub fn with_fragment(&self, fragment: &str) -> Result<Uri, Error> {
        let mut uri = self.clone();
        uri.fragment = encode(fragment, FRAGMENT_ENCODE_SET);
        uri.normalized()
    }

    /// Resolve a reference against this uri as base.
    ///
    /// Follows RFC 3986 section 5.2, which is what turns a relative `Location`
    /// header into the next absolute url.
    ///
    /// ```
    /// use ricochet::Uri;
    ///
    /// let base = Uri::parse("http://a.test/b/c/d?q").unwrap();
    /// assert_eq!(base.resolve("../g").unwrap().to_string(), "http://a.test/b/g");
    /// assert_eq!(base.resolve("//other.test/x").unwrap().to_string(), "http://other.test/x");
    /// ```
    pub fn resolve(&self, reference: &str) -> Result<Uri, Error> {
        let mut r = Uri::parse(reference)?;
        let fragment = std::mem::take(&mut r.fragment);

        let mut t = if !r.scheme.is_empty() {
            Uri {
                path: remove_dot_segments(&r.path),
                ..r
            }
        } else if r.has_authority() {
            Uri {
                scheme: self.scheme.clone(),
                path: remove_dot_segments(&r.path),
                ..r
            }
        } else {
            let (path, query) = if r.path.is_empty() {
                let query = if r.query.is_empty() {
                    self.query.clone()
                } else {
                    r.query
                };
                (self.path.clone(), query)
            } else if r.path.starts_with('/') {
                (remove_dot_segments(&r.path), r.query)
            } else {
                (remove_dot_segments(&self.merge(&r.path)), r.query)
            };

            Uri {
                scheme: self.scheme.clone(),
                user_info: self.user_info.clone(),
                host: self.host.clone(),
                port: self.port,
                path,
                query,
                fragment: String::new(),
            }
        };

        t.fragment = fragment;

        t.normalized()
    }

    fn merge(&self, path: &str) -> String {
        if self.has_authority() && self.path.is_empty() {
            return format!("/{}", path);
        }
        match self.path.rfind('/') {
            Some(i) => format!("{}{}", &self.path[..=i], path),
            None => path.to_string(),
        }
    }

    fn has_authority(&self) -> bool {
        !self.user_info.is_empty() || !self.host.is_empty() || self.port.is_some()
    }

    /// Bring components to canonical form.
    fn normalized(mut self) -> Result<Uri, Error> {
        self.scheme.make_ascii_lowercase();
        self.host.make_ascii_lowercase();

        if !self.scheme.is_empty() && default_port(&self.scheme).is_none() {
            return Err(Error::UnsupportedScheme(self.scheme));
        }

        check_host(&self.host)?;

        if self.port.is_some() && self.port == default_port(&self.scheme) {
            self.port = None;
        }

        if self.has_authority() {
            if !self.path.is_empty() && !self.path.starts_with('/') {
                self.path.insert(0, '/');
            }
        } else {
            if self.path.starts_with("//") {
                self.path = format!("/{}", self.path.trim_start_matches('/'));
            }

            // "a:b" without scheme would read back as scheme "a".
            let first = self.path.split('/').next().unwrap_or_default();
            if self.scheme.is_empty() && first.contains(':') {
                return Err(Error::BadUri(format!(
                    "relative path with colon in first segment: {}",
                    self.path
                )));
            }
        }

        Ok(self)
    }
}

fn split_scheme(s: &str) -> (&str, &str) {
    let Some(i) = s.find(':') else {
        return ("", s);
    };
    let candidate = &s[..i];

    let mut chars = candidate.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    if valid {
        (candidate, &s[i + 1..])
    } else {
        ("", s)
    }
}

fn split_port(host_port: &str) -> Result<(&str, Option<u16>), Error> {
    let (host, port) = if host_port.starts_with('[') {
        let Some(end) = host_port.find(']') else {
            return Err(Error::BadUri(format!("unterminated ip literal: {}", host_port)));
        };
        let (host, rest) = host_port.split_at(end + 1);
        if rest.is_empty() {
            (host, "")
        } else if let Some(port) = rest.strip_prefix(':') {
            (host, port)
        } else {
            return Err(Error::BadUri(format!("junk after ip literal: {}", host_port)));
        }
    } else {
        match host_port.rsplit_once(':') {
            Some((h, p)) => (h, p),
            None => (host_port, ""),
        }
    };

    if port.is_empty() {
        return Ok((host, None));
    }

    if !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::BadUri(format!("port is not a number: {}", port)));
    }

    let n: i64 = port.parse().map_err(|_| Error::BadUri(port.to_string()))?;

    Ok((host, Some(check_port(n)?)))
}

fn check_port(port: i64) -> Result<u16, Error> {
    if (1..=65535).contains(&port) {
        Ok(port as u16)
    } else {
        Err(Error::BadPort(port))
    }
}

fn encode(s: &str, set: &'static AsciiSet) -> String {
    utf8_percent_encode(s, set).to_string()
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// A host is a bracketed ip literal, or a name without delimiters.
fn check_host(host: &str) -> Result<(), Error> {
    let invalid = |c: char| c.is_ascii_control() || c == ' ';

    let ok = if let Some(literal) = host.strip_prefix('[') {
        literal
            .strip_suffix(']')
            .is_some_and(|inner| !inner.contains(|c: char| invalid(c) || "[]/?#@".contains(c)))
    } else {
        !host.contains(|c: char| invalid(c) || ":[]/?#@".contains(c))
    };

    if ok {
        Ok(())
    } else {
        Err(Error::BadUri(format!("invalid host: {:?}", host)))
    }
}

/// RFC 3986 5.2.4
fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::with_capacity(path.len());

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..]
                .find('/')
                .map(|i| i + start)
                .unwrap_or(input.len());
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }

    output
}

fn pop_segment(output: &mut String) {
    match output.rfind('/') {
        Some(i) => output.truncate(i),
        None => output.clear(),
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scheme.is_empty() {
            write!(f, "{}:", self.scheme)?;
        }

        let has_authority = self.has_authority();

        if has_authority {
            write!(f, "//{}", self.authority())?;
        }

        if has_authority && !self.path.is_empty() && !self.path.starts_with('/') {
            write!(f, "/{}", self.path)?;
        } else if !has_authority && self.path.starts_with("//") {
            write!(f, "/{}", self.path.trim_start_matches('/'))?;
        } else {
            write!(f, "{}", self.path)?;
        }

        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }

        if !self.fragment.is_empty() {
            write!(f, "#{}", self.fragment)?;
        }

        Ok(())
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::parse(s)
    }
}

impl TryFrom<&str> for Uri {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Uri::parse(value)
    }
}
