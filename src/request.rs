use http::Method;

use crate::{Error, Headers, Uri};

/// An immutable request.
///
/// Only `HEAD`, `GET` and `POST` are supported, and the uri must be an
/// absolute `http(s)` url. Both are checked on construction, so an existing
/// `Request` is always sendable.
///
/// ```
/// use ricochet::Request;
///
/// let req = Request::post("http://example.test/form", "a=1&b=2").unwrap()
///     .with_header("Content-Type", "application/x-www-form-urlencoded").unwrap();
///
/// assert_eq!(req.method(), "POST");
/// assert_eq!(req.header("content-type"), Some("application/x-www-form-urlencoded"));
/// assert_eq!(req.body(), b"a=1&b=2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: Headers,
    body: Vec<u8>,
}

impl Request {
    /// Create a request without headers or body.
    pub fn new(method: Method, uri: Uri) -> Result<Self, Error> {
        check_method(&method)?;
        check_uri(&uri)?;

        Ok(Request {
            method,
            uri,
            headers: Headers::new(),
            body: vec![],
        })
    }

    /// `HEAD` request for a raw uri.
    pub fn head(uri: &str) -> Result<Self, Error> {
        Request::new(Method::HEAD, Uri::parse(uri)?)
    }

    /// `GET` request for a raw uri.
    pub fn get(uri: &str) -> Result<Self, Error> {
        Request::new(Method::GET, Uri::parse(uri)?)
    }

    /// `POST` request for a raw uri with a body.
    pub fn post(uri: &str, body: impl Into<Vec<u8>>) -> Result<Self, Error> {
        Request::new(Method::POST, Uri::parse(uri)?)?.with_body(body)
    }

    /// The method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The uri.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// The body. Always empty for `HEAD` and `GET`.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Tell if the method sends a body.
    pub(crate) fn has_body(&self) -> bool {
        self.method == Method::POST
    }

    /// New request with another method.
    ///
    /// Changing to `HEAD` or `GET` drops the body.
    pub fn with_method(&self, method: Method) -> Result<Self, Error> {
        check_method(&method)?;
        let mut req = self.clone();
        req.method = method;
        if !req.has_body() {
            req.body.clear();
        }
        Ok(req)
    }

    /// New request with another uri.
    pub fn with_uri(&self, uri: Uri) -> Result<Self, Error> {
        check_uri(&uri)?;
        let mut req = self.clone();
        req.uri = uri;
        Ok(req)
    }

    /// New request with a header set, replacing previous values of it.
    pub fn with_header(&self, name: &str, value: &str) -> Result<Self, Error> {
        let mut req = self.clone();
        req.headers.insert(name, value)?;
        Ok(req)
    }

    /// New request with a value appended to a header.
    pub fn with_added_header(&self, name: &str, value: &str) -> Result<Self, Error> {
        let mut req = self.clone();
        req.headers.append(name, value)?;
        Ok(req)
    }

    /// New request without a header.
    pub fn without_header(&self, name: &str) -> Self {
        let mut req = self.clone();
        req.headers.remove(name);
        req
    }

    /// New request with a body. Only `POST` can have one.
    pub fn with_body(&self, body: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let body = body.into();
        if !self.has_body() && !body.is_empty() {
            return Err(Error::BodyNotAllowed(self.method.clone()));
        }
        let mut req = self.clone();
        req.body = body;
        Ok(req)
    }
}

fn check_method(method: &Method) -> Result<(), Error> {
    if matches!(*method, Method::HEAD | Method::GET | Method::POST) {
        Ok(())
    } else {
        Err(Error::UnsupportedMethod(method.clone()))
    }
}

fn check_uri(uri: &Uri) -> Result<(), Error> {
    if uri.is_absolute() {
        Ok(())
    } else {
        Err(Error::NotAbsolute(uri.to_string()))
    }
}
