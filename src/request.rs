//! The request being assembled before it is sent.

use crate::{
    body::{Body, Payload},
    Client, Result,
};
use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method};
use url::Url;

/// Everything needed to send a single HTTP request.
///
/// Created once per [`Client`] by a verb constructor and mutated in place by
/// the client's configuration methods.
#[derive(Debug)]
pub struct RequestDescriptor {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The absolute target URL.
    pub url: Url,

    /// Request headers. Repeated names keep every value.
    pub headers: HeaderMap,

    /// The resolved body.
    pub payload: Payload,
}

impl RequestDescriptor {
    /// Creates a descriptor with no headers and no body.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new(method: Method, url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            method,
            url: Url::parse(url.as_ref())?,
            headers: HeaderMap::new(),
            payload: Payload::Empty,
        })
    }

    /// Creates a descriptor whose body is resolved from `body`.
    ///
    /// A form body also sets `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or the body cannot be encoded.
    pub fn with_body(method: Method, url: impl AsRef<str>, body: Body) -> Result<Self> {
        let mut descriptor = Self::new(method, url)?;
        let (payload, content_type) = body.resolve()?;
        if let Some(content_type) = content_type {
            descriptor
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        descriptor.payload = payload;
        Ok(descriptor)
    }

    /// Returns the cookies attached so far as `(name, value)` pairs.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(cookie::Cookie::split_parse)
            .filter_map(|c| c.ok())
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect()
    }
}

/// Plain configuration for a [`Client`].
///
/// An alternative to the verb constructors when the method or the redirect
/// policy is only known at run time.
///
/// # Examples
///
/// ```
/// use httpchain::{body, RequestBuilder};
/// use http::Method;
///
/// let client = RequestBuilder {
///     method: Method::POST,
///     url: "https://api.example.com/login".to_string(),
///     follow_redirects: false,
///     body: body!["user", "alice"],
/// }
/// .build();
///
/// assert!(client.error().is_none());
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    /// The HTTP method.
    pub method: Method,

    /// The target URL.
    pub url: String,

    /// Whether the transport follows redirects.
    pub follow_redirects: bool,

    /// The body argument.
    pub body: Body,
}

impl RequestBuilder {
    /// Creates a GET builder that follows redirects and has no body.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            follow_redirects: true,
            body: Body::Empty,
        }
    }

    /// Resolves the body and creates the [`Client`].
    ///
    /// Failures become the client's sticky error.
    pub fn build(self) -> Client {
        Client::method(self.method, self.url, self.body).follow_redirects(self.follow_redirects)
    }
}
