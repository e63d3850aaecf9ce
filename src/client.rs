//! Chainable HTTP client with a sticky error.
//!
//! A [`Client`] wraps one request. Configuration methods take and return the
//! client so they can be chained; the first failure is stored and every later
//! call hands it back without doing anything.

use crate::{body::Body, decode::Decoder, request::RequestDescriptor, Error, Response, Result};
use base64::Engine;
use cookie::Cookie;
use http::{
    header::{AUTHORIZATION, COOKIE, USER_AGENT},
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
};
use std::time::{Duration, Instant};

/// A single HTTP request with chainable configuration.
///
/// Verb constructors resolve the body right away. If that fails, the error
/// becomes the client's sticky error: configuration calls turn into no-ops and
/// [`send`](Client::send) returns the error without touching the network.
///
/// # Examples
///
/// ```no_run
/// use httpchain::{body, Client, Text};
///
/// # async fn example() -> Result<(), httpchain::Error> {
/// let mut client = Client::post("https://httpbin.org/post", body!["name", "alice", "age", 30])
///     .user_agent("httpchain/0.1")
///     .basic_auth("user", "passwd")
///     .header("X-Request-Id", "42");
///
/// let response = client.send_and_decode(Text).await?;
/// println!("{} -> {}", client.status_code(), response.data);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    request: Option<RequestDescriptor>,
    error: Option<Error>,
    status: Option<StatusCode>,
    follow_redirects: bool,
    transport: Option<reqwest::Client>,
    owns_transport: bool,
}

impl Client {
    /// Creates a client with no request.
    ///
    /// Every configuration call on it fails with [`Error::NoRequest`] until a
    /// request is supplied through [`set_request`](Client::set_request).
    pub fn new() -> Self {
        Self {
            request: None,
            error: None,
            status: None,
            follow_redirects: true,
            transport: None,
            owns_transport: false,
        }
    }

    /// Creates a client for any method, resolving `body` immediately.
    pub fn method(method: Method, url: impl AsRef<str>, body: impl Into<Body>) -> Self {
        let url = url.as_ref();
        let mut client = Self::new();

        match RequestDescriptor::with_body(method.clone(), url, body.into()) {
            Ok(descriptor) => {
                tracing::debug!(method = %method, url = %descriptor.url, "Built HTTP request");
                client.request = Some(descriptor);
            }
            Err(e) => {
                tracing::debug!(error = %e, method = %method, url = url, "Failed to build request");
                client.error = Some(e);
            }
        }

        client
    }

    /// Creates a GET client.
    pub fn get(url: impl AsRef<str>) -> Self {
        Self::method(Method::GET, url, Body::Empty)
    }

    /// Creates a HEAD client.
    pub fn head(url: impl AsRef<str>) -> Self {
        Self::method(Method::HEAD, url, Body::Empty)
    }

    /// Creates a DELETE client.
    pub fn delete(url: impl AsRef<str>) -> Self {
        Self::method(Method::DELETE, url, Body::Empty)
    }

    /// Creates a POST client with the given body.
    ///
    /// # Examples
    ///
    /// ```
    /// use httpchain::{body, Client};
    ///
    /// let client = Client::post("http://localhost/post", body!["a", 1, "b", "x"]);
    /// let request = client.request().unwrap();
    /// assert_eq!(request.payload.as_bytes(), Some(&b"a=1&b=x"[..]));
    /// ```
    pub fn post(url: impl AsRef<str>, body: impl Into<Body>) -> Self {
        Self::method(Method::POST, url, body)
    }

    /// Creates a PUT client with the given body.
    pub fn put(url: impl AsRef<str>, body: impl Into<Body>) -> Self {
        Self::method(Method::PUT, url, body)
    }

    /// Creates a PATCH client with the given body.
    pub fn patch(url: impl AsRef<str>, body: impl Into<Body>) -> Self {
        Self::method(Method::PATCH, url, body)
    }

    /// Returns the request, if one exists.
    pub fn request(&self) -> Option<&RequestDescriptor> {
        self.request.as_ref()
    }

    /// Replaces the request.
    ///
    /// A stored error is kept.
    pub fn set_request(mut self, request: RequestDescriptor) -> Self {
        self.request = Some(request);
        self
    }

    /// Returns the transport, if one was injected or already built.
    pub fn transport(&self) -> Option<&reqwest::Client> {
        self.transport.as_ref()
    }

    /// Injects the `reqwest::Client` used to send the request.
    ///
    /// An injected transport keeps its own redirect policy;
    /// [`follow_redirects`](Client::follow_redirects) only shapes the
    /// transport this client builds for itself.
    pub fn set_transport(mut self, transport: reqwest::Client) -> Self {
        if !self.follow_redirects {
            tracing::warn!("Injected transport keeps its own redirect policy");
        }
        self.transport = Some(transport);
        self.owns_transport = false;
        self
    }

    /// Returns the sticky error, if any step has failed.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the status of the last response, or `None` if none was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the numeric status of the last response, or `-1` if none was received.
    pub fn status_code(&self) -> i32 {
        self.status.map_or(-1, |s| i32::from(s.as_u16()))
    }

    pub fn follows_redirects(&self) -> bool {
        self.follow_redirects
    }

    /// Converts the chain into a `Result`, yielding the sticky error if one is set.
    ///
    /// ```
    /// use httpchain::{body, Client, Error};
    ///
    /// let result = Client::post("http://localhost/post", body!["a", 1i16]).into_result();
    /// assert!(matches!(result, Err(Error::UnsupportedValueType("i16"))));
    /// ```
    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }

    /// Returns `true` if configuration may proceed.
    ///
    /// A stored error wins; otherwise a missing request becomes the stored error.
    fn ensure_request(&mut self) -> bool {
        if let Some(e) = &self.error {
            tracing::debug!(error = %e, "Skipping configuration on failed request");
            return false;
        }
        if self.request.is_none() {
            self.error = Some(Error::NoRequest);
            return false;
        }
        true
    }

    fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut RequestDescriptor) -> Result<()>,
    {
        if !self.ensure_request() {
            return self;
        }
        if let Some(request) = self.request.as_mut() {
            if let Err(e) = f(request) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Adds a header. Existing values for the same name are kept.
    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.configure(|request| {
            let (name, value) = header_pair(key, value)?;
            request.headers.append(name, value);
            Ok(())
        })
    }

    /// Adds several headers.
    ///
    /// Either every header is added or, if one is invalid, none are.
    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.configure(|request| {
            let parsed = headers
                .into_iter()
                .map(|(key, value)| header_pair(key, value))
                .collect::<Result<Vec<_>>>()?;
            for (name, value) in parsed {
                request.headers.append(name, value);
            }
            Ok(())
        })
    }

    /// Adds a `User-Agent` header.
    pub fn user_agent<V>(self, value: V) -> Self
    where
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.header(USER_AGENT, value)
    }

    /// Sets HTTP basic authentication, replacing any `Authorization` header.
    pub fn basic_auth(self, username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        self.configure(|request| {
            let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            let mut value = HeaderValue::try_from(format!("Basic {}", encoded))
                .map_err(|e| Error::InvalidHeader(e.to_string()))?;
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
            Ok(())
        })
    }

    /// Adds a cookie to the `Cookie` header.
    ///
    /// Only the name and value are sent; attributes such as `Domain` or
    /// `Expires` belong to `Set-Cookie` and are dropped.
    pub fn cookie(self, cookie: Cookie<'_>) -> Self {
        self.configure(|request| add_cookie(&mut request.headers, &cookie))
    }

    /// Adds several cookies to the `Cookie` header.
    pub fn cookies<'c>(self, cookies: impl IntoIterator<Item = Cookie<'c>>) -> Self {
        self.configure(|request| {
            for cookie in cookies {
                add_cookie(&mut request.headers, &cookie)?;
            }
            Ok(())
        })
    }

    /// Chooses whether redirects are followed. Defaults to `true`.
    ///
    /// When disabled, the first redirect response is returned as-is so its
    /// status and `Location` can be read. An injected transport keeps its own
    /// policy, so disabling has no effect there beyond a warning.
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        if !self.ensure_request() {
            return self;
        }
        if !follow && self.transport.is_some() && !self.owns_transport {
            tracing::warn!("Injected transport keeps its own redirect policy");
        }
        if self.follow_redirects != follow && self.owns_transport {
            self.transport = None;
            self.owns_transport = false;
        }
        self.follow_redirects = follow;
        self
    }

    /// Sends the request.
    ///
    /// Returns the stored error without any network activity if an earlier
    /// step failed. Transport errors are stored and returned; they also reset
    /// the status to "no response". Sending again re-sends the same request.
    ///
    /// With following disabled, a transport that refuses the redirect itself
    /// yields [`Error::Network`] for that send only; it is not stored.
    ///
    /// # Errors
    ///
    /// * [`Error::NoRequest`] if there is no request
    /// * [`Error::BodyConsumed`] if a streaming body was already sent
    /// * [`Error::Network`] for transport failures
    /// * the stored error, if any
    pub async fn send(&mut self) -> Result<reqwest::Response> {
        let (response, _latency) = self.execute().await?;
        Ok(response)
    }

    /// Sends the request and decodes the response.
    ///
    /// A send failure returns before the decoder runs. Decoder errors are
    /// returned unchanged and do not become the stored error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use httpchain::{Client, Json};
    /// use std::collections::HashMap;
    ///
    /// # async fn example() -> Result<(), httpchain::Error> {
    /// let mut client = Client::get("https://httpbin.org/cookies");
    /// let cookies: HashMap<String, serde_json::Value> = client.send_and_decode(Json).await?.data;
    /// # let _ = cookies;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send_and_decode<T, D>(&mut self, decoder: D) -> Result<Response<T>>
    where
        D: Decoder<T>,
    {
        let (response, latency) = self.execute().await?;
        let status = response.status();
        let headers = response.headers().clone();

        let data = decoder.decode(response).await.map_err(|e| {
            tracing::warn!(error = %e, status = status.as_u16(), "Failed to decode response");
            e
        })?;

        Ok(Response::new(data, status, headers, latency))
    }

    async fn execute(&mut self) -> Result<(reqwest::Response, Duration)> {
        if let Some(e) = &self.error {
            tracing::debug!(error = %e, "Skipping send on failed request");
            return Err(e.clone());
        }
        if self.request.is_none() {
            return Err(self.fail(Error::NoRequest));
        }

        let follow_redirects = self.follow_redirects;
        let transport = match self.ensure_transport() {
            Ok(transport) => transport,
            Err(e) => return Err(self.fail(e)),
        };

        let prepared = match self.request.as_mut() {
            Some(request) => request.payload.take_for_send().map(|body| {
                let mut builder = transport
                    .request(request.method.clone(), request.url.clone())
                    .headers(request.headers.clone());
                if let Some(body) = body {
                    builder = builder.body(body);
                }

                tracing::debug!(
                    method = %request.method,
                    url = %request.url,
                    follow_redirects = follow_redirects,
                    "Executing HTTP request"
                );

                builder
            }),
            None => Err(Error::NoRequest),
        };
        let builder = match prepared {
            Ok(builder) => builder,
            Err(e) => return Err(self.fail(e)),
        };

        let start_time = Instant::now();
        match builder.send().await {
            Ok(response) => {
                let latency = start_time.elapsed();
                let status = response.status();
                self.status = Some(status);

                tracing::info!(
                    status = status.as_u16(),
                    latency_ms = latency.as_millis(),
                    "Received HTTP response"
                );

                if status.is_redirection() && !follow_redirects {
                    tracing::debug!(
                        location = response
                            .headers()
                            .get(http::header::LOCATION)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default(),
                        "Redirect not followed"
                    );
                }

                Ok((response, latency))
            }
            Err(e) => {
                self.status = None;
                if !follow_redirects && e.is_redirect() {
                    tracing::debug!(error = %e, "Redirect blocked by transport");
                    return Err(e.into());
                }
                tracing::warn!(error = %e, "Request failed");
                Err(self.fail(e.into()))
            }
        }
    }

    /// Returns the transport, building and caching one if none is set.
    fn ensure_transport(&mut self) -> Result<reqwest::Client> {
        if let Some(transport) = &self.transport {
            return Ok(transport.clone());
        }

        let policy = if self.follow_redirects {
            reqwest::redirect::Policy::default()
        } else {
            reqwest::redirect::Policy::none()
        };
        let transport = reqwest::Client::builder().redirect(policy).build()?;

        self.transport = Some(transport.clone());
        self.owns_transport = true;
        Ok(transport)
    }

    fn fail(&mut self, e: Error) -> Error {
        self.error = Some(e.clone());
        e
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

fn header_pair<K, V>(key: K, value: V) -> Result<(HeaderName, HeaderValue)>
where
    HeaderName: TryFrom<K>,
    <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
    HeaderValue: TryFrom<V>,
    <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
{
    let name = HeaderName::try_from(key).map_err(|e| {
        let e: http::Error = e.into();
        Error::InvalidHeader(format!("Invalid header name: {}", e))
    })?;
    let value = HeaderValue::try_from(value).map_err(|e| {
        let e: http::Error = e.into();
        Error::InvalidHeader(format!("Invalid header value: {}", e))
    })?;
    Ok((name, value))
}

/// Appends `name=value` to the single `Cookie` header, separated by `; `.
fn add_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> Result<()> {
    let pair = format!("{}={}", cookie.name(), cookie.value());
    let value = match headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.is_empty() => format!("{}; {}", existing, pair),
        _ => pair,
    };
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::InvalidHeader(format!("Invalid cookie: {}", e)))?;
    headers.insert(COOKIE, value);
    Ok(())
}
