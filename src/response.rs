//! Decoded response wrapper.
//!
//! [`Response`] pairs the value a [`Decoder`](crate::Decoder) produced with the
//! status, headers and latency of the request that fetched it.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A decoded HTTP response.
///
/// # Type Parameters
///
/// * `T` - The type the decoder produced
///
/// # Examples
///
/// ```no_run
/// use httpchain::{Client, Json};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct UserAgent {
///     #[serde(rename = "user-agent")]
///     name: String,
/// }
///
/// # async fn example() -> Result<(), httpchain::Error> {
/// let mut client = Client::get("https://httpbin.org/user-agent").user_agent("httpchain");
/// let response = client.send_and_decode::<UserAgent, _>(Json).await?;
///
/// println!("Agent: {}", response.data.name);
/// println!("Request took {:?}", response.latency);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded data.
    pub data: T,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from sending the request until the response headers arrived.
    pub latency: Duration,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(data: T, status: StatusCode, headers: HeaderMap, latency: Duration) -> Self {
        Self {
            data,
            status,
            headers,
            latency,
        }
    }

    /// Maps the data to a different type, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use httpchain::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let latency = Duration::from_millis(5);
    /// let response = Response::new(42, StatusCode::OK, HeaderMap::new(), latency);
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
            latency: self.latency,
        }
    }

    /// Returns a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use httpchain::Response;
    /// # use http::{HeaderMap, HeaderValue, StatusCode};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert("location", HeaderValue::from_static("/next"));
    ///
    /// let response = Response::new((), StatusCode::FOUND, headers, Duration::ZERO);
    /// assert_eq!(response.header("location"), Some("/next"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
