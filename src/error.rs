//! Error types for chained HTTP requests.
//!
//! Every failure is a value. Errors raised while building a request are stored
//! on the [`Client`](crate::Client) as its sticky error and handed back by every
//! later call, so [`Error`] is `Clone`: the same error is both kept and returned.

use http::StatusCode;
use std::sync::Arc;

/// The main error type for chained HTTP requests.
///
/// # Examples
///
/// ```
/// use httpchain::{body, Client, Error};
///
/// let client = Client::post("https://api.example.com/form", body!["a", 1, "b"]);
///
/// match client.error() {
///     Some(Error::InvalidArgumentCount { expected, actual }) => {
///         assert_eq!((*expected, *actual), (4, 3));
///     }
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// A configuration or send call was made on a client without a request.
    #[error("no request")]
    NoRequest,

    /// A single body argument of a kind that cannot be turned into a body.
    ///
    /// The message names the offending value's type.
    #[error("parameters not correct {0}")]
    InvalidArgumentShape(String),

    /// A key/value body argument list with an odd number of items.
    #[error("parameters not correct, expected {expected} parameter got {actual}")]
    InvalidArgumentCount {
        /// The item count that would have been accepted
        expected: usize,
        /// The item count that was supplied
        actual: usize,
    },

    /// A body value that has no form encoding.
    #[error("unsupported type for post {0}")]
    UnsupportedValueType(&'static str),

    /// A decoder was asked to fill a target it cannot fill.
    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        /// What the decoder's target accepts
        expected: &'static str,
        /// What the response actually held
        found: String,
    },

    /// The form encoder rejected the body.
    #[error("Failed to encode form body: {0}")]
    Encoding(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header name or value could not be used.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A one-shot streaming body was already sent by an earlier call.
    #[error("request body stream was already consumed")]
    BodyConsumed,

    /// A transport-level error (connection failed, DNS lookup failed, etc.).
    ///
    /// The underlying `reqwest::Error` is surfaced as-is.
    #[error("Network error: {0}")]
    Network(#[source] Arc<reqwest::Error>),

    /// Failed to deserialize the response body into the expected type.
    ///
    /// Keeps the raw body and the serde message for debugging.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },
}

impl Error {
    /// Returns `true` if the error came from resolving the request body.
    ///
    /// These are detected at construction time, before any network activity.
    ///
    /// ```
    /// use httpchain::Error;
    ///
    /// assert!(Error::UnsupportedValueType("i16").is_encoding_error());
    /// assert!(!Error::NoRequest.is_encoding_error());
    /// ```
    pub fn is_encoding_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgumentShape(_)
                | Error::InvalidArgumentCount { .. }
                | Error::UnsupportedValueType(_)
                | Error::Encoding(_)
        )
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(Arc::new(e))
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(e: serde_urlencoded::ser::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}

/// A specialized `Result` type for chained HTTP requests.
pub type Result<T> = std::result::Result<T, Error>;
