//! Decoders that turn a received response into a value.
//!
//! [`Client::send_and_decode`](crate::Client::send_and_decode) accepts any
//! [`Decoder`]. Two are built in, [`Json`] and [`Text`], and any async closure
//! taking a `reqwest::Response` works too.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::future::Future;

/// Consumes a response and produces a `T`.
///
/// # Examples
///
/// ```no_run
/// use httpchain::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let mut client = Client::get("https://api.example.com/health");
///
/// let response = client
///     .send_and_decode(|resp: reqwest::Response| async move {
///         if resp.status().is_success() {
///             Ok(())
///         } else {
///             Err(Error::TypeMismatch {
///                 expected: "2xx status",
///                 found: resp.status().to_string(),
///             })
///         }
///     })
///     .await?;
/// # let _ = response;
/// # Ok(())
/// # }
/// ```
pub trait Decoder<T> {
    /// Decodes the response. Errors are returned to the caller unchanged.
    fn decode(self, response: reqwest::Response) -> impl Future<Output = Result<T>> + Send;
}

impl<T, F, Fut> Decoder<T> for F
where
    F: FnOnce(reqwest::Response) -> Fut,
    Fut: Future<Output = Result<T>> + Send,
{
    fn decode(self, response: reqwest::Response) -> impl Future<Output = Result<T>> + Send {
        self(response)
    }
}

/// Parses the response body as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl<T> Decoder<T> for Json
where
    T: DeserializeOwned,
{
    fn decode(self, response: reqwest::Response) -> impl Future<Output = Result<T>> + Send {
        async move {
            let status = response.status();
            let raw_body = response.text().await?;

            serde_json::from_str::<T>(&raw_body).map_err(|e| {
                tracing::warn!(
                    error = %e,
                    raw_response = %raw_body,
                    "Failed to deserialize response"
                );

                Error::DeserializationFailed {
                    raw_response: raw_body.clone(),
                    serde_error: e.to_string(),
                    status,
                }
            })
        }
    }
}

/// Reads the whole response body into a `String`.
///
/// The body is decoded with the `charset` of its `Content-Type`, UTF-8 when
/// none is given. Invalid sequences become `U+FFFD`, so any body decodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl Decoder<String> for Text {
    fn decode(self, response: reqwest::Response) -> impl Future<Output = Result<String>> + Send {
        async move { Ok(response.text().await?) }
    }
}
