//! # httpchain - chainable HTTP requests on top of `reqwest`
//!
//! httpchain wraps a single HTTP request in a [`Client`] whose configuration
//! methods can be chained. Bodies can be given as alternating key/value pairs,
//! a map of scalars, ordered [`FormValues`] or a raw stream; they are encoded
//! once, when the client is created.
//!
//! The first failure anywhere in a chain is kept as the client's *sticky
//! error*. Later configuration calls become no-ops and [`Client::send`] returns
//! that error without any network activity.
//!
//! ## Quick Start
//!
//! ```no_run
//! use httpchain::{body, Client, Json};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Echo {
//!     form: std::collections::HashMap<String, String>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), httpchain::Error> {
//!     let mut client = Client::post("https://httpbin.org/post", body!["name", "alice", "age", 30])
//!         .user_agent("httpchain/0.1")
//!         .header("X-Request-Id", "42");
//!
//!     let echo = client.send_and_decode::<Echo, _>(Json).await?;
//!     println!("Status {}: {:?}", client.status_code(), echo.data.form);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Sticky errors
//!
//! ```
//! use httpchain::{body, Client, Error};
//!
//! // An odd number of key/value items fails before anything is sent.
//! let client = Client::post("https://api.example.com/form", body!["a", 1, "b"])
//!     .header("X-Ignored", "1")
//!     .basic_auth("user", "passwd");
//!
//! assert!(matches!(
//!     client.error(),
//!     Some(Error::InvalidArgumentCount { expected: 4, actual: 3 })
//! ));
//! assert!(client.request().is_none());
//! ```
//!
//! ## Redirects
//!
//! ```no_run
//! use httpchain::Client;
//!
//! # async fn example() -> Result<(), httpchain::Error> {
//! let mut client = Client::get("https://example.com/old").follow_redirects(false);
//! let response = client.send().await?;
//!
//! assert!(response.status().is_redirection());
//! println!("Moved to {:?}", response.headers().get("location"));
//! # Ok(())
//! # }
//! ```

mod body;
mod client;
pub mod decode;
mod error;
mod form;
mod request;
mod response;
mod value;

pub use body::{Body, Payload, FORM_CONTENT_TYPE};
pub use client::Client;
pub use cookie::Cookie;
pub use decode::{Decoder, Json, Text};
pub use error::{Error, Result};
pub use form::FormValues;
pub use request::{RequestBuilder, RequestDescriptor};
pub use response::Response;
pub use value::Value;
