//! Request body arguments and their one-time resolution into a payload.
//!
//! A [`Body`] describes what the caller handed to a verb constructor. It is
//! resolved exactly once, when the request is built, into a [`Payload`] plus
//! an optional content type. Encoding errors surface there, before any
//! network activity.

use crate::{Error, FormValues, Result, Value};
use bytes::Bytes;
use std::collections::HashMap;

/// `Content-Type` for form-encoded bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A request body argument.
///
/// Use the `From` conversions or the [`body!`](crate::body) macro:
///
/// ```
/// use httpchain::{body, Body, FormValues};
/// use std::collections::HashMap;
///
/// let empty: Body = ().into();
/// let pairs = body!["name", "alice", "age", 30];
/// let form: Body = FormValues::from_iter([("q", "rust")]).into();
/// let map: Body = HashMap::from([("flag".to_string(), true.into())]).into();
/// let raw = Body::stream("raw bytes");
/// # let _ = (empty, pairs, form, map, raw);
/// ```
#[derive(Debug, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Bytes sent verbatim. The content type is left to the caller.
    Stream(reqwest::Body),
    /// Ordered form values, form encoded.
    Form(FormValues),
    /// A map of scalar values, form encoded.
    Map(HashMap<String, Value>),
    /// Alternating keys and values: `key1, value1, key2, value2, ...`.
    Pairs(Vec<Value>),
}

impl Body {
    /// Wraps anything `reqwest` accepts as a body.
    pub fn stream(body: impl Into<reqwest::Body>) -> Self {
        Body::Stream(body.into())
    }

    /// Resolves the argument into a payload and its content type.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgumentShape`] for a lone pair item or a non-string key
    /// * [`Error::InvalidArgumentCount`] for an odd number of pair items
    /// * [`Error::UnsupportedValueType`] for the first value with no encoding
    pub fn resolve(self) -> Result<(Payload, Option<&'static str>)> {
        match self {
            Body::Empty => Ok((Payload::Empty, None)),
            Body::Stream(body) => Ok((Payload::from(body), None)),
            Body::Form(values) => form_payload(&values),
            Body::Map(map) => {
                let mut values = FormValues::new();
                for (key, value) in map {
                    values.add(key, value.encode()?);
                }
                form_payload(&values)
            }
            Body::Pairs(items) => resolve_pairs(items),
        }
    }
}

fn resolve_pairs(items: Vec<Value>) -> Result<(Payload, Option<&'static str>)> {
    match items.len() {
        0 => Ok((Payload::Empty, None)),
        1 => Err(Error::InvalidArgumentShape(items[0].type_name().to_string())),
        n if n % 2 != 0 => Err(Error::InvalidArgumentCount {
            expected: n + 1,
            actual: n,
        }),
        _ => {
            let mut values = FormValues::new();
            let mut iter = items.into_iter();
            while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                let key = match key {
                    Value::Str(key) => key,
                    other => {
                        return Err(Error::InvalidArgumentShape(format!(
                            "key must be a string, got {}",
                            other.type_name()
                        )));
                    }
                };
                values.add(key, value.encode()?);
            }
            form_payload(&values)
        }
    }
}

fn form_payload(values: &FormValues) -> Result<(Payload, Option<&'static str>)> {
    let encoded = values.encode()?;
    Ok((
        Payload::Bytes(Bytes::from(encoded)),
        Some(FORM_CONTENT_TYPE),
    ))
}

impl From<()> for Body {
    fn from(_: ()) -> Self {
        Body::Empty
    }
}

impl From<FormValues> for Body {
    fn from(values: FormValues) -> Self {
        Body::Form(values)
    }
}

impl From<HashMap<String, Value>> for Body {
    fn from(map: HashMap<String, Value>) -> Self {
        Body::Map(map)
    }
}

impl From<Vec<Value>> for Body {
    fn from(items: Vec<Value>) -> Self {
        Body::Pairs(items)
    }
}

impl From<reqwest::Body> for Body {
    fn from(body: reqwest::Body) -> Self {
        Body::Stream(body)
    }
}

/// Builds a [`Body::Pairs`] from alternating keys and values.
///
/// ```
/// use httpchain::{body, Body};
///
/// let body = body!["a", 1, "b", "x"];
/// assert!(matches!(body, Body::Pairs(ref items) if items.len() == 4));
///
/// let empty = body![];
/// assert!(matches!(empty, Body::Pairs(ref items) if items.is_empty()));
/// ```
#[macro_export]
macro_rules! body {
    () => {
        $crate::Body::Pairs(::std::vec::Vec::new())
    };
    ($($item:expr),+ $(,)?) => {
        $crate::Body::Pairs(::std::vec![$($crate::Value::from($item)),+])
    };
}

/// A resolved request body.
#[derive(Debug)]
pub enum Payload {
    /// No body.
    Empty,
    /// Buffered bytes; can be sent any number of times.
    Bytes(Bytes),
    /// A one-shot stream; `None` once it has been sent.
    Stream(Option<reqwest::Body>),
}

impl Payload {
    /// Returns the buffered bytes, if the payload is buffered.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Produces a body for one send. Streams are handed out only once.
    pub(crate) fn take_for_send(&mut self) -> Result<Option<reqwest::Body>> {
        match self {
            Payload::Empty => Ok(None),
            Payload::Bytes(bytes) => Ok(Some(reqwest::Body::from(bytes.clone()))),
            Payload::Stream(stream) => stream.take().map(Some).ok_or(Error::BodyConsumed),
        }
    }
}

impl From<reqwest::Body> for Payload {
    fn from(body: reqwest::Body) -> Self {
        match body.as_bytes() {
            Some(bytes) => Payload::Bytes(Bytes::copy_from_slice(bytes)),
            None => Payload::Stream(Some(body)),
        }
    }
}
