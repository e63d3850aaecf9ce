//! Scalar values accepted in form bodies.

use crate::{Error, Result};
use std::any::type_name;

/// A single value in a key/value or map body.
///
/// Every supported Rust scalar converts into a `Value` with `From`. The
/// primitives that have no form encoding convert into
/// [`Value::Unsupported`], which carries the type name so the body encoder
/// can report it.
///
/// ```
/// use httpchain::Value;
///
/// assert_eq!(Value::from(true).encode().unwrap(), "true");
/// assert_eq!(Value::from(2.344).encode().unwrap(), "2.344000");
/// assert_eq!(Value::from(20u64).encode().unwrap(), "20");
/// assert!(Value::from(1i16).encode().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `true` / `false`.
    Bool(bool),
    /// Fixed point with six decimals. Non-finite values encode as `+Inf`,
    /// `-Inf` and `NaN`.
    Float(f64),
    /// Native-width integer.
    Int(isize),
    /// 64-bit signed integer.
    Int64(i64),
    /// A single character.
    Char(char),
    /// A literal string.
    Str(String),
    /// 64-bit unsigned integer.
    Uint64(u64),
    /// A value with no form encoding, named by its type.
    Unsupported(&'static str),
}

impl Value {
    /// Returns the string form used in a form-encoded body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedValueType`] for [`Value::Unsupported`].
    pub fn encode(&self) -> Result<String> {
        let encoded = match self {
            Value::Bool(b) => b.to_string(),
            Value::Float(f) => encode_float(*f),
            Value::Int(i) => i.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Str(s) => s.clone(),
            Value::Uint64(u) => u.to_string(),
            Value::Unsupported(ty) => return Err(Error::UnsupportedValueType(ty)),
        };
        Ok(encoded)
    }

    /// Returns the string, if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the Rust type this value was built from.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => type_name::<bool>(),
            Value::Float(_) => type_name::<f64>(),
            Value::Int(_) => type_name::<isize>(),
            Value::Int64(_) => type_name::<i64>(),
            Value::Char(_) => type_name::<char>(),
            Value::Str(_) => "string",
            Value::Uint64(_) => type_name::<u64>(),
            Value::Unsupported(ty) => ty,
        }
    }
}

fn encode_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f == f64::INFINITY {
        "+Inf".to_string()
    } else if f == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        format!("{:.6}", f)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Int(v)
    }
}

// Unsuffixed integer literals are `i32`; they count as the native int.
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as isize)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Str(v.clone())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

macro_rules! unsupported_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(_: $ty) -> Self {
                    Value::Unsupported(type_name::<$ty>())
                }
            }
        )*
    };
}

unsupported_value!(i8, i16, u8, u16, u32, usize, f32, i128, u128);
