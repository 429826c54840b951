//! Typed extraction of result values.
//!
//! Backends hand back storage-class values (an SQLite INTEGER column arrives
//! as [`Value::BigInt`] whatever width it was bound with), so the integer
//! conversions here accept any integer variant and range-check it.
//!
//! Non-optional targets reject NULL. Use `Option<T>` to read a nullable
//! column: NULL becomes `None`, never a zero or empty default.

use crate::error::ReadError;
use crate::value::{Value, system_time_from_secs};
use std::time::SystemTime;

/// Result of a conversion from a [`Value`].
pub type ConvertResult<T> = std::result::Result<T, ReadError>;

/// Trait for converting from a `Value` to a typed value.
pub trait FromValue: Sized {
    /// Convert from a Value, returning an error if the conversion fails.
    fn from_value(value: &Value) -> ConvertResult<Self>;
}

fn mismatch(expected: &'static str, value: &Value) -> ReadError {
    ReadError::type_mismatch(expected, value.type_name())
}

fn integer<T: TryFrom<i64>>(expected: &'static str, value: &Value) -> ConvertResult<T> {
    let v = value.as_i64().ok_or_else(|| mismatch(expected, value))?;
    T::try_from(v).map_err(|_| ReadError::type_mismatch(expected, format!("value {v} out of range")))
}

impl FromValue for bool {
    fn from_value(value: &Value) -> ConvertResult<Self> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> ConvertResult<Self> {
                    integer(stringify!($ty), value)
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl FromValue for u64 {
    fn from_value(value: &Value) -> ConvertResult<Self> {
        match value {
            Value::UBigInt(v) => Ok(*v),
            _ => integer("u64", value),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> ConvertResult<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", value))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> ConvertResult<Self> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> ConvertResult<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch("Vec<u8>", value))
    }
}

impl FromValue for SystemTime {
    fn from_value(value: &Value) -> ConvertResult<Self> {
        let secs = match value {
            Value::Timestamp(secs) | Value::BigInt(secs) => *secs,
            _ => integer("SystemTime", value)?,
        };
        system_time_from_secs(secs).ok_or_else(|| {
            ReadError::type_mismatch("SystemTime", format!("{secs} seconds out of range"))
        })
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> ConvertResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> ConvertResult<Self> {
        Ok(value.clone())
    }
}
