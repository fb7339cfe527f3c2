//! Traits for converting between KwValue and Rust types.
//!
//! Keyword handlers receive `&[KwValue]` that the engine has already coerced
//! to the declared parameter types, so these conversions are strict: they
//! only unwrap the expected variant and never parse text.
//!
//! # Example
//!
//! ```ignore
//! use keyway_sdk::{arg, KwResult, KwValue, ToKw};
//!
//! fn repeat(args: &[KwValue]) -> KwResult<KwValue> {
//!     let text: String = arg(args, 0)?;
//!     let times: i64 = arg(args, 1)?;
//!     Ok(text.repeat(times as usize).to_kw())
//! }
//! ```

use std::collections::BTreeMap;

use crate::error::{KeywordFailure, KwResult};
use crate::value::KwValue;

/// Convert from KwValue to a Rust type.
pub trait FromKw: Sized {
    /// Convert, returning a type-mismatch failure if the variant doesn't match.
    fn from_kw(value: &KwValue) -> KwResult<Self>;
}

/// Convert from a Rust type to KwValue.
pub trait ToKw {
    /// Convert to KwValue.
    fn to_kw(self) -> KwValue;
}

/// Extract and convert the argument at `index`.
pub fn arg<T: FromKw>(args: &[KwValue], index: usize) -> KwResult<T> {
    match args.get(index) {
        Some(value) => T::from_kw(value),
        None => Err(KeywordFailure::new(format!(
            "missing argument at position {}",
            index + 1
        ))
        .with_kind("TypeError")),
    }
}

fn mismatch(expected: &str, value: &KwValue) -> KeywordFailure {
    KeywordFailure::type_mismatch(expected, value.type_name())
}

impl FromKw for KwValue {
    fn from_kw(value: &KwValue) -> KwResult<Self> {
        Ok(value.clone())
    }
}

impl FromKw for i64 {
    fn from_kw(value: &KwValue) -> KwResult<Self> {
        value.as_int().ok_or_else(|| mismatch("integer", value))
    }
}

impl FromKw for i32 {
    fn from_kw(value: &KwValue) -> KwResult<Self> {
        let i = i64::from_kw(value)?;
        i32::try_from(i).map_err(|_| KeywordFailure::new(format!("{} does not fit in i32", i)))
    }
}

impl FromKw for f64 {
    fn from_kw(value: &KwValue) -> KwResult<Self> {
        value.as_float().ok_or_else(|| mismatch("float", value))
    }
}

impl FromKw for bool {
    fn from_kw(value: &KwValue) -> KwResult<Self> {
        value.as_bool().ok_or_else(|| mismatch("boolean", value))
    }
}

impl FromKw for char {
    fn from_kw(value: &KwValue) -> KwResult<Self> {
        value.as_char().ok_or_else(|| mismatch("char", value))
    }
}

impl FromKw for String {
    fn from_kw(value: &KwValue) -> KwResult<Self> {
        value
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| mismatch("text", value))
    }
}

impl FromKw for Vec<KwValue> {
    fn from_kw(value: &KwValue) -> KwResult<Self> {
        value
            .as_list()
            .map(<[KwValue]>::to_vec)
            .ok_or_else(|| mismatch("list", value))
    }
}

impl FromKw for BTreeMap<String, KwValue> {
    fn from_kw(value: &KwValue) -> KwResult<Self> {
        value.as_map().cloned().ok_or_else(|| mismatch("mapping", value))
    }
}

impl<T: FromKw> FromKw for Option<T> {
    fn from_kw(value: &KwValue) -> KwResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_kw(value).map(Some)
        }
    }
}

impl<T: Into<KwValue>> ToKw for T {
    fn to_kw(self) -> KwValue {
        self.into()
    }
}

// Unit type (for keywords that return nothing)
impl From<()> for KwValue {
    fn from(_: ()) -> Self {
        KwValue::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_kw_primitives() {
        assert_eq!(i64::from_kw(&KwValue::Int(42)).unwrap(), 42);
        assert_eq!(bool::from_kw(&KwValue::Bool(true)).unwrap(), true);
        assert_eq!(String::from_kw(&KwValue::text("hi")).unwrap(), "hi");
        assert!((f64::from_kw(&KwValue::Float(2.5)).unwrap() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_from_kw_is_strict() {
        let err = i64::from_kw(&KwValue::text("42")).unwrap_err();
        assert_eq!(err.kind(), "TypeError");
        assert_eq!(err.message(), "expected integer, got text");
    }

    #[test]
    fn test_i32_range() {
        assert!(i32::from_kw(&KwValue::Int(i64::MAX)).is_err());
        assert_eq!(i32::from_kw(&KwValue::Int(-5)).unwrap(), -5);
    }

    #[test]
    fn test_option_and_arg() {
        let args = vec![KwValue::Null, KwValue::Int(3)];
        assert_eq!(arg::<Option<i64>>(&args, 0).unwrap(), None);
        assert_eq!(arg::<Option<i64>>(&args, 1).unwrap(), Some(3));
        assert!(arg::<i64>(&args, 2).is_err());
    }

    #[test]
    fn test_to_kw() {
        assert_eq!(42i64.to_kw(), KwValue::Int(42));
        assert_eq!("x".to_kw(), KwValue::text("x"));
        assert!(().to_kw().is_null());
    }
}
