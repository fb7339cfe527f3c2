//! Coercion rules
//!
//! The pure value → declared-type conversion table. The resolver uses it
//! twice: to score candidate signatures and to produce the final argument
//! values. Nothing here has side effects.
//!
//! | target      | accepted inputs                                             |
//! |-------------|-------------------------------------------------------------|
//! | integer     | integer-valued number, base-10 text within the width        |
//! | float       | any number, decimal text                                    |
//! | boolean     | boolean, true/false literal text (case-insensitive)         |
//! | char        | single-character text                                       |
//! | text        | any representable value                                     |
//! | list[T]     | any list; elements coerced to T, one level deep only        |
//! | mapping     | any mapping, values pass through                            |
//! | any         | anything, unchanged                                         |
//!
//! A value that already is an instance of the target kind is always an
//! exact match and is returned unchanged.

use std::num::IntErrorKind;

use keyway_sdk::{FloatWidth, IntWidth, KwValue, TypeKind};
use thiserror::Error;

/// Default literals accepted as `true`
pub const DEFAULT_TRUE_STRINGS: &[&str] = &["TRUE"];

/// Default literals accepted as `false`
pub const DEFAULT_FALSE_STRINGS: &[&str] = &["FALSE"];

static ANY_SEQUENCE: TypeKind = TypeKind::Sequence(None);

/// How well a value matched a declared type.
///
/// Ordered so that `Exact > Converted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchRank {
    /// The value had to be converted
    Converted,
    /// The value already was an instance of the declared type
    Exact,
}

/// Successful coercion result
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    /// Value in the declared type
    pub value: KwValue,
    /// Match quality
    pub rank: MatchRank,
}

impl Coerced {
    fn exact(value: KwValue) -> Self {
        Coerced {
            value,
            rank: MatchRank::Exact,
        }
    }

    fn converted(value: KwValue) -> Self {
        Coerced {
            value,
            rank: MatchRank::Converted,
        }
    }
}

/// Reasons a value cannot be coerced
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoercionError {
    /// The value's type is not accepted by the target
    #[error("{actual} cannot be converted to {expected}")]
    Incompatible {
        /// Declared type
        expected: String,
        /// Actual value type
        actual: String,
    },

    /// Text that does not parse as the target
    #[error("'{text}' is not a valid {expected}")]
    Unparseable {
        /// Declared type
        expected: String,
        /// Offending text
        text: String,
    },

    /// Numeric value outside the declared width, or lossy
    #[error("{value} is out of range for {expected}")]
    OutOfRange {
        /// Declared type
        expected: String,
        /// Offending value
        value: String,
    },

    /// A list element failed
    #[error("item {index}: {source}")]
    Element {
        /// Zero-based element index
        index: usize,
        /// Element failure
        source: Box<CoercionError>,
    },

    /// Value has no text representation
    #[error("{type_name} cannot be represented as text: {reason}")]
    Unrepresentable {
        /// Value type
        type_name: String,
        /// Representation failure
        reason: String,
    },
}

/// The coercion table, parameterized by the accepted boolean literals.
#[derive(Debug, Clone)]
pub struct CoercionRules {
    true_strings: Vec<String>,
    false_strings: Vec<String>,
}

impl Default for CoercionRules {
    fn default() -> Self {
        CoercionRules::with_literals(DEFAULT_TRUE_STRINGS, DEFAULT_FALSE_STRINGS)
    }
}

impl CoercionRules {
    /// Rules with the default literals
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules with custom boolean literals (compared case-insensitively)
    pub fn with_literals<S: AsRef<str>>(true_strings: &[S], false_strings: &[S]) -> Self {
        CoercionRules {
            true_strings: true_strings.iter().map(|s| s.as_ref().to_uppercase()).collect(),
            false_strings: false_strings.iter().map(|s| s.as_ref().to_uppercase()).collect(),
        }
    }

    /// Check whether `value` already is an instance of `target`
    pub fn is_exact(&self, value: &KwValue, target: &TypeKind) -> bool {
        match (target, value) {
            (TypeKind::Any, _) => true,
            (TypeKind::Integer(width), KwValue::Int(i)) => width.contains(*i),
            (TypeKind::Float(FloatWidth::Double), KwValue::Float(_)) => true,
            (TypeKind::Float(FloatWidth::Single), KwValue::Float(f)) => fits_single(*f),
            (TypeKind::Boolean, KwValue::Bool(_)) => true,
            (TypeKind::Char, KwValue::Char(_)) => true,
            (TypeKind::Text, KwValue::Text(_)) => true,
            (TypeKind::Sequence(None), KwValue::List(_)) => true,
            (TypeKind::Sequence(Some(elem)), KwValue::List(items)) => {
                let elem = shallow(elem);
                items.iter().all(|item| self.is_exact(item, elem))
            }
            (TypeKind::Mapping, KwValue::Map(_)) => true,
            _ => false,
        }
    }

    /// Coerce `value` into `target`.
    pub fn coerce(&self, value: &KwValue, target: &TypeKind) -> Result<Coerced, CoercionError> {
        if self.is_exact(value, target) {
            return Ok(Coerced::exact(value.clone()));
        }
        let converted = match target {
            TypeKind::Integer(width) => coerce_integer(value, *width, target)?,
            TypeKind::Float(width) => coerce_float(value, *width, target)?,
            TypeKind::Boolean => self.coerce_boolean(value, target)?,
            TypeKind::Char => coerce_char(value, target)?,
            TypeKind::Text => coerce_text(value)?,
            TypeKind::Sequence(elem) => self.coerce_sequence(value, elem.as_deref(), target)?,
            TypeKind::Mapping | TypeKind::Any => return Err(incompatible(value, target)),
        };
        Ok(Coerced::converted(converted))
    }

    /// Parse a boolean literal
    pub fn parse_bool(&self, text: &str) -> Option<bool> {
        let upper = text.to_uppercase();
        if self.true_strings.contains(&upper) {
            Some(true)
        } else if self.false_strings.contains(&upper) {
            Some(false)
        } else {
            None
        }
    }

    fn coerce_boolean(&self, value: &KwValue, target: &TypeKind) -> Result<KwValue, CoercionError> {
        match value {
            KwValue::Text(s) => self
                .parse_bool(s)
                .map(KwValue::Bool)
                .ok_or_else(|| unparseable(s, target)),
            _ => Err(incompatible(value, target)),
        }
    }

    fn coerce_sequence(
        &self,
        value: &KwValue,
        elem: Option<&TypeKind>,
        target: &TypeKind,
    ) -> Result<KwValue, CoercionError> {
        let items = match value {
            KwValue::List(items) => items,
            _ => return Err(incompatible(value, target)),
        };
        let Some(elem) = elem else {
            return Ok(value.clone());
        };
        let elem = shallow(elem);
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let coerced = self
                .coerce(item, elem)
                .map_err(|e| CoercionError::Element {
                    index,
                    source: Box::new(e),
                })?;
            out.push(coerced.value);
        }
        Ok(KwValue::List(out))
    }
}

// Element types are only applied one level deep.
fn shallow(elem: &TypeKind) -> &TypeKind {
    match elem {
        TypeKind::Sequence(Some(_)) => &ANY_SEQUENCE,
        other => other,
    }
}

fn fits_single(f: f64) -> bool {
    !f.is_finite() || f.abs() <= f32::MAX as f64
}

fn incompatible(value: &KwValue, target: &TypeKind) -> CoercionError {
    CoercionError::Incompatible {
        expected: target.to_string(),
        actual: value.type_name().to_string(),
    }
}

fn unparseable(text: &str, target: &TypeKind) -> CoercionError {
    CoercionError::Unparseable {
        expected: target.to_string(),
        text: text.to_string(),
    }
}

fn out_of_range(value: impl ToString, target: &TypeKind) -> CoercionError {
    CoercionError::OutOfRange {
        expected: target.to_string(),
        value: value.to_string(),
    }
}

fn coerce_integer(value: &KwValue, width: IntWidth, target: &TypeKind) -> Result<KwValue, CoercionError> {
    let (min, max) = width.bounds();
    match value {
        // Not exact, so outside the width
        KwValue::Int(i) => Err(out_of_range(i, target)),
        KwValue::Float(f) => {
            if f.is_finite() && f.fract() == 0.0 && *f >= min as f64 && *f <= max as f64 {
                Ok(KwValue::Int(*f as i64))
            } else {
                Err(out_of_range(format!("{:?}", f), target))
            }
        }
        KwValue::Text(s) => match s.parse::<i64>() {
            Ok(i) if width.contains(i) => Ok(KwValue::Int(i)),
            Ok(i) => Err(out_of_range(i, target)),
            Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
                Err(out_of_range(s, target))
            }
            Err(_) => Err(unparseable(s, target)),
        },
        _ => Err(incompatible(value, target)),
    }
}

fn coerce_float(value: &KwValue, width: FloatWidth, target: &TypeKind) -> Result<KwValue, CoercionError> {
    let f = match value {
        KwValue::Int(i) => *i as f64,
        KwValue::Float(f) => *f,
        KwValue::Text(s) => match s.parse::<f64>() {
            Ok(f) if f.is_finite() => f,
            _ => return Err(unparseable(s, target)),
        },
        _ => return Err(incompatible(value, target)),
    };
    if width == FloatWidth::Single && !fits_single(f) {
        return Err(out_of_range(format!("{:?}", f), target));
    }
    Ok(KwValue::Float(f))
}

fn coerce_char(value: &KwValue, target: &TypeKind) -> Result<KwValue, CoercionError> {
    match value {
        KwValue::Text(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(KwValue::Char(c)),
                _ => Err(unparseable(s, target)),
            }
        }
        _ => Err(incompatible(value, target)),
    }
}

fn coerce_text(value: &KwValue) -> Result<KwValue, CoercionError> {
    value
        .repr()
        .map(KwValue::Text)
        .map_err(|reason| CoercionError::Unrepresentable {
            type_name: value.type_name().to_string(),
            reason,
        })
}
