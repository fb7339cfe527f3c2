//! KwValue: weakly-typed values exchanged with keyword libraries
//!
//! Callers hand keywords loosely typed values (often plain text read from
//! test data). Keyword implementations receive the same representation after
//! the engine has coerced each value into the declared parameter type.
//!
//! # Variants
//!
//! ```text
//! Null            absent value, also the "void" return
//! Bool / Int      inline primitives (integers are always carried as i64)
//! Float / Char
//! Text            owned UTF-8 string
//! List            ordered sequence, elements are not coerced recursively
//! Map             string-keyed mapping, values pass through unchanged
//! Object          opaque host value with a fallible representation
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Opaque value owned by the host runtime.
///
/// The engine never inspects host objects beyond their type name. Producing a
/// user-facing representation is allowed to fail; the invoker surfaces such a
/// failure as its own error instead of reporting an empty result.
pub trait HostObject: fmt::Debug + Send + Sync {
    /// Type name shown in diagnostics
    fn type_name(&self) -> &str;

    /// User-facing representation of the object
    fn repr(&self) -> Result<String, String>;
}

/// Value passed to and returned from keywords.
#[derive(Clone, Debug, Default)]
pub enum KwValue {
    /// Absent value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (all integer widths share this carrier)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Single character
    Char(char),
    /// Text value
    Text(String),
    /// Ordered sequence
    List(Vec<KwValue>),
    /// Key/value mapping
    Map(BTreeMap<String, KwValue>),
    /// Opaque host object
    Object(Arc<dyn HostObject>),
}

impl KwValue {
    /// Create a text value
    pub fn text(s: impl Into<String>) -> Self {
        KwValue::Text(s.into())
    }

    /// Create a list value
    pub fn list(items: impl IntoIterator<Item = KwValue>) -> Self {
        KwValue::List(items.into_iter().collect())
    }

    /// Create a mapping value
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, KwValue)>) -> Self {
        KwValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Wrap a host object
    pub fn object(obj: impl HostObject + 'static) -> Self {
        KwValue::Object(Arc::new(obj))
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, KwValue::Null)
    }

    /// Get as boolean if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            KwValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as integer if this is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            KwValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as float if this is a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            KwValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as char if this is a char
    pub fn as_char(&self) -> Option<char> {
        match self {
            KwValue::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// Get as string slice if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            KwValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as slice if this is a list
    pub fn as_list(&self) -> Option<&[KwValue]> {
        match self {
            KwValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get as mapping if this is a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, KwValue>> {
        match self {
            KwValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Type name for diagnostics
    pub fn type_name(&self) -> &str {
        match self {
            KwValue::Null => "null",
            KwValue::Bool(_) => "boolean",
            KwValue::Int(_) => "integer",
            KwValue::Float(_) => "float",
            KwValue::Char(_) => "char",
            KwValue::Text(_) => "text",
            KwValue::List(_) => "list",
            KwValue::Map(_) => "mapping",
            KwValue::Object(obj) => obj.type_name(),
        }
    }

    /// User-facing representation.
    ///
    /// Fails only when a host object (possibly nested inside a list or map)
    /// cannot represent itself.
    pub fn repr(&self) -> Result<String, String> {
        match self {
            KwValue::Null => Ok("null".to_string()),
            KwValue::Bool(b) => Ok(b.to_string()),
            KwValue::Int(i) => Ok(i.to_string()),
            KwValue::Float(f) => Ok(format!("{:?}", f)),
            KwValue::Char(c) => Ok(c.to_string()),
            KwValue::Text(s) => Ok(s.clone()),
            KwValue::List(items) => {
                let parts = items.iter().map(KwValue::repr).collect::<Result<Vec<_>, _>>()?;
                Ok(format!("[{}]", parts.join(", ")))
            }
            KwValue::Map(entries) => {
                let mut parts = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    parts.push(format!("{}: {}", key, value.repr()?));
                }
                Ok(format!("{{{}}}", parts.join(", ")))
            }
            KwValue::Object(obj) => obj.repr(),
        }
    }
}

impl PartialEq for KwValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (KwValue::Null, KwValue::Null) => true,
            (KwValue::Bool(a), KwValue::Bool(b)) => a == b,
            (KwValue::Int(a), KwValue::Int(b)) => a == b,
            (KwValue::Float(a), KwValue::Float(b)) => a == b,
            (KwValue::Char(a), KwValue::Char(b)) => a == b,
            (KwValue::Text(a), KwValue::Text(b)) => a == b,
            (KwValue::List(a), KwValue::List(b)) => a == b,
            (KwValue::Map(a), KwValue::Map(b)) => a == b,
            // Host objects compare by identity
            (KwValue::Object(a), KwValue::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl fmt::Display for KwValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "<unrepresentable {}>", self.type_name()),
        }
    }
}

impl From<bool> for KwValue {
    fn from(b: bool) -> Self {
        KwValue::Bool(b)
    }
}

impl From<i32> for KwValue {
    fn from(i: i32) -> Self {
        KwValue::Int(i as i64)
    }
}

impl From<i64> for KwValue {
    fn from(i: i64) -> Self {
        KwValue::Int(i)
    }
}

impl From<f64> for KwValue {
    fn from(f: f64) -> Self {
        KwValue::Float(f)
    }
}

impl From<char> for KwValue {
    fn from(c: char) -> Self {
        KwValue::Char(c)
    }
}

impl From<&str> for KwValue {
    fn from(s: &str) -> Self {
        KwValue::Text(s.to_string())
    }
}

impl From<String> for KwValue {
    fn from(s: String) -> Self {
        KwValue::Text(s)
    }
}

impl From<Vec<KwValue>> for KwValue {
    fn from(items: Vec<KwValue>) -> Self {
        KwValue::List(items)
    }
}

impl From<BTreeMap<String, KwValue>> for KwValue {
    fn from(entries: BTreeMap<String, KwValue>) -> Self {
        KwValue::Map(entries)
    }
}
