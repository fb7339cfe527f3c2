//! Declared parameter types
//!
//! A keyword's parameters declare one of a small set of type kinds. The
//! engine's coercion rules convert caller values into these kinds; the SDK
//! only describes them.

use std::fmt;

use crate::value::KwValue;

// ============================================================================
// Numeric widths
// ============================================================================

/// Width of a declared integer parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// 8-bit signed
    Byte,
    /// 16-bit signed
    Short,
    /// 32-bit signed
    Int,
    /// 64-bit signed
    Long,
}

impl IntWidth {
    /// Inclusive bounds of this width
    pub const fn bounds(self) -> (i64, i64) {
        match self {
            IntWidth::Byte => (i8::MIN as i64, i8::MAX as i64),
            IntWidth::Short => (i16::MIN as i64, i16::MAX as i64),
            IntWidth::Int => (i32::MIN as i64, i32::MAX as i64),
            IntWidth::Long => (i64::MIN, i64::MAX),
        }
    }

    /// Check whether `value` fits in this width
    pub const fn contains(self, value: i64) -> bool {
        let (min, max) = self.bounds();
        value >= min && value <= max
    }
}

/// Width of a declared floating point parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    /// 32-bit float
    Single,
    /// 64-bit float
    Double,
}

// ============================================================================
// TypeKind
// ============================================================================

/// Declared type of a parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Integer family
    Integer(IntWidth),
    /// Floating family
    Float(FloatWidth),
    /// Boolean
    Boolean,
    /// Single character
    Char,
    /// Text
    Text,
    /// Ordered sequence, optionally with a declared element type
    Sequence(Option<Box<TypeKind>>),
    /// Key/value mapping
    Mapping,
    /// Opaque / any value
    Any,
}

impl TypeKind {
    /// 32-bit integer, the most common integer declaration
    pub const INT: TypeKind = TypeKind::Integer(IntWidth::Int);

    /// 64-bit float
    pub const DOUBLE: TypeKind = TypeKind::Float(FloatWidth::Double);

    /// Sequence with a declared element type
    pub fn sequence_of(element: TypeKind) -> Self {
        TypeKind::Sequence(Some(Box::new(element)))
    }

    /// Sequence without element type
    pub fn sequence() -> Self {
        TypeKind::Sequence(None)
    }

    /// Whether this is a sequence kind
    pub fn is_sequence(&self) -> bool {
        matches!(self, TypeKind::Sequence(_))
    }

    /// Whether this is the mapping kind
    pub fn is_mapping(&self) -> bool {
        matches!(self, TypeKind::Mapping)
    }

    /// Declared element type of a sequence kind
    pub fn element(&self) -> Option<&TypeKind> {
        match self {
            TypeKind::Sequence(Some(elem)) => Some(elem),
            _ => None,
        }
    }

    /// Parse a textual type name as used by dynamic libraries.
    ///
    /// Accepts `int`, `long`, `float`, `bool`, `str`, `list[int]`, `int[]`
    /// and similar spellings, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Some(inner) = name.strip_suffix("[]") {
            return TypeKind::parse(inner).map(TypeKind::sequence_of);
        }
        if let Some(open) = name.find('[') {
            let (base, rest) = name.split_at(open);
            let inner = rest.strip_prefix('[')?.strip_suffix(']')?;
            return match base.trim().to_ascii_lowercase().as_str() {
                "list" | "sequence" | "array" => TypeKind::parse(inner).map(TypeKind::sequence_of),
                _ => None,
            };
        }
        let kind = match name.to_ascii_lowercase().as_str() {
            "byte" => TypeKind::Integer(IntWidth::Byte),
            "short" => TypeKind::Integer(IntWidth::Short),
            "int" | "integer" => TypeKind::Integer(IntWidth::Int),
            "long" => TypeKind::Integer(IntWidth::Long),
            "float" | "single" => TypeKind::Float(FloatWidth::Single),
            "double" => TypeKind::Float(FloatWidth::Double),
            "bool" | "boolean" => TypeKind::Boolean,
            "char" | "character" => TypeKind::Char,
            "str" | "string" | "text" => TypeKind::Text,
            "list" | "sequence" | "array" => TypeKind::Sequence(None),
            "dict" | "map" | "mapping" => TypeKind::Mapping,
            "any" | "object" => TypeKind::Any,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Integer(IntWidth::Byte) => write!(f, "byte"),
            TypeKind::Integer(IntWidth::Short) => write!(f, "short"),
            TypeKind::Integer(IntWidth::Int) => write!(f, "int"),
            TypeKind::Integer(IntWidth::Long) => write!(f, "long"),
            TypeKind::Float(FloatWidth::Single) => write!(f, "float"),
            TypeKind::Float(FloatWidth::Double) => write!(f, "double"),
            TypeKind::Boolean => write!(f, "boolean"),
            TypeKind::Char => write!(f, "char"),
            TypeKind::Text => write!(f, "text"),
            TypeKind::Sequence(None) => write!(f, "list"),
            TypeKind::Sequence(Some(elem)) => write!(f, "list[{}]", elem),
            TypeKind::Mapping => write!(f, "mapping"),
            TypeKind::Any => write!(f, "any"),
        }
    }
}

// ============================================================================
// Parameter declarations
// ============================================================================

/// A declared parameter: name, type and optional default value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub kind: TypeKind,
    /// Default value; a parameter with a default is optional
    pub default: Option<KwValue>,
}

impl ParamDecl {
    /// Create a required parameter
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        ParamDecl {
            name: name.into(),
            kind,
            default: None,
        }
    }

    /// Attach a default value, making the parameter optional
    pub fn with_default(mut self, default: impl Into<KwValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Whether the caller must supply this parameter
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl fmt::Display for ParamDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "{}: {}={}", self.name, self.kind, default),
            None => write!(f, "{}: {}", self.name, self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_width_bounds() {
        assert!(IntWidth::Byte.contains(127));
        assert!(!IntWidth::Byte.contains(128));
        assert!(IntWidth::Short.contains(-32768));
        assert!(!IntWidth::Int.contains(i32::MAX as i64 + 1));
        assert!(IntWidth::Long.contains(i64::MIN));
    }

    #[test]
    fn test_parse_type_names() {
        assert_eq!(TypeKind::parse("int"), Some(TypeKind::INT));
        assert_eq!(TypeKind::parse("Boolean"), Some(TypeKind::Boolean));
        assert_eq!(TypeKind::parse("str"), Some(TypeKind::Text));
        assert_eq!(TypeKind::parse("dict"), Some(TypeKind::Mapping));
        assert_eq!(TypeKind::parse("list"), Some(TypeKind::sequence()));
        assert_eq!(
            TypeKind::parse("list[int]"),
            Some(TypeKind::sequence_of(TypeKind::INT))
        );
        assert_eq!(
            TypeKind::parse("double[]"),
            Some(TypeKind::sequence_of(TypeKind::DOUBLE))
        );
        assert_eq!(TypeKind::parse("frobnicator"), None);
        assert_eq!(TypeKind::parse("set[int]"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(TypeKind::sequence_of(TypeKind::Text).to_string(), "list[text]");
        assert_eq!(TypeKind::Integer(IntWidth::Long).to_string(), "long");
        let p = ParamDecl::new("count", TypeKind::INT).with_default(1);
        assert_eq!(p.to_string(), "count: int=1");
        assert!(!p.is_required());
    }
}
