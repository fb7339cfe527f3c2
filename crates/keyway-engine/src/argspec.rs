//! Dynamic argument specs
//!
//! Parses the textual argument spec a dynamic library returns for one
//! keyword (`["name", "count=1", "*rest", "**options"]`) and turns it into
//! typed parameter declarations, optionally using the library's declared
//! argument types.

use keyway_sdk::{KwValue, ParamDecl, TypeKind};
use thiserror::Error;

use crate::coercion::{CoercionError, CoercionRules};

/// A malformed argument spec
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ArgSpecError {
    /// An entry follows `**name`
    #[error("Only last argument can be kwargs.")]
    KwargsNotLast,

    /// Two `*name` entries
    #[error("Cannot have multiple varargs.")]
    MultipleVarargs,

    /// A positional entry follows `*name`
    #[error("Positional argument after varargs.")]
    PositionalAfterVarargs,

    /// A required entry follows one with a default
    #[error("Non-default argument after default arguments.")]
    NonDefaultAfterDefault,

    /// An entry with no name
    #[error("Invalid argument \"{0}\".")]
    InvalidEntry(String),

    /// A declared type name is not recognized
    #[error("Unknown argument type '{0}'.")]
    UnknownType(String),

    /// A default value does not coerce to its declared type
    #[error("Invalid default value for argument '{name}': {source}")]
    InvalidDefault {
        /// Parameter name
        name: String,
        /// Coercion failure
        source: CoercionError,
    },
}

/// One positional entry of a spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEntry {
    /// Parameter name
    pub name: String,
    /// Default text, when given as `name=default`
    pub default: Option<String>,
}

/// A parsed argument spec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgSpec {
    /// Positional entries in order
    pub positional: Vec<SpecEntry>,
    /// `*name`
    pub varargs: Option<String>,
    /// `**name`
    pub kwargs: Option<String>,
}

/// Typed parameters built from a spec
#[derive(Debug, Clone, PartialEq)]
pub struct SpecParams {
    /// Fixed parameters with coerced defaults
    pub params: Vec<ParamDecl>,
    /// Variadic parameter, always a sequence
    pub variadic: Option<ParamDecl>,
    /// Named-args sink, always a mapping
    pub named: Option<ParamDecl>,
}

impl ArgSpec {
    /// Parse spec entries
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, ArgSpecError> {
        let mut spec = ArgSpec::default();
        for entry in entries {
            let entry = entry.as_ref();
            if spec.kwargs.is_some() {
                return Err(ArgSpecError::KwargsNotLast);
            }
            if let Some(name) = entry.strip_prefix("**") {
                spec.kwargs = Some(entry_name(name, entry)?);
            } else if let Some(name) = entry.strip_prefix('*') {
                if spec.varargs.is_some() {
                    return Err(ArgSpecError::MultipleVarargs);
                }
                spec.varargs = Some(entry_name(name, entry)?);
            } else {
                if spec.varargs.is_some() {
                    return Err(ArgSpecError::PositionalAfterVarargs);
                }
                let (name, default) = match entry.split_once('=') {
                    Some((name, default)) => (name, Some(default.to_string())),
                    None => (entry, None),
                };
                let has_defaults = spec.positional.iter().any(|e| e.default.is_some());
                if default.is_none() && has_defaults {
                    return Err(ArgSpecError::NonDefaultAfterDefault);
                }
                spec.positional.push(SpecEntry {
                    name: entry_name(name, entry)?,
                    default,
                });
            }
        }
        Ok(spec)
    }

    /// Build typed parameters.
    ///
    /// `types` lines up with the positional entries followed by the varargs
    /// entry, whose type is the element type. Missing entries mean `Any` and
    /// extra entries are ignored.
    pub fn to_params(
        &self,
        types: &[TypeKind],
        rules: &CoercionRules,
    ) -> Result<SpecParams, ArgSpecError> {
        let mut params = Vec::with_capacity(self.positional.len());
        for (i, entry) in self.positional.iter().enumerate() {
            let kind = types.get(i).cloned().unwrap_or(TypeKind::Any);
            let mut param = ParamDecl::new(&entry.name, kind);
            if let Some(text) = &entry.default {
                let coerced = rules
                    .coerce(&KwValue::text(text.as_str()), &param.kind)
                    .map_err(|source| ArgSpecError::InvalidDefault {
                        name: entry.name.clone(),
                        source,
                    })?;
                param.default = Some(coerced.value);
            }
            params.push(param);
        }
        let variadic = self.varargs.as_ref().map(|name| {
            let kind = match types.get(self.positional.len()) {
                Some(TypeKind::Any) | None => TypeKind::sequence(),
                Some(elem) => TypeKind::sequence_of(elem.clone()),
            };
            ParamDecl::new(name, kind)
        });
        let named = self
            .kwargs
            .as_ref()
            .map(|name| ParamDecl::new(name, TypeKind::Mapping));
        Ok(SpecParams {
            params,
            variadic,
            named,
        })
    }
}

/// Parse declared type names
pub fn parse_types<S: AsRef<str>>(names: &[S]) -> Result<Vec<TypeKind>, ArgSpecError> {
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            TypeKind::parse(name).ok_or_else(|| ArgSpecError::UnknownType(name.to_string()))
        })
        .collect()
}

fn entry_name(name: &str, entry: &str) -> Result<String, ArgSpecError> {
    let name = name.trim();
    if name.is_empty() || name.starts_with('*') {
        Err(ArgSpecError::InvalidEntry(entry.to_string()))
    } else {
        Ok(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_spec() {
        let spec = ArgSpec::parse(&["a", "b=2", "*rest", "**opts"]).unwrap();
        assert_eq!(spec.positional.len(), 2);
        assert_eq!(spec.positional[0].default, None);
        assert_eq!(spec.positional[1].default.as_deref(), Some("2"));
        assert_eq!(spec.varargs.as_deref(), Some("rest"));
        assert_eq!(spec.kwargs.as_deref(), Some("opts"));
    }

    #[test]
    fn test_default_splits_on_first_equals() {
        let spec = ArgSpec::parse(&["expr=a=b"]).unwrap();
        assert_eq!(spec.positional[0].name, "expr");
        assert_eq!(spec.positional[0].default.as_deref(), Some("a=b"));

        let spec = ArgSpec::parse(&["empty="]).unwrap();
        assert_eq!(spec.positional[0].default.as_deref(), Some(""));
    }

    #[test]
    fn test_grammar_violations() {
        assert_eq!(ArgSpec::parse(&["**kw", "a"]), Err(ArgSpecError::KwargsNotLast));
        assert_eq!(ArgSpec::parse(&["*a", "*b"]), Err(ArgSpecError::MultipleVarargs));
        assert_eq!(ArgSpec::parse(&["*a", "b"]), Err(ArgSpecError::PositionalAfterVarargs));
        assert_eq!(ArgSpec::parse(&["a=1", "b"]), Err(ArgSpecError::NonDefaultAfterDefault));
        assert!(matches!(ArgSpec::parse(&["*"]), Err(ArgSpecError::InvalidEntry(_))));
        assert!(matches!(ArgSpec::parse(&["***x"]), Err(ArgSpecError::InvalidEntry(_))));
        assert!(matches!(ArgSpec::parse(&[""]), Err(ArgSpecError::InvalidEntry(_))));
    }

    #[test]
    fn test_untyped_params() {
        let rules = CoercionRules::new();
        let params = ArgSpec::parse(&["a", "b=x", "*rest"])
            .unwrap()
            .to_params(&[], &rules)
            .unwrap();
        assert_eq!(params.params[0].kind, TypeKind::Any);
        assert_eq!(params.params[1].default, Some(KwValue::text("x")));
        assert_eq!(params.variadic.unwrap().kind, TypeKind::sequence());
        assert!(params.named.is_none());
    }

    #[test]
    fn test_typed_defaults_are_coerced() {
        let rules = CoercionRules::new();
        let types = parse_types(&["str", "int", "bool"]).unwrap();
        let params = ArgSpec::parse(&["name", "count=3", "*flags"])
            .unwrap()
            .to_params(&types, &rules)
            .unwrap();
        assert_eq!(params.params[1].kind, TypeKind::INT);
        assert_eq!(params.params[1].default, Some(KwValue::Int(3)));
        assert_eq!(
            params.variadic.unwrap().kind,
            TypeKind::sequence_of(TypeKind::Boolean)
        );
    }

    #[test]
    fn test_bad_default_is_reported() {
        let rules = CoercionRules::new();
        let err = ArgSpec::parse(&["count=many"])
            .unwrap()
            .to_params(&[TypeKind::INT], &rules)
            .unwrap_err();
        assert!(matches!(err, ArgSpecError::InvalidDefault { ref name, .. } if name == "count"));
    }

    #[test]
    fn test_unknown_type_name() {
        assert_eq!(
            parse_types(&["int", "frobnicator"]),
            Err(ArgSpecError::UnknownType("frobnicator".to_string()))
        );
    }
}
