//! Call arguments and resolved calls

use std::collections::BTreeMap;
use std::fmt;

use keyway_sdk::{Execute, KeywordFn, KwValue};

use crate::coercion::MatchRank;

/// Actual values supplied at a call site
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArguments {
    /// Positional values in order
    pub positional: Vec<KwValue>,
    /// Named values
    pub named: BTreeMap<String, KwValue>,
}

impl CallArguments {
    /// Positional-only arguments
    pub fn new(positional: impl IntoIterator<Item = KwValue>) -> Self {
        CallArguments {
            positional: positional.into_iter().collect(),
            named: BTreeMap::new(),
        }
    }

    /// Add a named value
    pub fn with_named(mut self, name: impl Into<String>, value: impl Into<KwValue>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Whether any named value was supplied
    pub fn has_named(&self) -> bool {
        !self.named.is_empty()
    }

    /// Type names of the positional values, for diagnostics
    pub fn value_types(&self) -> Vec<String> {
        self.positional
            .iter()
            .map(|v| v.type_name().to_string())
            .collect()
    }
}

impl From<Vec<KwValue>> for CallArguments {
    fn from(positional: Vec<KwValue>) -> Self {
        CallArguments::new(positional)
    }
}

/// What a resolved call executes
#[derive(Clone)]
pub enum CallTarget {
    /// A static method
    Method(KeywordFn),
    /// The dynamic execute entry point, called with the declared name
    Dynamic {
        /// Name passed to `execute`
        name: String,
        /// Entry point
        execute: Execute,
    },
    /// A constructor; arguments are validated but instances are created by
    /// the session manager
    Constructor,
}

impl fmt::Debug for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallTarget::Method(_) => write!(f, "Method(<fn>)"),
            CallTarget::Dynamic { name, execute } => f
                .debug_struct("Dynamic")
                .field("name", name)
                .field("named", &execute.supports_named())
                .finish(),
            CallTarget::Constructor => write!(f, "Constructor"),
        }
    }
}

/// A chosen signature with its arguments bound and coerced
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    /// Declared operation name
    pub operation: String,
    /// Human readable operation name
    pub printable: String,
    /// Index of the chosen signature within the operation
    pub signature: usize,
    /// Rendered chosen signature
    pub description: String,
    /// What to execute
    pub target: CallTarget,
    /// Fixed parameter values, defaults filled in
    pub fixed: Vec<KwValue>,
    /// Overflow values, `None` when the signature has no variadic parameter
    pub varargs: Option<Vec<KwValue>>,
    /// Named values, `None` when the signature has no named-args sink
    pub named: Option<BTreeMap<String, KwValue>>,
    /// Match rank of every supplied positional value
    pub ranks: Vec<MatchRank>,
}

impl ResolvedCall {
    /// Arguments in the shape a static method receives: fixed values, then
    /// the varargs as one list, then the named values as one mapping.
    pub fn packed_arguments(&self) -> Vec<KwValue> {
        let mut args = self.fixed.clone();
        if let Some(varargs) = &self.varargs {
            args.push(KwValue::List(varargs.clone()));
        }
        if let Some(named) = &self.named {
            args.push(KwValue::Map(named.clone()));
        }
        args
    }

    /// Positional values in the shape `execute` receives: fixed values
    /// followed by the varargs.
    pub fn flat_positional(&self) -> Vec<KwValue> {
        let mut args = self.fixed.clone();
        if let Some(varargs) = &self.varargs {
            args.extend(varargs.iter().cloned());
        }
        args
    }
}
