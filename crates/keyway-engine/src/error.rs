//! Error taxonomy
//!
//! Two tiers: resolution errors are ordinary results of choosing a
//! signature, invocation errors wrap whatever the implementation raised.
//! Catalog errors surface while a library is introspected, before any call.

use std::fmt;

use keyway_sdk::{KeywordFailure, KwValue};
use thiserror::Error;

pub use crate::argspec::ArgSpecError;
pub use crate::coercion::CoercionError;

// ============================================================================
// Catalog
// ============================================================================

/// Errors raised while building a library's catalog
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    /// A dynamic keyword declares `**kwargs` but the library's execute entry
    /// point has no named-arguments form. Only that keyword is rejected; see
    /// [`Catalog::rejected`](crate::catalog::Catalog::rejected).
    #[error(
        "keyword '{operation}' in library '{library}' accepts named arguments \
         but the library's execute entry point cannot pass them"
    )]
    NamedArgumentsUnsupported {
        /// Library name
        library: String,
        /// Offending keyword
        operation: String,
    },

    /// The name-listing entry point failed
    #[error("getting keyword names from library '{library}' failed: {reason}")]
    KeywordNamesUnavailable {
        /// Library name
        library: String,
        /// Failure message
        reason: String,
    },

    /// A declared signature is malformed
    #[error("keyword '{operation}' has an invalid signature: {reason}")]
    InvalidSignature {
        /// Offending keyword
        operation: String,
        /// What is wrong
        reason: String,
    },

    /// Documentation or tags could not be fetched. Never fatal: the
    /// annotation degrades to empty and this error is kept for diagnosis.
    #[error("getting {annotation} of keyword '{operation}' failed: {reason}")]
    DocumentationRetrievalFailure {
        /// Keyword name
        operation: String,
        /// `documentation` or `tags`
        annotation: &'static str,
        /// Failure message
        reason: String,
    },
}

// ============================================================================
// Resolution
// ============================================================================

/// Why one candidate signature did not accept the call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReport {
    /// Declared signature, e.g. `f(text, int)`
    pub signature: String,
    /// Rejection reason
    pub reason: String,
}

impl fmt::Display for CandidateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.signature, self.reason)
    }
}

fn join_reports(reports: &[CandidateReport]) -> String {
    reports
        .iter()
        .map(|r| format!("\n  {}", r))
        .collect::<String>()
}

/// Errors from choosing a signature for a call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ResolutionError {
    /// No operation with that name
    #[error("no keyword with name '{name}' found in library '{library}'")]
    NoSuchOperation {
        /// Library name
        library: String,
        /// Requested name
        name: String,
    },

    /// No signature accepts that many positional values
    #[error("keyword '{operation}' expected {expected} arguments, got {got}")]
    ArgumentCountMismatch {
        /// Keyword name
        operation: String,
        /// Accepted counts, e.g. `1 to 3` or `at least 2`
        expected: String,
        /// Supplied positional count
        got: usize,
    },

    /// Named values were supplied but no arity-viable signature has a sink
    #[error("keyword '{operation}' does not accept named arguments, got {}", .names.join(", "))]
    NamedArgumentsRejected {
        /// Keyword name
        operation: String,
        /// Supplied names
        names: Vec<String>,
    },

    /// Several signatures match equally well
    #[error(
        "ambiguous call to keyword '{operation}' with argument types ({}): {} match equally",
        .argument_types.join(", "),
        .candidates.join(" and ")
    )]
    AmbiguousSignature {
        /// Keyword name
        operation: String,
        /// Types of the supplied positional values
        argument_types: Vec<String>,
        /// Tied signatures
        candidates: Vec<String>,
    },

    /// No signature accepts the supplied values
    #[error(
        "no signature of keyword '{operation}' accepts argument types ({}):{}",
        .argument_types.join(", "),
        join_reports(.candidates)
    )]
    ArgumentCoercionFailure {
        /// Keyword name
        operation: String,
        /// Types of the supplied positional values
        argument_types: Vec<String>,
        /// Every candidate with its rejection reason
        candidates: Vec<CandidateReport>,
    },

    /// The operation is registered but its argument spec is unusable
    #[error("keyword '{operation}' cannot be called: {reason}")]
    ArgumentSpecRetrievalFailure {
        /// Keyword name
        operation: String,
        /// Why the argument spec is unusable
        reason: String,
    },
}

// ============================================================================
// Invocation
// ============================================================================

/// A failure raised by the implementation during invocation.
///
/// Propagated verbatim; the engine never retries.
#[derive(Debug, Clone, Error)]
#[error("keyword '{operation}' in library '{library}' failed: {failure}")]
pub struct InvocationFailure {
    /// Keyword name
    pub operation: String,
    /// Library name
    pub library: String,
    /// What the implementation raised
    #[source]
    pub failure: KeywordFailure,
}

impl InvocationFailure {
    /// Create a failure for `operation` in `library`
    pub fn new(
        operation: impl Into<String>,
        library: impl Into<String>,
        failure: KeywordFailure,
    ) -> Self {
        InvocationFailure {
            operation: operation.into(),
            library: library.into(),
            failure,
        }
    }

    /// Failure message
    pub fn message(&self) -> &str {
        self.failure.message()
    }

    /// Whether the reporter should omit the failure kind
    pub fn is_name_suppressed(&self) -> bool {
        self.failure.is_name_suppressed()
    }

    /// Caller-facing text: `Kind: message`, or just the message when the
    /// implementation asked for its name to be suppressed.
    pub fn report(&self) -> String {
        if self.failure.is_name_suppressed() {
            self.failure.message().to_string()
        } else {
            format!("{}: {}", self.failure.kind(), self.failure.message())
        }
    }
}

/// Errors from executing a resolved call
#[derive(Debug, Clone, Error)]
pub enum InvocationError {
    /// The implementation raised
    #[error(transparent)]
    Failure(#[from] InvocationFailure),

    /// The call succeeded but its return value has no text representation.
    /// The value itself is kept.
    #[error("keyword '{operation}' returned {type_name} which cannot be represented: {reason}")]
    UnrepresentableResult {
        /// Keyword name
        operation: String,
        /// Type name of the returned value
        type_name: String,
        /// Representation failure
        reason: String,
        /// The captured return value
        value: KwValue,
    },
}

// ============================================================================
// Config
// ============================================================================

/// Errors loading engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Parsed but invalid
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

// ============================================================================
// Umbrella
// ============================================================================

/// Any error the engine reports
#[derive(Debug, Error)]
pub enum KeywordError {
    /// Catalog build failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Signature selection failed
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Execution failed
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// Configuration failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A dispatcher was asked for a library it has no handle for
    #[error("no library named '{0}' is available")]
    NoSuchLibrary(String),
}

impl From<InvocationFailure> for KeywordError {
    fn from(failure: InvocationFailure) -> Self {
        KeywordError::Invocation(InvocationError::Failure(failure))
    }
}

/// Engine result type
pub type KeywordOutcome<T> = Result<T, KeywordError>;
