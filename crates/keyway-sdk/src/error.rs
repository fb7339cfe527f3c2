//! Failure type raised by keyword implementations

use std::error::Error;
use std::sync::Arc;

/// Result type for keyword implementations
pub type KwResult<T> = Result<T, KeywordFailure>;

/// Failure raised by a keyword implementation or a discovery entry point.
///
/// `kind` names the failure class (shown as a prefix when reported) and
/// `suppress_name` asks the reporter to drop that prefix. Neither changes the
/// failure's identity or its cause chain.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct KeywordFailure {
    message: String,
    kind: String,
    suppress_name: bool,
    #[source]
    source: Option<Arc<dyn Error + Send + Sync + 'static>>,
}

impl KeywordFailure {
    /// Create a failure with the generic `Error` kind
    pub fn new(message: impl Into<String>) -> Self {
        KeywordFailure {
            message: message.into(),
            kind: "Error".to_string(),
            suppress_name: false,
            source: None,
        }
    }

    /// Create a failure reporting a mismatched argument type
    pub fn type_mismatch(expected: &str, got: &str) -> Self {
        KeywordFailure::new(format!("expected {}, got {}", expected, got)).with_kind("TypeError")
    }

    /// Set the failure kind
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Ask the reporter to omit the failure kind prefix
    pub fn suppress_name(mut self) -> Self {
        self.suppress_name = true;
        self
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Failure message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Failure kind
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether the kind prefix should be hidden when reported
    pub fn is_name_suppressed(&self) -> bool {
        self.suppress_name
    }

    /// Underlying cause, if any
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.source.as_deref()
    }
}

impl From<String> for KeywordFailure {
    fn from(s: String) -> Self {
        KeywordFailure::new(s)
    }
}

impl From<&str> for KeywordFailure {
    fn from(s: &str) -> Self {
        KeywordFailure::new(s)
    }
}
