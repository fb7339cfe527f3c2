//! Engine configuration (keyway.toml)
//!
//! Every section and field is optional:
//!
//! ```toml
//! [coercion]
//! true_strings = ["true"]
//! false_strings = ["false"]
//!
//! [resolution]
//! cache = true
//!
//! [logging]
//! trace_arguments = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coercion::{CoercionRules, DEFAULT_FALSE_STRINGS, DEFAULT_TRUE_STRINGS};
use crate::error::ConfigError;

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Coercion settings
    #[serde(default)]
    pub coercion: CoercionConfig,

    /// Resolution settings
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[coercion]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoercionConfig {
    /// Literals accepted as `true`, case-insensitively
    #[serde(default = "default_true_strings")]
    pub true_strings: Vec<String>,

    /// Literals accepted as `false`, case-insensitively
    #[serde(default = "default_false_strings")]
    pub false_strings: Vec<String>,
}

impl Default for CoercionConfig {
    fn default() -> Self {
        CoercionConfig {
            true_strings: default_true_strings(),
            false_strings: default_false_strings(),
        }
    }
}

/// `[resolution]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionConfig {
    /// Cache arity-filter results per handle
    #[serde(default = "default_true")]
    pub cache: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        ResolutionConfig { cache: true }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Emit trace events with argument and return values
    #[serde(default = "default_true")]
    pub trace_arguments: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            trace_arguments: true,
        }
    }
}

fn default_true_strings() -> Vec<String> {
    DEFAULT_TRUE_STRINGS.iter().map(|s| s.to_lowercase()).collect()
}

fn default_false_strings() -> Vec<String> {
    DEFAULT_FALSE_STRINGS.iter().map(|s| s.to_lowercase()).collect()
}

fn default_true() -> bool {
    true
}

impl EngineConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let coercion = &self.coercion;
        if coercion.true_strings.is_empty() {
            return Err(ConfigError::ValidationError(
                "coercion.true_strings cannot be empty".to_string(),
            ));
        }
        if coercion.false_strings.is_empty() {
            return Err(ConfigError::ValidationError(
                "coercion.false_strings cannot be empty".to_string(),
            ));
        }
        for literal in coercion.true_strings.iter().chain(&coercion.false_strings) {
            if literal.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "boolean literals cannot be blank".to_string(),
                ));
            }
        }
        if let Some(both) = coercion.true_strings.iter().find(|t| {
            coercion
                .false_strings
                .iter()
                .any(|f| f.to_uppercase() == t.to_uppercase())
        }) {
            return Err(ConfigError::ValidationError(format!(
                "'{}' is both a true and a false literal",
                both
            )));
        }
        Ok(())
    }

    /// Coercion rules with the configured literals
    pub fn coercion_rules(&self) -> CoercionRules {
        CoercionRules::with_literals(&self.coercion.true_strings, &self.coercion.false_strings)
    }
}
