//! Run configuration
//!
//! Defaults, optionally overlaid by a YAML file, then by CLI flags or
//! environment in the binary. Validation checks presence and sanity only.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::openai::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::redact::{RedactionRuleDef, Redactor};
use crate::trace::TraceLimits;

/// Oracle connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Never read from files in practice; usually comes from `OPENAI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    /// Cost control: at most this many failures reach the oracle.
    pub max_failures: usize,
    pub max_message_chars: usize,
    pub trace: TraceLimits,
    pub oracle: OracleConfig,
    /// Appended after the built-in redaction rules.
    pub extra_redactions: Vec<RedactionRuleDef>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            max_failures: 30,
            max_message_chars: 6000,
            trace: TraceLimits::default(),
            oracle: OracleConfig::default(),
            extra_redactions: Vec::new(),
        }
    }
}

impl TriageConfig {
    /// Load from a YAML file; missing keys take defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Check required settings before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.oracle.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(ConfigError::Missing("oracle api key (OPENAI_API_KEY)")),
        }
        if self.oracle.model.trim().is_empty() {
            return Err(ConfigError::Missing("oracle model"));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(invalid("oracle.timeout_secs", "must be positive"));
        }
        if self.max_message_chars == 0 {
            return Err(invalid("max_message_chars", "must be positive"));
        }
        if self.trace.max_file_chars == 0 {
            return Err(invalid("trace.max_file_chars", "must be positive"));
        }
        if self.trace.suffixes.iter().any(|s| s.is_empty()) {
            return Err(invalid("trace.suffixes", "empty suffix matches every entry"));
        }
        self.redactor()?;
        Ok(())
    }

    /// Built-in redaction rules plus any configured extras.
    pub fn redactor(&self) -> Result<Redactor, ConfigError> {
        Ok(Redactor::with_extra_rules(&self.extra_redactions)?)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
