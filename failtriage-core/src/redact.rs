//! Secret redaction
//!
//! Masks secret-shaped values (API keys, bearer tokens, passwords, generic
//! tokens) before any text leaves the process. Rules are applied in order,
//! so an earlier rule's output is what later rules see.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::RedactError;

/// Placeholder written in place of a masked value.
pub const REDACTED: &str = "<REDACTED>";

/// Serializable form of a redaction rule, as it appears in config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionRuleDef {
    pub name: String,
    /// Regex; matched case-insensitively.
    pub pattern: String,
    /// Replacement in `regex` syntax (`${1}` refers to the first group).
    pub replacement: String,
}

/// A compiled redaction rule.
#[derive(Debug, Clone)]
pub struct RedactionRule {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl RedactionRule {
    pub fn compile(def: &RedactionRuleDef) -> Result<Self, RedactError> {
        let pattern = RegexBuilder::new(&def.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RedactError::InvalidPattern {
                name: def.name.clone(),
                source,
            })?;
        Ok(Self {
            name: def.name.clone(),
            pattern,
            replacement: def.replacement.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The built-in rule set, in application order.
pub fn default_rule_defs() -> Vec<RedactionRuleDef> {
    let rule = |name: &str, pattern: &str, replacement: &str| RedactionRuleDef {
        name: name.to_string(),
        pattern: pattern.to_string(),
        replacement: replacement.to_string(),
    };
    vec![
        rule(
            "api_key",
            r"(api[_-]?key)\s*[:=]\s*[A-Za-z0-9_\-]+",
            "${1}=<REDACTED>",
        ),
        rule(
            "bearer",
            r"(authorization:\s*bearer)\s+[A-Za-z0-9.\-_]+",
            "${1} <REDACTED>",
        ),
        rule("password", r"(password)\s*[:=]\s*\S+", "${1}=<REDACTED>"),
        rule(
            "token",
            r"(token)\s*[:=]\s*[A-Za-z0-9.\-_]+",
            "${1}=<REDACTED>",
        ),
    ]
}

/// Ordered set of redaction rules.
#[derive(Debug, Clone)]
pub struct Redactor {
    rules: Vec<RedactionRule>,
}

impl Redactor {
    pub fn new(rules: Vec<RedactionRule>) -> Self {
        Self { rules }
    }

    /// Compile rule definitions, preserving their order.
    pub fn from_defs(defs: &[RedactionRuleDef]) -> Result<Self, RedactError> {
        let rules = defs
            .iter()
            .map(RedactionRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// Built-in rules followed by `extra`.
    pub fn with_extra_rules(extra: &[RedactionRuleDef]) -> Result<Self, RedactError> {
        let mut defs = default_rule_defs();
        defs.extend_from_slice(extra);
        Self::from_defs(&defs)
    }

    pub fn rules(&self) -> &[RedactionRule] {
        &self.rules
    }

    /// Mask secret values in `text`. Labels are kept, only values change.
    pub fn redact(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let mut out = text.to_string();
        for rule in &self.rules {
            let replaced = rule
                .pattern
                .replace_all(&out, rule.replacement.as_str())
                .into_owned();
            out = replaced;
        }
        out
    }
}

impl Default for Redactor {
    fn default() -> Self {
        let rules = default_rule_defs()
            .iter()
            .map(|def| RedactionRule::compile(def).expect("built-in redaction rules compile"))
            .collect();
        Self::new(rules)
    }
}
