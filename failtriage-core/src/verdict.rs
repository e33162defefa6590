//! Structured triage verdicts
//!
//! JSON field names and enum values here are persisted in the report and
//! read by downstream tooling; keep them stable.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FALLBACK_SUMMARY: &str = "AI analysis failed";
pub const FALLBACK_RETRY_REASON: &str = "AI error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    ApplicationBug,
    TestBug,
    EnvironmentIssue,
    FlakyTest,
    TestDataIssue,
    Unknown,
}

impl FailureType {
    pub const ALL: [&'static str; 6] = [
        "application_bug",
        "test_bug",
        "environment_issue",
        "flaky_test",
        "test_data_issue",
        "unknown",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureType::ApplicationBug => "application_bug",
            FailureType::TestBug => "test_bug",
            FailureType::EnvironmentIssue => "environment_issue",
            FailureType::FlakyTest => "flaky_test",
            FailureType::TestDataIssue => "test_data_issue",
            FailureType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    Selector,
    DataSetup,
    Timing,
    Data,
    Assertion,
    Infra,
    Auth,
    Other,
}

impl SuggestionCategory {
    pub const ALL: [&'static str; 8] = [
        "selector",
        "data_setup",
        "timing",
        "data",
        "assertion",
        "infra",
        "auth",
        "other",
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryScope {
    #[default]
    Test,
    Suite,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub reason: String,
    #[serde(default)]
    pub retry_scope: RetryScope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub category: SuggestionCategory,
    pub suggestion: String,
}

/// Classification of one failed test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub test_name: String,
    pub suite_name: String,
    pub failure_type: FailureType,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub summary: String,
    pub likely_root_cause: String,
    pub retry: RetryDecision,
    #[serde(default)]
    pub suggestions: Vec<FixSuggestion>,
    #[serde(default)]
    pub tags_to_apply: BTreeSet<String>,
    #[serde(default)]
    pub missing_logs: BTreeSet<String>,
}

impl AnalysisResult {
    /// Degraded result used whenever classification fails.
    pub fn fallback(
        suite_name: impl Into<String>,
        test_name: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            suite_name: suite_name.into(),
            failure_type: FailureType::Unknown,
            confidence: 0.0,
            summary: FALLBACK_SUMMARY.to_string(),
            likely_root_cause: detail.into(),
            retry: RetryDecision {
                should_retry: false,
                reason: FALLBACK_RETRY_REASON.to_string(),
                retry_scope: RetryScope::None,
            },
            suggestions: Vec::new(),
            tags_to_apply: BTreeSet::new(),
            missing_logs: BTreeSet::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.failure_type == FailureType::Unknown
            && self.confidence == 0.0
            && self.retry.retry_scope == RetryScope::None
            && self.summary == FALLBACK_SUMMARY
    }
}

/// JSON schema the oracle must answer with.
pub fn analysis_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "test_name": {"type": "string"},
            "suite_name": {"type": "string"},
            "failure_type": {"type": "string", "enum": FailureType::ALL},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "summary": {"type": "string"},
            "likely_root_cause": {"type": "string"},
            "retry": {
                "type": "object",
                "properties": {
                    "should_retry": {"type": "boolean"},
                    "reason": {"type": "string"},
                    "retry_scope": {"type": "string", "enum": ["test", "suite", "none"]}
                },
                "required": ["should_retry", "reason"]
            },
            "suggestions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "category": {"type": "string", "enum": SuggestionCategory::ALL},
                        "suggestion": {"type": "string"}
                    },
                    "required": ["category", "suggestion"]
                }
            },
            "tags_to_apply": {"type": "array", "items": {"type": "string"}},
            "missing_logs": {"type": "array", "items": {"type": "string"}}
        },
        "required": [
            "test_name",
            "suite_name",
            "failure_type",
            "confidence",
            "summary",
            "likely_root_cause",
            "retry"
        ]
    })
}

/// Outcome of validating raw oracle output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedVerdict {
    Parsed(AnalysisResult),
    /// Well-formed JSON that breaks the schema.
    SchemaInvalid(String),
    /// Not JSON at all.
    Unparseable(String),
}

/// Validate raw oracle text against the analysis schema.
pub fn parse_verdict(raw: &str) -> ParsedVerdict {
    let body = strip_code_fence(raw);

    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            return ParsedVerdict::Unparseable(format!(
                "AI returned non-JSON output: {}\nRaw:\n{}",
                e, raw
            ))
        }
    };

    let schema_errors = match jsonschema::validator_for(&analysis_schema()) {
        Ok(validator) => validator
            .iter_errors(&value)
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect::<Vec<_>>(),
        Err(e) => vec![format!("invalid schema: {}", e)],
    };
    if !schema_errors.is_empty() {
        return ParsedVerdict::SchemaInvalid(format!(
            "AI returned invalid structured output: {}\nRaw:\n{}",
            schema_errors.join("; "),
            raw
        ));
    }

    match serde_json::from_value::<AnalysisResult>(value) {
        Ok(result) if (0.0..=1.0).contains(&result.confidence) => ParsedVerdict::Parsed(result),
        Ok(result) => ParsedVerdict::SchemaInvalid(format!(
            "AI returned confidence {} outside [0, 1]",
            result.confidence
        )),
        Err(e) => ParsedVerdict::SchemaInvalid(format!(
            "AI returned invalid structured output: {}\nRaw:\n{}",
            e, raw
        )),
    }
}

/// Unwrap a single ```json fenced block, if the whole reply is one.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_json() -> Value {
        serde_json::json!({
            "test_name": "test_invalid_password",
            "suite_name": "Login",
            "failure_type": "flaky_test",
            "confidence": 0.7,
            "summary": "Timing issue on login button",
            "likely_root_cause": "Button not yet enabled",
            "retry": {"should_retry": true, "reason": "timing", "retry_scope": "test"},
            "suggestions": [{"category": "timing", "suggestion": "Wait for element enabled"}],
            "tags_to_apply": ["flaky", "login", "flaky"],
            "missing_logs": []
        })
    }

    #[test]
    fn test_parse_valid() {
        let raw = valid_json().to_string();
        match parse_verdict(&raw) {
            ParsedVerdict::Parsed(r) => {
                assert_eq!(r.failure_type, FailureType::FlakyTest);
                assert_eq!(r.retry.retry_scope, RetryScope::Test);
                assert_eq!(r.tags_to_apply.len(), 2);
                assert_eq!(r.suggestions[0].category, SuggestionCategory::Timing);
            }
            other => panic!("expected Parsed, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_fields_default() {
        let mut v = valid_json();
        let obj = v.as_object_mut().unwrap();
        obj.remove("suggestions");
        obj.remove("tags_to_apply");
        obj.remove("missing_logs");
        obj["retry"].as_object_mut().unwrap().remove("retry_scope");

        match parse_verdict(&v.to_string()) {
            ParsedVerdict::Parsed(r) => {
                assert!(r.suggestions.is_empty());
                assert!(r.tags_to_apply.is_empty());
                assert_eq!(r.retry.retry_scope, RetryScope::Test);
            }
            other => panic!("expected Parsed, got {:?}", other),
        }
    }

    #[test]
    fn test_fenced_json_accepted() {
        let raw = format!("```json\n{}\n```", valid_json());
        assert!(matches!(parse_verdict(&raw), ParsedVerdict::Parsed(_)));
    }

    #[test]
    fn test_confidence_out_of_range_is_schema_invalid() {
        let mut v = valid_json();
        v["confidence"] = serde_json::json!(1.5);
        assert!(matches!(
            parse_verdict(&v.to_string()),
            ParsedVerdict::SchemaInvalid(_)
        ));
    }

    #[test]
    fn test_unknown_enum_is_schema_invalid() {
        let mut v = valid_json();
        v["failure_type"] = serde_json::json!("cosmic_rays");
        assert!(matches!(
            parse_verdict(&v.to_string()),
            ParsedVerdict::SchemaInvalid(_)
        ));
    }

    #[test]
    fn test_missing_required_is_schema_invalid() {
        let mut v = valid_json();
        v.as_object_mut().unwrap().remove("summary");
        match parse_verdict(&v.to_string()) {
            ParsedVerdict::SchemaInvalid(detail) => assert!(detail.contains("summary")),
            other => panic!("expected SchemaInvalid, got {:?}", other),
        }
    }

    #[test]
    fn test_not_json_is_unparseable() {
        assert!(matches!(
            parse_verdict("I think this is a flaky test."),
            ParsedVerdict::Unparseable(_)
        ));
        assert!(matches!(parse_verdict(""), ParsedVerdict::Unparseable(_)));
    }

    #[test]
    fn test_fallback_shape() {
        let r = AnalysisResult::fallback("Login", "t", "timeout");
        assert!(r.is_fallback());
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["failure_type"], "unknown");
        assert_eq!(json["confidence"], 0.0);
        assert_eq!(json["summary"], "AI analysis failed");
        assert_eq!(json["likely_root_cause"], "timeout");
        assert_eq!(json["retry"]["should_retry"], false);
        assert_eq!(json["retry"]["reason"], "AI error");
        assert_eq!(json["retry"]["retry_scope"], "none");
        assert_eq!(json["suggestions"], serde_json::json!([]));
        assert_eq!(json["tags_to_apply"], serde_json::json!([]));
        assert_eq!(json["missing_logs"], serde_json::json!([]));
    }
}
