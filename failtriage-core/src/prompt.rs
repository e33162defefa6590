//! Oracle instructions and user prompt

use crate::bundle::EvidenceBundle;

pub const SYSTEM_INSTRUCTIONS: &str = r#"You are a QA automation assistant for Robot Framework.
Your job: classify a test failure and recommend next actions.

When a Playwright trace excerpt is provided, use it as primary evidence for UI actions, console errors, and network failures.

Hard rules:
- Output MUST be valid JSON matching the provided JSON Schema.
- Classify failure_type as one of: application_bug, test_bug, environment_issue, flaky_test, test_data_issue, unknown.
- If evidence is insufficient: set failure_type="unknown" and confidence <= 0.5.
- Suggest retry only if it is likely flaky or environment related.
- Do not invent logs, steps, or system behavior that are not present in the input.
"#;

/// User prompt carrying the sanitized bundle as JSON.
pub fn build_user_prompt(bundle: &EvidenceBundle) -> String {
    let body = serde_json::to_string_pretty(bundle).unwrap_or_else(|_| format!("{:?}", bundle));
    format!(
        "Analyze this Robot Framework test failure.\n\nFailure bundle (sanitized):\n{}\n",
        body
    )
}
