//! Evidence bundles
//!
//! The flat, redacted payload handed to the oracle for one failure.

use serde::{Deserialize, Serialize};

use crate::redact::Redactor;
use crate::report_tree::TestStatus;
use crate::trace::TraceExcerpt;
use crate::walker::FailureRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub suite_name: String,
    pub test_name: String,
    pub status: TestStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

pub struct BundleBuilder<'r> {
    redactor: &'r Redactor,
}

impl<'r> BundleBuilder<'r> {
    pub fn new(redactor: &'r Redactor) -> Self {
        Self { redactor }
    }

    pub fn build(&self, record: FailureRecord, excerpt: Option<&TraceExcerpt>) -> EvidenceBundle {
        EvidenceBundle {
            suite_name: record.suite_path,
            test_name: record.test_name,
            status: record.status,
            message: self.redactor.redact(&record.message),
            trace: excerpt.map(|e| self.trace_text(e)),
        }
    }

    // Re-redacting a capped excerpt could grow it past the total cap.
    fn trace_text(&self, excerpt: &TraceExcerpt) -> String {
        if excerpt.is_redacted() {
            excerpt.render().to_string()
        } else {
            self.redactor.redact(excerpt.render())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{TraceArchiveReader, TraceLimits, NO_EVIDENCE};
    use std::io::{Cursor, Write};
    use std::path::Path;

    fn record(message: &str) -> FailureRecord {
        FailureRecord {
            suite_path: "Login".into(),
            test_name: "test_invalid_password".into(),
            status: TestStatus::Fail,
            message: message.into(),
            truncated: false,
        }
    }

    #[test]
    fn test_message_redacted() {
        let redactor = Redactor::default();
        let bundle = BundleBuilder::new(&redactor)
            .build(record("password=secret123 AssertionError: expected true"), None);
        assert_eq!(bundle.suite_name, "Login");
        assert_eq!(
            bundle.message,
            "password=<REDACTED> AssertionError: expected true"
        );
        assert!(bundle.trace.is_none());
    }

    #[test]
    fn test_trace_redacted() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("0.trace", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer
            .write_all(b"GET /api Authorization: Bearer abc.def")
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        let excerpt = TraceArchiveReader::default()
            .extract_from_reader(Cursor::new(bytes), Path::new("t.zip"))
            .unwrap();

        let redactor = Redactor::default();
        let bundle = BundleBuilder::new(&redactor).build(record("boom"), Some(&excerpt));
        let trace = bundle.trace.unwrap();
        assert!(trace.contains("Authorization: Bearer <REDACTED>"));
        assert!(!trace.contains("abc.def"));
    }

    #[test]
    fn test_pre_redacted_trace_stays_within_total_cap() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("0.trace", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all("api_key=x ".repeat(30).as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let redactor = Redactor::default();
        let limits = TraceLimits {
            max_total_chars: 100,
            ..TraceLimits::default()
        };
        let excerpt = TraceArchiveReader::new(limits)
            .with_redactor(redactor.clone())
            .extract_from_reader(Cursor::new(bytes), Path::new("t.zip"))
            .unwrap();

        let bundle = BundleBuilder::new(&redactor).build(record("boom"), Some(&excerpt));
        let trace = bundle.trace.unwrap();
        assert!(trace.chars().count() <= 100);
        assert_eq!(trace, excerpt.render());
        assert!(!trace.contains("api_key=x"));
    }

    #[test]
    fn test_empty_excerpt_carries_sentinel() {
        let bytes = zip::ZipWriter::new(Cursor::new(Vec::new()))
            .finish()
            .unwrap()
            .into_inner();
        let excerpt = TraceArchiveReader::default()
            .extract_from_reader(Cursor::new(bytes), Path::new("t.zip"))
            .unwrap();
        let redactor = Redactor::default();
        let bundle = BundleBuilder::new(&redactor).build(record("boom"), Some(&excerpt));
        assert_eq!(bundle.trace.as_deref(), Some(NO_EVIDENCE));
    }

    #[test]
    fn test_bundle_serializes_flat() {
        let redactor = Redactor::default();
        let bundle = BundleBuilder::new(&redactor).build(record("x"), None);
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "suite_name": "Login",
                "test_name": "test_invalid_password",
                "status": "FAIL",
                "message": "x"
            })
        );
    }
}
