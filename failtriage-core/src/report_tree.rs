//! Execution report tree
//!
//! Owned suite/test tree parsed from a Robot Framework `output.xml`.
//! Only what triage needs is kept: suite and test names, the test's own
//! status and its message. Keyword-level statuses are skipped.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ReportError;

/// Final status of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestStatus {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "SKIP")]
    Skip,
    #[serde(rename = "NOT RUN")]
    NotRun,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
            TestStatus::Skip => "SKIP",
            TestStatus::NotRun => "NOT RUN",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PASS" => Ok(TestStatus::Pass),
            "FAIL" => Ok(TestStatus::Fail),
            "SKIP" => Ok(TestStatus::Skip),
            "NOT RUN" | "NOT_RUN" => Ok(TestStatus::NotRun),
            other => Err(format!("unknown test status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNode {
    pub name: String,
    pub status: TestStatus,
    pub message: String,
}

impl TestNode {
    pub fn new(name: impl Into<String>, status: TestStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SuiteNode {
    pub name: String,
    pub tests: Vec<TestNode>,
    pub suites: Vec<SuiteNode>,
}

impl SuiteNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_test(mut self, test: TestNode) -> Self {
        self.tests.push(test);
        self
    }

    pub fn with_suite(mut self, suite: SuiteNode) -> Self {
        self.suites.push(suite);
        self
    }

    /// Total number of tests in this suite and all descendants.
    pub fn test_count(&self) -> usize {
        self.tests.len() + self.suites.iter().map(SuiteNode::test_count).sum::<usize>()
    }
}

/// Read and parse `output.xml` from disk.
pub fn load_report(path: &Path) -> Result<SuiteNode, ReportError> {
    if !path.exists() {
        return Err(ReportError::NotFound(path.to_path_buf()));
    }
    let xml = std::fs::read_to_string(path)?;
    let root = parse_report(&xml)?;
    debug!(
        path = %path.display(),
        suite = %root.name,
        tests = root.test_count(),
        "Loaded execution report"
    );
    Ok(root)
}

enum Frame {
    Suite(SuiteNode),
    Test(TestNode),
    /// `<status>` directly under a `<test>`; collects the message text.
    TestStatus(String),
    Other,
}

/// Parse the XML text of an `output.xml` into its root suite.
pub fn parse_report(xml: &str) -> Result<SuiteNode, ReportError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<SuiteNode> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let malformed = |reason: String| ReportError::Malformed { position, reason };

        let event = reader.read_event().map_err(|e| malformed(e.to_string()))?;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"suite" => {
                    let name = attr(&e, "name").map_err(malformed)?.unwrap_or_default();
                    stack.push(Frame::Suite(SuiteNode::new(name)));
                }
                b"test" => {
                    let name = attr(&e, "name").map_err(malformed)?.unwrap_or_default();
                    stack.push(Frame::Test(TestNode::new(name, TestStatus::NotRun, "")));
                }
                b"status" => {
                    let frame = if let Some(Frame::Test(test)) = stack.last_mut() {
                        test.status = status_attr(&e).map_err(malformed)?;
                        Frame::TestStatus(String::new())
                    } else {
                        Frame::Other
                    };
                    stack.push(frame);
                }
                _ => stack.push(Frame::Other),
            },
            Event::Empty(e) => {
                if e.name().as_ref() == b"status" {
                    if let Some(Frame::Test(test)) = stack.last_mut() {
                        test.status = status_attr(&e).map_err(malformed)?;
                        test.message.clear();
                    }
                }
            }
            Event::Text(t) => {
                if let Some(Frame::TestStatus(text)) = stack.last_mut() {
                    let unescaped = t.unescape().map_err(|e| malformed(e.to_string()))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(c) => {
                if let Some(Frame::TestStatus(text)) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => match stack.pop() {
                Some(Frame::TestStatus(message)) => {
                    if let Some(Frame::Test(test)) = stack.last_mut() {
                        test.message = message;
                    }
                }
                Some(Frame::Test(test)) => match stack.last_mut() {
                    Some(Frame::Suite(suite)) => suite.tests.push(test),
                    _ => {
                        return Err(malformed(format!(
                            "test '{}' is not inside a suite",
                            test.name
                        )))
                    }
                },
                Some(Frame::Suite(suite)) => match stack.last_mut() {
                    Some(Frame::Suite(parent)) => parent.suites.push(suite),
                    Some(Frame::Test(_)) | Some(Frame::TestStatus(_)) => {
                        return Err(malformed(format!(
                            "suite '{}' nested inside a test",
                            suite.name
                        )))
                    }
                    _ => {
                        if root.is_none() {
                            root = Some(suite);
                        } else {
                            warn!(suite = %suite.name, "Ignoring extra top-level suite");
                        }
                    }
                },
                Some(Frame::Other) => {}
                None => return Err(malformed("unbalanced end tag".to_string())),
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ReportError::Malformed {
            position: reader.buffer_position() as u64,
            reason: "unexpected end of document".to_string(),
        });
    }

    root.ok_or(ReportError::MissingRootSuite)
}

fn attr(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, String> {
    match e.try_get_attribute(key).map_err(|err| err.to_string())? {
        Some(a) => a
            .unescape_value()
            .map(|v| Some(v.into_owned()))
            .map_err(|err| err.to_string()),
        None => Ok(None),
    }
}

fn status_attr(e: &BytesStart<'_>) -> Result<TestStatus, String> {
    attr(e, "status")?
        .ok_or_else(|| "status element without status attribute".to_string())?
        .parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<robot generator="Robot 7.0" generated="2024-01-01T00:00:00" rpa="false" schemaversion="5">
<suite id="s1" name="Tests" source="/work/tests">
<suite id="s1-s1" name="Login" source="/work/tests/login.robot">
<test id="s1-s1-t1" name="test_invalid_password" line="3">
<kw name="Log">
<msg time="2024-01-01T00:00:00" level="INFO">hello</msg>
<status status="PASS" start="2024-01-01T00:00:00" elapsed="0.001"/>
</kw>
<status status="FAIL" start="2024-01-01T00:00:00" elapsed="0.002">password=secret123 AssertionError: expected &lt;true&gt;</status>
</test>
<test id="s1-s1-t2" name="test_ok" line="9">
<status status="PASS" start="2024-01-01T00:00:00" elapsed="0.002"/>
</test>
<status status="FAIL" start="2024-01-01T00:00:00" elapsed="0.004"/>
</suite>
<test id="s1-t1" name="root level" line="1">
<kw name="Fail">
<status status="FAIL" start="2024-01-01T00:00:00" elapsed="0.001">inner</status>
</kw>
<status status="FAIL" start="2024-01-01T00:00:00" elapsed="0.001">outer</status>
</test>
<status status="FAIL" start="2024-01-01T00:00:00" elapsed="0.01"/>
</suite>
<statistics/>
<errors/>
</robot>
"#;

    #[test]
    fn test_parse_sample_tree() {
        let root = parse_report(SAMPLE).unwrap();
        assert_eq!(root.name, "Tests");
        assert_eq!(root.tests.len(), 1);
        assert_eq!(root.suites.len(), 1);
        assert_eq!(root.test_count(), 3);

        let login = &root.suites[0];
        assert_eq!(login.name, "Login");
        let failed = &login.tests[0];
        assert_eq!(failed.status, TestStatus::Fail);
        assert_eq!(
            failed.message,
            "password=secret123 AssertionError: expected <true>"
        );
        assert_eq!(login.tests[1].status, TestStatus::Pass);
        assert_eq!(login.tests[1].message, "");
    }

    #[test]
    fn test_keyword_status_does_not_leak_into_test() {
        let root = parse_report(SAMPLE).unwrap();
        assert_eq!(root.tests[0].message, "outer");
    }

    #[test]
    fn test_legacy_status_format() {
        let xml = r#"<robot><suite name="Old"><test name="t">
<status status="FAIL" starttime="20200101 00:00:00.000" endtime="20200101 00:00:01.000">boom</status>
</test></suite></robot>"#;
        let root = parse_report(xml).unwrap();
        assert_eq!(root.tests[0].status, TestStatus::Fail);
        assert_eq!(root.tests[0].message, "boom");
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let err = parse_report("<robot><suite name=\"x\"></robot>").unwrap_err();
        assert!(matches!(err, ReportError::Malformed { .. }));
    }

    #[test]
    fn test_unknown_status_is_error() {
        let xml = r#"<robot><suite name="s"><test name="t"><status status="WEIRD"/></test></suite></robot>"#;
        assert!(matches!(
            parse_report(xml),
            Err(ReportError::Malformed { .. })
        ));
    }

    #[test]
    fn test_missing_root_suite() {
        assert!(matches!(
            parse_report("<robot></robot>"),
            Err(ReportError::MissingRootSuite)
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_report(Path::new("/definitely/not/here/output.xml")).unwrap_err();
        assert!(matches!(err, ReportError::NotFound(_)));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("fail".parse::<TestStatus>().unwrap(), TestStatus::Fail);
        assert_eq!("NOT RUN".parse::<TestStatus>().unwrap(), TestStatus::NotRun);
        assert!("nope".parse::<TestStatus>().is_err());
    }
}
