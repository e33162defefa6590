//! Failed-test extraction
//!
//! Walks the report tree depth-first and collects one [`FailureRecord`] per
//! failed test. Child suites of the root come first, the root suite's own
//! tests last; below the root a suite's own tests precede its children.
//! Records are keyed by `(suite_path, test_name)`; a later record with the
//! same key replaces the earlier one in place.
//!
//! Suite paths are relative to the root (`Login`, `Login.Admin`) and tests
//! of the root suite use the root's name. A relative path that starts with
//! the root's name is spelled out from the root (`Tests.Tests`), so nested
//! suites never share a key with the root's own tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::report_tree::{SuiteNode, TestStatus};

pub const MESSAGE_TRUNCATED_TAG: &str = "\n<TRUNCATED>";

/// A failed test, as extracted from the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub suite_path: String,
    pub test_name: String,
    pub status: TestStatus,
    pub message: String,
    pub truncated: bool,
}

impl FailureRecord {
    pub fn key(&self) -> (&str, &str) {
        (&self.suite_path, &self.test_name)
    }
}

pub struct ResultTreeWalker {
    max_message_chars: usize,
}

impl ResultTreeWalker {
    pub fn new(max_message_chars: usize) -> Self {
        Self { max_message_chars }
    }

    /// Collect failed tests from the whole tree, deduplicated.
    pub fn collect_failures(&self, root: &SuiteNode) -> Vec<FailureRecord> {
        let mut found = Vec::new();

        for suite in &root.suites {
            self.walk(&root.name, suite, &suite.name, &mut found);
        }
        for test in &root.tests {
            if test.status == TestStatus::Fail {
                found.push(self.record(&root.name, &test.name, test.status, &test.message));
            }
        }

        dedup_last_wins(found)
    }

    fn walk(
        &self,
        root_name: &str,
        suite: &SuiteNode,
        path: &str,
        out: &mut Vec<FailureRecord>,
    ) {
        let key = suite_key(root_name, path);
        for test in &suite.tests {
            if test.status == TestStatus::Fail {
                out.push(self.record(&key, &test.name, test.status, &test.message));
            }
        }
        for child in &suite.suites {
            let child_path = format!("{}.{}", path, child.name);
            self.walk(root_name, child, &child_path, out);
        }
    }

    fn record(
        &self,
        suite_path: &str,
        test_name: &str,
        status: TestStatus,
        message: &str,
    ) -> FailureRecord {
        let (message, truncated) = truncate_message(message.trim(), self.max_message_chars);
        FailureRecord {
            suite_path: suite_path.to_string(),
            test_name: test_name.to_string(),
            status,
            message,
            truncated,
        }
    }
}

/// Suite key for a path relative to the root.
fn suite_key(root_name: &str, relative: &str) -> String {
    let shadows_root = relative
        .strip_prefix(root_name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'));
    if shadows_root {
        format!("{}.{}", root_name, relative)
    } else {
        relative.to_string()
    }
}

fn truncate_message(message: &str, max_chars: usize) -> (String, bool) {
    match message.char_indices().nth(max_chars) {
        Some((cut, _)) => (format!("{}{}", &message[..cut], MESSAGE_TRUNCATED_TAG), true),
        None => (message.to_string(), false),
    }
}

/// Keep one record per key; content from the last, position from the first.
fn dedup_last_wins(records: Vec<FailureRecord>) -> Vec<FailureRecord> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut unique: Vec<FailureRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = (record.suite_path.clone(), record.test_name.clone());
        match index.get(&key) {
            Some(&pos) => unique[pos] = record,
            None => {
                index.insert(key, unique.len());
                unique.push(record);
            }
        }
    }
    unique
}
