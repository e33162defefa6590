//! Triage report
//!
//! Final artifact of a run: run metadata plus one analysis per processed
//! failure, in processing order.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::verdict::AnalysisResult;

/// Metadata about the test run the analyses belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    pub return_code: i32,
    pub output_dir: PathBuf,
    pub output_xml: PathBuf,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub robot_return_code: i32,
    pub robot_outputdir: PathBuf,
    pub robot_output_xml: PathBuf,
    pub model: String,
    pub failure_count_analyzed: usize,
    pub analyses: Vec<AnalysisResult>,
}

impl Report {
    /// Assemble the report. No validation beyond structure.
    pub fn assemble(
        metadata: RunMetadata,
        analyses: Vec<AnalysisResult>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            generated_at,
            robot_return_code: metadata.return_code,
            robot_outputdir: metadata.output_dir,
            robot_output_xml: metadata.output_xml,
            model: metadata.model,
            failure_count_analyzed: analyses.len(),
            analyses,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = self.to_json_pretty().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
