//! Error types
//!
//! Fatal input errors abort the run. Oracle errors never leave the
//! orchestrator; they are folded into fallback results there.

use std::path::PathBuf;
use std::time::Duration;

/// Errors reading or parsing the execution report (`output.xml`).
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error reading report: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed report XML at byte {position}: {reason}")]
    Malformed { position: u64, reason: String },

    #[error("report has no root suite")]
    MissingRootSuite,
}

/// Errors locating or reading the trace archive.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("IO error reading trace archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid trace archive {path}: {reason}")]
    InvalidArchive { path: PathBuf, reason: String },
}

/// Errors raised by a classification oracle call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("oracle transport error: {0}")]
    Transport(String),

    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("oracle returned no content")]
    EmptyResponse,
}

/// Configuration errors. Checked before the pipeline starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Redact(#[from] RedactError),
}

/// Errors building redaction rules.
#[derive(Debug, thiserror::Error)]
pub enum RedactError {
    #[error("invalid redaction pattern '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// Top-level error for a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, TriageError>;
