//! AI-assisted triage of failed Robot Framework tests
//!
//! Turns failed tests from an `output.xml` into redacted, size-bounded
//! evidence bundles, asks a classification oracle for a structured verdict
//! on each, and collects the verdicts into a report.
//!
//! ## Architecture
//!
//! ```text
//! output.xml → report_tree → walker → bundle (+ trace, redact) → orchestrator → report
//! ```
//!
//! Oracle failures never abort a run: every processed failure gets exactly
//! one result, degraded to `failure_type = unknown` when classification
//! fails.

pub mod bundle;
pub mod config;
pub mod error;
pub mod openai;
pub mod oracle;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
pub mod redact;
pub mod report;
pub mod report_tree;
pub mod trace;
pub mod verdict;
pub mod walker;

pub use bundle::{BundleBuilder, EvidenceBundle};
pub use config::{OracleConfig, TriageConfig};
pub use error::{ConfigError, OracleError, ReportError, TraceError, TriageError};
pub use openai::OpenAiOracle;
pub use oracle::{ClassificationOracle, OracleRequest};
pub use orchestrator::{AnalysisError, AnalysisOrchestrator};
pub use pipeline::TriagePipeline;
pub use redact::Redactor;
pub use report::{Report, RunMetadata};
pub use report_tree::{load_report, parse_report, SuiteNode, TestNode, TestStatus};
pub use trace::{TraceArchiveReader, TraceExcerpt, TraceLimits};
pub use verdict::{AnalysisResult, FailureType, ParsedVerdict, RetryScope};
pub use walker::{FailureRecord, ResultTreeWalker};
