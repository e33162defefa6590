//! Triage pipeline
//!
//! ```text
//! SuiteNode → ResultTreeWalker → FailureRecord[] ─┐
//! trace dir → TraceArchiveReader → TraceExcerpt ──┼→ BundleBuilder → AnalysisOrchestrator → AnalysisResult[]
//!                                     Redactor ───┘
//! ```

use std::path::Path;

use tracing::{debug, info};

use crate::bundle::{BundleBuilder, EvidenceBundle};
use crate::config::TriageConfig;
use crate::error::Result;
use crate::oracle::ClassificationOracle;
use crate::orchestrator::AnalysisOrchestrator;
use crate::redact::Redactor;
use crate::report_tree::SuiteNode;
use crate::trace::{TraceArchiveReader, TraceExcerpt};
use crate::verdict::AnalysisResult;
use crate::walker::ResultTreeWalker;

pub struct TriagePipeline<O: ClassificationOracle> {
    walker: ResultTreeWalker,
    traces: TraceArchiveReader,
    redactor: Redactor,
    orchestrator: AnalysisOrchestrator<O>,
    max_failures: usize,
}

impl<O: ClassificationOracle> TriagePipeline<O> {
    pub fn new(config: &TriageConfig, oracle: O) -> Result<Self> {
        let redactor = config.redactor()?;
        Ok(Self {
            walker: ResultTreeWalker::new(config.max_message_chars),
            traces: TraceArchiveReader::new(config.trace.clone())
                .with_redactor(redactor.clone()),
            redactor,
            orchestrator: AnalysisOrchestrator::new(oracle, config.oracle.timeout()),
            max_failures: config.max_failures,
        })
    }

    pub fn orchestrator(&self) -> &AnalysisOrchestrator<O> {
        &self.orchestrator
    }

    /// Model id reported by the oracle.
    pub fn model_name(&self) -> &str {
        self.orchestrator.oracle().model_name()
    }

    /// Load the trace excerpt for this run, if any archive is present.
    pub fn load_trace(&self, trace_dir: Option<&Path>) -> Result<Option<TraceExcerpt>> {
        let Some(dir) = trace_dir else {
            return Ok(None);
        };
        let Some(archive) = self.traces.find_archive(dir)? else {
            info!(dir = %dir.display(), "No trace archive found");
            return Ok(None);
        };
        let excerpt = self.traces.extract(&archive)?;
        info!(
            archive = %archive.display(),
            entries = excerpt.entries.len(),
            truncated = excerpt.total_truncated,
            "Loaded trace excerpt"
        );
        Ok(Some(excerpt))
    }

    /// Failure records to bundles, capped at `max_failures`.
    pub fn build_bundles(
        &self,
        root: &SuiteNode,
        excerpt: Option<&TraceExcerpt>,
    ) -> Vec<EvidenceBundle> {
        let failures = self.walker.collect_failures(root);
        let found = failures.len();
        if found > self.max_failures {
            info!(
                found,
                analyzing = self.max_failures,
                "Capping failures for analysis"
            );
        }

        let builder = BundleBuilder::new(&self.redactor);
        let bundles: Vec<_> = failures
            .into_iter()
            .take(self.max_failures)
            .map(|record| builder.build(record, excerpt))
            .collect();
        debug!(bundles = bundles.len(), "Built evidence bundles");
        bundles
    }

    /// Run the whole pipeline for one report tree.
    pub async fn run(
        &self,
        root: &SuiteNode,
        trace_dir: Option<&Path>,
    ) -> Result<Vec<AnalysisResult>> {
        let excerpt = self.load_trace(trace_dir)?;
        let bundles = self.build_bundles(root, excerpt.as_ref());
        info!(count = bundles.len(), "Analyzing failures");
        Ok(self.orchestrator.analyze_all(bundles).await)
    }
}
