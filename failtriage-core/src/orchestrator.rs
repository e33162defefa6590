//! Analysis orchestrator
//!
//! Sends each bundle to the oracle in order and always produces exactly one
//! [`AnalysisResult`] per bundle. Any failure for a bundle (transport,
//! timeout, bad output) becomes a fallback result for that bundle only.
//! There are no retries.

use std::time::Duration;

use serde_json::Value;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::bundle::EvidenceBundle;
use crate::error::OracleError;
use crate::oracle::{ClassificationOracle, OracleRequest};
use crate::prompt::SYSTEM_INSTRUCTIONS;
use crate::verdict::{analysis_schema, parse_verdict, AnalysisResult, ParsedVerdict};

/// Why a single bundle could not be classified.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("{0}")]
    SchemaInvalid(String),

    #[error("{0}")]
    Unparseable(String),
}

pub struct AnalysisOrchestrator<O: ClassificationOracle> {
    oracle: O,
    call_timeout: Duration,
    schema: Value,
}

impl<O: ClassificationOracle> AnalysisOrchestrator<O> {
    pub fn new(oracle: O, call_timeout: Duration) -> Self {
        Self {
            oracle,
            call_timeout,
            schema: analysis_schema(),
        }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Classify one bundle. Errors are per-bundle and recoverable.
    pub async fn analyze(&self, bundle: &EvidenceBundle) -> Result<AnalysisResult, AnalysisError> {
        let request = OracleRequest {
            instructions: SYSTEM_INSTRUCTIONS,
            bundle,
            output_schema: &self.schema,
        };

        let raw = match timeout(self.call_timeout, self.oracle.classify(&request)).await {
            Ok(reply) => reply?,
            Err(_elapsed) => return Err(OracleError::Timeout(self.call_timeout).into()),
        };

        match parse_verdict(&raw) {
            ParsedVerdict::Parsed(mut result) => {
                if result.test_name != bundle.test_name || result.suite_name != bundle.suite_name {
                    warn!(
                        expected_suite = %bundle.suite_name,
                        expected_test = %bundle.test_name,
                        got_suite = %result.suite_name,
                        got_test = %result.test_name,
                        "Oracle renamed the failure; keeping bundle identity"
                    );
                    result.test_name = bundle.test_name.clone();
                    result.suite_name = bundle.suite_name.clone();
                }
                Ok(result)
            }
            ParsedVerdict::SchemaInvalid(detail) => Err(AnalysisError::SchemaInvalid(detail)),
            ParsedVerdict::Unparseable(detail) => Err(AnalysisError::Unparseable(detail)),
        }
    }

    /// Classify every bundle in order, one result per bundle.
    pub async fn analyze_all(&self, bundles: Vec<EvidenceBundle>) -> Vec<AnalysisResult> {
        let mut results = Vec::with_capacity(bundles.len());

        for bundle in bundles {
            let result = match self.analyze(&bundle).await {
                Ok(result) => {
                    info!(
                        "[AI] {} ({:.2}) - {}",
                        result.failure_type, result.confidence, result.test_name
                    );
                    result
                }
                Err(e) => {
                    error!("[AI] ERROR analyzing {}: {}", bundle.test_name, e);
                    AnalysisResult::fallback(&bundle.suite_name, &bundle.test_name, e.to_string())
                }
            };
            results.push(result);
        }

        results
    }
}
