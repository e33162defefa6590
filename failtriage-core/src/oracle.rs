//! Classification oracle
//!
//! The orchestrator only sees [`ClassificationOracle`]: a request goes in,
//! raw text comes out. Validation of that text happens in the orchestrator.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::bundle::EvidenceBundle;
use crate::error::OracleError;

/// Everything the oracle receives for one failure.
#[derive(Debug, Clone, Serialize)]
pub struct OracleRequest<'a> {
    pub instructions: &'a str,
    pub bundle: &'a EvidenceBundle,
    pub output_schema: &'a Value,
}

/// Narrow capability: classify one bundle, return the raw reply text.
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    async fn classify(&self, request: &OracleRequest<'_>) -> Result<String, OracleError>;

    /// Model identifier, recorded in the report.
    fn model_name(&self) -> &str;
}
