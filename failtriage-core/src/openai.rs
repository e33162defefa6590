//! OpenAI oracle
//!
//! Chat completions with a `json_schema` response format. Returns the first
//! choice's message content untouched; validation is the caller's job.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::OracleError;
use crate::oracle::{ClassificationOracle, OracleRequest};
use crate::prompt::build_user_prompt;
use crate::trace::take_chars;

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone)]
pub struct OpenAiOracle {
    api_key: String,
    model: String,
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiOracle {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        Ok(Self {
            api_key,
            model: model.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout,
            client,
        })
    }

    /// Point at a compatible endpoint (proxy, gateway, local server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout(self.timeout)
        } else {
            OracleError::Transport(e.to_string())
        }
    }

    fn request_body(&self, request: &OracleRequest<'_>) -> Value {
        serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": request.instructions},
                {"role": "user", "content": build_user_prompt(request.bundle)}
            ],
            "temperature": 0.1,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "failure_analysis",
                    "schema": request.output_schema,
                    "strict": false
                }
            }
        })
    }
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

/// Pull the first choice's content out of a chat-completions reply.
fn extract_content(body: &str) -> Result<String, OracleError> {
    let api_response: ApiResponse = serde_json::from_str(body)
        .map_err(|e| OracleError::Transport(format!("failed to decode OpenAI response: {}", e)))?;
    api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(OracleError::EmptyResponse)
}

#[async_trait]
impl ClassificationOracle for OpenAiOracle {
    async fn classify(&self, request: &OracleRequest<'_>) -> Result<String, OracleError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;
        if !status.is_success() {
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("OpenAI raw response: {}", take_chars(&body, 1000));
        extract_content(&body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::EvidenceBundle;
    use crate::report_tree::TestStatus;
    use crate::verdict::analysis_schema;

    fn oracle() -> OpenAiOracle {
        OpenAiOracle::new("test-key".to_string(), DEFAULT_MODEL, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_new_oracle() {
        let o = oracle();
        assert_eq!(o.model_name(), DEFAULT_MODEL);
        assert_eq!(o.endpoint(), DEFAULT_ENDPOINT);
        let o = o.with_endpoint("http://localhost:9999/v1/chat/completions");
        assert_eq!(o.endpoint(), "http://localhost:9999/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let bundle = EvidenceBundle {
            suite_name: "Login".into(),
            test_name: "t".into(),
            status: TestStatus::Fail,
            message: "boom".into(),
            trace: None,
        };
        let schema = analysis_schema();
        let request = OracleRequest {
            instructions: "classify",
            bundle: &bundle,
            output_schema: &schema,
        };
        let body = oracle().request_body(&request);
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["content"], "classify");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap()
            .contains("\"test_name\": \"t\""));
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["schema"], schema);
    }

    #[test]
    fn test_extract_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"{\"a\":1}"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_extract_content_empty() {
        assert!(matches!(
            extract_content(r#"{"choices":[]}"#),
            Err(OracleError::EmptyResponse)
        ));
        assert!(matches!(
            extract_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(OracleError::EmptyResponse)
        ));
        assert!(matches!(
            extract_content("<html>"),
            Err(OracleError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let o = oracle().with_endpoint("http://127.0.0.1:1/v1/chat/completions");
        let bundle = EvidenceBundle {
            suite_name: "s".into(),
            test_name: "t".into(),
            status: TestStatus::Fail,
            message: String::new(),
            trace: None,
        };
        let schema = analysis_schema();
        let request = OracleRequest {
            instructions: "x",
            bundle: &bundle,
            output_schema: &schema,
        };
        let err = o.classify(&request).await.unwrap_err();
        assert!(matches!(
            err,
            OracleError::Transport(_) | OracleError::Timeout(_)
        ));
    }
}
