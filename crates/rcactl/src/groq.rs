//! Groq chat-completion transport.
//!
//! Speaks the OpenAI-compatible `/chat/completions` wire format and hands the
//! raw response document to the narrative generator, which owns payload
//! validation and the fallback decision. Every failure here is
//! [`RcaError::NarrativeUnavailable`]: a missing key, a timeout, or an API
//! error degrades the narrative, never the run. One attempt per run, no
//! retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use rca_common::config::LlmConfig;
use rca_common::{ChatTransport, RcaError};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// HTTP client bound to one Groq endpoint, model, and API key.
pub struct GroqClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f64,
    api_key: String,
}

impl GroqClient {
    /// Reads the API key from the configured environment variable. A missing
    /// key is a narrative-only failure, so callers fall back instead of
    /// aborting.
    pub fn from_config(config: &LlmConfig) -> Result<Self, RcaError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            RcaError::NarrativeUnavailable(format!(
                "environment variable {} is not set",
                config.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                RcaError::NarrativeUnavailable(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: config.chat_endpoint(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
        })
    }
}

#[async_trait]
impl ChatTransport for GroqClient {
    async fn complete(&self, prompt: &str) -> Result<Value, RcaError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
        };

        debug!("Requesting narrative from {} ({})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RcaError::NarrativeUnavailable(format!("chat request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RcaError::NarrativeUnavailable(format!(
                "chat API error {}: {}",
                status, body
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            RcaError::NarrativeUnavailable(format!("unparseable chat response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: "llama-3.1-8b-instant".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Explain the outage".to_string(),
            }],
            temperature: 0.2,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Explain the outage");
        assert_eq!(json["temperature"], 0.2);
    }

    #[test]
    fn test_missing_api_key_is_narrative_failure() {
        let config = LlmConfig {
            api_key_env: "CEPH_RCA_TEST_KEY_THAT_DOES_NOT_EXIST".to_string(),
            ..LlmConfig::default()
        };

        let err = match GroqClient::from_config(&config) {
            Err(e) => e,
            Ok(_) => panic!("missing key must fail client construction"),
        };
        assert_eq!(err.code(), "NARRATIVE_UNAVAILABLE");
        assert!(!err.is_fatal());
        assert!(err
            .to_string()
            .contains("CEPH_RCA_TEST_KEY_THAT_DOES_NOT_EXIST"));
    }

    #[test]
    fn test_present_api_key_builds_client() {
        std::env::set_var("CEPH_RCA_TEST_KEY_PRESENT", "gsk_test");
        let config = LlmConfig {
            api_key_env: "CEPH_RCA_TEST_KEY_PRESENT".to_string(),
            ..LlmConfig::default()
        };

        let client = GroqClient::from_config(&config).unwrap();
        assert_eq!(client.model, "llama-3.1-8b-instant");
        assert!(client.endpoint.ends_with("/chat/completions"));
        std::env::remove_var("CEPH_RCA_TEST_KEY_PRESENT");
    }
}
