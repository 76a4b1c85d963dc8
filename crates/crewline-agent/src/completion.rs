// ABOUTME: Chat-completions client for the local model runner's OpenAI-compatible API.
// ABOUTME: Defines the CompletionClient trait, its reqwest implementation, and the model availability check.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crewline_core::{AgentConfig, Message};

/// Upper bound on the availability check's wait, shorter than a completion's.
const MODELS_TIMEOUT_SECS: u64 = 10;

/// Errors that can occur while talking to the completion endpoint.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

/// Anything that can turn a message sequence into the assistant's reply text.
/// The HTTP client implements it for real runs; tests substitute scripted stubs.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `messages` in order and return the assistant's text.
    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError>;

    /// Model identifier being used, for logging and display.
    fn model_name(&self) -> &str;
}

/// Run a completion and fold any failure into the reply as `Error: <message>`.
///
/// Callers on the crew path treat the returned text as agent output either way;
/// there is no separate error channel.
pub async fn complete_inline(client: &dyn CompletionClient, messages: &[Message]) -> String {
    match client.complete(messages).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                model = %client.model_name(),
                error = %e,
                "completion failed, embedding error in agent output"
            );
            format!("Error: {}", e)
        }
    }
}

/// Whether the configured model is served by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Available,
    Missing { model: String, available: Vec<String> },
}

/// reqwest-backed client for `POST {model_url}/chat/completions`.
pub struct HttpCompletionClient {
    client: reqwest::Client,
    config: AgentConfig,
}

impl HttpCompletionClient {
    /// Build a client whose requests are bounded by `config.request_timeout`.
    pub fn new(config: AgentConfig) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CompletionError::ProviderError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Build the JSON request body for the Chat Completions API.
    pub fn build_request_body(&self, messages: &[Message]) -> Value {
        json!({
            "model": self.config.model_name,
            "messages": messages,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": false
        })
    }

    /// Extract `choices[0].message.content` from a Chat Completions response.
    pub fn parse_response(response_body: &Value) -> Result<String, CompletionError> {
        let choice = response_body
            .get("choices")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                CompletionError::InvalidResponse("missing choices array in response".to_string())
            })?
            .first()
            .ok_or_else(|| CompletionError::InvalidResponse("empty choices array".to_string()))?;

        choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(String::from)
            .ok_or_else(|| {
                CompletionError::InvalidResponse("missing message content in choice".to_string())
            })
    }

    /// Extract model ids from a `GET /models` response (`{"data": [{"id": ...}]}`).
    pub fn parse_models(response_body: &Value) -> Vec<String> {
        response_body
            .get("data")
            .and_then(|d| d.as_array())
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m.get("id").and_then(|id| id.as_str()).map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Timeout applied to `GET /models`: the configured request timeout,
    /// capped at ten seconds.
    pub fn models_timeout(&self) -> Duration {
        self.config
            .request_timeout
            .min(Duration::from_secs(MODELS_TIMEOUT_SECS))
    }

    /// List the model ids the endpoint currently serves.
    pub async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        let url = self.config.models_url();
        let timeout = self.models_timeout();
        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(&url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::ProviderError(format!(
                "model runner not responding: {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(format!("failed to parse JSON: {}", e)))?;

        Ok(Self::parse_models(&body))
    }

    /// Check that the configured model appears in the endpoint's model list.
    pub async fn check_model(&self) -> Result<ModelStatus, CompletionError> {
        let available = self.list_models().await?;
        if available.iter().any(|id| *id == self.config.model_name) {
            Ok(ModelStatus::Available)
        } else {
            Ok(ModelStatus::Missing {
                model: self.config.model_name.clone(),
                available,
            })
        }
    }

}

/// Map a reqwest failure to a `CompletionError`, reporting the timeout that
/// was actually in force for the request.
fn transport_error(url: &str, timeout: Duration, e: reqwest::Error) -> CompletionError {
    if e.is_timeout() {
        CompletionError::Timeout(timeout.as_secs())
    } else {
        CompletionError::ProviderError(format!("HTTP request to {} failed: {}", url, e))
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, CompletionError> {
        let body = self.build_request_body(messages);
        let url = self.config.completions_url();

        tracing::debug!(model = %self.config.model_name, messages = messages.len(), "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&url, self.config.request_timeout, e))?;

        let status = response.status();

        if status.is_server_error() {
            return Err(CompletionError::ProviderError(format!(
                "Server error: {}",
                status
            )));
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CompletionError::ProviderError(format!(
                "API error {}: {}",
                status, error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(format!("failed to parse JSON: {}", e)))?;

        Self::parse_response(&response_body)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}
