//! Chat-completion client
//!
//! [`ChatBackend`] is the transport seam: the production implementation talks
//! to an OpenAI-compatible `/chat/completions` endpoint, tests plug in scripted
//! backends. [`LlmClient`] wraps a backend together with the request's
//! [`CallBudget`] so every call is counted exactly once, whatever its outcome.
//!
//! Nothing here returns a panic or an unchecked JSON access: every transport,
//! status or payload problem becomes a [`ClientError`].

use super::CallBudget;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("brandrank/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an unparseable error body echoed into an error message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Chat client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("credentials missing")]
    CredentialsMissing,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("API error: {0}")]
    Provider(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty reply")]
    EmptyReply,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat-completion request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(model: &str, system_prompt: &str, user_prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
        }
    }

    pub fn system_prompt(&self) -> &str {
        self.message_content("system")
    }

    pub fn user_prompt(&self) -> &str {
        self.message_content("user")
    }

    fn message_content(&self, role: &str) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Transport for chat-completion requests
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one request and return the reply text
    async fn send(&self, request: &ChatRequest) -> Result<String, ClientError>;

    /// Whether credentials are configured (checked before a run starts)
    fn has_credentials(&self) -> bool {
        true
    }
}

// Provider response schema. Every field is optional so that odd-but-valid
// JSON decodes and is classified below instead of failing as a parse error.

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: Option<String>,
}

/// Classify an HTTP status + body into reply text or a [`ClientError`]
pub(crate) fn decode_completion(status: u16, body: &str) -> Result<String, ClientError> {
    let parsed = serde_json::from_str::<CompletionResponse>(body);

    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .and_then(|r| r.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| {
                let snippet: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
                if snippet.is_empty() {
                    "no response body".to_string()
                } else {
                    snippet
                }
            });
        return Err(ClientError::Api { status, message });
    }

    let response = parsed.map_err(|e| ClientError::Parse(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(ClientError::Provider(
            error
                .message
                .unwrap_or_else(|| "unknown provider error".to_string()),
        ));
    }

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| ClientError::Parse("response has no choices[0].message.content".to_string()))?;

    let content = content.trim();
    if content.is_empty() {
        return Err(ClientError::EmptyReply);
    }

    Ok(content.to_string())
}

/// OpenAI-compatible chat-completion backend (OpenRouter by default)
pub struct OpenRouterBackend {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenRouterBackend {
    /// Create a backend for `{base_url}/chat/completions`
    ///
    /// A missing key is accepted here; every send then fails with
    /// [`ClientError::CredentialsMissing`] without touching the network.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout.as_secs())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl ChatBackend for OpenRouterBackend {
    async fn send(&self, request: &ChatRequest) -> Result<String, ClientError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ClientError::CredentialsMissing)?;

        tracing::debug!(model = %request.model, endpoint = %self.endpoint, "Sending chat completion");

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("X-Title", "brandrank")
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        decode_completion(status, &body)
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Budget-counting chat client shared by every phase of one request
#[derive(Clone)]
pub struct LlmClient {
    backend: Arc<dyn ChatBackend>,
    budget: Arc<CallBudget>,
}

impl LlmClient {
    pub fn new(backend: Arc<dyn ChatBackend>, budget: Arc<CallBudget>) -> Self {
        Self { backend, budget }
    }

    pub fn budget(&self) -> &CallBudget {
        &self.budget
    }

    /// Send one chat request to `model`
    ///
    /// Counts against the budget before the request is sent, so failed calls
    /// are counted too.
    pub async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ClientError> {
        let issued = self.budget.record_call();
        tracing::debug!(
            model = %model,
            issued,
            limit = self.budget.limit(),
            "Model call issued"
        );

        let request = ChatRequest::new(model, system_prompt, user_prompt);
        let result = self.backend.send(&request).await;

        if let Err(ref e) = result {
            tracing::warn!(model = %model, error = %e, "Model call failed");
        }

        result
    }
}

#[cfg(test)]
#[path = "../../tests/helpers/scripted_backend.rs"]
pub(crate) mod test_support;
