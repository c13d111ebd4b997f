//! OpenAI-compatible chat-completions backend.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use async_trait::async_trait;

use crate::error::LlmError;
use crate::traits::{DecisionModel, DecisionResponse, GenerateOptions};

/// Decision backend speaking the OpenAI chat-completions protocol.
///
/// Works against api.openai.com or any compatible endpoint (vLLM,
/// llama.cpp server, together.ai, ...).
pub struct OpenAiCompatModel {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl OpenAiCompatModel {
    /// Create a backend for `model` against api.openai.com.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: model.into(),
            temperature: 0.7,
        }
    }

    /// Point the backend at a compatible server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the API key sent as a bearer token.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the default sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Serialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[async_trait]
impl DecisionModel for OpenAiCompatModel {
    fn backend(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt, options), fields(backend = "openai", model = %self.model))]
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<DecisionResponse, LlmError> {
        debug!(prompt_len = prompt.len(), "Generating decision");

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: options.temperature.unwrap_or(self.temperature),
            max_tokens: options.max_tokens,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LlmError::AuthenticationError(status.to_string()));
        }
        if !status.is_success() {
            return Err(LlmError::ApiError(format!(
                "backend returned status {status}"
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = chat_response.choices.first().ok_or(LlmError::EmptyResponse)?;
        let text = choice
            .message
            .content
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        // Confidence from finish reason: a clean stop is trustworthy,
        // a truncated or filtered response less so.
        let finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown");
        let confidence = if finish_reason == "stop" { 0.9 } else { 0.7 };

        let usage = chat_response
            .usage
            .and_then(|u| serde_json::to_value(u).ok());

        Ok(DecisionResponse::new(text, confidence).with_metadata(serde_json::json!({
            "finish_reason": finish_reason,
            "usage": usage,
        })))
    }

    async fn health_check(&self) -> Result<bool, LlmError> {
        let mut builder = self.client.get(format!("{}/models", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(response.status().is_success())
    }
}
