//! Core traits and types for decision backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LlmError;

/// Options controlling a single generation call.
///
/// Unset fields fall back to the backend's defaults. Node registration
/// stores a set of options; per-call overrides win over registered ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerateOptions {
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Reasoning style hint forwarded to the backend (e.g. "strategic")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_type: Option<String>,
}

impl GenerateOptions {
    /// Create empty options (backend defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the reasoning style hint.
    #[must_use]
    pub fn with_reasoning_type(mut self, reasoning_type: impl Into<String>) -> Self {
        self.reasoning_type = Some(reasoning_type.into());
        self
    }

    /// Merge `overrides` on top of these options; set override fields win.
    #[must_use]
    pub fn merged_with(&self, overrides: &GenerateOptions) -> Self {
        Self {
            temperature: overrides.temperature.or(self.temperature),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
            reasoning_type: overrides
                .reasoning_type
                .clone()
                .or_else(|| self.reasoning_type.clone()),
        }
    }
}

/// Response from a decision backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResponse {
    /// Generated decision text
    pub text: String,
    /// Backend confidence in the decision, in `[0, 1]`
    pub confidence: f64,
    /// Optional reasoning trace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Backend-specific metadata
    #[serde(default)]
    pub metadata: Value,
}

impl DecisionResponse {
    /// Create a response with just text and confidence.
    #[must_use]
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
            reasoning: None,
            metadata: Value::Null,
        }
    }

    /// Attach a reasoning trace.
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Attach backend metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Trait for decision backends.
///
/// Implement this trait to plug a model behind the shared manager.
#[async_trait]
pub trait DecisionModel: Send + Sync {
    /// Get the backend name (e.g. "mock", "openai").
    fn backend(&self) -> &str;

    /// Get the model name being used.
    fn model(&self) -> &str;

    /// Generate a decision from a prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<DecisionResponse, LlmError>;

    /// Check if the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the health check fails.
    async fn health_check(&self) -> Result<bool, LlmError>;
}
