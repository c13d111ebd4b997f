//! Mock decision backend for tests and demos.

use serde_json::json;
use tokio::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::traits::{DecisionModel, DecisionResponse, GenerateOptions};

/// Failure behavior of a [`MockModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockMode {
    /// Every call succeeds
    Ok,
    /// `generate` fails with an API error
    FailGenerate,
    /// `health_check` fails (backend unreachable)
    Unavailable,
}

/// A deterministic decision backend.
///
/// By default every call returns the configured response text with a
/// fixed confidence and a generation counter in the metadata. Failure
/// modes exercise the engine's error paths.
pub struct MockModel {
    model: String,
    response: String,
    confidence: f64,
    mode: MockMode,
    generations: Mutex<u64>,
}

impl MockModel {
    /// Create a mock backend named `model`.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            response: "ok".to_string(),
            confidence: 0.9,
            mode: MockMode::Ok,
            generations: Mutex::new(0),
        }
    }

    /// Set the canned response text.
    #[must_use]
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = response.into();
        self
    }

    /// Set the reported confidence.
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Make every `generate` call fail.
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.mode = MockMode::FailGenerate;
        self
    }

    /// Make the backend report itself unreachable.
    #[must_use]
    pub const fn unavailable(mut self) -> Self {
        self.mode = MockMode::Unavailable;
        self
    }
}

#[async_trait]
impl DecisionModel for MockModel {
    fn backend(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<DecisionResponse, LlmError> {
        if self.mode == MockMode::FailGenerate {
            return Err(LlmError::ApiError("mock generate failure".into()));
        }

        let mut generations = self.generations.lock().await;
        *generations += 1;

        Ok(DecisionResponse::new(self.response.clone(), self.confidence)
            .with_reasoning("canned response")
            .with_metadata(json!({
                "generation_count": *generations,
                "prompt_length": prompt.len(),
                "temperature": options.temperature,
            })))
    }

    async fn health_check(&self) -> Result<bool, LlmError> {
        match self.mode {
            MockMode::Unavailable => Err(LlmError::NotAvailable("mock backend offline".into())),
            _ => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_response() {
        let model = MockModel::new("mock").with_response("BUY 10").with_confidence(0.75);

        let response = model
            .generate("market is up", &GenerateOptions::default())
            .await
            .unwrap();

        assert_eq!(response.text, "BUY 10");
        assert_eq!(response.confidence, 0.75);
        assert_eq!(response.metadata["generation_count"], 1);
    }

    #[tokio::test]
    async fn test_generation_counter_advances() {
        let model = MockModel::new("mock");

        model.generate("a", &GenerateOptions::default()).await.unwrap();
        let second = model.generate("b", &GenerateOptions::default()).await.unwrap();

        assert_eq!(second.metadata["generation_count"], 2);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let model = MockModel::new("mock").failing();
        let err = model
            .generate("a", &GenerateOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::ApiError(_)));
        // Health is still fine; only generation fails.
        assert!(model.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_unavailable_mode() {
        let model = MockModel::new("mock").unavailable();
        assert!(model.health_check().await.is_err());
    }
}
