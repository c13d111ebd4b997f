//! Sandbox traits and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SandboxError;

/// Result of executing one action against an environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Environment state after the action
    pub next_state: Value,
    /// Reward earned by the action
    pub reward: f64,
    /// Whether the environment reached a terminal state
    pub done: bool,
}

impl StepOutcome {
    /// Create a new outcome.
    #[must_use]
    pub fn new(next_state: Value, reward: f64, done: bool) -> Self {
        Self {
            next_state,
            reward,
            done,
        }
    }

    /// Check if the environment is still running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        !self.done
    }
}

/// Trait for environment sandboxes.
///
/// A sandbox is an isolated task environment with three operations:
/// case generation, action execution, and action scoring. Given
/// identical internal state and action, every operation must be
/// deterministic.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Generate a task case from the environment's current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot produce a case.
    async fn generate_case(&self) -> Result<Value, SandboxError>;

    /// Execute an action and advance the environment state.
    ///
    /// # Errors
    ///
    /// Returns an error if the action is invalid or execution fails.
    async fn execute(&self, action: &Value) -> Result<StepOutcome, SandboxError>;

    /// Score an action against a case.
    ///
    /// # Errors
    ///
    /// Returns an error if scoring fails.
    async fn verify_score(&self, action: &Value, case: &Value) -> Result<f64, SandboxError>;

    /// Check if the sandbox is ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the sandbox is not accessible.
    async fn is_ready(&self) -> Result<bool, SandboxError>;
}

/// Implementation of Sandbox for Box<dyn Sandbox>.
/// This allows using trait objects where a generic sandbox is expected.
#[async_trait]
impl Sandbox for Box<dyn Sandbox> {
    async fn generate_case(&self) -> Result<Value, SandboxError> {
        (**self).generate_case().await
    }

    async fn execute(&self, action: &Value) -> Result<StepOutcome, SandboxError> {
        (**self).execute(action).await
    }

    async fn verify_score(&self, action: &Value, case: &Value) -> Result<f64, SandboxError> {
        (**self).verify_score(action, case).await
    }

    async fn is_ready(&self) -> Result<bool, SandboxError> {
        (**self).is_ready().await
    }
}
