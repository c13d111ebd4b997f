//! Scripted sandbox - replays a predefined outcome sequence.

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use async_trait::async_trait;

use crate::error::SandboxError;
use crate::traits::{Sandbox, StepOutcome};

/// One step of a scripted environment run.
#[derive(Debug, Clone)]
pub struct ScriptedStep {
    /// State reported after this step
    pub state: Value,
    /// Reward for this step
    pub reward: f64,
    /// Score reported by `verify_score` while on this step
    pub score: f64,
}

impl ScriptedStep {
    /// Create a step with `state` as its post-action state.
    #[must_use]
    pub fn new(state: Value, reward: f64) -> Self {
        Self {
            state,
            reward,
            score: reward,
        }
    }

    /// Set the score for this step.
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

/// An environment that replays a fixed script of outcomes.
///
/// The last scripted step is terminal: executing it returns
/// `done = true`, and executing past it is an error. Scripts make
/// multi-round engine behavior fully deterministic.
pub struct ScriptedSandbox {
    script: Vec<ScriptedStep>,
    cursor: Mutex<usize>,
}

impl ScriptedSandbox {
    /// Create a sandbox from a script of steps.
    #[must_use]
    pub fn new(script: Vec<ScriptedStep>) -> Self {
        Self {
            script,
            cursor: Mutex::new(0),
        }
    }

    /// Convenience: build a script from reward values alone.
    #[must_use]
    pub fn from_rewards(rewards: &[f64]) -> Self {
        let script = rewards
            .iter()
            .enumerate()
            .map(|(i, &reward)| ScriptedStep::new(json!({ "step": i + 1 }), reward))
            .collect();
        Self::new(script)
    }
}

#[async_trait]
impl Sandbox for ScriptedSandbox {
    async fn generate_case(&self) -> Result<Value, SandboxError> {
        let cursor = self.cursor.lock().await;
        Ok(json!({ "case": "scripted", "step": *cursor }))
    }

    async fn execute(&self, _action: &Value) -> Result<StepOutcome, SandboxError> {
        let mut cursor = self.cursor.lock().await;

        let step = self
            .script
            .get(*cursor)
            .ok_or(SandboxError::Exhausted(*cursor as u64))?;

        *cursor += 1;
        let done = *cursor >= self.script.len();
        debug!(step = *cursor, reward = step.reward, done, "Scripted step");

        Ok(StepOutcome::new(step.state.clone(), step.reward, done))
    }

    async fn verify_score(&self, _action: &Value, _case: &Value) -> Result<f64, SandboxError> {
        let cursor = self.cursor.lock().await;
        // Score the most recently executed step; before any execution
        // the first step's score stands.
        let index = cursor
            .saturating_sub(1)
            .min(self.script.len().saturating_sub(1));
        self.script
            .get(index)
            .map(|step| step.score)
            .ok_or_else(|| SandboxError::ScoringFailed("empty script".into()))
    }

    async fn is_ready(&self) -> Result<bool, SandboxError> {
        Ok(!self.script.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_script() {
        let sandbox = ScriptedSandbox::from_rewards(&[0.1, 0.2, 0.3]);

        let first = sandbox.execute(&json!("a")).await.unwrap();
        assert_eq!(first.reward, 0.1);
        assert!(!first.done);

        let second = sandbox.execute(&json!("b")).await.unwrap();
        assert_eq!(second.reward, 0.2);

        let third = sandbox.execute(&json!("c")).await.unwrap();
        assert_eq!(third.reward, 0.3);
        assert!(third.done);
    }

    #[tokio::test]
    async fn test_exhausted_script_errors() {
        let sandbox = ScriptedSandbox::from_rewards(&[1.0]);

        sandbox.execute(&json!("a")).await.unwrap();
        let err = sandbox.execute(&json!("b")).await.unwrap_err();

        assert!(matches!(err, SandboxError::Exhausted(_)));
    }

    #[tokio::test]
    async fn test_empty_script_not_ready() {
        let sandbox = ScriptedSandbox::new(vec![]);
        assert!(!sandbox.is_ready().await.unwrap());
    }
}
