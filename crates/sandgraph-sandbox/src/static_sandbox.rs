//! Static sandbox - constant-outcome environment for tests and demos.

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use async_trait::async_trait;

use crate::error::SandboxError;
use crate::traits::{Sandbox, StepOutcome};

/// An environment that returns the same reward for every action.
///
/// The internal state is a step counter; `next_state` reports the number
/// of executed steps, so state progression is observable while outcomes
/// stay constant. Useful for wiring tests and reward-accounting checks.
pub struct StaticSandbox {
    reward: f64,
    score: f64,
    /// Terminate after this many steps, if set.
    done_after: Option<u64>,
    steps: Mutex<u64>,
}

impl StaticSandbox {
    /// Create a sandbox that always yields `reward` and never terminates.
    #[must_use]
    pub fn new(reward: f64) -> Self {
        Self {
            reward,
            score: reward,
            done_after: None,
            steps: Mutex::new(0),
        }
    }

    /// Set the score returned by `verify_score`.
    #[must_use]
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    /// Terminate the environment after `steps` executed actions.
    #[must_use]
    pub fn with_done_after(mut self, steps: u64) -> Self {
        self.done_after = Some(steps);
        self
    }
}

#[async_trait]
impl Sandbox for StaticSandbox {
    async fn generate_case(&self) -> Result<Value, SandboxError> {
        let steps = self.steps.lock().await;
        Ok(json!({ "case": "static", "step": *steps }))
    }

    async fn execute(&self, action: &Value) -> Result<StepOutcome, SandboxError> {
        let mut steps = self.steps.lock().await;
        *steps += 1;

        let done = self.done_after.is_some_and(|limit| *steps >= limit);
        debug!(step = *steps, reward = self.reward, done, "Static step");

        Ok(StepOutcome::new(
            json!({ "step": *steps, "last_action": action }),
            self.reward,
            done,
        ))
    }

    async fn verify_score(&self, _action: &Value, _case: &Value) -> Result<f64, SandboxError> {
        Ok(self.score)
    }

    async fn is_ready(&self) -> Result<bool, SandboxError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_constant_reward() {
        let sandbox = StaticSandbox::new(1.0);

        for _ in 0..3 {
            let outcome = sandbox.execute(&json!("noop")).await.unwrap();
            assert_eq!(outcome.reward, 1.0);
            assert!(!outcome.done);
        }
    }

    #[tokio::test]
    async fn test_state_advances() {
        let sandbox = StaticSandbox::new(0.5);

        let first = sandbox.execute(&json!("noop")).await.unwrap();
        let second = sandbox.execute(&json!("noop")).await.unwrap();

        assert_eq!(first.next_state["step"], 1);
        assert_eq!(second.next_state["step"], 2);
    }

    #[tokio::test]
    async fn test_done_after() {
        let sandbox = StaticSandbox::new(1.0).with_done_after(2);

        assert!(!sandbox.execute(&json!("a")).await.unwrap().done);
        assert!(sandbox.execute(&json!("b")).await.unwrap().done);
    }

    #[tokio::test]
    async fn test_score() {
        let sandbox = StaticSandbox::new(1.0).with_score(0.25);
        let case = sandbox.generate_case().await.unwrap();

        let score = sandbox.verify_score(&json!("noop"), &case).await.unwrap();
        assert_eq!(score, 0.25);
    }
}
