//! Policy trainer - batches experience and applies updates at round
//! boundaries.

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use async_trait::async_trait;

use crate::config::RlConfig;
use crate::error::RlError;
use crate::experience::{Experience, ExperienceBuffer};

/// Snapshot of trainer statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Algorithm family name
    pub algorithm: String,
    /// Number of applied policy updates
    pub updates: u64,
    /// Total experience records ever added
    pub total_experiences: u64,
    /// Sum of all rewards ever added
    pub reward_sum: f64,
    /// Size of the batch consumed by the last update
    pub last_batch_size: usize,
    /// Mean discounted return of the last update batch
    pub last_mean_return: f64,
    /// Current running baseline
    pub baseline: f64,
    /// Experience currently buffered (not yet consumed by an update)
    pub buffered: usize,
    /// Learning rate in effect
    pub learning_rate: f64,
}

/// Trait for policy-update backends.
///
/// The workflow engine holds one trainer per workflow and is the only
/// caller of `update_policy`; it invokes it at round boundaries with
/// whatever experience the bridge enqueued during the round.
#[async_trait]
pub trait PolicyTrainer: Send + Sync {
    /// Append one experience record to the trainer's buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the trainer cannot accept experience.
    async fn add_experience(&self, experience: Experience) -> Result<(), RlError>;

    /// Apply a policy update over all buffered experience.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    async fn update_policy(&self) -> Result<TrainingStats, RlError>;

    /// Current statistics snapshot.
    async fn training_stats(&self) -> TrainingStats;
}

struct TrainerState {
    buffer: ExperienceBuffer,
    updates: u64,
    total_experiences: u64,
    reward_sum: f64,
    last_batch_size: usize,
    last_mean_return: f64,
    baseline: f64,
}

/// Reference trainer: discounted returns against a running baseline.
///
/// Not a production optimizer - it implements the full capability
/// contract (buffering, batched updates, cumulative statistics) while
/// keeping the policy mathematics trivial, which is all the engine
/// needs.
pub struct RlTrainer {
    config: RlConfig,
    state: Mutex<TrainerState>,
}

impl RlTrainer {
    /// Create a trainer from a configuration.
    #[must_use]
    pub fn new(config: RlConfig) -> Self {
        let buffer = ExperienceBuffer::new(config.buffer_capacity);
        Self {
            config,
            state: Mutex::new(TrainerState {
                buffer,
                updates: 0,
                total_experiences: 0,
                reward_sum: 0.0,
                last_batch_size: 0,
                last_mean_return: 0.0,
                baseline: 0.0,
            }),
        }
    }

    /// The trainer's configuration.
    #[must_use]
    pub const fn config(&self) -> &RlConfig {
        &self.config
    }

    fn stats_of(&self, state: &TrainerState) -> TrainingStats {
        TrainingStats {
            algorithm: self.config.algorithm.as_str().to_string(),
            updates: state.updates,
            total_experiences: state.total_experiences,
            reward_sum: state.reward_sum,
            last_batch_size: state.last_batch_size,
            last_mean_return: state.last_mean_return,
            baseline: state.baseline,
            buffered: state.buffer.len(),
            learning_rate: self.config.learning_rate,
        }
    }
}

#[async_trait]
impl PolicyTrainer for RlTrainer {
    async fn add_experience(&self, experience: Experience) -> Result<(), RlError> {
        let mut state = self.state.lock().await;
        state.total_experiences += 1;
        state.reward_sum += experience.reward;
        state.buffer.push(experience);
        Ok(())
    }

    async fn update_policy(&self) -> Result<TrainingStats, RlError> {
        self.config.validate()?;

        let mut state = self.state.lock().await;
        let batch = state.buffer.drain();

        if batch.is_empty() {
            debug!("Policy update skipped: no buffered experience");
            state.last_batch_size = 0;
            return Ok(self.stats_of(&state));
        }

        // Discounted returns, computed back-to-front; a terminal
        // transition resets the accumulator.
        let mut returns = vec![0.0; batch.len()];
        let mut acc = 0.0;
        for (i, experience) in batch.iter().enumerate().rev() {
            if experience.done {
                acc = 0.0;
            }
            acc = experience.reward + self.config.gamma * acc;
            returns[i] = acc;
        }

        let mean_return = returns.iter().sum::<f64>() / returns.len() as f64;
        state.baseline += self.config.learning_rate * (mean_return - state.baseline);
        state.updates += 1;
        state.last_batch_size = batch.len();
        state.last_mean_return = mean_return;

        info!(
            update = state.updates,
            batch_size = batch.len(),
            mean_return,
            baseline = state.baseline,
            "Policy updated"
        );

        Ok(self.stats_of(&state))
    }

    async fn training_stats(&self) -> TrainingStats {
        let state = self.state.lock().await;
        self.stats_of(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exp(reward: f64, done: bool) -> Experience {
        Experience::new(json!({}), json!("noop"), reward, done)
    }

    #[tokio::test]
    async fn test_accumulates_experience_stats() {
        let trainer = RlTrainer::new(RlConfig::default());

        for _ in 0..3 {
            trainer.add_experience(exp(1.0, false)).await.unwrap();
        }

        let stats = trainer.training_stats().await;
        assert_eq!(stats.total_experiences, 3);
        assert_eq!(stats.reward_sum, 3.0);
        assert_eq!(stats.buffered, 3);
        assert_eq!(stats.updates, 0);
    }

    #[tokio::test]
    async fn test_update_consumes_buffer() {
        let trainer = RlTrainer::new(RlConfig::default());
        trainer.add_experience(exp(1.0, false)).await.unwrap();
        trainer.add_experience(exp(2.0, false)).await.unwrap();

        let stats = trainer.update_policy().await.unwrap();
        assert_eq!(stats.updates, 1);
        assert_eq!(stats.last_batch_size, 2);
        assert_eq!(stats.buffered, 0);

        // Totals survive the drain.
        assert_eq!(stats.total_experiences, 2);
        assert_eq!(stats.reward_sum, 3.0);
    }

    #[tokio::test]
    async fn test_discounted_returns() {
        let trainer = RlTrainer::new(RlConfig::new().with_gamma(0.5));
        trainer.add_experience(exp(1.0, false)).await.unwrap();
        trainer.add_experience(exp(1.0, false)).await.unwrap();

        let stats = trainer.update_policy().await.unwrap();
        // returns: [1 + 0.5 * 1, 1] = [1.5, 1.0], mean 1.25
        assert!((stats.last_mean_return - 1.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_done_resets_return() {
        let trainer = RlTrainer::new(RlConfig::new().with_gamma(1.0));
        trainer.add_experience(exp(1.0, true)).await.unwrap();
        trainer.add_experience(exp(5.0, false)).await.unwrap();

        let stats = trainer.update_policy().await.unwrap();
        // Back-to-front: acc = 5 at i=1; the terminal flag at i=0 resets
        // acc before adding its own reward. returns = [1.0, 5.0], mean 3.0.
        assert!((stats.last_mean_return - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_update_is_noop() {
        let trainer = RlTrainer::new(RlConfig::default());
        let stats = trainer.update_policy().await.unwrap();

        assert_eq!(stats.updates, 0);
        assert_eq!(stats.last_batch_size, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_update() {
        let trainer = RlTrainer::new(RlConfig::new().with_gamma(2.0));
        trainer.add_experience(exp(1.0, false)).await.unwrap();

        assert!(trainer.update_policy().await.is_err());
    }
}
