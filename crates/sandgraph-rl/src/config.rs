//! Trainer configuration.

use serde::{Deserialize, Serialize};

/// Policy-optimization algorithm family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RlAlgorithm {
    /// Proximal policy optimization (default)
    #[default]
    Ppo,
    /// Group relative policy optimization
    Grpo,
    /// Plain REINFORCE with a baseline
    Reinforce,
}

impl RlAlgorithm {
    /// Stable string name used in stats mappings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RlAlgorithm::Ppo => "ppo",
            RlAlgorithm::Grpo => "grpo",
            RlAlgorithm::Reinforce => "reinforce",
        }
    }
}

/// Configuration for an [`RlTrainer`](crate::RlTrainer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RlConfig {
    /// Algorithm family
    pub algorithm: RlAlgorithm,
    /// Learning rate applied to the baseline update
    pub learning_rate: f64,
    /// Discount factor for returns
    pub gamma: f64,
    /// Maximum experience records buffered between updates
    pub buffer_capacity: usize,
}

impl Default for RlConfig {
    fn default() -> Self {
        Self {
            algorithm: RlAlgorithm::default(),
            learning_rate: 1e-4,
            gamma: 0.99,
            buffer_capacity: 10_000,
        }
    }
}

impl RlConfig {
    /// Create a default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the algorithm family.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: RlAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the discount factor.
    #[must_use]
    pub const fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the buffer capacity.
    #[must_use]
    pub const fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Validate parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns an error naming the out-of-range parameter.
    pub fn validate(&self) -> Result<(), crate::RlError> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(crate::RlError::InvalidConfig(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(crate::RlError::InvalidConfig(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }
        Ok(())
    }
}
