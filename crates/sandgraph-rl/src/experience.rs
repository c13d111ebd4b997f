//! Experience records and the replay buffer.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `(state, action, reward, done)` transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    /// Environment state the action was taken in
    pub state: Value,
    /// Action chosen by the decision policy
    pub action: Value,
    /// Reward earned by the action
    pub reward: f64,
    /// Whether the transition ended an episode
    pub done: bool,
}

impl Experience {
    /// Create an experience record.
    #[must_use]
    pub fn new(state: Value, action: Value, reward: f64, done: bool) -> Self {
        Self {
            state,
            action,
            reward,
            done,
        }
    }
}

/// Bounded FIFO buffer of experience records.
///
/// When full, the oldest record is evicted. The buffer is owned
/// exclusively by a trainer; `drain` hands the whole batch to one
/// policy update.
#[derive(Debug)]
pub struct ExperienceBuffer {
    entries: VecDeque<Experience>,
    capacity: usize,
}

impl ExperienceBuffer {
    /// Create a buffer holding at most `capacity` records.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Append an experience, evicting the oldest when full.
    pub fn push(&mut self, experience: Experience) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(experience);
    }

    /// Take all buffered experience, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<Experience> {
        self.entries.drain(..).collect()
    }

    /// Number of buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
