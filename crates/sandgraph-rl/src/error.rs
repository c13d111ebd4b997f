//! Trainer error types.

use thiserror::Error;

/// Errors that can occur during policy training.
#[derive(Error, Debug)]
pub enum RlError {
    /// Invalid trainer configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Trainer backend failed to apply an update
    #[error("Update failed: {0}")]
    UpdateFailed(String),
}
