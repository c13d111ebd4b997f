//! Sandbox error types.

use thiserror::Error;

/// Errors that can occur during sandbox operations.
#[derive(Error, Debug)]
pub enum SandboxError {
    /// Sandbox is not ready to serve requests
    #[error("Sandbox not ready: {0}")]
    NotReady(String),

    /// Case generation failed
    #[error("Case generation failed: {0}")]
    CaseGeneration(String),

    /// The action could not be interpreted by this environment
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Action execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The environment has no more steps to serve
    #[error("Environment exhausted after {0} steps")]
    Exhausted(u64),

    /// Scoring failed
    #[error("Scoring failed: {0}")]
    ScoringFailed(String),
}
