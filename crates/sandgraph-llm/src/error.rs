//! LLM error types.

use thiserror::Error;

/// Errors that can occur when interacting with a decision backend.
#[derive(Error, Debug)]
pub enum LlmError {
    /// API error from the backend
    #[error("API error: {0}")]
    ApiError(String),

    /// Network/connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Backend is not available
    #[error("Backend not available: {0}")]
    NotAvailable(String),

    /// Empty response from backend
    #[error("Empty response from model")]
    EmptyResponse,

    /// Invalid response format
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// Node was never registered with the manager
    #[error("Node not registered: {0}")]
    NodeNotRegistered(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
