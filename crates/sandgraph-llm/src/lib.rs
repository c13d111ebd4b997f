//! # sandgraph-llm
//!
//! Shared LLM decision backend for the SandGraph workflow engine.
//!
//! This crate provides:
//! - [`DecisionModel`] - the trait implemented by model backends
//! - [`SharedLlmManager`] - the single global owner of a model instance;
//!   decision nodes register with it and generate through it, never
//!   holding the model themselves
//! - [`MockModel`] - deterministic backend for tests and demos
//! - [`OpenAiCompatModel`] - chat-completions backend for any
//!   OpenAI-compatible API
//!
//! ## Example
//!
//! ```rust,no_run
//! use sandgraph_llm::{GenerateOptions, MockModel, SharedLlmManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = SharedLlmManager::new(MockModel::new("mock"));
//!
//!     manager.register_node("decider", GenerateOptions::default()).await;
//!     let response = manager
//!         .generate_for_node("decider", "next move?", &GenerateOptions::default())
//!         .await?;
//!
//!     println!("{}", response.text);
//!     Ok(())
//! }
//! ```

mod error;
mod manager;
mod mock;
mod openai;
mod traits;

pub use error::LlmError;
pub use manager::{ManagerStats, NodeUsage, SharedLlmManager};
pub use mock::MockModel;
pub use openai::OpenAiCompatModel;
pub use traits::{DecisionModel, DecisionResponse, GenerateOptions};
