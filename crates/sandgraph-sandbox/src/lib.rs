//! # sandgraph-sandbox
//!
//! Environment sandboxes for the SandGraph workflow engine.
//!
//! A sandbox is an isolated task environment: it generates task cases,
//! executes actions against its internal state, and scores actions
//! against cases. Environment nodes in a workflow graph are bound to a
//! sandbox instance; the engine drives it through the [`Sandbox`] trait
//! and never touches its internals.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sandgraph_sandbox::{Sandbox, StaticSandbox};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sandbox = StaticSandbox::new(1.0);
//!
//!     let outcome = sandbox.execute(&serde_json::json!("noop")).await?;
//!     println!("reward: {}", outcome.reward);
//!
//!     Ok(())
//! }
//! ```

mod error;
mod scripted;
mod static_sandbox;
mod traits;

pub use error::SandboxError;
pub use scripted::{ScriptedSandbox, ScriptedStep};
pub use static_sandbox::StaticSandbox;
pub use traits::{Sandbox, StepOutcome};
