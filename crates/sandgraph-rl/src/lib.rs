//! # sandgraph-rl
//!
//! Policy training for the SandGraph workflow engine.
//!
//! The engine's experience bridge feeds `(state, action, reward, done)`
//! records into a [`PolicyTrainer`]; the engine invokes
//! [`PolicyTrainer::update_policy`] at round boundaries, batching all
//! experience gathered since the previous update. The trainer owns its
//! buffer exclusively; nothing else reads or clears it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sandgraph_rl::{Experience, PolicyTrainer, RlConfig, RlTrainer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let trainer = RlTrainer::new(RlConfig::default());
//!
//!     trainer
//!         .add_experience(Experience::new(
//!             serde_json::json!({"step": 0}),
//!             serde_json::json!("noop"),
//!             1.0,
//!             false,
//!         ))
//!         .await?;
//!
//!     let stats = trainer.update_policy().await?;
//!     println!("updates: {}", stats.updates);
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod experience;
mod trainer;

pub use config::{RlAlgorithm, RlConfig};
pub use error::RlError;
pub use experience::{Experience, ExperienceBuffer};
pub use trainer::{PolicyTrainer, RlTrainer, TrainingStats};
