//! # sandgraph-core
//!
//! Round-driven workflow execution engine coordinating environment
//! sandboxes, a shared LLM decision backend, and an RL policy trainer.
//!
//! This crate provides:
//! - [`WorkflowGraph`] - node/edge construction with build-time
//!   validation and cycle detection over intra-round edges
//! - [`scheduler`] - deterministic topological execution plans
//! - [`NodeExecutor`] - capability dispatch with failure isolation and
//!   per-node timeouts
//! - [`ExperienceBridge`] - turns environment/decision results into RL
//!   training experience
//! - [`WorkflowEngine`] - the façade: build a graph, bind resources,
//!   execute rounds
//!
//! A workflow that conceptually cycles (environment → decision →
//! optimizer → environment) stays schedulable because the cycle-closing
//! edge is declared as a *feedback* edge: it carries round *r*'s output
//! into round *r+1*'s input instead of creating a same-round
//! dependency.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sandgraph_core::{NodeType, WorkflowEngine};
//! use sandgraph_llm::{MockModel, SharedLlmManager};
//! use sandgraph_rl::{PolicyTrainer, RlConfig, RlTrainer};
//! use sandgraph_sandbox::StaticSandbox;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let llm = Arc::new(SharedLlmManager::new(MockModel::new("mock")));
//!     let trainer: Arc<dyn PolicyTrainer> = Arc::new(RlTrainer::new(RlConfig::default()));
//!
//!     let mut engine = WorkflowEngine::new("trading", llm, trainer);
//!     engine.add_node(NodeType::Environment, "env", serde_json::Value::Null)?;
//!     engine.add_node(NodeType::Decision, "decide", serde_json::Value::Null)?;
//!     engine.add_node(NodeType::PolicyUpdate, "opt", serde_json::Value::Null)?;
//!     engine.add_edge("env", "decide")?;
//!     engine.add_edge("decide", "opt")?;
//!     engine.mark_feedback("opt", "env")?;
//!     engine.bind_sandbox("env", Arc::new(StaticSandbox::new(1.0)))?;
//!
//!     let result = engine.execute_full_workflow(5).await?;
//!     println!("rounds: {}", result.rounds_executed);
//!     Ok(())
//! }
//! ```

mod bridge;
mod engine;
mod error;
mod executor;
mod graph;
mod node;
mod propagate;
pub mod scheduler;
mod types;

pub use bridge::ExperienceBridge;
pub use engine::{EngineConfig, WorkflowEngine};
pub use error::{GraphError, NodeError, WorkflowError};
pub use executor::{CustomNode, NodeExecutor};
pub use graph::{Edge, EdgeKind, WorkflowGraph};
pub use node::{
    DecisionConfig, EnvironmentConfig, Node, NodeConfig, NodeType, PolicyUpdateConfig,
};
pub use propagate::{assemble_inputs, merge_output, RoundContext};
pub use scheduler::ExecutionPlan;
pub use types::{AggregateResult, NodeId, NodeResult, NodeStatus, RoundReport};
