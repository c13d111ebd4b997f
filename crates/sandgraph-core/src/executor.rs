//! Node executor - capability dispatch with failure isolation.
//!
//! The executor resolves a node's capability handle (sandbox, shared
//! LLM manager, trainer, or custom handler), runs it under a per-node
//! timeout, and converts every failure into an `Error` result. Nothing
//! a node does can abort the round; the engine decides what to skip
//! downstream.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use sandgraph_llm::SharedLlmManager;
use sandgraph_rl::PolicyTrainer;
use sandgraph_sandbox::Sandbox;

use crate::error::NodeError;
use crate::node::{DecisionConfig, EnvironmentConfig, Node, NodeConfig};
use crate::types::{NodeId, NodeResult};

/// Trait for caller-defined custom nodes.
#[async_trait]
pub trait CustomNode: Send + Sync {
    /// Process the merged input mapping and produce an output value.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler fails; the executor converts it
    /// into an `Error` result.
    async fn run(&self, inputs: Value) -> Result<Value, NodeError>;
}

/// Executes single nodes against their capability handles.
///
/// The LLM manager and trainer are the workflow's global, singly-owned
/// resources; sandboxes and custom handlers are bound per node. Nodes
/// only ever see these through the executor - they never own a handle.
pub struct NodeExecutor {
    llm: Arc<SharedLlmManager>,
    trainer: Arc<dyn PolicyTrainer>,
    sandboxes: HashMap<NodeId, Arc<dyn Sandbox>>,
    handlers: HashMap<NodeId, Arc<dyn CustomNode>>,
    timeout: Duration,
}

impl NodeExecutor {
    /// Create an executor around the workflow's shared resources.
    pub fn new(llm: Arc<SharedLlmManager>, trainer: Arc<dyn PolicyTrainer>) -> Self {
        Self {
            llm,
            trainer,
            sandboxes: HashMap::new(),
            handlers: HashMap::new(),
            timeout: Duration::from_millis(30_000),
        }
    }

    /// Set the per-node execution timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Bind a sandbox to an environment node.
    pub fn bind_sandbox(&mut self, node: NodeId, sandbox: Arc<dyn Sandbox>) {
        self.sandboxes.insert(node, sandbox);
    }

    /// Register a handler for a custom node.
    pub fn register_handler(&mut self, node: NodeId, handler: Arc<dyn CustomNode>) {
        self.handlers.insert(node, handler);
    }

    /// Execute one node with its merged inputs.
    ///
    /// Never fails: capability errors and timeouts become `Error`
    /// results.
    pub async fn execute(&self, node: &Node, inputs: Value) -> NodeResult {
        let started = Instant::now();
        debug!(node = %node.name, node_type = %node.node_type, "Executing node");

        let outcome = tokio::time::timeout(self.timeout, self.dispatch(node, &inputs)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => NodeResult::ok(node.name.clone(), output, duration_ms),
            Ok(Err(error)) => {
                warn!(node = %node.name, %error, "Node execution failed");
                NodeResult::error(node.name.clone(), error.to_string(), duration_ms)
            }
            Err(_) => {
                let error = NodeError::Timeout(self.timeout.as_millis() as u64);
                warn!(node = %node.name, %error, "Node execution timed out");
                NodeResult::error(node.name.clone(), error.to_string(), duration_ms)
            }
        }
    }

    async fn dispatch(&self, node: &Node, inputs: &Value) -> Result<Value, NodeError> {
        match &node.config {
            NodeConfig::Environment(cfg) => self.run_environment(node, cfg, inputs).await,
            NodeConfig::Decision(cfg) => self.run_decision(node, cfg, inputs).await,
            NodeConfig::PolicyUpdate(_) => self.run_policy_snapshot().await,
            NodeConfig::Custom(_) => self.run_custom(node, inputs).await,
        }
    }

    /// Environment step: case, action execution, score. The action
    /// comes from the merged inputs under the configured key; the
    /// carried pre-execution state is echoed back so the experience
    /// bridge can pair it with the step's reward.
    async fn run_environment(
        &self,
        node: &Node,
        cfg: &EnvironmentConfig,
        inputs: &Value,
    ) -> Result<Value, NodeError> {
        let sandbox = self
            .sandboxes
            .get(&node.name)
            .ok_or_else(|| NodeError::SandboxNotBound(node.name.clone()))?;

        let action = inputs
            .get(&cfg.action_key)
            .cloned()
            .unwrap_or_else(|| cfg.default_action.clone());
        let state = inputs.get("state").cloned().unwrap_or(Value::Null);

        let case = sandbox.generate_case().await?;
        let outcome = sandbox.execute(&action).await?;
        let score = sandbox.verify_score(&action, &case).await?;

        Ok(json!({
            "state": state,
            "next_state": outcome.next_state,
            "reward": outcome.reward,
            "done": outcome.done,
            "score": score,
        }))
    }

    /// Decision step: assemble the prompt from configuration and
    /// inputs, forward to the shared manager. The executor never
    /// inspects or post-processes the model's decision.
    async fn run_decision(
        &self,
        node: &Node,
        cfg: &DecisionConfig,
        inputs: &Value,
    ) -> Result<Value, NodeError> {
        let context = serde_json::to_string_pretty(inputs)
            .map_err(|e| NodeError::Serialization(e.to_string()))?;

        let prompt = match &cfg.prompt_template {
            Some(template) => template.replace("{inputs}", &context),
            None => {
                let role = cfg.role.as_deref().unwrap_or("You are a decision node.");
                format!("{role}\n\nCurrent workflow inputs:\n{context}\n\nRespond with the next action.")
            }
        };

        let options = cfg.generate_options();

        let response = self
            .llm
            .generate_for_node(node.name.as_str(), &prompt, &options)
            .await?;

        Ok(json!({
            "action": response.text,
            "confidence": response.confidence,
            "reasoning": response.reasoning,
        }))
    }

    /// A policy node's in-plan execution only reports the trainer's
    /// current statistics; the engine applies the actual update at the
    /// round boundary.
    async fn run_policy_snapshot(&self) -> Result<Value, NodeError> {
        let stats = self.trainer.training_stats().await;
        serde_json::to_value(stats).map_err(|e| NodeError::Serialization(e.to_string()))
    }

    async fn run_custom(&self, node: &Node, inputs: &Value) -> Result<Value, NodeError> {
        match self.handlers.get(&node.name) {
            Some(handler) => handler.run(inputs.clone()).await,
            // No handler registered: the node is a passthrough join.
            None => Ok(inputs.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;
    use sandgraph_llm::{GenerateOptions, MockModel};
    use sandgraph_rl::{RlConfig, RlTrainer};
    use sandgraph_sandbox::StaticSandbox;

    fn executor_with_mock(model: MockModel) -> NodeExecutor {
        let llm = Arc::new(SharedLlmManager::new(model));
        let trainer: Arc<dyn PolicyTrainer> = Arc::new(RlTrainer::new(RlConfig::default()));
        NodeExecutor::new(llm, trainer)
    }

    fn node(node_type: NodeType, name: &str, config: Value) -> Node {
        Node::new(node_type, NodeId::new(name), config).unwrap()
    }

    #[tokio::test]
    async fn test_environment_execution() {
        let mut executor = executor_with_mock(MockModel::new("mock"));
        executor.bind_sandbox(NodeId::new("env"), Arc::new(StaticSandbox::new(1.0)));

        let env = node(NodeType::Environment, "env", Value::Null);
        let result = executor
            .execute(&env, json!({"action": "noop", "state": {"step": 0}}))
            .await;

        assert!(result.is_ok());
        assert_eq!(result.output["reward"], 1.0);
        assert_eq!(result.output["done"], false);
        assert_eq!(result.output["state"], json!({"step": 0}));
    }

    #[tokio::test]
    async fn test_environment_without_sandbox_errors() {
        let executor = executor_with_mock(MockModel::new("mock"));

        let env = node(NodeType::Environment, "env", Value::Null);
        let result = executor.execute(&env, json!({})).await;

        assert_eq!(result.status, crate::types::NodeStatus::Error);
        assert!(result.error.as_deref().unwrap_or("").contains("sandbox"));
    }

    #[tokio::test]
    async fn test_decision_execution() {
        let executor = executor_with_mock(MockModel::new("mock").with_response("BUY 10"));
        executor
            .llm
            .register_node("decide", GenerateOptions::default())
            .await;

        let decide = node(NodeType::Decision, "decide", json!({"role": "trader"}));
        let result = executor.execute(&decide, json!({"state": 1})).await;

        assert!(result.is_ok());
        assert_eq!(result.output["action"], "BUY 10");
    }

    #[tokio::test]
    async fn test_decision_backend_failure_becomes_error_result() {
        let executor = executor_with_mock(MockModel::new("mock").failing());
        executor
            .llm
            .register_node("decide", GenerateOptions::default())
            .await;

        let decide = node(NodeType::Decision, "decide", Value::Null);
        let result = executor.execute(&decide, json!({})).await;

        assert_eq!(result.status, crate::types::NodeStatus::Error);
    }

    #[tokio::test]
    async fn test_policy_node_reports_stats_snapshot() {
        let executor = executor_with_mock(MockModel::new("mock"));

        let opt = node(NodeType::PolicyUpdate, "opt", Value::Null);
        let result = executor.execute(&opt, json!({})).await;

        assert!(result.is_ok());
        assert_eq!(result.output["updates"], 0);
        assert_eq!(result.output["total_experiences"], 0);
    }

    #[tokio::test]
    async fn test_custom_node_passthrough() {
        let executor = executor_with_mock(MockModel::new("mock"));

        let custom = node(NodeType::Custom, "join", Value::Null);
        let result = executor.execute(&custom, json!({"x": 1})).await;

        assert!(result.is_ok());
        assert_eq!(result.output["x"], 1);
    }

    #[tokio::test]
    async fn test_custom_handler_invoked() {
        struct Doubler;

        #[async_trait]
        impl CustomNode for Doubler {
            async fn run(&self, inputs: Value) -> Result<Value, NodeError> {
                let x = inputs
                    .get("x")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| NodeError::MissingInput("x".into()))?;
                Ok(json!({"x": x * 2}))
            }
        }

        let mut executor = executor_with_mock(MockModel::new("mock"));
        executor.register_handler(NodeId::new("double"), Arc::new(Doubler));

        let custom = node(NodeType::Custom, "double", Value::Null);
        let result = executor.execute(&custom, json!({"x": 21})).await;

        assert_eq!(result.output["x"], 42);
    }

    #[tokio::test]
    async fn test_timeout_becomes_error_result() {
        struct Stall;

        #[async_trait]
        impl CustomNode for Stall {
            async fn run(&self, _inputs: Value) -> Result<Value, NodeError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Value::Null)
            }
        }

        let mut executor = executor_with_mock(MockModel::new("mock"));
        executor.set_timeout(Duration::from_millis(20));
        executor.register_handler(NodeId::new("stall"), Arc::new(Stall));

        let custom = node(NodeType::Custom, "stall", Value::Null);
        let result = executor.execute(&custom, json!({})).await;

        assert_eq!(result.status, crate::types::NodeStatus::Error);
        assert!(result.error.as_deref().unwrap_or("").contains("timed out"));
    }
}
