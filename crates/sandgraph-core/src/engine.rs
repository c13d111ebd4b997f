//! WorkflowEngine - the top-level façade.
//!
//! Composes the graph builder, scheduler, executor, propagator, and
//! experience bridge into the round-driven execution model:
//!
//! 1. validate the graph and compute one execution plan,
//! 2. register decision nodes with the shared LLM manager and
//!    health-check the backend (fail fast before any node runs),
//! 3. per round: dispatch nodes in dependency waves (bounded
//!    parallelism, per-node timeout, skip-marking below failures),
//!    harvest experience, apply the policy update at the boundary,
//!    then carry feedback-edge outputs and environment state into the
//!    next round,
//! 4. stop at the requested round count, or earlier when an
//!    environment reports a terminal state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use sandgraph_llm::SharedLlmManager;
use sandgraph_rl::PolicyTrainer;
use sandgraph_sandbox::Sandbox;

use crate::bridge::ExperienceBridge;
use crate::error::WorkflowError;
use crate::executor::{CustomNode, NodeExecutor};
use crate::graph::WorkflowGraph;
use crate::node::{NodeConfig, NodeType};
use crate::propagate::{self, RoundContext};
use crate::scheduler::{self, ExecutionPlan};
use crate::types::{AggregateResult, NodeId, NodeResult, RoundReport};

// ============================================================================
// ENGINE CONFIGURATION
// ============================================================================

/// Configuration for workflow execution.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-node execution timeout in milliseconds.
    pub node_timeout_ms: u64,
    /// Maximum nodes dispatched concurrently within a round.
    pub max_parallel_nodes: usize,
    /// Fail the whole run when a round finishes with non-Ok nodes.
    pub require_complete_rounds: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_timeout_ms: 30_000,
            max_parallel_nodes: 4,
            require_complete_rounds: false,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.node_timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_parallel_nodes(mut self, max: usize) -> Self {
        self.max_parallel_nodes = max;
        self
    }

    pub fn with_strict_rounds(mut self, strict: bool) -> Self {
        self.require_complete_rounds = strict;
        self
    }
}

// ============================================================================
// WORKFLOW ENGINE
// ============================================================================

/// The workflow engine façade.
///
/// The LLM manager and the policy trainer are injected at construction
/// time and threaded through to node executions by reference; graph
/// nodes never own them.
pub struct WorkflowEngine {
    name: String,
    graph: WorkflowGraph,
    executor: NodeExecutor,
    llm: Arc<SharedLlmManager>,
    trainer: Arc<dyn PolicyTrainer>,
    bridge: ExperienceBridge,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Create an engine around the workflow's shared resources.
    pub fn new(
        name: impl Into<String>,
        llm: Arc<SharedLlmManager>,
        trainer: Arc<dyn PolicyTrainer>,
    ) -> Self {
        Self {
            name: name.into(),
            graph: WorkflowGraph::new(),
            executor: NodeExecutor::new(llm.clone(), trainer.clone()),
            llm,
            trainer: trainer.clone(),
            bridge: ExperienceBridge::new(trainer),
            config: EngineConfig::default(),
        }
    }

    /// Apply an engine configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.executor
            .set_timeout(Duration::from_millis(config.node_timeout_ms));
        self.config = config;
        self
    }

    /// The engine's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying graph.
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    // ========================================================================
    // GRAPH CONSTRUCTION
    // ========================================================================

    /// Add a node. See [`WorkflowGraph::add_node`].
    ///
    /// # Errors
    ///
    /// Returns a graph error for duplicate names or invalid configs.
    pub fn add_node(
        &mut self,
        node_type: NodeType,
        name: impl Into<NodeId>,
        config: Value,
    ) -> Result<(), WorkflowError> {
        self.graph.add_node(node_type, name, config)?;
        Ok(())
    }

    /// Add an intra-round edge. See [`WorkflowGraph::add_edge`].
    ///
    /// # Errors
    ///
    /// Returns a graph error for unknown endpoints or self-loops.
    pub fn add_edge(
        &mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
    ) -> Result<(), WorkflowError> {
        self.graph.add_edge(from, to)?;
        Ok(())
    }

    /// Mark an edge as a round-boundary link. See
    /// [`WorkflowGraph::mark_feedback`].
    ///
    /// # Errors
    ///
    /// Returns a graph error for unknown endpoints.
    pub fn mark_feedback(
        &mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
    ) -> Result<(), WorkflowError> {
        self.graph.mark_feedback(from, to)?;
        Ok(())
    }

    /// Bind a sandbox to an environment node.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NodeNotFound`] for unknown nodes.
    pub fn bind_sandbox(
        &mut self,
        name: impl Into<NodeId>,
        sandbox: Arc<dyn Sandbox>,
    ) -> Result<(), WorkflowError> {
        let name = name.into();
        if !self.graph.contains(&name) {
            return Err(WorkflowError::NodeNotFound(name));
        }
        self.executor.bind_sandbox(name, sandbox);
        Ok(())
    }

    /// Register a handler for a custom node.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NodeNotFound`] for unknown nodes.
    pub fn register_custom(
        &mut self,
        name: impl Into<NodeId>,
        handler: Arc<dyn CustomNode>,
    ) -> Result<(), WorkflowError> {
        let name = name.into();
        if !self.graph.contains(&name) {
            return Err(WorkflowError::NodeNotFound(name));
        }
        self.executor.register_handler(name, handler);
        Ok(())
    }

    // ========================================================================
    // EXECUTION
    // ========================================================================

    /// Execute a single node ad hoc with explicit inputs, bypassing the
    /// scheduler. Intended for debugging and tests.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NodeNotFound`] for unknown nodes.
    /// Execution failures are reported inside the returned result, not
    /// as errors.
    pub async fn execute_node(
        &self,
        name: impl Into<NodeId>,
        inputs: Value,
    ) -> Result<NodeResult, WorkflowError> {
        let name = name.into();
        let node = self
            .graph
            .node(&name)
            .ok_or(WorkflowError::NodeNotFound(name))?;

        if node.node_type == NodeType::Decision && !self.llm.is_registered(node.name.as_str()).await
        {
            self.register_decision_nodes().await;
        }

        Ok(self.executor.execute(node, inputs).await)
    }

    /// Execute the full workflow for `rounds` rounds.
    ///
    /// # Errors
    ///
    /// Returns a graph error if validation fails,
    /// [`WorkflowError::BackendUnavailable`] if the decision backend is
    /// unreachable before any node has run, and
    /// [`WorkflowError::RoundIncomplete`] in strict mode when a round
    /// finishes with non-Ok nodes. Per-node failures are reported
    /// inside the aggregate result.
    #[instrument(skip(self), fields(workflow = %self.name))]
    pub async fn execute_full_workflow(
        &self,
        rounds: usize,
    ) -> Result<AggregateResult, WorkflowError> {
        let started = Instant::now();
        let started_at = chrono::Utc::now();
        let run_id = format!("run-{}", Uuid::new_v4());

        self.graph.validate()?;
        let plan = scheduler::plan(&self.graph)?;

        if !self.graph.nodes_of_type(NodeType::Decision).is_empty() {
            self.register_decision_nodes().await;
            self.llm
                .health_check()
                .await
                .map_err(|e| WorkflowError::BackendUnavailable(e.to_string()))?;
        }

        let update_every = self.policy_update_interval();
        let has_policy_node = update_every.is_some();

        info!(
            run_id = %run_id,
            rounds,
            nodes = self.graph.len(),
            "Starting workflow"
        );

        let mut carried: HashMap<NodeId, Map<String, Value>> = HashMap::new();
        let mut per_round: Vec<RoundReport> = Vec::with_capacity(rounds);

        for round in 0..rounds {
            let mut ctx = RoundContext::new(round, std::mem::take(&mut carried));
            self.execute_round(&plan, &mut ctx).await;

            let emitted = self.bridge.harvest(&self.graph, &ctx).await;
            debug!(round, emitted, "Experience harvested");

            if let Some(every) = update_every {
                if (round as u32 + 1) % every == 0 {
                    match self.trainer.update_policy().await {
                        Ok(stats) => {
                            debug!(round, updates = stats.updates, "Policy updated");
                        }
                        Err(error) => {
                            warn!(round, %error, "Policy update failed");
                        }
                    }
                }
            }

            carried = self.next_round_carry(&ctx);
            let terminal = self.terminal_state_reached(&ctx);

            let report = ctx.into_report();
            let complete = report.complete;
            let failed = report.failed_nodes();
            per_round.push(report);

            if self.config.require_complete_rounds && !complete {
                return Err(WorkflowError::RoundIncomplete { round, failed });
            }

            if terminal {
                info!(round, "Terminal state reported; stopping early");
                break;
            }
        }

        let final_state = final_state_of(&per_round, &plan);
        let training_stats = if has_policy_node {
            serde_json::to_value(self.trainer.training_stats().await)
                .map_err(|e| WorkflowError::Serialization(e.to_string()))?
        } else {
            Value::Null
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            run_id = %run_id,
            rounds_executed = per_round.len(),
            duration_ms,
            "Workflow completed"
        );

        Ok(AggregateResult {
            run_id,
            started_at,
            rounds_executed: per_round.len(),
            per_round,
            final_state,
            training_stats,
            duration_ms,
        })
    }

    /// Execute one round: dispatch nodes in dependency waves.
    ///
    /// A node is dispatched only when every upstream result for the
    /// current round exists; nodes below a failure are skip-marked
    /// without executing. Nodes inside one wave run concurrently,
    /// bounded by the parallelism limit.
    async fn execute_round(&self, plan: &ExecutionPlan, ctx: &mut RoundContext) {
        let gate = Arc::new(Semaphore::new(self.config.max_parallel_nodes.max(1)));
        let mut remaining: Vec<NodeId> = plan.order.clone();

        while !remaining.is_empty() {
            let ready: Vec<NodeId> = remaining
                .iter()
                .filter(|name| {
                    plan.dependencies_of(name)
                        .iter()
                        .all(|dep| ctx.has_result(dep))
                })
                .cloned()
                .collect();

            if ready.is_empty() {
                // Unreachable for a validated plan; avoid spinning if
                // it ever happens.
                warn!(round = ctx.round, "No dispatchable nodes remain");
                break;
            }

            let mut wave = Vec::new();
            for name in &ready {
                let Some(node) = self.graph.node(name) else {
                    continue;
                };

                if let Some(failed) = ctx.upstream_failure(&self.graph, name) {
                    debug!(round = ctx.round, node = %name, upstream = %failed, "Skipping node");
                    ctx.insert(NodeResult::skipped(
                        name.clone(),
                        format!("upstream node '{failed}' did not complete"),
                    ));
                    continue;
                }

                let inputs = propagate::assemble_inputs(&self.graph, node, ctx);
                let gate = gate.clone();
                wave.push(async move {
                    let _permit = gate.acquire().await.ok();
                    self.executor.execute(node, inputs).await
                });
            }

            for result in join_all(wave).await {
                ctx.insert(result);
            }

            remaining.retain(|name| !ctx.has_result(name));
        }
    }

    /// Register every decision node with the shared manager.
    async fn register_decision_nodes(&self) {
        for node in self.graph.nodes_of_type(NodeType::Decision) {
            if let NodeConfig::Decision(cfg) = &node.config {
                self.llm
                    .register_node(node.name.as_str(), cfg.generate_options())
                    .await;
            }
        }
    }

    /// Update interval of the first policy node, if the graph has one.
    fn policy_update_interval(&self) -> Option<u32> {
        self.graph
            .nodes_of_type(NodeType::PolicyUpdate)
            .first()
            .and_then(|node| match &node.config {
                NodeConfig::PolicyUpdate(cfg) => Some(cfg.update_every_rounds.max(1)),
                _ => None,
            })
    }

    /// Build the carried inputs for the next round: feedback-edge
    /// payloads first, then each environment node's `next_state`
    /// carried under its own `state` key.
    fn next_round_carry(&self, ctx: &RoundContext) -> HashMap<NodeId, Map<String, Value>> {
        let mut carried: HashMap<NodeId, Map<String, Value>> = HashMap::new();

        for edge in self.graph.feedback_edges() {
            if let Some(result) = ctx.result(&edge.from) {
                if result.is_ok() {
                    let entry = carried.entry(edge.to.clone()).or_default();
                    propagate::merge_output(entry, edge.from.as_str(), &result.output);
                }
            }
        }

        for node in self.graph.nodes_of_type(NodeType::Environment) {
            if let Some(result) = ctx.result(&node.name) {
                if result.is_ok() {
                    if let Some(next_state) = result.output.get("next_state") {
                        carried
                            .entry(node.name.clone())
                            .or_default()
                            .insert("state".to_string(), next_state.clone());
                    }
                }
            }
        }

        carried
    }

    /// Check whether any environment node reported `done == true`.
    fn terminal_state_reached(&self, ctx: &RoundContext) -> bool {
        self.graph
            .nodes_of_type(NodeType::Environment)
            .iter()
            .filter_map(|node| ctx.result(&node.name))
            .filter(|result| result.is_ok())
            .any(|result| {
                result
                    .output
                    .get("done")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            })
    }
}

/// Output of the final round's terminal node.
fn final_state_of(per_round: &[RoundReport], plan: &ExecutionPlan) -> Value {
    per_round
        .last()
        .and_then(|report| {
            plan.order
                .last()
                .and_then(|name| report.results.get(name.as_str()))
        })
        .filter(|result| result.is_ok())
        .map(|result| result.output.clone())
        .unwrap_or(Value::Null)
}
