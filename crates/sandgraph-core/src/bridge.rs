//! Experience bridge - turns round results into RL training records.
//!
//! For every intra-round environment → decision edge whose two results
//! are Ok, one `(state, action, reward, done)` record is emitted into
//! the trainer's buffer: the state the environment carried into the
//! round, the decision taken on it, and the reward/done the environment
//! reported this round. A broken chain produces a logged gap, never an
//! error.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use sandgraph_rl::{Experience, PolicyTrainer};

use crate::graph::WorkflowGraph;
use crate::node::NodeType;
use crate::propagate::RoundContext;

/// Observes round results and feeds the policy trainer.
pub struct ExperienceBridge {
    trainer: Arc<dyn PolicyTrainer>,
}

impl ExperienceBridge {
    /// Create a bridge feeding `trainer`.
    pub fn new(trainer: Arc<dyn PolicyTrainer>) -> Self {
        Self { trainer }
    }

    /// Harvest experience from a finished round. Returns the number of
    /// emitted records.
    pub async fn harvest(&self, graph: &WorkflowGraph, ctx: &RoundContext) -> usize {
        let mut emitted = 0;

        for edge in graph.intra_edges() {
            let (Some(env), Some(decision)) = (graph.node(&edge.from), graph.node(&edge.to))
            else {
                continue;
            };
            if env.node_type != NodeType::Environment || decision.node_type != NodeType::Decision
            {
                continue;
            }

            let (Some(env_result), Some(decision_result)) =
                (ctx.result(&edge.from), ctx.result(&edge.to))
            else {
                debug!(
                    round = ctx.round,
                    env = %edge.from,
                    decision = %edge.to,
                    "Experience gap: chain did not execute"
                );
                continue;
            };

            if !env_result.is_ok() || !decision_result.is_ok() {
                debug!(
                    round = ctx.round,
                    env = %edge.from,
                    decision = %edge.to,
                    "Experience gap: chain member not Ok"
                );
                continue;
            }

            let Some(reward) = env_result.output.get("reward").and_then(Value::as_f64) else {
                debug!(
                    round = ctx.round,
                    env = %edge.from,
                    "Experience gap: environment output carries no reward"
                );
                continue;
            };

            let state = env_result
                .output
                .get("state")
                .cloned()
                .unwrap_or(Value::Null);
            let action = decision_result
                .output
                .get("action")
                .cloned()
                .unwrap_or(Value::Null);
            let done = env_result
                .output
                .get("done")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            match self
                .trainer
                .add_experience(Experience::new(state, action, reward, done))
                .await
            {
                Ok(()) => emitted += 1,
                Err(error) => {
                    warn!(round = ctx.round, %error, "Trainer rejected experience");
                }
            }
        }

        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;
    use crate::types::{NodeId, NodeResult};
    use sandgraph_rl::{RlConfig, RlTrainer};
    use serde_json::json;
    use std::collections::HashMap;

    fn chain_graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        graph
            .add_node(NodeType::Environment, "env", Value::Null)
            .unwrap();
        graph
            .add_node(NodeType::Decision, "decide", Value::Null)
            .unwrap();
        graph.add_edge("env", "decide").unwrap();
        graph
    }

    fn env_output(reward: f64, done: bool) -> Value {
        json!({
            "state": {"step": 0},
            "next_state": {"step": 1},
            "reward": reward,
            "done": done,
            "score": reward,
        })
    }

    #[tokio::test]
    async fn test_emits_one_experience_per_chain() {
        let graph = chain_graph();
        let trainer = Arc::new(RlTrainer::new(RlConfig::default()));
        let bridge = ExperienceBridge::new(trainer.clone());

        let mut ctx = RoundContext::new(0, HashMap::new());
        ctx.insert(NodeResult::ok(NodeId::new("env"), env_output(1.0, false), 1));
        ctx.insert(NodeResult::ok(
            NodeId::new("decide"),
            json!({"action": "noop", "confidence": 0.9}),
            1,
        ));

        let emitted = bridge.harvest(&graph, &ctx).await;
        assert_eq!(emitted, 1);

        let stats = trainer.training_stats().await;
        assert_eq!(stats.total_experiences, 1);
        assert_eq!(stats.reward_sum, 1.0);
    }

    #[tokio::test]
    async fn test_broken_chain_emits_nothing() {
        let graph = chain_graph();
        let trainer = Arc::new(RlTrainer::new(RlConfig::default()));
        let bridge = ExperienceBridge::new(trainer.clone());

        let mut ctx = RoundContext::new(0, HashMap::new());
        ctx.insert(NodeResult::ok(NodeId::new("env"), env_output(1.0, false), 1));
        ctx.insert(NodeResult::skipped(NodeId::new("decide"), "upstream"));

        let emitted = bridge.harvest(&graph, &ctx).await;
        assert_eq!(emitted, 0);
        assert_eq!(trainer.training_stats().await.total_experiences, 0);
    }

    #[tokio::test]
    async fn test_non_env_decision_edges_ignored() {
        let mut graph = WorkflowGraph::new();
        graph
            .add_node(NodeType::Custom, "a", Value::Null)
            .unwrap();
        graph
            .add_node(NodeType::Custom, "b", Value::Null)
            .unwrap();
        graph.add_edge("a", "b").unwrap();

        let trainer = Arc::new(RlTrainer::new(RlConfig::default()));
        let bridge = ExperienceBridge::new(trainer.clone());

        let mut ctx = RoundContext::new(0, HashMap::new());
        ctx.insert(NodeResult::ok(NodeId::new("a"), json!({}), 1));
        ctx.insert(NodeResult::ok(NodeId::new("b"), json!({}), 1));

        assert_eq!(bridge.harvest(&graph, &ctx).await, 0);
    }

    #[tokio::test]
    async fn test_missing_reward_is_a_gap() {
        let graph = chain_graph();
        let trainer = Arc::new(RlTrainer::new(RlConfig::default()));
        let bridge = ExperienceBridge::new(trainer.clone());

        let mut ctx = RoundContext::new(0, HashMap::new());
        ctx.insert(NodeResult::ok(NodeId::new("env"), json!({"state": 1}), 1));
        ctx.insert(NodeResult::ok(
            NodeId::new("decide"),
            json!({"action": "noop"}),
            1,
        ));

        assert_eq!(bridge.harvest(&graph, &ctx).await, 0);
    }
}
