//! State propagation - carrying node outputs into dependent inputs.
//!
//! Each round owns a context mapping node names to their results. A
//! node's input is assembled from three layers, later layers winning on
//! key overlap:
//!
//! 1. the node's static configuration,
//! 2. the round's carried inputs (feedback-edge payloads and carried
//!    environment state from the previous round),
//! 3. upstream outputs, merged in `add_edge` declaration order - the
//!    edge declared later wins.
//!
//! The last rule is the documented tie-break for overlapping keys;
//! silent overwrites in workflow wiring are a classic authoring bug, so
//! the order is fixed and observable.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::graph::WorkflowGraph;
use crate::node::Node;
use crate::types::{NodeId, NodeResult, RoundReport};

/// Execution context of one round.
#[derive(Debug, Default)]
pub struct RoundContext {
    /// Round index, starting at 0
    pub round: usize,
    carried: HashMap<NodeId, Map<String, Value>>,
    results: HashMap<NodeId, NodeResult>,
}

impl RoundContext {
    /// Create the context for `round`, with inputs carried over from
    /// the previous round (empty for round 0).
    #[must_use]
    pub fn new(round: usize, carried: HashMap<NodeId, Map<String, Value>>) -> Self {
        Self {
            round,
            carried,
            results: HashMap::new(),
        }
    }

    /// Record a node's result for this round.
    pub fn insert(&mut self, result: NodeResult) {
        self.results.insert(result.node.clone(), result);
    }

    /// Result of a node in this round, if it already ran.
    #[must_use]
    pub fn result(&self, node: &NodeId) -> Option<&NodeResult> {
        self.results.get(node)
    }

    /// Check if a node has a result in this round.
    #[must_use]
    pub fn has_result(&self, node: &NodeId) -> bool {
        self.results.contains_key(node)
    }

    /// Carried inputs for a node, if any.
    #[must_use]
    pub fn carried_for(&self, node: &NodeId) -> Option<&Map<String, Value>> {
        self.carried.get(node)
    }

    /// Check if every recorded result is Ok.
    #[must_use]
    pub fn complete(&self) -> bool {
        self.results.values().all(NodeResult::is_ok)
    }

    /// Name of the first upstream dependency of `node` whose result is
    /// not Ok, if any. Used to decide skip-marking.
    #[must_use]
    pub fn upstream_failure(&self, graph: &WorkflowGraph, node: &NodeId) -> Option<NodeId> {
        graph
            .intra_predecessors(node)
            .into_iter()
            .find(|pred| self.result(pred).map_or(true, |r| !r.is_ok()))
            .cloned()
    }

    /// Consume the context into a per-round report.
    #[must_use]
    pub fn into_report(self) -> RoundReport {
        let complete = self.complete();
        let results = self
            .results
            .into_iter()
            .map(|(name, result)| (name.as_str().to_string(), result))
            .collect::<BTreeMap<_, _>>();

        RoundReport {
            round: self.round,
            results,
            complete,
        }
    }
}

/// Assemble the merged input mapping for a node.
#[must_use]
pub fn assemble_inputs(graph: &WorkflowGraph, node: &Node, ctx: &RoundContext) -> Value {
    let mut inputs = node.config.to_input_object();

    if let Some(carried) = ctx.carried_for(&node.name) {
        for (key, value) in carried {
            inputs.insert(key.clone(), value.clone());
        }
    }

    for edge in graph.intra_edges().filter(|e| e.to == node.name) {
        if let Some(result) = ctx.result(&edge.from) {
            if result.is_ok() {
                merge_output(&mut inputs, edge.from.as_str(), &result.output);
            }
        }
    }

    Value::Object(inputs)
}

/// Merge one upstream output into an input mapping. Object outputs
/// merge key-by-key; anything else lands under the upstream node's
/// name.
pub fn merge_output(inputs: &mut Map<String, Value>, source: &str, output: &Value) {
    match output {
        Value::Object(map) => {
            for (key, value) in map {
                inputs.insert(key.clone(), value.clone());
            }
        }
        other => {
            inputs.insert(source.to_string(), other.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeType;
    use serde_json::json;

    fn graph_with(names: &[&str]) -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        for name in names {
            graph
                .add_node(NodeType::Custom, *name, Value::Null)
                .unwrap();
        }
        graph
    }

    fn ok(name: &str, output: Value) -> NodeResult {
        NodeResult::ok(NodeId::new(name), output, 1)
    }

    #[test]
    fn test_later_edge_wins_on_key_overlap() {
        let mut graph = graph_with(&["a", "b", "sink"]);
        graph.add_edge("a", "sink").unwrap();
        graph.add_edge("b", "sink").unwrap();

        let mut ctx = RoundContext::new(0, HashMap::new());
        ctx.insert(ok("a", json!({"value": "from_a"})));
        ctx.insert(ok("b", json!({"value": "from_b"})));

        let sink = graph.node(&NodeId::new("sink")).unwrap();
        let inputs = assemble_inputs(&graph, sink, &ctx);

        // b's edge was declared after a's.
        assert_eq!(inputs["value"], "from_b");
    }

    #[test]
    fn test_non_object_output_keyed_by_source() {
        let mut graph = graph_with(&["a", "sink"]);
        graph.add_edge("a", "sink").unwrap();

        let mut ctx = RoundContext::new(0, HashMap::new());
        ctx.insert(ok("a", json!(42)));

        let sink = graph.node(&NodeId::new("sink")).unwrap();
        let inputs = assemble_inputs(&graph, sink, &ctx);

        assert_eq!(inputs["a"], 42);
    }

    #[test]
    fn test_error_output_not_propagated() {
        let mut graph = graph_with(&["a", "sink"]);
        graph.add_edge("a", "sink").unwrap();

        let mut ctx = RoundContext::new(0, HashMap::new());
        ctx.insert(NodeResult::error(NodeId::new("a"), "boom", 1));

        let sink = graph.node(&NodeId::new("sink")).unwrap();
        let inputs = assemble_inputs(&graph, sink, &ctx);

        assert!(inputs.get("a").is_none());
    }

    #[test]
    fn test_carried_inputs_seed_the_round() {
        let graph = graph_with(&["env"]);

        let mut carried = HashMap::new();
        let mut seed = Map::new();
        seed.insert("state".to_string(), json!({"step": 3}));
        carried.insert(NodeId::new("env"), seed);

        let ctx = RoundContext::new(1, carried);
        let env = graph.node(&NodeId::new("env")).unwrap();
        let inputs = assemble_inputs(&graph, env, &ctx);

        assert_eq!(inputs["state"], json!({"step": 3}));
    }

    #[test]
    fn test_upstream_outputs_win_over_carried() {
        let mut graph = graph_with(&["a", "sink"]);
        graph.add_edge("a", "sink").unwrap();

        let mut carried = HashMap::new();
        let mut seed = Map::new();
        seed.insert("value".to_string(), json!("carried"));
        carried.insert(NodeId::new("sink"), seed);

        let mut ctx = RoundContext::new(1, carried);
        ctx.insert(ok("a", json!({"value": "fresh"})));

        let sink = graph.node(&NodeId::new("sink")).unwrap();
        let inputs = assemble_inputs(&graph, sink, &ctx);

        assert_eq!(inputs["value"], "fresh");
    }

    #[test]
    fn test_upstream_failure_detection() {
        let mut graph = graph_with(&["a", "b", "sink"]);
        graph.add_edge("a", "sink").unwrap();
        graph.add_edge("b", "sink").unwrap();

        let mut ctx = RoundContext::new(0, HashMap::new());
        ctx.insert(ok("a", json!({})));
        ctx.insert(NodeResult::error(NodeId::new("b"), "boom", 1));

        let failure = ctx.upstream_failure(&graph, &NodeId::new("sink"));
        assert_eq!(failure, Some(NodeId::new("b")));
    }

    #[test]
    fn test_into_report() {
        let mut ctx = RoundContext::new(2, HashMap::new());
        ctx.insert(ok("a", json!({})));
        ctx.insert(NodeResult::skipped(NodeId::new("b"), "upstream"));

        let report = ctx.into_report();
        assert_eq!(report.round, 2);
        assert!(!report.complete);
        assert_eq!(report.results.len(), 2);
    }
}
