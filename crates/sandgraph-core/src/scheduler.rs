//! Scheduler - topological execution plans over intra-round edges.
//!
//! Kahn's algorithm with a determinism rule: when several nodes are
//! eligible at once, the one added to the graph first runs first. Plans
//! are computed once per graph shape and reused across rounds; the
//! round loop itself lives in the engine.

use std::collections::{HashMap, HashSet};

use crate::error::GraphError;
use crate::graph::WorkflowGraph;
use crate::types::NodeId;

/// Ordered execution plan for one round.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Node names in a valid topological order
    pub order: Vec<NodeId>,
    dependencies: HashMap<NodeId, Vec<NodeId>>,
}

impl ExecutionPlan {
    /// Intra-round dependencies of a node, in edge declaration order.
    #[must_use]
    pub fn dependencies_of(&self, node: &NodeId) -> &[NodeId] {
        self.dependencies
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of scheduled nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the plan schedules nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Compute a topological execution plan for the graph.
///
/// # Errors
///
/// Returns [`GraphError::CyclicGraph`] if the intra-round edges contain
/// a cycle. `WorkflowGraph::validate` reports cycles with a precise
/// path; this is the scheduler's own backstop.
pub fn plan(graph: &WorkflowGraph) -> Result<ExecutionPlan, GraphError> {
    let mut in_degree: HashMap<&NodeId, usize> = graph
        .nodes()
        .iter()
        .map(|node| (&node.name, 0))
        .collect();
    for edge in graph.intra_edges() {
        if let Some(degree) = in_degree.get_mut(&edge.to) {
            *degree += 1;
        }
    }

    let mut order = Vec::with_capacity(graph.len());
    let mut emitted: HashSet<&NodeId> = HashSet::new();

    // Repeatedly take the first (by insertion order) unemitted node
    // with no remaining dependencies.
    while order.len() < graph.len() {
        let next = graph
            .nodes()
            .iter()
            .find(|node| !emitted.contains(&node.name) && in_degree.get(&node.name) == Some(&0));

        let Some(node) = next else {
            let stuck: Vec<NodeId> = graph
                .nodes()
                .iter()
                .filter(|n| !emitted.contains(&n.name))
                .map(|n| n.name.clone())
                .collect();
            return Err(GraphError::CyclicGraph(stuck));
        };

        emitted.insert(&node.name);
        order.push(node.name.clone());

        for edge in graph.intra_edges() {
            if edge.from == node.name {
                if let Some(degree) = in_degree.get_mut(&edge.to) {
                    *degree = degree.saturating_sub(1);
                }
            }
        }
    }

    let dependencies = graph
        .nodes()
        .iter()
        .map(|node| {
            let preds = graph
                .intra_predecessors(&node.name)
                .into_iter()
                .cloned()
                .collect();
            (node.name.clone(), preds)
        })
        .collect();

    Ok(ExecutionPlan { order, dependencies })
}
