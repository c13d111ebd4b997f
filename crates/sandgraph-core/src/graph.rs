//! WorkflowGraph - node/edge construction and validation.
//!
//! Edges come in two kinds. Intra-round edges are same-round data
//! dependencies and must form a DAG; feedback edges link round *r*'s
//! output to round *r+1*'s input and are excluded from the acyclicity
//! check. A workflow that conceptually cycles
//! (environment → decision → optimizer → environment) stays schedulable
//! because the cycle-closing edge is tagged as feedback: the cycle is
//! unrolled across rounds instead of existing inside one round's
//! static graph.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::Value;

use crate::error::GraphError;
use crate::node::{Node, NodeType};
use crate::types::NodeId;

// ============================================================================
// EDGES
// ============================================================================

/// The scheduling class of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Same-round dependency; participates in acyclicity checking
    IntraRound,
    /// Round-boundary link; carries output into the next round
    Feedback,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::IntraRound => write!(f, "intra_round"),
            EdgeKind::Feedback => write!(f, "feedback"),
        }
    }
}

/// A directed edge between two nodes.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
}

// ============================================================================
// WORKFLOW GRAPH
// ============================================================================

/// The workflow graph: nodes in insertion order plus directed edges in
/// declaration order. Both orders are load-bearing - the scheduler
/// breaks ties by node insertion order, and the propagator resolves
/// input-key conflicts by edge declaration order.
#[derive(Debug, Default)]
pub struct WorkflowGraph {
    nodes: Vec<Node>,
    index: HashMap<NodeId, usize>,
    edges: Vec<Edge>,
}

impl WorkflowGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    /// Add a node with a raw configuration value.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNode`] if the name is taken, or
    /// [`GraphError::InvalidConfig`] if the configuration does not
    /// match the node type's option set.
    pub fn add_node(
        &mut self,
        node_type: NodeType,
        name: impl Into<NodeId>,
        config: Value,
    ) -> Result<(), GraphError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }

        let node = Node::new(node_type, name.clone(), config)?;
        self.index.insert(name, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Add an intra-round edge.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DanglingEdge`] if an endpoint is unknown,
    /// or [`GraphError::SelfLoop`] if `from == to`.
    pub fn add_edge(
        &mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
    ) -> Result<(), GraphError> {
        let from = from.into();
        let to = to.into();

        self.require_node(&from)?;
        self.require_node(&to)?;
        if from == to {
            return Err(GraphError::SelfLoop(from));
        }

        self.edges.push(Edge {
            from,
            to,
            kind: EdgeKind::IntraRound,
        });
        Ok(())
    }

    /// Designate the edge `from → to` as a round-boundary link.
    ///
    /// Re-tags an existing intra-round edge, or inserts a new feedback
    /// edge if none exists. Feedback self-edges are permitted: they
    /// carry a node's round-*r* output into its own round-*r+1* input
    /// and create no intra-round dependency.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DanglingEdge`] if an endpoint is unknown.
    pub fn mark_feedback(
        &mut self,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
    ) -> Result<(), GraphError> {
        let from = from.into();
        let to = to.into();

        self.require_node(&from)?;
        self.require_node(&to)?;

        if let Some(edge) = self
            .edges
            .iter_mut()
            .find(|e| e.from == from && e.to == to)
        {
            edge.kind = EdgeKind::Feedback;
            return Ok(());
        }

        self.edges.push(Edge {
            from,
            to,
            kind: EdgeKind::Feedback,
        });
        Ok(())
    }

    fn require_node(&self, name: &NodeId) -> Result<(), GraphError> {
        if self.index.contains_key(name) {
            Ok(())
        } else {
            Err(GraphError::DanglingEdge(name.clone()))
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// All nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node by name.
    #[must_use]
    pub fn node(&self, name: &NodeId) -> Option<&Node> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Check if a node exists.
    #[must_use]
    pub fn contains(&self, name: &NodeId) -> bool {
        self.index.contains_key(name)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Intra-round edges in declaration order.
    pub fn intra_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.kind == EdgeKind::IntraRound)
    }

    /// Feedback edges in declaration order.
    pub fn feedback_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.kind == EdgeKind::Feedback)
    }

    /// Intra-round predecessors of a node, in edge declaration order.
    #[must_use]
    pub fn intra_predecessors(&self, name: &NodeId) -> Vec<&NodeId> {
        self.intra_edges()
            .filter(|e| &e.to == name)
            .map(|e| &e.from)
            .collect()
    }

    /// Intra-round successors of a node, in edge declaration order.
    #[must_use]
    pub fn intra_successors(&self, name: &NodeId) -> Vec<&NodeId> {
        self.intra_edges()
            .filter(|e| &e.from == name)
            .map(|e| &e.to)
            .collect()
    }

    // ========================================================================
    // VALIDATION
    // ========================================================================

    /// Validate the graph: the intra-round edge set must be acyclic.
    ///
    /// Idempotent; call again after any mutation. Feedback edges are
    /// not inspected.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicGraph`] naming a discovered cycle.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for node in &self.nodes {
            if self.walk_for_cycle(&node.name, &mut visited, &mut rec_stack, &mut path) {
                return Err(GraphError::CyclicGraph(trim_to_cycle(path)));
            }
        }

        Ok(())
    }

    fn walk_for_cycle(
        &self,
        node: &NodeId,
        visited: &mut HashSet<NodeId>,
        rec_stack: &mut HashSet<NodeId>,
        path: &mut Vec<NodeId>,
    ) -> bool {
        if rec_stack.contains(node) {
            path.push(node.clone());
            return true;
        }
        if visited.contains(node) {
            return false;
        }

        visited.insert(node.clone());
        rec_stack.insert(node.clone());
        path.push(node.clone());

        for successor in self.intra_successors(node) {
            if self.walk_for_cycle(successor, visited, rec_stack, path) {
                return true;
            }
        }

        path.pop();
        rec_stack.remove(node);
        false
    }

    /// Nodes of a given type, in insertion order.
    #[must_use]
    pub fn nodes_of_type(&self, node_type: NodeType) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == node_type)
            .collect()
    }
}

/// Reduce a DFS walk path to the cycle it discovered: the path ends
/// with a repeated node; everything before its first occurrence is the
/// approach, not the cycle.
fn trim_to_cycle(path: Vec<NodeId>) -> Vec<NodeId> {
    if let Some(last) = path.last() {
        if let Some(start) = path.iter().position(|n| n == last) {
            if start + 1 < path.len() {
                return path[start..].to_vec();
            }
        }
    }
    path
}
