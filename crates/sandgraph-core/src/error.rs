//! Error taxonomy for the workflow engine.
//!
//! Graph errors are raised synchronously at build/validation time and
//! are fatal to graph construction. Node execution failures never
//! surface as errors: the executor converts them into `Error` results
//! inside the per-round report.

use thiserror::Error;

use crate::types::NodeId;

/// Render a cycle path for error messages.
fn join_path(path: &[NodeId]) -> String {
    path.iter()
        .map(NodeId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Graph construction and validation errors.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node with this name already exists
    #[error("Duplicate node: {0}")]
    DuplicateNode(NodeId),

    /// An edge endpoint references a node that was never added
    #[error("Edge endpoint references unknown node: {0}")]
    DanglingEdge(NodeId),

    /// An intra-round edge may not point at its own source
    #[error("Self-loop on node: {0}")]
    SelfLoop(NodeId),

    /// The intra-round edge set contains a cycle
    #[error("Cyclic graph: {}", join_path(.0))]
    CyclicGraph(Vec<NodeId>),

    /// A node configuration failed validation
    #[error("Invalid config for node '{node}': {reason}")]
    InvalidConfig { node: NodeId, reason: String },
}

/// Errors surfaced by the workflow engine façade.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Graph construction or validation failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A referenced node does not exist in the graph
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// The decision backend was unreachable before any node had run
    #[error("Decision backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Strict mode only: a round finished with non-Ok nodes
    #[error("Round {round} incomplete; failed nodes: {}", .failed.join(", "))]
    RoundIncomplete { round: usize, failed: Vec<String> },

    /// A value could not be serialized into the result structure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Node-level execution errors, caught by the executor and converted
/// into `Error` results.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Decision backend call failed
    #[error("LLM error: {0}")]
    Llm(#[from] sandgraph_llm::LlmError),

    /// Sandbox call failed
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] sandgraph_sandbox::SandboxError),

    /// Trainer call failed
    #[error("Trainer error: {0}")]
    Trainer(#[from] sandgraph_rl::RlError),

    /// Environment node has no bound sandbox
    #[error("No sandbox bound to environment node: {0}")]
    SandboxNotBound(NodeId),

    /// A required input was missing from the merged input mapping
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Node execution exceeded its timeout
    #[error("Node timed out after {0} ms")]
    Timeout(u64),

    /// Custom handler failed
    #[error("Handler error: {0}")]
    Handler(String),

    /// Value serialization failed inside the executor
    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_graph_names_cycle() {
        let err = GraphError::CyclicGraph(vec![
            NodeId::new("a"),
            NodeId::new("b"),
            NodeId::new("a"),
        ]);
        assert_eq!(err.to_string(), "Cyclic graph: a -> b -> a");
    }

    #[test]
    fn test_round_incomplete_lists_failures() {
        let err = WorkflowError::RoundIncomplete {
            round: 2,
            failed: vec!["env".to_string(), "decide".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Round 2 incomplete; failed nodes: env, decide"
        );
    }

    #[test]
    fn test_graph_error_converts() {
        let err: WorkflowError = GraphError::DuplicateNode(NodeId::new("env")).into();
        assert!(matches!(err, WorkflowError::Graph(_)));
    }
}
