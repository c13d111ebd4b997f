//! Core type definitions for the workflow engine.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Unique identifier for a node in the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// NODE RESULTS
// ============================================================================

/// Outcome status of one node execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Node executed and produced output
    Ok,
    /// Node execution failed; `error` holds the detail
    Error,
    /// Node was not executed because an upstream dependency failed
    Skipped,
}

/// Result of executing one node in one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    /// Node that produced this result
    pub node: NodeId,
    /// Outcome status
    pub status: NodeStatus,
    /// Node output (meaningful only when status is Ok)
    pub output: Value,
    /// Error or skip reason when status is not Ok
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock execution time in milliseconds
    pub duration_ms: u64,
}

impl NodeResult {
    /// Create a successful result.
    #[must_use]
    pub fn ok(node: NodeId, output: Value, duration_ms: u64) -> Self {
        Self {
            node,
            status: NodeStatus::Ok,
            output,
            error: None,
            duration_ms,
        }
    }

    /// Create a failed result.
    #[must_use]
    pub fn error(node: NodeId, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            node,
            status: NodeStatus::Error,
            output: Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }

    /// Create a skipped result.
    #[must_use]
    pub fn skipped(node: NodeId, reason: impl Into<String>) -> Self {
        Self {
            node,
            status: NodeStatus::Skipped,
            output: Value::Null,
            error: Some(reason.into()),
            duration_ms: 0,
        }
    }

    /// Check if the node executed successfully.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == NodeStatus::Ok
    }
}

// ============================================================================
// AGGREGATE RESULTS
// ============================================================================

/// Per-round slice of an aggregate result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round index, starting at 0
    pub round: usize,
    /// Result per node name
    pub results: BTreeMap<String, NodeResult>,
    /// Whether every node in the round finished Ok
    pub complete: bool,
}

impl RoundReport {
    /// Names of nodes that did not finish Ok.
    #[must_use]
    pub fn failed_nodes(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|(_, result)| !result.is_ok())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Result of a full workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Unique run identifier
    pub run_id: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Number of rounds actually executed (early termination may stop
    /// before the requested count)
    pub rounds_executed: usize,
    /// Per-round results, round index → node name → result
    pub per_round: Vec<RoundReport>,
    /// Output of the final round's terminal node
    pub final_state: Value,
    /// Trainer statistics at the end of the run
    pub training_stats: Value,
    /// Total wall-clock duration in milliseconds
    pub duration_ms: u64,
}
