//! SharedLlmManager - single global owner of a decision model.
//!
//! Many decision nodes share one model instance. Nodes never hold the
//! model: they register with the manager and generate through it. The
//! manager merges per-node options with per-call overrides, serializes
//! backend access, and keeps usage statistics per node.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info};

use crate::error::LlmError;
use crate::traits::{DecisionModel, DecisionResponse, GenerateOptions};

/// Registration record for one node.
#[derive(Debug, Clone)]
struct NodeRegistration {
    options: GenerateOptions,
    registered_at: DateTime<Utc>,
}

/// Usage statistics for one registered node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeUsage {
    /// Number of generations issued by this node
    pub generations: u64,
    /// Timestamp of the node's last generation
    pub last_used: Option<DateTime<Utc>>,
}

/// Snapshot of global manager statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerStats {
    /// Backend name
    pub backend: String,
    /// Model name
    pub model: String,
    /// Total generations across all nodes
    pub total_generations: u64,
    /// Number of registered nodes
    pub registered_nodes: usize,
    /// Per-node usage
    pub per_node: HashMap<String, NodeUsage>,
}

#[derive(Default)]
struct ManagerState {
    nodes: HashMap<String, NodeRegistration>,
    usage: HashMap<String, NodeUsage>,
    total_generations: u64,
}

/// Shared manager around a single decision model instance.
///
/// Concurrent generate calls are gated by an internal semaphore
/// (one permit by default), so a backend never sees interleaved
/// requests unless explicitly allowed.
pub struct SharedLlmManager {
    model: Arc<dyn DecisionModel>,
    state: RwLock<ManagerState>,
    gate: Arc<Semaphore>,
}

impl SharedLlmManager {
    /// Create a manager owning `model`.
    pub fn new(model: impl DecisionModel + 'static) -> Self {
        Self {
            model: Arc::new(model),
            state: RwLock::new(ManagerState::default()),
            gate: Arc::new(Semaphore::new(1)),
        }
    }

    /// Allow up to `permits` concurrent backend calls.
    #[must_use]
    pub fn with_max_concurrency(mut self, permits: usize) -> Self {
        self.gate = Arc::new(Semaphore::new(permits.max(1)));
        self
    }

    /// Register a node that will generate through this manager.
    ///
    /// Re-registering replaces the stored options; usage statistics are
    /// kept across re-registration.
    pub async fn register_node(&self, node: impl Into<String>, options: GenerateOptions) {
        let node = node.into();
        let mut state = self.state.write().await;

        state.nodes.insert(
            node.clone(),
            NodeRegistration {
                options,
                registered_at: Utc::now(),
            },
        );
        state.usage.entry(node.clone()).or_default();

        info!(node = %node, "Decision node registered");
    }

    /// Check whether a node has been registered.
    pub async fn is_registered(&self, node: &str) -> bool {
        self.state.read().await.nodes.contains_key(node)
    }

    /// Generate a decision on behalf of a registered node.
    ///
    /// The node's registered options are merged with `overrides`
    /// (override fields win) before the backend call.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::NodeNotRegistered`] for unknown nodes, or the
    /// backend's error if generation fails.
    pub async fn generate_for_node(
        &self,
        node: &str,
        prompt: &str,
        overrides: &GenerateOptions,
    ) -> Result<DecisionResponse, LlmError> {
        let registered = {
            let state = self.state.read().await;
            state
                .nodes
                .get(node)
                .ok_or_else(|| LlmError::NodeNotRegistered(node.to_string()))?
                .options
                .clone()
        };

        let options = registered.merged_with(overrides);

        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| LlmError::NotAvailable("manager gate closed".into()))?;

        debug!(node = %node, prompt_len = prompt.len(), "Forwarding generate call");
        let mut response = self.model.generate(prompt, &options).await?;

        let global_generation = {
            let mut state = self.state.write().await;
            state.total_generations += 1;
            let usage = state.usage.entry(node.to_string()).or_default();
            usage.generations += 1;
            usage.last_used = Some(Utc::now());
            state.total_generations
        };

        response.metadata = annotate(response.metadata, node, global_generation);
        Ok(response)
    }

    /// Check that the underlying backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the check fails.
    pub async fn health_check(&self) -> Result<bool, LlmError> {
        self.model.health_check().await
    }

    /// Backend name of the owned model.
    pub fn backend(&self) -> &str {
        self.model.backend()
    }

    /// Model name of the owned model.
    pub fn model_name(&self) -> &str {
        self.model.model()
    }

    /// Snapshot of global statistics.
    pub async fn global_stats(&self) -> ManagerStats {
        let state = self.state.read().await;
        ManagerStats {
            backend: self.model.backend().to_string(),
            model: self.model.model().to_string(),
            total_generations: state.total_generations,
            registered_nodes: state.nodes.len(),
            per_node: state.usage.clone(),
        }
    }

    /// Usage statistics for one node.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::NodeNotRegistered`] for unknown nodes.
    pub async fn node_stats(&self, node: &str) -> Result<NodeUsage, LlmError> {
        let state = self.state.read().await;
        if !state.nodes.contains_key(node) {
            return Err(LlmError::NodeNotRegistered(node.to_string()));
        }
        Ok(state.usage.get(node).cloned().unwrap_or_default())
    }

    /// When a node was registered, if it was.
    pub async fn registered_at(&self, node: &str) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .await
            .nodes
            .get(node)
            .map(|r| r.registered_at)
    }
}

/// Fold node identity into response metadata without discarding what
/// the backend put there.
fn annotate(metadata: Value, node: &str, global_generation: u64) -> Value {
    let mut object = match metadata {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("backend_metadata".to_string(), other);
            map
        }
    };
    object.insert("node".to_string(), json!(node));
    object.insert("global_generation".to_string(), json!(global_generation));
    Value::Object(object)
}
