//! Node definitions and typed per-node configuration.
//!
//! Every node type has a typed configuration record with an enumerated
//! option set; unknown keys are rejected when the node is added, not
//! silently ignored at execution time.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GraphError;
use crate::types::NodeId;

// ============================================================================
// NODE TYPE
// ============================================================================

/// The capability class of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Environment subset: generates cases, executes actions, scores
    Environment,
    /// Decision node backed by the shared LLM
    Decision,
    /// Policy-update node backed by the trainer
    PolicyUpdate,
    /// Caller-defined node
    Custom,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Environment => write!(f, "environment"),
            NodeType::Decision => write!(f, "decision"),
            NodeType::PolicyUpdate => write!(f, "policy_update"),
            NodeType::Custom => write!(f, "custom"),
        }
    }
}

// ============================================================================
// TYPED CONFIGURATION
// ============================================================================

/// Configuration for an environment node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Input key the action is read from
    pub action_key: String,
    /// Action used when no upstream input supplies one
    pub default_action: Value,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            action_key: "action".to_string(),
            default_action: Value::String("noop".to_string()),
        }
    }
}

/// Configuration for a decision node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecisionConfig {
    /// Role line prepended to generated prompts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Prompt template; `{inputs}` is replaced with the serialized
    /// input mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    /// Sampling temperature forwarded to the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Token limit forwarded to the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Reasoning style hint forwarded to the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_type: Option<String>,
}

impl DecisionConfig {
    /// Backend options derived from this configuration.
    #[must_use]
    pub fn generate_options(&self) -> sandgraph_llm::GenerateOptions {
        sandgraph_llm::GenerateOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            reasoning_type: self.reasoning_type.clone(),
        }
    }
}

/// Configuration for a policy-update node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyUpdateConfig {
    /// Apply an update every N round boundaries
    pub update_every_rounds: u32,
}

impl Default for PolicyUpdateConfig {
    fn default() -> Self {
        Self {
            update_every_rounds: 1,
        }
    }
}

/// Typed configuration, one variant per node type.
#[derive(Debug, Clone)]
pub enum NodeConfig {
    Environment(EnvironmentConfig),
    Decision(DecisionConfig),
    PolicyUpdate(PolicyUpdateConfig),
    /// Custom nodes take a free-form object, passed through to the
    /// registered handler
    Custom(Value),
}

impl NodeConfig {
    /// Parse and validate a raw configuration value for `node_type`.
    ///
    /// Null stands for "all defaults". Unknown keys fail parsing.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidConfig`] naming the offending node
    /// if the value does not match the node type's option set.
    pub fn parse(node_type: NodeType, name: &NodeId, config: Value) -> Result<Self, GraphError> {
        let invalid = |reason: String| GraphError::InvalidConfig {
            node: name.clone(),
            reason,
        };

        match node_type {
            NodeType::Environment => {
                if config.is_null() {
                    return Ok(Self::Environment(EnvironmentConfig::default()));
                }
                serde_json::from_value(config)
                    .map(Self::Environment)
                    .map_err(|e| invalid(e.to_string()))
            }
            NodeType::Decision => {
                if config.is_null() {
                    return Ok(Self::Decision(DecisionConfig::default()));
                }
                serde_json::from_value(config)
                    .map(Self::Decision)
                    .map_err(|e| invalid(e.to_string()))
            }
            NodeType::PolicyUpdate => {
                if config.is_null() {
                    return Ok(Self::PolicyUpdate(PolicyUpdateConfig::default()));
                }
                serde_json::from_value(config)
                    .map(Self::PolicyUpdate)
                    .map_err(|e| invalid(e.to_string()))
            }
            NodeType::Custom => match config {
                Value::Null => Ok(Self::Custom(Value::Object(Map::new()))),
                Value::Object(_) => Ok(Self::Custom(config)),
                other => Err(invalid(format!(
                    "custom config must be an object, got {other}"
                ))),
            },
        }
    }

    /// Render the configuration as the base input object for the node.
    #[must_use]
    pub fn to_input_object(&self) -> Map<String, Value> {
        let value = match self {
            Self::Environment(cfg) => serde_json::to_value(cfg),
            Self::Decision(cfg) => serde_json::to_value(cfg),
            Self::PolicyUpdate(cfg) => serde_json::to_value(cfg),
            Self::Custom(cfg) => Ok(cfg.clone()),
        };

        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

// ============================================================================
// NODE
// ============================================================================

/// A node in the workflow graph. Immutable after addition.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique node name
    pub name: NodeId,
    /// Capability class
    pub node_type: NodeType,
    /// Validated typed configuration
    pub config: NodeConfig,
}

impl Node {
    /// Create a node with a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidConfig`] if `config` does not match
    /// the node type's option set.
    pub fn new(node_type: NodeType, name: NodeId, config: Value) -> Result<Self, GraphError> {
        let config = NodeConfig::parse(node_type, &name, config)?;
        Ok(Self {
            name,
            node_type,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_config_uses_defaults() {
        let node = Node::new(NodeType::Environment, NodeId::new("env"), Value::Null).unwrap();
        match &node.config {
            NodeConfig::Environment(cfg) => {
                assert_eq!(cfg.action_key, "action");
                assert_eq!(cfg.default_action, json!("noop"));
            }
            _ => panic!("expected environment config"),
        }
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Node::new(
            NodeType::Decision,
            NodeId::new("decide"),
            json!({"role": "trader", "temprature": 0.7}),
        )
        .unwrap_err();

        match err {
            GraphError::InvalidConfig { node, reason } => {
                assert_eq!(node.as_str(), "decide");
                assert!(reason.contains("temprature"));
            }
            other => panic!("expected InvalidConfig, got {other}"),
        }
    }

    #[test]
    fn test_custom_config_must_be_object() {
        let err = Node::new(NodeType::Custom, NodeId::new("c"), json!([1, 2])).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConfig { .. }));
    }

    #[test]
    fn test_config_to_input_object() {
        let node = Node::new(
            NodeType::Decision,
            NodeId::new("decide"),
            json!({"role": "trader", "temperature": 0.2}),
        )
        .unwrap();

        let inputs = node.config.to_input_object();
        assert_eq!(inputs["role"], "trader");
        // Unset options stay absent rather than appearing as nulls.
        assert!(!inputs.contains_key("max_tokens"));
    }

    #[test]
    fn test_policy_update_defaults() {
        let node = Node::new(NodeType::PolicyUpdate, NodeId::new("opt"), Value::Null).unwrap();
        match &node.config {
            NodeConfig::PolicyUpdate(cfg) => assert_eq!(cfg.update_every_rounds, 1),
            _ => panic!("expected policy update config"),
        }
    }
}
