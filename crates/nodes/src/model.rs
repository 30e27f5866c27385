//! `NodeDefinition` — the payload-level representation of a single node.
//!
//! Lives in this crate (rather than `engine`) so executors can take it by
//! reference without a circular dependency; `engine` re-exports it as the
//! node type of its workflow payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl NodeDefinition {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: Value) -> Self {
        Self { id: id.into(), kind: kind.into(), data }
    }

    /// Fetch a required field from `data`, failing with `InvalidPayload`.
    pub fn field<'a>(&'a self, name: &str) -> Result<&'a Value, crate::NodeError> {
        self.data
            .get(name)
            .ok_or_else(|| crate::NodeError::invalid_payload(format!("node '{}' missing field '{name}'", self.id)))
    }

    pub fn field_str(&self, name: &str) -> Result<&str, crate::NodeError> {
        self.field(name)?
            .as_str()
            .ok_or_else(|| crate::NodeError::invalid_payload(format!("node '{}' field '{name}' must be a string", self.id)))
    }

    pub fn field_f64(&self, name: &str) -> Result<f64, crate::NodeError> {
        self.field(name)?
            .as_f64()
            .ok_or_else(|| crate::NodeError::invalid_payload(format!("node '{}' field '{name}' must be a number", self.id)))
    }
}
