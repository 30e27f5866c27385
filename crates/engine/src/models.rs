//! Core domain models: the persisted `Workflow` wrapper and the raw
//! execution `Payload` it carries (spec.md §6 "Payload format").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a workflow is started. Orthogonal to payload execution; carried
/// by the persisted `Workflow` for the API/CLI layer to act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    Webhook { path: String },
    Manual,
    Cron { expression: String },
}

/// Directed edge from one node's output to another node's input.
///
/// `source_handle`/`target_handle` name ports: absence means
/// "unconditional" (the edge is satisfied whenever its source produced a
/// value at all); a present `source_handle` must match a `path` field in
/// the source's produced value (see `Engine::node_should_execute`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, rename = "sourceHandle")]
    pub source_handle: Option<String>,
    #[serde(default, rename = "targetHandle")]
    pub target_handle: Option<String>,
    /// Deprecated predecessor of `sourceHandle`, still accepted on the
    /// wire. Disagreeing with `sourceHandle` is a validation error — see
    /// `Engine::new`.
    #[serde(default)]
    pub condition: Option<String>,
}

/// The wire payload an `Engine` executes: `{nodes, edges}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    pub nodes: Vec<nodes::NodeDefinition>,
    pub edges: Vec<Edge>,
}

/// A persisted workflow: a named, triggerable `Payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub trigger: Trigger,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, trigger: Trigger, payload: Payload) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), trigger, payload, created_at: Utc::now() }
    }
}
