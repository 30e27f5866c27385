//! Engine-level error types (spec.md §7 taxonomy).

use thiserror::Error;

/// Errors produced while constructing or running an [`crate::Engine`].
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Structural (payload-shape) errors ------
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    #[error("edge references unknown node '{node_id}' ({side} side)")]
    UnknownNodeReference { node_id: String, side: &'static str },

    #[error("workflow graph contains a cycle")]
    CycleDetected,

    #[error("node '{node_id}' failed validation: {source}")]
    NodeValidation { node_id: String, #[source] source: nodes::NodeError },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // ------ Resource ceiling errors ------
    #[error("payload size {size} exceeds MaxPayloadSize {limit}")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("node count {count} exceeds MaxNodes {limit}")]
    TooManyNodes { count: usize, limit: usize },

    #[error("edge count {count} exceeds MaxEdges {limit}")]
    TooManyEdges { count: usize, limit: usize },

    #[error("execution exceeded MaxExecutionTime")]
    ExecutionTimeout,

    // ------ Configuration / payload parsing ------
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid payload JSON: {0}")]
    InvalidJson(String),

    #[error(transparent)]
    Graph(#[from] graph::GraphError),

    // ------ Persistence ------
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}

impl EngineError {
    /// Whether this error should abort the whole execution rather than
    /// just mark one node failed and continue (spec.md §4.7 loop:
    /// "if fatal (e.g. LimitExceeded, Timeout): break").
    pub fn is_fatal(node_error: &nodes::NodeError) -> bool {
        use nodes::NodeErrorKind::*;
        matches!(node_error.kind, IterationLimitExceeded | Timeout)
    }
}
