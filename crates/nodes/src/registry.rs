//! The `Executor` contract and the registry that dispatches on node kind.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::model::NodeDefinition;

/// A node implementation. One instance is registered per `node_kind()` and
/// shared (via `Arc`) across every workflow execution that uses it.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The `type` string a [`NodeDefinition`] must carry to dispatch here.
    fn node_kind(&self) -> &str;

    /// Structural validation of `node.data`, run once before execution
    /// begins so malformed payloads fail fast instead of mid-run.
    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError>;

    /// Run the node. `ctx.get_inputs(&node.id)` yields values produced by
    /// upstream nodes with a satisfied edge into this one.
    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError>;
}

/// Maps node-kind strings to their [`Executor`]. Built once at startup and
/// frozen before any execution begins — registration after `freeze()` is a
/// programming error, not a runtime one, so it panics rather than erroring.
#[derive(Default)]
pub struct NodeRegistry {
    executors: HashMap<String, Arc<dyn Executor>>,
    frozen: bool,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, executor: Arc<dyn Executor>) {
        assert!(!self.frozen, "cannot register '{}' after the registry was frozen", executor.node_kind());
        self.executors.insert(executor.node_kind().to_string(), executor);
    }

    /// Lock the registry against further registration. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn get(&self, kind: &str) -> Result<&Arc<dyn Executor>, NodeError> {
        self.executors.get(kind).ok_or_else(|| NodeError::unknown_kind(kind))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.executors.contains_key(kind)
    }

    /// Register every built-in executor and freeze the registry.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_all(&mut registry);
        registry.freeze();
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;

    #[test]
    fn unregistered_kind_errors() {
        let registry = NodeRegistry::new();
        assert!(registry.get("nope").is_err());
    }

    #[test]
    fn registered_kind_is_found() {
        let mut registry = NodeRegistry::new();
        registry.register(Arc::new(MockExecutor::returning("mock", Value::Null)));
        assert!(registry.get("mock").is_ok());
    }

    #[test]
    #[should_panic]
    fn registering_after_freeze_panics() {
        let mut registry = NodeRegistry::new();
        registry.freeze();
        registry.register(Arc::new(MockExecutor::returning("mock", Value::Null)));
    }
}
