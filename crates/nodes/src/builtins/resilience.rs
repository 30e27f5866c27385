//! Resilience family: `retry`, `try_catch`, `timeout`, `delay`.
//!
//! `retry`, `try_catch`, and `timeout` are control-flow containers: their
//! `data.operation: {type, data}` names an inner node they dispatch through
//! `ctx.registry()`, the same way the engine dispatches top-level nodes.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::error::{NodeError, NodeErrorKind};
use crate::model::NodeDefinition;
use crate::registry::Executor;

fn inner_node(node: &NodeDefinition) -> Result<NodeDefinition, NodeError> {
    let operation = node.field("operation")?;
    let kind = operation
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| NodeError::invalid_payload(format!("node '{}' operation needs a 'type'", node.id)))?;
    let data = operation.get("data").cloned().unwrap_or(Value::Null);
    Ok(NodeDefinition::new(format!("{}:inner", node.id), kind, data))
}

async fn dispatch_inner(ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
    let child = inner_node(node)?;
    let executor = ctx.registry().get(&child.kind)?.clone();
    executor.execute(ctx, &child).await
}

/// `data.operation`, `data.max_attempts?` (default `Config::default_max_attempts`),
/// `data.backoff_ms?` (default `Config::default_backoff`, doubled each
/// retry). Retries until the inner operation succeeds or attempts run out.
pub struct RetryExecutor;

#[async_trait]
impl Executor for RetryExecutor {
    fn node_kind(&self) -> &str {
        "retry"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        inner_node(node).map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let max_attempts = node.data.get("max_attempts").and_then(Value::as_u64).unwrap_or(ctx.config().default_max_attempts as u64).max(1);
        let mut backoff = node
            .data
            .get("backoff_ms")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
            .unwrap_or(ctx.config().default_backoff);

        let mut last_err = None;
        for attempt in 0..max_attempts {
            if attempt > 0 {
                ctx.increment_node_execution()?;
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            match dispatch_inner(ctx, node).await {
                Ok(value) => return Ok(value),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.expect("max_attempts >= 1 guarantees at least one iteration"))
    }
}

/// `data.operation`, `data.fallback?` (a literal value returned on
/// failure). Without `fallback`, a caught error becomes a normal
/// `{error, message}` value instead of propagating.
pub struct TryCatchExecutor;

#[async_trait]
impl Executor for TryCatchExecutor {
    fn node_kind(&self) -> &str {
        "try_catch"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        inner_node(node).map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        match dispatch_inner(ctx, node).await {
            Ok(value) => Ok(value),
            Err(err) => match node.data.get("fallback") {
                Some(fallback) => Ok(fallback.clone()),
                None => Ok(json!({ "error": err.kind.to_string(), "message": err.message })),
            },
        }
    }
}

/// `data.operation`, `data.timeout_ms`. Aborts the inner operation with a
/// `Timeout` error if it does not finish within the window, or within the
/// execution's remaining global deadline, whichever is sooner.
pub struct TimeoutExecutor;

#[async_trait]
impl Executor for TimeoutExecutor {
    fn node_kind(&self) -> &str {
        "timeout"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        node.field_f64("timeout_ms")?;
        inner_node(node).map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let requested = Duration::from_millis(node.field_f64("timeout_ms")? as u64);
        let remaining = ctx.deadline().saturating_duration_since(std::time::Instant::now());
        let budget = requested.min(remaining);

        match tokio::time::timeout(budget, dispatch_inner(ctx, node)).await {
            Ok(result) => result,
            Err(_) => Err(NodeError::new(NodeErrorKind::Timeout, format!("node '{}' exceeded its timeout", node.id))),
        }
    }
}

/// `data.duration_ms`. Suspends, then passes the first input through
/// unchanged (or `data.value`, if present).
pub struct DelayExecutor;

#[async_trait]
impl Executor for DelayExecutor {
    fn node_kind(&self) -> &str {
        "delay"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        node.field_f64("duration_ms").map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let requested = Duration::from_millis(node.field_f64("duration_ms")? as u64);
        let remaining = ctx.deadline().saturating_duration_since(std::time::Instant::now());
        tokio::time::sleep(requested.min(remaining)).await;
        Ok(node.data.get("value").cloned().unwrap_or_else(|| ctx.get_input(&node.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn retry_succeeds_without_retrying_on_first_try() {
        let node = NodeDefinition::new(
            "n1",
            "retry",
            json!({ "operation": { "type": "number", "data": { "value": 5.0 } }, "max_attempts": 3, "backoff_ms": 1 }),
        );
        let ctx = TestContext::new();
        assert_eq!(RetryExecutor.execute(&ctx, &node).await.unwrap(), Value::from(5.0));
    }

    #[tokio::test]
    async fn retry_exhausts_attempts_on_persistent_failure() {
        let node = NodeDefinition::new(
            "n1",
            "retry",
            json!({ "operation": { "type": "extract", "data": {} }, "max_attempts": 2, "backoff_ms": 1 }),
        );
        let ctx = TestContext::new();
        assert!(RetryExecutor.execute(&ctx, &node).await.is_err());
    }

    #[tokio::test]
    async fn try_catch_returns_fallback_on_error() {
        let node = NodeDefinition::new(
            "n1",
            "try_catch",
            json!({ "operation": { "type": "extract", "data": {} }, "fallback": "safe" }),
        );
        let ctx = TestContext::new();
        assert_eq!(TryCatchExecutor.execute(&ctx, &node).await.unwrap(), Value::String("safe".into()));
    }

    #[tokio::test]
    async fn try_catch_passes_through_success() {
        let node = NodeDefinition::new("n1", "try_catch", json!({ "operation": { "type": "number", "data": { "value": 1.0 } } }));
        let ctx = TestContext::new();
        assert_eq!(TryCatchExecutor.execute(&ctx, &node).await.unwrap(), Value::from(1.0));
    }

    #[tokio::test]
    async fn delay_passes_value_through() {
        let node = NodeDefinition::new("n1", "delay", json!({ "duration_ms": 1, "value": "done" }));
        let ctx = TestContext::new();
        assert_eq!(DelayExecutor.execute(&ctx, &node).await.unwrap(), Value::String("done".into()));
    }
}
