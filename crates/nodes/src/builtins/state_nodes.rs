//! State family: `variable`, `accumulator`, `counter`, `cache`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::error::{NodeError, NodeErrorKind};
use crate::model::NodeDefinition;
use crate::registry::Executor;

/// `data.action` ∈ `{get, set, delete}`, `data.name`. `set` takes
/// `data.value` or, absent that, the first input. `get` on a missing
/// variable fails with `VariableNotFound` unless `data.default` is set.
pub struct VariableExecutor;

#[async_trait]
impl Executor for VariableExecutor {
    fn node_kind(&self) -> &str {
        "variable"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        let action = node.field_str("action")?;
        if !matches!(action, "get" | "set" | "delete") {
            return Err(NodeError::new(NodeErrorKind::InvalidOperation, format!("unknown variable action '{action}'")));
        }
        node.field_str("name").map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let action = node.field_str("action")?;
        let name = node.field_str("name")?;

        match action {
            "set" => {
                let value = node.data.get("value").cloned().unwrap_or_else(|| ctx.get_input(&node.id));
                ctx.state().set_variable(name, value.clone());
                Ok(value)
            }
            "get" => match ctx.state().get_variable(name) {
                Some(value) => Ok(value),
                None => match node.data.get("default") {
                    Some(default) => Ok(default.clone()),
                    None => Err(NodeError::new(NodeErrorKind::VariableNotFound, format!("variable '{name}' not found"))),
                },
            },
            "delete" => {
                let existed = ctx.state().get_variable(name).is_some();
                ctx.state().set_variable(name, Value::Null);
                Ok(Value::Bool(existed))
            }
            _ => unreachable!("validated above"),
        }
    }
}

/// `data.reducer` ∈ `{sum, multiply, concat, push, replace}`, applied to
/// the first input against the current accumulator cell. The new value is
/// stored and returned.
pub struct AccumulatorExecutor;

#[async_trait]
impl Executor for AccumulatorExecutor {
    fn node_kind(&self) -> &str {
        "accumulator"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        let reducer = node.field_str("reducer")?;
        if !matches!(reducer, "sum" | "multiply" | "concat" | "push" | "replace") {
            return Err(NodeError::new(NodeErrorKind::InvalidOperation, format!("unknown reducer '{reducer}'")));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let reducer = node.field_str("reducer")?;
        let incoming = ctx.get_input(&node.id);
        let current = ctx.state().accumulator_get();

        let next = match reducer {
            "replace" => incoming,
            "sum" => Value::from(current.as_f64().unwrap_or(0.0) + incoming.as_f64().unwrap_or(0.0)),
            "multiply" => Value::from(
                current.as_f64().unwrap_or(1.0) * incoming.as_f64().unwrap_or(1.0),
            ),
            "concat" => {
                let mut s = current.as_str().unwrap_or_default().to_string();
                s.push_str(incoming.as_str().unwrap_or_default());
                Value::String(s)
            }
            "push" => {
                let mut arr = match current {
                    Value::Array(a) => a,
                    Value::Null => Vec::new(),
                    other => vec![other],
                };
                arr.push(incoming);
                Value::Array(arr)
            }
            _ => unreachable!("validated above"),
        };
        ctx.state().accumulator_set(next.clone());
        Ok(next)
    }
}

/// `data.action` ∈ `{increment, reset, get}`, `data.delta` (default `1`).
pub struct CounterExecutor;

#[async_trait]
impl Executor for CounterExecutor {
    fn node_kind(&self) -> &str {
        "counter"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        let action = node.field_str("action")?;
        if !matches!(action, "increment" | "reset" | "get") {
            return Err(NodeError::new(NodeErrorKind::InvalidOperation, format!("unknown counter action '{action}'")));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let action = node.field_str("action")?;
        let value = match action {
            "increment" => {
                let delta = node.data.get("delta").and_then(Value::as_f64).unwrap_or(1.0);
                ctx.state().counter_increment(delta)
            }
            "reset" => {
                ctx.state().counter_reset();
                0.0
            }
            "get" => ctx.state().counter_get(),
            _ => unreachable!("validated above"),
        };
        Ok(Value::from(value))
    }
}

/// `data.action` ∈ `{get, set}`, `data.key`, `data.value?` (for `set`,
/// falling back to the first input), `data.ttl_seconds?` (falls back to
/// the active `Config::default_cache_ttl`). `get` on a miss returns
/// `data.default` if present, otherwise fails with `CacheMiss`.
pub struct CacheExecutor;

#[async_trait]
impl Executor for CacheExecutor {
    fn node_kind(&self) -> &str {
        "cache"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        let action = node.field_str("action")?;
        if !matches!(action, "get" | "set") {
            return Err(NodeError::new(NodeErrorKind::InvalidOperation, format!("unknown cache action '{action}'")));
        }
        node.field_str("key").map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let action = node.field_str("action")?;
        let key = node.field_str("key")?;

        match action {
            "set" => {
                let value = node.data.get("value").cloned().unwrap_or_else(|| ctx.get_input(&node.id));
                let ttl = node
                    .data
                    .get("ttl_seconds")
                    .and_then(Value::as_u64)
                    .map(Duration::from_secs)
                    .unwrap_or(ctx.config().default_cache_ttl);
                ctx.state().cache_set(key, value.clone(), ttl);
                Ok(value)
            }
            "get" => match ctx.state().cache_get(key) {
                Some(value) => Ok(json!({ "found": true, "value": value })),
                None => match node.data.get("default") {
                    Some(default) => Ok(json!({ "found": false, "value": default })),
                    None => Err(NodeError::new(NodeErrorKind::CacheMiss, format!("cache key '{key}' not found or expired"))),
                },
            },
            _ => unreachable!("validated above"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn variable_set_then_get_roundtrips() {
        let ctx = TestContext::new();
        let set = NodeDefinition::new("n1", "variable", json!({ "action": "set", "name": "x", "value": 7.0 }));
        VariableExecutor.execute(&ctx, &set).await.unwrap();

        let get = NodeDefinition::new("n2", "variable", json!({ "action": "get", "name": "x" }));
        assert_eq!(VariableExecutor.execute(&ctx, &get).await.unwrap(), Value::from(7.0));
    }

    #[tokio::test]
    async fn variable_get_missing_without_default_errors() {
        let ctx = TestContext::new();
        let get = NodeDefinition::new("n1", "variable", json!({ "action": "get", "name": "missing" }));
        let err = VariableExecutor.execute(&ctx, &get).await.unwrap_err();
        assert_eq!(err.kind, NodeErrorKind::VariableNotFound);
    }

    #[tokio::test]
    async fn accumulator_sum_reduces() {
        let ctx = TestContext::new().with_input("n1", Value::from(3.0));
        let node = NodeDefinition::new("n1", "accumulator", json!({ "reducer": "sum" }));
        assert_eq!(AccumulatorExecutor.execute(&ctx, &node).await.unwrap(), Value::from(3.0));

        let ctx2_input = ctx.with_input("n1", Value::from(4.0));
        let node2 = NodeDefinition::new("n1", "accumulator", json!({ "reducer": "sum" }));
        assert_eq!(AccumulatorExecutor.execute(&ctx2_input, &node2).await.unwrap(), Value::from(7.0));
    }

    #[tokio::test]
    async fn counter_increment_and_reset() {
        let ctx = TestContext::new();
        let inc = NodeDefinition::new("n1", "counter", json!({ "action": "increment", "delta": 2.0 }));
        assert_eq!(CounterExecutor.execute(&ctx, &inc).await.unwrap(), Value::from(2.0));
        assert_eq!(CounterExecutor.execute(&ctx, &inc).await.unwrap(), Value::from(4.0));

        let reset = NodeDefinition::new("n1", "counter", json!({ "action": "reset" }));
        assert_eq!(CounterExecutor.execute(&ctx, &reset).await.unwrap(), Value::from(0.0));
    }

    #[tokio::test]
    async fn cache_miss_without_default_errors() {
        let ctx = TestContext::new();
        let get = NodeDefinition::new("n1", "cache", json!({ "action": "get", "key": "k" }));
        let err = CacheExecutor.execute(&ctx, &get).await.unwrap_err();
        assert_eq!(err.kind, NodeErrorKind::CacheMiss);
    }

    #[tokio::test]
    async fn cache_set_then_get_hits() {
        let ctx = TestContext::new();
        let set = NodeDefinition::new("n1", "cache", json!({ "action": "set", "key": "k", "value": "v" }));
        CacheExecutor.execute(&ctx, &set).await.unwrap();

        let get = NodeDefinition::new("n1", "cache", json!({ "action": "get", "key": "k" }));
        let out = CacheExecutor.execute(&ctx, &get).await.unwrap();
        assert_eq!(out["found"], true);
        assert_eq!(out["value"], "v");
    }
}
