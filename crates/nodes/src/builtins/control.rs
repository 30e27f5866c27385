//! Control-flow family: `condition`, `switch`, `for_each`, `while_loop`,
//! `parallel`, `join`, `split`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::error::{NodeError, NodeErrorKind};
use crate::expr;
use crate::model::NodeDefinition;
use crate::registry::Executor;

/// `data.condition`: an expression over `input`/`variables.*`/`context.*`/
/// `node.<id>.<field>`. Output carries a `path` field (`"true"`/`"false"`)
/// that downstream edges gate on via `sourceHandle`.
pub struct ConditionExecutor;

#[async_trait]
impl Executor for ConditionExecutor {
    fn node_kind(&self) -> &str {
        "condition"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        node.field_str("condition").map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let condition = node.field_str("condition")?;
        let context = expr::build_context(ctx, &node.id);
        let result = expr::evaluate_bool(condition, &context)?;
        Ok(json!({ "result": result, "path": if result { "true" } else { "false" } }))
    }
}

/// `data.cases: [{when, output_path}]`, `data.default_path?`. The first
/// case whose `when` expression is truthy wins; its `output_path` becomes
/// the produced `path` field. With no match and no default, the node fails
/// rather than silently dead-ending every downstream edge.
pub struct SwitchExecutor;

#[async_trait]
impl Executor for SwitchExecutor {
    fn node_kind(&self) -> &str {
        "switch"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        let cases = node
            .field("cases")?
            .as_array()
            .ok_or_else(|| NodeError::invalid_payload(format!("node '{}' field 'cases' must be an array", node.id)))?;
        for case in cases {
            if case.get("when").and_then(Value::as_str).is_none() || case.get("output_path").and_then(Value::as_str).is_none() {
                return Err(NodeError::invalid_payload(format!(
                    "node '{}' case entries need 'when' and 'output_path' strings",
                    node.id
                )));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let cases = node.field("cases")?.as_array().expect("validated above");
        let context = expr::build_context(ctx, &node.id);

        for case in cases {
            let when = case.get("when").and_then(Value::as_str).expect("validated above");
            let output_path = case.get("output_path").and_then(Value::as_str).expect("validated above");
            if expr::evaluate_bool(when, &context)? {
                return Ok(json!({ "path": output_path }));
            }
        }
        if let Some(default_path) = node.data.get("default_path").and_then(Value::as_str) {
            return Ok(json!({ "path": default_path }));
        }
        Err(NodeError::new(NodeErrorKind::InvalidOperation, format!("node '{}' matched no case and has no default_path", node.id)))
    }
}

/// `data.expression`: evaluated once per element of `data.items` (or the
/// first input, if `items` is absent), with `item`/`index` bound alongside
/// the usual `variables`/`context`/`node` names. Collects the results.
pub struct ForEachExecutor;

fn items_source(ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Vec<Value>, NodeError> {
    if let Some(items) = node.data.get("items") {
        return items
            .as_array()
            .cloned()
            .ok_or_else(|| NodeError::invalid_payload(format!("node '{}' field 'items' must be an array", node.id)));
    }
    match ctx.get_input(&node.id) {
        Value::Array(items) => Ok(items),
        _ => Err(NodeError::invalid_payload(format!("node '{}' has no 'items' and its input is not an array", node.id))),
    }
}

#[async_trait]
impl Executor for ForEachExecutor {
    fn node_kind(&self) -> &str {
        "for_each"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        node.field_str("expression").map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let expression = node.field_str("expression")?;
        let items = items_source(ctx, node)?;
        let max_iterations = ctx.config().max_iterations;

        let mut base_context = expr::build_context(ctx, &node.id);
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            if index as u64 >= max_iterations {
                return Err(NodeError::new(NodeErrorKind::IterationLimitExceeded, format!("node '{}' exceeded MaxIterations", node.id)));
            }
            ctx.increment_node_execution()?;
            base_context.insert("item".to_string(), item);
            base_context.insert("index".to_string(), Value::from(index as u64));
            results.push(expr::evaluate(expression, &base_context)?);
        }
        Ok(Value::Array(results))
    }
}

/// `data.condition`: re-evaluated each iteration against an `accumulator`
/// binding; `data.body_expression` computes the next accumulator value.
/// `data.initial` seeds the accumulator (default `null`).
pub struct WhileLoopExecutor;

#[async_trait]
impl Executor for WhileLoopExecutor {
    fn node_kind(&self) -> &str {
        "while_loop"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        node.field_str("condition")?;
        node.field_str("body_expression").map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let condition = node.field_str("condition")?;
        let body = node.field_str("body_expression")?;
        let max_iterations = ctx.config().max_iterations;

        let mut context = expr::build_context(ctx, &node.id);
        let mut accumulator = node.data.get("initial").cloned().unwrap_or(Value::Null);
        let mut iterations = 0u64;

        loop {
            context.insert("accumulator".to_string(), accumulator.clone());
            if !expr::evaluate_bool(condition, &context)? {
                break;
            }
            if iterations >= max_iterations {
                return Err(NodeError::new(NodeErrorKind::IterationLimitExceeded, format!("node '{}' exceeded MaxIterations", node.id)));
            }
            ctx.increment_node_execution()?;
            accumulator = expr::evaluate(body, &context)?;
            iterations += 1;
        }
        Ok(json!({ "accumulator": accumulator, "iterations": iterations }))
    }
}

/// `data.branches: [{expression}]`, `data.max_concurrency` (default 4).
/// Each branch expression runs concurrently, bounded by `max_concurrency`.
pub struct ParallelExecutor;

#[async_trait]
impl Executor for ParallelExecutor {
    fn node_kind(&self) -> &str {
        "parallel"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        let branches = node
            .field("branches")?
            .as_array()
            .ok_or_else(|| NodeError::invalid_payload(format!("node '{}' field 'branches' must be an array", node.id)))?;
        for branch in branches {
            if branch.get("expression").and_then(Value::as_str).is_none() {
                return Err(NodeError::invalid_payload(format!("node '{}' branch entries need an 'expression' string", node.id)));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let branches = node.field("branches")?.as_array().expect("validated above");
        let max_concurrency = node.data.get("max_concurrency").and_then(Value::as_u64).unwrap_or(4).max(1) as usize;
        let context = expr::build_context(ctx, &node.id);

        let mut results: Vec<Value> = Vec::with_capacity(branches.len());
        for chunk in branches.chunks(max_concurrency) {
            let outcomes: Vec<Result<Value, NodeError>> = chunk
                .iter()
                .map(|branch| {
                    ctx.increment_node_execution()?;
                    let expression = branch.get("expression").and_then(Value::as_str).expect("validated above");
                    expr::evaluate(expression, &context)
                })
                .collect();
            for outcome in outcomes {
                results.push(outcome?);
            }
        }
        Ok(Value::Array(results))
    }
}

/// Merges every value on an incoming edge into one array (default) or,
/// with `data.keys` present, a same-length list of key names, into an
/// object pairing each key with its corresponding input in edge order.
pub struct JoinExecutor;

#[async_trait]
impl Executor for JoinExecutor {
    fn node_kind(&self) -> &str {
        "join"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        if let Some(keys) = node.data.get("keys") {
            keys.as_array()
                .ok_or_else(|| NodeError::invalid_payload(format!("node '{}' field 'keys' must be an array", node.id)))?;
        }
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let inputs = ctx.get_inputs(&node.id);

        if let Some(keys) = node.data.get("keys").and_then(Value::as_array) {
            let mut object = serde_json::Map::new();
            for (key, value) in keys.iter().zip(inputs.into_iter()) {
                if let Some(key) = key.as_str() {
                    object.insert(key.to_string(), value);
                }
            }
            Ok(Value::Object(object))
        } else {
            Ok(Value::Array(inputs))
        }
    }
}

/// Passes its first input through unchanged after asserting it is an
/// array — a declarative fan-out marker consumed by UI tooling and
/// downstream `for_each` nodes.
pub struct SplitExecutor;

#[async_trait]
impl Executor for SplitExecutor {
    fn node_kind(&self) -> &str {
        "split"
    }

    fn validate(&self, _node: &NodeDefinition) -> Result<(), NodeError> {
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let input = ctx.get_input(&node.id);
        match input {
            Value::Array(_) => Ok(input),
            other => Err(NodeError::invalid_payload(format!("node '{}' split requires an array input, got {other:?}", node.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[tokio::test]
    async fn condition_true_path() {
        let node = NodeDefinition::new("n1", "condition", json!({ "condition": "input > 5" }));
        let ctx = TestContext::new().with_input("n1", Value::from(10.0));
        let out = ConditionExecutor.execute(&ctx, &node).await.unwrap();
        assert_eq!(out["path"], "true");
    }

    #[tokio::test]
    async fn switch_matches_first_true_case() {
        let node = NodeDefinition::new(
            "n1",
            "switch",
            json!({ "cases": [
                {"when": "input == 1", "output_path": "one"},
                {"when": "input == 2", "output_path": "two"}
            ], "default_path": "other" }),
        );
        let ctx = TestContext::new().with_input("n1", Value::from(2.0));
        let out = SwitchExecutor.execute(&ctx, &node).await.unwrap();
        assert_eq!(out["path"], "two");
    }

    #[tokio::test]
    async fn switch_falls_back_to_default() {
        let node = NodeDefinition::new(
            "n1",
            "switch",
            json!({ "cases": [{"when": "input == 1", "output_path": "one"}], "default_path": "other" }),
        );
        let ctx = TestContext::new().with_input("n1", Value::from(99.0));
        let out = SwitchExecutor.execute(&ctx, &node).await.unwrap();
        assert_eq!(out["path"], "other");
    }

    #[tokio::test]
    async fn for_each_maps_items() {
        let node = NodeDefinition::new("n1", "for_each", json!({ "items": [1, 2, 3], "expression": "item * 2" }));
        let ctx = TestContext::new();
        let out = ForEachExecutor.execute(&ctx, &node).await.unwrap();
        assert_eq!(out, json!([2.0, 4.0, 6.0]));
    }

    #[tokio::test]
    async fn while_loop_accumulates() {
        let node = NodeDefinition::new(
            "n1",
            "while_loop",
            json!({ "initial": 0, "condition": "accumulator < 3", "body_expression": "accumulator + 1" }),
        );
        let ctx = TestContext::new();
        let out = WhileLoopExecutor.execute(&ctx, &node).await.unwrap();
        assert_eq!(out["accumulator"], 3.0);
        assert_eq!(out["iterations"], 3);
    }

    #[tokio::test]
    async fn join_defaults_to_array() {
        let node = NodeDefinition::new("n1", "join", json!({}));
        let ctx = TestContext::new().with_input("n1", Value::from(1.0)).with_input("n1", Value::from(2.0));
        let out = JoinExecutor.execute(&ctx, &node).await.unwrap();
        assert_eq!(out, json!([1.0, 2.0]));
    }

    #[tokio::test]
    async fn split_rejects_non_array_input() {
        let node = NodeDefinition::new("n1", "split", json!({}));
        let ctx = TestContext::new().with_input("n1", Value::from(1.0));
        assert!(SplitExecutor.execute(&ctx, &node).await.is_err());
    }
}
