//! Operations family: `operation`, `text_operation`, `transform`, `extract`.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::{NodeError, NodeErrorKind};
use crate::model::NodeDefinition;
use crate::registry::Executor;

fn insufficient(node_id: &str, need: usize, got: usize) -> NodeError {
    NodeError::new(
        NodeErrorKind::InsufficientInputs,
        format!("node '{node_id}' needs at least {need} numeric input(s), got {got}"),
    )
}

/// `data.op` ∈ `{add, subtract, multiply, divide}`. Operands are every
/// value on an incoming edge, plus `data.operand` if present, folded
/// left-to-right in that order.
pub struct OperationExecutor;

#[async_trait]
impl Executor for OperationExecutor {
    fn node_kind(&self) -> &str {
        "operation"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        let op = node.field_str("op")?;
        if !matches!(op, "add" | "subtract" | "multiply" | "divide") {
            return Err(NodeError::new(NodeErrorKind::InvalidOperation, format!("unknown op '{op}'")));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let op = node.field_str("op")?;

        let mut operands: Vec<f64> = ctx
            .get_inputs(&node.id)
            .into_iter()
            .filter_map(|v| v.as_f64())
            .collect();
        if let Some(operand) = node.data.get("operand").and_then(Value::as_f64) {
            operands.push(operand);
        }
        if operands.len() < 2 {
            return Err(insufficient(&node.id, 2, operands.len()));
        }

        let mut acc = operands[0];
        for &next in &operands[1..] {
            acc = match op {
                "add" => acc + next,
                "subtract" => acc - next,
                "multiply" => acc * next,
                "divide" => {
                    if next == 0.0 {
                        return Err(NodeError::new(NodeErrorKind::DivisionByZero, format!("node '{}' divided by zero", node.id)));
                    }
                    acc / next
                }
                _ => unreachable!("validated above"),
            };
        }
        Ok(Value::from(acc))
    }
}

/// `data.op` ∈ `{upper, lower, trim, concat, replace}`. `concat` joins
/// every input (stringified) with `data.separator` (default `""`); the
/// others operate on the first input (or `data.value` as a fallback).
pub struct TextOperationExecutor;

impl TextOperationExecutor {
    fn operand_text(node: &NodeDefinition, ctx: &dyn ExecutionContext) -> String {
        let input = ctx.get_input(&node.id);
        match input {
            Value::String(s) => s,
            Value::Null => node.data.get("value").and_then(Value::as_str).unwrap_or_default().to_string(),
            other => other.to_string(),
        }
    }
}

#[async_trait]
impl Executor for TextOperationExecutor {
    fn node_kind(&self) -> &str {
        "text_operation"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        let op = node.field_str("op")?;
        if !matches!(op, "upper" | "lower" | "trim" | "concat" | "replace") {
            return Err(NodeError::new(NodeErrorKind::InvalidOperation, format!("unknown text op '{op}'")));
        }
        if op == "replace" && (node.data.get("from").is_none() || node.data.get("to").is_none()) {
            return Err(NodeError::invalid_payload(format!("node '{}' replace requires 'from' and 'to'", node.id)));
        }
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let op = node.field_str("op")?;

        let result = match op {
            "concat" => {
                let separator = node.data.get("separator").and_then(Value::as_str).unwrap_or("");
                let parts: Vec<String> = ctx
                    .get_inputs(&node.id)
                    .into_iter()
                    .map(|v| match v {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect();
                parts.join(separator)
            }
            "upper" => Self::operand_text(node, ctx).to_uppercase(),
            "lower" => Self::operand_text(node, ctx).to_lowercase(),
            "trim" => Self::operand_text(node, ctx).trim().to_string(),
            "replace" => {
                let from = node.field_str("from")?;
                let to = node.field_str("to")?;
                Self::operand_text(node, ctx).replace(from, to)
            }
            _ => unreachable!("validated above"),
        };
        Ok(Value::String(result))
    }
}

/// `data.mappings: [{from, to}]`. Reads each `from` dotted path out of the
/// first input and writes it under `to` in a freshly built object.
pub struct TransformExecutor;

fn get_path(value: &Value, path: &str) -> Value {
    let mut current = value.clone();
    for segment in path.split('.') {
        current = current.get(segment).cloned().unwrap_or(Value::Null);
    }
    current
}

#[async_trait]
impl Executor for TransformExecutor {
    fn node_kind(&self) -> &str {
        "transform"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        let mappings = node
            .field("mappings")?
            .as_array()
            .ok_or_else(|| NodeError::invalid_payload(format!("node '{}' field 'mappings' must be an array", node.id)))?;
        for mapping in mappings {
            if mapping.get("from").and_then(Value::as_str).is_none() || mapping.get("to").and_then(Value::as_str).is_none() {
                return Err(NodeError::invalid_payload(format!("node '{}' mapping entries need 'from' and 'to' strings", node.id)));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let input = ctx.get_input(&node.id);
        let mappings = node.field("mappings")?.as_array().expect("validated above");

        let mut output = serde_json::Map::new();
        for mapping in mappings {
            let from = mapping.get("from").and_then(Value::as_str).expect("validated above");
            let to = mapping.get("to").and_then(Value::as_str).expect("validated above");
            output.insert(to.to_string(), get_path(&input, from));
        }
        Ok(Value::Object(output))
    }
}

/// `data.path`: a dotted path into the first input; missing segments
/// resolve to `null` rather than erroring.
pub struct ExtractExecutor;

#[async_trait]
impl Executor for ExtractExecutor {
    fn node_kind(&self) -> &str {
        "extract"
    }

    fn validate(&self, node: &NodeDefinition) -> Result<(), NodeError> {
        node.field_str("path").map(|_| ())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        ctx.increment_node_execution()?;
        let path = node.field_str("path")?;
        let input = ctx.get_input(&node.id);
        Ok(get_path(&input, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use serde_json::json;

    #[tokio::test]
    async fn add_folds_inputs() {
        let node = NodeDefinition::new("n1", "operation", json!({ "op": "add" }));
        let ctx = TestContext::new().with_input("n1", Value::from(2.0)).with_input("n1", Value::from(3.0));
        assert_eq!(OperationExecutor.execute(&ctx, &node).await.unwrap(), Value::from(5.0));
    }

    #[tokio::test]
    async fn divide_by_zero_is_rejected() {
        let node = NodeDefinition::new("n1", "operation", json!({ "op": "divide" }));
        let ctx = TestContext::new().with_input("n1", Value::from(4.0)).with_input("n1", Value::from(0.0));
        let err = OperationExecutor.execute(&ctx, &node).await.unwrap_err();
        assert_eq!(err.kind, NodeErrorKind::DivisionByZero);
    }

    #[tokio::test]
    async fn insufficient_operands_rejected() {
        let node = NodeDefinition::new("n1", "operation", json!({ "op": "add" }));
        let ctx = TestContext::new().with_input("n1", Value::from(2.0));
        let err = OperationExecutor.execute(&ctx, &node).await.unwrap_err();
        assert_eq!(err.kind, NodeErrorKind::InsufficientInputs);
    }

    #[tokio::test]
    async fn concat_joins_with_separator() {
        let node = NodeDefinition::new("n1", "text_operation", json!({ "op": "concat", "separator": "-" }));
        let ctx = TestContext::new()
            .with_input("n1", Value::String("a".into()))
            .with_input("n1", Value::String("b".into()));
        assert_eq!(TextOperationExecutor.execute(&ctx, &node).await.unwrap(), Value::String("a-b".into()));
    }

    #[tokio::test]
    async fn transform_maps_fields() {
        let node = NodeDefinition::new(
            "n1",
            "transform",
            json!({ "mappings": [{"from": "user.name", "to": "name"}] }),
        );
        let ctx = TestContext::new().with_input("n1", json!({"user": {"name": "ada"}}));
        assert_eq!(TransformExecutor.execute(&ctx, &node).await.unwrap(), json!({"name": "ada"}));
    }

    #[tokio::test]
    async fn extract_missing_path_is_null() {
        let node = NodeDefinition::new("n1", "extract", json!({ "path": "a.b.c" }));
        let ctx = TestContext::new().with_input("n1", json!({"a": {}}));
        assert_eq!(ExtractExecutor.execute(&ctx, &node).await.unwrap(), Value::Null);
    }
}
