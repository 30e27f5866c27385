//! `MockExecutor` — a test double implementing [`Executor`].
//!
//! Registered under the `mock` node kind in test builds only; useful in
//! unit and integration tests where a real node implementation is either
//! unavailable or irrelevant.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::error::{NodeError, NodeErrorKind};
use crate::model::NodeDefinition;
use crate::registry::Executor;

pub enum MockBehaviour {
    ReturnValue(Value),
    FailRetryable(String),
    FailFatal(String),
}

pub struct MockExecutor {
    pub kind: String,
    pub behaviour: MockBehaviour,
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl MockExecutor {
    pub fn returning(kind: impl Into<String>, value: Value) -> Self {
        Self { kind: kind.into(), behaviour: MockBehaviour::ReturnValue(value), calls: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn failing_fatal(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            behaviour: MockBehaviour::FailFatal(msg.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_retryable(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            behaviour: MockBehaviour::FailRetryable(msg.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn node_kind(&self) -> &str {
        &self.kind
    }

    fn validate(&self, _node: &NodeDefinition) -> Result<(), NodeError> {
        Ok(())
    }

    async fn execute(&self, ctx: &dyn ExecutionContext, node: &NodeDefinition) -> Result<Value, NodeError> {
        let input = ctx.get_input(&node.id);
        self.calls.lock().unwrap().push(input.clone());

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => {
                let mut out = json!({ "node": node.id });
                if let (Some(out_obj), Some(v_obj)) = (out.as_object_mut(), v.as_object()) {
                    for (k, val) in v_obj {
                        out_obj.insert(k.clone(), val.clone());
                    }
                }
                Ok(out)
            }
            MockBehaviour::FailRetryable(msg) => Err(NodeError::new(NodeErrorKind::UpstreamStatus, msg.clone())),
            MockBehaviour::FailFatal(msg) => Err(NodeError::invalid_payload(msg.clone())),
        }
    }
}
