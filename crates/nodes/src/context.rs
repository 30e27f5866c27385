//! The narrow handle executors see into the engine's internals.
//!
//! `engine` owns the concrete `StateManager`/deadline/counters; this crate
//! only sees them through the [`ExecutionContext`] and [`StateHandle`]
//! traits, which keeps `nodes` free of a dependency on `engine`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use config::Config;
use http_client::HttpClientRegistry;
use serde_json::Value;
use uuid::Uuid;

use crate::error::NodeError;
use crate::registry::NodeRegistry;

/// Typed access to the five workflow-scoped state substores.
pub trait StateHandle: Send + Sync {
    fn get_variable(&self, name: &str) -> Option<Value>;
    fn set_variable(&self, name: &str, value: Value);
    fn list_variables(&self) -> HashMap<String, Value>;

    fn accumulator_get(&self) -> Value;
    fn accumulator_set(&self, value: Value);

    fn counter_get(&self) -> f64;
    fn counter_increment(&self, delta: f64) -> f64;
    fn counter_reset(&self);

    fn cache_get(&self, key: &str) -> Option<Value>;
    fn cache_set(&self, key: &str, value: Value, ttl: Duration);

    /// Variables unioned with workflow constants; variables shadow constants.
    fn context_get_all(&self) -> HashMap<String, Value>;
}

/// Everything an executor may need from its surroundings, without reaching
/// into the engine directly.
#[async_trait::async_trait]
pub trait ExecutionContext: Send + Sync {
    fn workflow_id(&self) -> Uuid;
    fn execution_id(&self) -> Uuid;

    /// Values produced by every node with a satisfied edge into `node_id`.
    fn get_inputs(&self, node_id: &str) -> Vec<Value>;

    /// Every node result produced so far this execution, keyed by node id —
    /// backs the `node.<id>.<field>` form in `condition`/`switch` expressions.
    fn node_results(&self) -> HashMap<String, Value>;

    /// Convenience: the first input, or `Value::Null` if there are none.
    fn get_input(&self, node_id: &str) -> Value {
        self.get_inputs(node_id).into_iter().next().unwrap_or(Value::Null)
    }

    /// Count one node execution against `MaxNodeExecutions`/`MaxIterations`.
    fn increment_node_execution(&self) -> Result<(), NodeError>;
    /// Count one outbound HTTP call against `MaxHttpCallsPerExec`.
    fn increment_http_call(&self) -> Result<(), NodeError>;

    fn state(&self) -> &dyn StateHandle;
    fn config(&self) -> &Config;
    fn deadline(&self) -> Instant;
    fn secrets(&self) -> &HashMap<String, String>;
    fn http_clients(&self) -> &HttpClientRegistry;

    /// The full set of registered executors, so control-flow containers
    /// (`retry`, `try_catch`, `timeout`, loops) can dispatch an inner
    /// operation without the engine threading it through by hand.
    fn registry(&self) -> &NodeRegistry;

    /// Emit a lifecycle observation; the engine fills in workflow/execution
    /// identifiers and timestamps before forwarding to its `Observer`.
    fn emit(&self, status: &str, metadata: Value);
}
