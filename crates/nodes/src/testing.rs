//! In-memory [`ExecutionContext`] used only by this crate's own unit tests.
//!
//! The real `StateManager`/deadline/counter machinery lives in the `engine`
//! crate; built-in executors are tested here against a minimal stand-in so
//! they don't need a full engine to unit-test in isolation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use config::Config;
use http_client::HttpClientRegistry;
use serde_json::Value;
use uuid::Uuid;

use crate::context::{ExecutionContext, StateHandle};
use crate::error::{NodeError, NodeErrorKind};
use crate::registry::NodeRegistry;

pub struct TestContext {
    pub inputs: Mutex<HashMap<String, Vec<Value>>>,
    pub node_results: Mutex<HashMap<String, Value>>,
    variables: Mutex<HashMap<String, Value>>,
    constants: Mutex<HashMap<String, Value>>,
    accumulator: Mutex<Value>,
    counter: Mutex<f64>,
    cache: Mutex<HashMap<String, (Value, Instant)>>,
    config: Config,
    node_execs: Mutex<u64>,
    http_calls: Mutex<u64>,
    registry: NodeRegistry,
    http_clients: HttpClientRegistry,
    secrets: HashMap<String, String>,
    deadline: Instant,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            inputs: Mutex::new(HashMap::new()),
            node_results: Mutex::new(HashMap::new()),
            variables: Mutex::new(HashMap::new()),
            constants: Mutex::new(HashMap::new()),
            accumulator: Mutex::new(Value::Null),
            counter: Mutex::new(0.0),
            cache: Mutex::new(HashMap::new()),
            config: Config::default(),
            node_execs: Mutex::new(0),
            http_calls: Mutex::new(0),
            registry: NodeRegistry::with_builtins(),
            http_clients: HttpClientRegistry::new(),
            secrets: HashMap::new(),
            deadline: Instant::now() + Duration::from_secs(300),
        }
    }

    pub fn with_input(self, node_id: &str, value: Value) -> Self {
        self.inputs.lock().unwrap().entry(node_id.to_string()).or_default().push(value);
        self
    }

    pub fn node_executions(&self) -> u64 {
        *self.node_execs.lock().unwrap()
    }

    pub fn http_call_count(&self) -> u64 {
        *self.http_calls.lock().unwrap()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHandle for TestContext {
    fn get_variable(&self, name: &str) -> Option<Value> {
        self.variables.lock().unwrap().get(name).cloned()
    }

    fn set_variable(&self, name: &str, value: Value) {
        self.variables.lock().unwrap().insert(name.to_string(), value);
    }

    fn list_variables(&self) -> HashMap<String, Value> {
        self.variables.lock().unwrap().clone()
    }

    fn accumulator_get(&self) -> Value {
        self.accumulator.lock().unwrap().clone()
    }

    fn accumulator_set(&self, value: Value) {
        *self.accumulator.lock().unwrap() = value;
    }

    fn counter_get(&self) -> f64 {
        *self.counter.lock().unwrap()
    }

    fn counter_increment(&self, delta: f64) -> f64 {
        let mut c = self.counter.lock().unwrap();
        *c += delta;
        *c
    }

    fn counter_reset(&self) {
        *self.counter.lock().unwrap() = 0.0;
    }

    fn cache_get(&self, key: &str) -> Option<Value> {
        let mut cache = self.cache.lock().unwrap();
        match cache.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Some(value.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    fn cache_set(&self, key: &str, value: Value, ttl: Duration) {
        self.cache.lock().unwrap().insert(key.to_string(), (value, Instant::now() + ttl));
    }

    fn context_get_all(&self) -> HashMap<String, Value> {
        let mut merged = self.constants.lock().unwrap().clone();
        merged.extend(self.variables.lock().unwrap().clone());
        merged
    }
}

#[async_trait::async_trait]
impl ExecutionContext for TestContext {
    fn workflow_id(&self) -> Uuid {
        Uuid::nil()
    }

    fn execution_id(&self) -> Uuid {
        Uuid::nil()
    }

    fn get_inputs(&self, node_id: &str) -> Vec<Value> {
        self.inputs.lock().unwrap().get(node_id).cloned().unwrap_or_default()
    }

    fn node_results(&self) -> HashMap<String, Value> {
        self.node_results.lock().unwrap().clone()
    }

    fn increment_node_execution(&self) -> Result<(), NodeError> {
        let mut count = self.node_execs.lock().unwrap();
        *count += 1;
        if *count > self.config.max_node_executions {
            return Err(NodeError::new(NodeErrorKind::InvalidPayload, "node execution limit exceeded"));
        }
        Ok(())
    }

    fn increment_http_call(&self) -> Result<(), NodeError> {
        let mut count = self.http_calls.lock().unwrap();
        *count += 1;
        if *count > self.config.max_http_calls_per_exec {
            return Err(NodeError::new(NodeErrorKind::InvalidPayload, "http call limit exceeded"));
        }
        Ok(())
    }

    fn state(&self) -> &dyn StateHandle {
        self
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn deadline(&self) -> Instant {
        self.deadline
    }

    fn secrets(&self) -> &HashMap<String, String> {
        &self.secrets
    }

    fn http_clients(&self) -> &HttpClientRegistry {
        &self.http_clients
    }

    fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    fn emit(&self, _status: &str, _metadata: Value) {}
}
