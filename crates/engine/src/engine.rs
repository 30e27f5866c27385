//! `Engine` — parses a payload, validates and graphs it, and runs it
//! (spec.md §4.7).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use config::Config;
use http_client::HttpClientRegistry;
use nodes::NodeRegistry;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;
use uuid::Uuid;

use crate::context_impl::EngineExecutionContext;
use crate::error::EngineError;
use crate::gating::edge_satisfied;
use crate::graph_adapter::GraphView;
use crate::models::Payload;
use crate::observer::{NullObserver, Observer};
use crate::snapshot::EngineSnapshot;
use crate::state::StateManager;

/// One entry in [`ExecutionOutcome::errors`] (spec.md §6 "Result format").
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionError {
    pub node_id: String,
    pub error_kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Counters {
    pub nodes_executed: u64,
    pub http_calls: u64,
}

/// What a completed (or timed-out) run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    pub node_results: HashMap<String, Value>,
    pub final_output: Value,
    pub errors: Vec<ExecutionError>,
    pub skipped: Vec<String>,
    pub counters: Counters,
    pub duration: Duration,
}

/// Validates a payload against a [`Config`] and [`NodeRegistry`], then
/// runs it to completion.
///
/// Construction (`new`) does every structural check spec.md asks for up
/// front so a malformed workflow never reaches an executor. `execute`
/// assumes the engine was built successfully and only has to worry about
/// runtime failures.
pub struct Engine {
    payload: Payload,
    node_defs: HashMap<String, nodes::NodeDefinition>,
    graph: Arc<GraphView>,
    order: Vec<String>,
    config: Arc<Config>,
    registry: Arc<NodeRegistry>,
    http_clients: Arc<HttpClientRegistry>,
    secrets: HashMap<String, String>,
    constants: HashMap<String, Value>,
    observer: Arc<dyn Observer>,
    workflow_id: Uuid,
}

impl Engine {
    /// Parse, validate, and graph a payload. No executor runs here.
    pub fn new(payload: Payload, config: Config, registry: Arc<NodeRegistry>) -> Result<Self, EngineError> {
        if payload.nodes.len() > config.max_nodes {
            return Err(EngineError::TooManyNodes { count: payload.nodes.len(), limit: config.max_nodes });
        }
        if payload.edges.len() > config.max_edges {
            return Err(EngineError::TooManyEdges { count: payload.edges.len(), limit: config.max_edges });
        }

        for edge in &payload.edges {
            if let (Some(condition), Some(handle)) = (&edge.condition, &edge.source_handle) {
                if condition != handle {
                    return Err(EngineError::InvalidPayload(format!(
                        "edge {}->{} has a deprecated `condition` ('{condition}') disagreeing with `sourceHandle` ('{handle}')",
                        edge.source, edge.target
                    )));
                }
            }
        }

        let mut node_defs = HashMap::with_capacity(payload.nodes.len());
        for node in &payload.nodes {
            let executor = registry.get(&node.kind).map_err(|source| EngineError::NodeValidation { node_id: node.id.clone(), source })?;
            executor.validate(node).map_err(|source| EngineError::NodeValidation { node_id: node.id.clone(), source })?;
            node_defs.insert(node.id.clone(), node.clone());
        }

        let node_ids: Vec<String> = payload.nodes.iter().map(|n| n.id.clone()).collect();
        let graph = match GraphView::new(node_ids, payload.edges.clone()) {
            Ok(g) => g,
            Err(graph::GraphError::DuplicateNodeId(id)) => return Err(EngineError::DuplicateNodeId(id)),
            Err(graph::GraphError::DanglingEdge { node_id, side }) => {
                return Err(EngineError::UnknownNodeReference { node_id, side });
            }
            Err(graph::GraphError::CycleDetected) => return Err(EngineError::CycleDetected),
        };
        let order = graph.topological_sort().map_err(|_| EngineError::CycleDetected)?;

        Ok(Self {
            payload,
            node_defs,
            graph: Arc::new(graph),
            order,
            config: Arc::new(config),
            registry,
            http_clients: Arc::new(HttpClientRegistry::new()),
            secrets: HashMap::new(),
            constants: HashMap::new(),
            observer: Arc::new(NullObserver),
            workflow_id: Uuid::new_v4(),
        })
    }

    /// Parse a JSON payload from bytes, enforcing `MaxPayloadSize` before
    /// even touching `serde_json`.
    pub fn from_payload_bytes(bytes: &[u8], config: Config, registry: Arc<NodeRegistry>) -> Result<Self, EngineError> {
        if bytes.len() as u64 > config.max_payload_size {
            return Err(EngineError::PayloadTooLarge { size: bytes.len() as u64, limit: config.max_payload_size });
        }
        let payload: Payload = serde_json::from_slice(bytes).map_err(|e| EngineError::InvalidJson(e.to_string()))?;
        Self::new(payload, config, registry)
    }

    pub fn with_http_clients(mut self, http_clients: HttpClientRegistry) -> Self {
        self.http_clients = Arc::new(http_clients);
        self
    }

    pub fn with_secrets(mut self, secrets: HashMap<String, String>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_constants(mut self, constants: HashMap<String, Value>) -> Self {
        self.constants = constants;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_workflow_id(mut self, workflow_id: Uuid) -> Self {
        self.workflow_id = workflow_id;
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Deserialize a previously produced snapshot. Pass the result to
    /// [`Engine::execute_from`] to resume.
    pub fn load_snapshot(bytes: &[u8]) -> Result<EngineSnapshot, EngineError> {
        EngineSnapshot::from_bytes(bytes)
    }

    /// Run the whole payload to completion (or until a fatal error / the
    /// deadline) and return both the human-facing result and a snapshot
    /// of the state it finished in.
    pub async fn execute(&self) -> (ExecutionOutcome, EngineSnapshot) {
        self.execute_from(None).await
    }

    /// Run the payload, optionally resuming from a prior [`EngineSnapshot`].
    ///
    /// A snapshot whose recorded `remaining` budget has already elapsed by
    /// the time this runs fails immediately with `ExecutionTimeout`,
    /// rather than silently granting a fresh deadline.
    #[instrument(skip(self, resume), fields(workflow_id = %self.workflow_id))]
    pub async fn execute_from(&self, resume: Option<EngineSnapshot>) -> (ExecutionOutcome, EngineSnapshot) {
        let start = Instant::now();
        let execution_id = Uuid::new_v4();

        let (deadline, results, skipped, node_executions, http_calls, state) = match resume {
            Some(snapshot) => (
                Instant::now() + snapshot.remaining,
                snapshot.results,
                snapshot.skipped,
                snapshot.node_executions,
                snapshot.http_calls,
                StateManager::restore(snapshot.state, self.config.max_cache_size),
            ),
            None => (
                Instant::now() + self.config.max_execution_time,
                HashMap::new(),
                HashSet::new(),
                0,
                0,
                StateManager::with_constants(self.config.max_cache_size, self.constants.clone()),
            ),
        };

        let already_done: HashSet<String> = results.keys().cloned().collect();
        let results = Arc::new(Mutex::new(results));
        let skipped = Arc::new(Mutex::new(skipped));

        let ctx = EngineExecutionContext {
            workflow_id: self.workflow_id,
            execution_id,
            config: self.config.clone(),
            state: Arc::new(state),
            registry: self.registry.clone(),
            http_clients: self.http_clients.clone(),
            secrets: self.secrets.clone(),
            deadline,
            graph: self.graph.clone(),
            results: results.clone(),
            skipped: skipped.clone(),
            node_executions: AtomicU64::new(node_executions),
            http_calls: AtomicU64::new(http_calls),
            observer: self.observer.clone(),
            current_node: Mutex::new(None),
        };

        ctx.emit("workflow_start", Value::Null);

        let mut errors = Vec::new();
        let mut timed_out = false;

        for node_id in &self.order {
            if already_done.contains(node_id) || skipped.lock().unwrap().contains(node_id) {
                continue;
            }
            if Instant::now() >= ctx.deadline() {
                timed_out = true;
                break;
            }

            let node_def = &self.node_defs[node_id];
            let input_edges = self.graph.input_edges(node_id);
            let should_execute = input_edges.is_empty()
                || input_edges.iter().any(|edge| edge_satisfied(edge, &results.lock().unwrap(), &skipped.lock().unwrap()));

            if !should_execute {
                skipped.lock().unwrap().insert(node_id.clone());
                ctx.set_current_node(node_id.clone(), node_def.kind.clone());
                ctx.emit("node_skipped", Value::Null);
                ctx.clear_current_node();
                continue;
            }

            ctx.set_current_node(node_id.clone(), node_def.kind.clone());
            ctx.emit("node_start", Value::Null);

            let executor = self.registry.get(&node_def.kind).expect("kind validated at construction");
            match executor.execute(&ctx, node_def).await {
                Ok(value) => {
                    results.lock().unwrap().insert(node_id.clone(), value.clone());
                    ctx.emit("node_success", value);
                }
                Err(node_error) => {
                    let fatal = EngineError::is_fatal(&node_error);
                    errors.push(ExecutionError {
                        node_id: node_id.clone(),
                        error_kind: node_error.kind.to_string(),
                        message: node_error.message.clone(),
                    });
                    ctx.emit("node_failure", serde_json::json!({ "message": node_error.message }));
                    ctx.clear_current_node();
                    if fatal {
                        timed_out = matches!(node_error.kind, nodes::NodeErrorKind::Timeout);
                        break;
                    }
                    continue;
                }
            }
            ctx.clear_current_node();
        }

        if timed_out {
            errors.push(ExecutionError {
                node_id: "<engine>".to_string(),
                error_kind: "execution_timeout".to_string(),
                message: "MaxExecutionTime exceeded".to_string(),
            });
        }

        ctx.emit("workflow_end", Value::Null);

        let final_results = results.lock().unwrap().clone();
        let final_skipped: HashSet<String> = skipped.lock().unwrap().clone();
        let counters = Counters { nodes_executed: ctx.node_executions(), http_calls: ctx.http_calls() };
        let final_output = self.compute_final_output(&final_results);
        let remaining = ctx.deadline().saturating_duration_since(Instant::now());

        let outcome_snapshot = EngineSnapshot::new(
            final_results.clone(),
            final_skipped.clone(),
            counters.nodes_executed,
            counters.http_calls,
            remaining,
            ctx.state.snapshot(),
        );

        let outcome = ExecutionOutcome {
            node_results: final_results,
            final_output,
            errors,
            skipped: final_skipped.into_iter().collect(),
            counters,
            duration: start.elapsed(),
        };

        (outcome, outcome_snapshot)
    }

    /// The single terminal node's value, or a map over all terminals when
    /// there's more than one (spec.md §4.7 "Final output").
    fn compute_final_output(&self, results: &HashMap<String, Value>) -> Value {
        let terminals = self.graph.terminal_nodes();
        if let [only] = terminals.as_slice() {
            return results.get(*only).cloned().unwrap_or(Value::Null);
        }
        let mut map = Map::new();
        for terminal in terminals {
            map.insert(terminal.to_string(), results.get(terminal).cloned().unwrap_or(Value::Null));
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Edge;
    use nodes::NodeDefinition;
    use serde_json::json;

    fn number_node(id: &str, value: f64) -> NodeDefinition {
        NodeDefinition::new(id, "number", json!({ "value": value }))
    }

    fn edge(source: &str, target: &str) -> Edge {
        Edge { id: None, source: source.into(), target: target.into(), source_handle: None, target_handle: None, condition: None }
    }

    fn registry() -> Arc<NodeRegistry> {
        Arc::new(NodeRegistry::with_builtins())
    }

    #[tokio::test]
    async fn simple_addition() {
        let payload = Payload {
            nodes: vec![number_node("1", 10.0), number_node("2", 5.0), NodeDefinition::new("3", "operation", json!({ "op": "add" }))],
            edges: vec![edge("1", "3"), edge("2", "3")],
        };
        let engine = Engine::new(payload, Config::default(), registry()).unwrap();
        let (outcome, _) = engine.execute().await;

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.node_results["3"], json!(15.0));
        assert_eq!(outcome.final_output, json!(15.0));
    }

    #[tokio::test]
    async fn conditional_path_termination() {
        let payload = Payload {
            nodes: vec![
                number_node("age", 25.0),
                NodeDefinition::new("check", "condition", json!({ "condition": "input >= 18" })),
                NodeDefinition::new("adult", "text_input", json!({ "text": "Adult" })),
                NodeDefinition::new("minor", "text_input", json!({ "text": "Minor" })),
            ],
            edges: vec![
                edge("age", "check"),
                Edge { id: None, source: "check".into(), target: "adult".into(), source_handle: Some("true".into()), target_handle: None, condition: None },
                Edge { id: None, source: "check".into(), target: "minor".into(), source_handle: Some("false".into()), target_handle: None, condition: None },
            ],
        };
        let engine = Engine::new(payload, Config::default(), registry()).unwrap();
        let (outcome, _) = engine.execute().await;

        assert!(outcome.node_results.contains_key("adult"));
        assert!(outcome.skipped.contains(&"minor".to_string()));
    }

    #[tokio::test]
    async fn cycle_is_rejected_at_construction() {
        let payload = Payload { nodes: vec![number_node("a", 1.0), number_node("b", 2.0)], edges: vec![edge("a", "b"), edge("b", "a")] };
        assert!(matches!(Engine::new(payload, Config::default(), registry()), Err(EngineError::CycleDetected)));
    }

    #[tokio::test]
    async fn duplicate_node_id_rejected() {
        let payload = Payload { nodes: vec![number_node("a", 1.0), number_node("a", 2.0)], edges: vec![] };
        assert!(matches!(Engine::new(payload, Config::default(), registry()), Err(EngineError::DuplicateNodeId(_))));
    }

    #[tokio::test]
    async fn dangling_edge_rejected() {
        let payload = Payload { nodes: vec![number_node("a", 1.0)], edges: vec![edge("a", "ghost")] };
        assert!(matches!(Engine::new(payload, Config::default(), registry()), Err(EngineError::UnknownNodeReference { .. })));
    }

    #[tokio::test]
    async fn empty_payload_executes_to_an_empty_result() {
        let payload = Payload { nodes: vec![], edges: vec![] };
        let engine = Engine::new(payload, Config::default(), registry()).unwrap();
        let (outcome, _) = engine.execute().await;
        assert!(outcome.node_results.is_empty());
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.final_output, Value::Null);
    }

    #[tokio::test]
    async fn http_call_budget_exceeded_halts_further_dispatch() {
        let mut config = Config::default();
        config.max_http_calls_per_exec = 0;
        let payload =
            Payload { nodes: vec![NodeDefinition::new("h", "http", json!({ "url": "http://example.com" }))], edges: vec![] };
        let engine = Engine::new(payload, config, registry()).unwrap();
        let (outcome, _) = engine.execute().await;
        assert!(!outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn snapshot_restore_continues_from_recorded_state() {
        let payload = Payload {
            nodes: vec![number_node("1", 10.0), number_node("2", 5.0), NodeDefinition::new("3", "operation", json!({ "op": "add" }))],
            edges: vec![edge("1", "3"), edge("2", "3")],
        };
        let engine = Engine::new(payload, Config::default(), registry()).unwrap();
        let (outcome, snapshot) = engine.execute().await;
        let bytes = snapshot.to_bytes().unwrap();

        let resumed_snapshot = Engine::load_snapshot(&bytes).unwrap();
        let (resumed_outcome, _) = engine.execute_from(Some(resumed_snapshot)).await;

        assert_eq!(resumed_outcome.node_results, outcome.node_results);
    }
}
