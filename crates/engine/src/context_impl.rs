//! The concrete [`nodes::ExecutionContext`]/[`nodes::StateHandle`]
//! implementation executors actually run against.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use config::Config;
use http_client::HttpClientRegistry;
use nodes::{ExecutionContext, NodeError, NodeErrorKind, NodeRegistry, StateHandle};
use serde_json::Value;
use uuid::Uuid;

use crate::gating::edge_satisfied;
use crate::graph_adapter::GraphView;
use crate::observer::{EventKind, Observer, ObserverEvent};
use crate::state::StateManager;

/// Everything shared across one execution's node dispatch loop.
pub struct EngineExecutionContext {
    pub(crate) workflow_id: Uuid,
    pub(crate) execution_id: Uuid,
    pub(crate) config: Arc<Config>,
    pub(crate) state: Arc<StateManager>,
    pub(crate) registry: Arc<NodeRegistry>,
    pub(crate) http_clients: Arc<HttpClientRegistry>,
    pub(crate) secrets: HashMap<String, String>,
    pub(crate) deadline: Instant,
    pub(crate) graph: Arc<GraphView>,
    pub(crate) results: Arc<Mutex<HashMap<String, Value>>>,
    pub(crate) skipped: Arc<Mutex<std::collections::HashSet<String>>>,
    pub(crate) node_executions: AtomicU64,
    pub(crate) http_calls: AtomicU64,
    pub(crate) observer: Arc<dyn Observer>,
    pub(crate) current_node: Mutex<Option<(String, String)>>,
}

impl EngineExecutionContext {
    pub fn node_executions(&self) -> u64 {
        self.node_executions.load(Ordering::SeqCst)
    }

    pub fn http_calls(&self) -> u64 {
        self.http_calls.load(Ordering::SeqCst)
    }

    /// Scope subsequent `emit()` calls to the node currently being
    /// dispatched; cleared by the engine loop after each node.
    pub fn set_current_node(&self, node_id: impl Into<String>, node_kind: impl Into<String>) {
        *self.current_node.lock().unwrap() = Some((node_id.into(), node_kind.into()));
    }

    pub fn clear_current_node(&self) {
        *self.current_node.lock().unwrap() = None;
    }
}

#[async_trait::async_trait]
impl ExecutionContext for EngineExecutionContext {
    fn workflow_id(&self) -> Uuid {
        self.workflow_id
    }

    fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    fn get_inputs(&self, node_id: &str) -> Vec<Value> {
        let results = self.results.lock().unwrap();
        let skipped = self.skipped.lock().unwrap();
        self.graph
            .input_edges(node_id)
            .into_iter()
            .filter(|edge| edge_satisfied(edge, &results, &skipped))
            .filter_map(|edge| results.get(&edge.source).cloned())
            .collect()
    }

    fn node_results(&self) -> HashMap<String, Value> {
        self.results.lock().unwrap().clone()
    }

    fn increment_node_execution(&self) -> Result<(), NodeError> {
        let count = self.node_executions.fetch_add(1, Ordering::SeqCst) + 1;
        if count > self.config.max_node_executions {
            return Err(NodeError::new(
                NodeErrorKind::IterationLimitExceeded,
                format!("node execution count {count} exceeds MaxNodeExecutions {}", self.config.max_node_executions),
            ));
        }
        Ok(())
    }

    fn increment_http_call(&self) -> Result<(), NodeError> {
        let count = self.http_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if count > self.config.max_http_calls_per_exec {
            // Reuses `IterationLimitExceeded`: both it and `MaxHTTPCallsPerExec`
            // are hard resource ceilings that must halt dispatch (spec.md §7).
            return Err(NodeError::new(
                NodeErrorKind::IterationLimitExceeded,
                format!("http call count {count} exceeds MaxHTTPCallsPerExec {}", self.config.max_http_calls_per_exec),
            ));
        }
        Ok(())
    }

    fn state(&self) -> &dyn StateHandle {
        self.state.as_ref()
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
        self.http_clients.as_ref()
    }

    fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    fn emit(&self, status: &str, metadata: Value) {
        let (node_id, node_kind) = self.current_node.lock().unwrap().clone().unzip();
        let kind = match status {
            "node_start" => EventKind::NodeStart,
            "node_success" => EventKind::NodeSuccess,
            "node_failure" => EventKind::NodeFailure,
            "node_skipped" => EventKind::NodeSkipped,
            "workflow_start" => EventKind::WorkflowStart,
            "workflow_end" => EventKind::WorkflowEnd,
            _ => EventKind::NodeSuccess,
        };
        self.observer.on_event(&ObserverEvent {
            kind,
            workflow_id: self.workflow_id,
            execution_id: self.execution_id,
            node_id,
            node_kind,
            timestamp: chrono::Utc::now(),
            status: status.to_string(),
            error: None,
            metadata,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use std::collections::HashSet;

    fn make_ctx(graph: GraphView) -> EngineExecutionContext {
        EngineExecutionContext {
            workflow_id: Uuid::new_v4(),
            execution_id: Uuid::new_v4(),
            config: Arc::new(Config::default()),
            state: Arc::new(StateManager::new(10)),
            registry: Arc::new(NodeRegistry::with_builtins()),
            http_clients: Arc::new(HttpClientRegistry::new()),
            secrets: HashMap::new(),
            deadline: Instant::now() + std::time::Duration::from_secs(60),
            graph: Arc::new(graph),
            results: Arc::new(Mutex::new(HashMap::new())),
            skipped: Arc::new(Mutex::new(HashSet::new())),
            node_executions: AtomicU64::new(0),
            http_calls: AtomicU64::new(0),
            observer: Arc::new(NullObserver),
            current_node: Mutex::new(None),
        }
    }

    #[test]
    fn node_execution_counter_enforces_ceiling() {
        let mut cfg = Config::default();
        cfg.max_node_executions = 1;
        let mut ctx = make_ctx(GraphView::empty());
        ctx.config = Arc::new(cfg);

        assert!(ctx.increment_node_execution().is_ok());
        assert!(ctx.increment_node_execution().is_err());
    }

    #[test]
    fn get_inputs_omits_skipped_and_unmatched_handles() {
        let graph = GraphView::from_edges(vec![
            crate::models::Edge { id: None, source: "a".into(), target: "c".into(), source_handle: None, target_handle: None },
            crate::models::Edge { id: None, source: "b".into(), target: "c".into(), source_handle: Some("true".into()), target_handle: None },
        ]);
        let ctx = make_ctx(graph);
        ctx.results.lock().unwrap().insert("a".to_string(), serde_json::json!(1));
        ctx.results.lock().unwrap().insert("b".to_string(), serde_json::json!({"path": "false"}));

        let inputs = ctx.get_inputs("c");
        assert_eq!(inputs, vec![serde_json::json!(1)]);
    }
}
