//! Lifecycle observation (spec.md §5 "Observability").
//!
//! The engine never decides how an event is surfaced; it only builds an
//! [`ObserverEvent`] and hands it to whatever [`Observer`] the caller
//! supplied. `TracingObserver` covers the common case of just wanting log
//! lines; `BroadcastObserver` fans the same event out to several sinks at
//! once (e.g. tracing plus a websocket feed).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What happened. Mirrors the node lifecycle plus the two workflow-level
/// bookends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    WorkflowStart,
    WorkflowEnd,
    NodeStart,
    NodeSuccess,
    NodeFailure,
    NodeSkipped,
}

impl EventKind {
    fn as_str(&self) -> &'static str {
        match self {
            EventKind::WorkflowStart => "workflow_start",
            EventKind::WorkflowEnd => "workflow_end",
            EventKind::NodeStart => "node_start",
            EventKind::NodeSuccess => "node_success",
            EventKind::NodeFailure => "node_failure",
            EventKind::NodeSkipped => "node_skipped",
        }
    }
}

/// One lifecycle observation, fully addressed (spec.md §5).
#[derive(Debug, Clone)]
pub struct ObserverEvent {
    pub kind: EventKind,
    pub workflow_id: Uuid,
    pub execution_id: Uuid,
    pub node_id: Option<String>,
    pub node_kind: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub error: Option<String>,
    pub metadata: Value,
}

/// Receives [`ObserverEvent`]s as an execution progresses.
///
/// Implementations must not block the execution loop for long — a slow
/// observer should hand events off (a channel, a buffered writer) rather
/// than do expensive work inline.
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &ObserverEvent);
}

/// Discards every event. The default when a caller doesn't care.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_event(&self, _event: &ObserverEvent) {}
}

/// Logs every event through `tracing`, at a level matching its severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &ObserverEvent) {
        match event.kind {
            EventKind::NodeFailure => error!(
                workflow_id = %event.workflow_id,
                execution_id = %event.execution_id,
                node_id = event.node_id.as_deref().unwrap_or(""),
                error = event.error.as_deref().unwrap_or(""),
                "{}", event.kind.as_str()
            ),
            EventKind::NodeSkipped => warn!(
                workflow_id = %event.workflow_id,
                execution_id = %event.execution_id,
                node_id = event.node_id.as_deref().unwrap_or(""),
                "{}", event.kind.as_str()
            ),
            _ => info!(
                workflow_id = %event.workflow_id,
                execution_id = %event.execution_id,
                node_id = event.node_id.as_deref().unwrap_or(""),
                "{}", event.kind.as_str()
            ),
        }
    }
}

/// Fans a single event out to every observer in the list, in order.
///
/// A panicking observer would take down the whole execution, so this is
/// the only place where "more than one sink" is allowed — keep observers
/// themselves infallible.
pub struct BroadcastObserver {
    observers: Vec<Arc<dyn Observer>>,
}

impl BroadcastObserver {
    pub fn new(observers: Vec<Arc<dyn Observer>>) -> Self {
        Self { observers }
    }
}

impl Observer for BroadcastObserver {
    fn on_event(&self, event: &ObserverEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingObserver(Mutex<Vec<EventKind>>);

    impl Observer for RecordingObserver {
        fn on_event(&self, event: &ObserverEvent) {
            self.0.lock().unwrap().push(event.kind);
        }
    }

    fn sample_event(kind: EventKind) -> ObserverEvent {
        ObserverEvent {
            kind,
            workflow_id: Uuid::new_v4(),
            execution_id: Uuid::new_v4(),
            node_id: None,
            node_kind: None,
            timestamp: Utc::now(),
            status: "ok".into(),
            error: None,
            metadata: Value::Null,
        }
    }

    #[test]
    fn broadcast_forwards_to_every_observer() {
        let a = Arc::new(RecordingObserver(Mutex::new(Vec::new())));
        let b = Arc::new(RecordingObserver(Mutex::new(Vec::new())));
        let broadcast = BroadcastObserver::new(vec![a.clone(), b.clone()]);

        broadcast.on_event(&sample_event(EventKind::WorkflowStart));

        assert_eq!(a.0.lock().unwrap().as_slice(), &[EventKind::WorkflowStart]);
        assert_eq!(b.0.lock().unwrap().as_slice(), &[EventKind::WorkflowStart]);
    }

    #[test]
    fn null_observer_does_nothing() {
        NullObserver.on_event(&sample_event(EventKind::NodeFailure));
    }
}
