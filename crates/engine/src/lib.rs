//! `engine` crate — `StateManager`, `ExecutionContext`, `Observer`, the
//! `Engine` orchestrator, and snapshot/restore (spec.md §4.4-4.7, §§8-9).

pub mod context_impl;
pub mod engine;
pub mod error;
mod gating;
mod graph_adapter;
pub mod models;
pub mod observer;
pub mod snapshot;
pub mod state;

pub use context_impl::EngineExecutionContext;
pub use engine::{Counters, Engine, ExecutionError, ExecutionOutcome};
pub use error::EngineError;
pub use models::{Edge, Payload, Trigger, Workflow};
pub use observer::{BroadcastObserver, EventKind, NullObserver, Observer, ObserverEvent, TracingObserver};
pub use snapshot::EngineSnapshot;
pub use state::StateManager;
