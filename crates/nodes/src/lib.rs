//! `nodes` crate — the [`Executor`] contract, its registry, and every
//! built-in node kind (spec.md §4.2-4.4).
//!
//! `ExecutionContext`/`StateHandle` are narrow traits rather than concrete
//! types from `engine`, so this crate has no dependency on it: `engine`
//! implements both against its real `StateManager` and feeds executors
//! through here without a dependency cycle.

mod builtins;
pub mod context;
pub mod error;
pub mod expr;
mod model;
pub mod registry;
pub mod template;

#[cfg(test)]
pub mod testing;

#[cfg(any(test, feature = "mock-node"))]
pub mod mock;

pub use builtins::*;
pub use context::{ExecutionContext, StateHandle};
pub use error::{NodeError, NodeErrorKind};
pub use model::NodeDefinition;
pub use registry::{Executor, NodeRegistry};
