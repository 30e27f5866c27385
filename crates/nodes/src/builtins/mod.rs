//! The ~25 built-in node kinds, grouped by family per spec.md §4.2.

mod control;
mod io;
mod ops;
mod resilience;
mod state_nodes;

pub use control::{ConditionExecutor, ForEachExecutor, JoinExecutor, ParallelExecutor, SplitExecutor, SwitchExecutor, WhileLoopExecutor};
pub use io::{HttpExecutor, NumberExecutor, TextInputExecutor, VisualizationExecutor};
pub use ops::{ExtractExecutor, OperationExecutor, TextOperationExecutor, TransformExecutor};
pub use resilience::{DelayExecutor, RetryExecutor, TimeoutExecutor, TryCatchExecutor};
pub use state_nodes::{AccumulatorExecutor, CacheExecutor, CounterExecutor, VariableExecutor};

use std::sync::Arc;

use crate::registry::NodeRegistry;

/// Register every built-in executor. Called once by
/// [`NodeRegistry::with_builtins`]; the registry is frozen right after.
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(NumberExecutor));
    registry.register(Arc::new(TextInputExecutor));
    registry.register(Arc::new(HttpExecutor));
    registry.register(Arc::new(VisualizationExecutor));

    registry.register(Arc::new(OperationExecutor));
    registry.register(Arc::new(TextOperationExecutor));
    registry.register(Arc::new(TransformExecutor));
    registry.register(Arc::new(ExtractExecutor));

    registry.register(Arc::new(ConditionExecutor));
    registry.register(Arc::new(ForEachExecutor));
    registry.register(Arc::new(WhileLoopExecutor));
    registry.register(Arc::new(SwitchExecutor));
    registry.register(Arc::new(ParallelExecutor));
    registry.register(Arc::new(JoinExecutor));
    registry.register(Arc::new(SplitExecutor));

    registry.register(Arc::new(VariableExecutor));
    registry.register(Arc::new(AccumulatorExecutor));
    registry.register(Arc::new(CounterExecutor));
    registry.register(Arc::new(CacheExecutor));

    registry.register(Arc::new(RetryExecutor));
    registry.register(Arc::new(TryCatchExecutor));
    registry.register(Arc::new(TimeoutExecutor));
    registry.register(Arc::new(DelayExecutor));
}
