//! Conditional edge gating (spec.md §4.7 "`node_should_execute`").
//!
//! Shared between the execution loop (deciding whether a node runs at all)
//! and [`crate::context_impl::EngineExecutionContext::get_inputs`]
//! (deciding which edges actually contribute a value to a running node) —
//! both ask the same question about the same edge.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::models::Edge;

/// The port label a produced value exposes, if any: `condition` nodes set
/// `path` to `"true"`/`"false"`; `switch` nodes set `output_path` to the
/// matched case's label.
pub fn produced_handle(value: &Value) -> Option<&str> {
    value.get("path").and_then(Value::as_str).or_else(|| value.get("output_path").and_then(Value::as_str))
}

/// Whether `edge` currently carries data, given what has executed so far.
///
/// An edge is satisfied when its source was not skipped, produced a
/// result, and either names no `sourceHandle` (unconditional) or names one
/// matching the handle the source's value exposes.
pub fn edge_satisfied(edge: &Edge, results: &HashMap<String, Value>, skipped: &HashSet<String>) -> bool {
    if skipped.contains(&edge.source) {
        return false;
    }
    let Some(value) = results.get(&edge.source) else {
        return false;
    };
    match &edge.source_handle {
        None => true,
        Some(handle) => produced_handle(value) == Some(handle.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn edge(source: &str, handle: Option<&str>) -> Edge {
        Edge {
            id: None,
            source: source.into(),
            target: "t".into(),
            source_handle: handle.map(str::to_string),
            target_handle: None,
        }
    }

    #[test]
    fn unconditional_edge_satisfied_once_source_has_a_result() {
        let mut results = HashMap::new();
        results.insert("a".to_string(), json!(1));
        assert!(edge_satisfied(&edge("a", None), &results, &HashSet::new()));
    }

    #[test]
    fn handle_must_match_produced_path() {
        let mut results = HashMap::new();
        results.insert("a".to_string(), json!({"path": "true"}));
        assert!(edge_satisfied(&edge("a", Some("true")), &results, &HashSet::new()));
        assert!(!edge_satisfied(&edge("a", Some("false")), &results, &HashSet::new()));
    }

    #[test]
    fn skipped_source_never_satisfies() {
        let mut results = HashMap::new();
        results.insert("a".to_string(), json!(1));
        let mut skipped = HashSet::new();
        skipped.insert("a".to_string());
        assert!(!edge_satisfied(&edge("a", None), &results, &skipped));
    }

    #[test]
    fn missing_result_is_unsatisfied() {
        assert!(!edge_satisfied(&edge("a", None), &HashMap::new(), &HashSet::new()));
    }
}
