//! Versioned, lossless snapshot format (spec.md §6 "Snapshot format").
//!
//! Opaque to callers: produced by [`crate::Engine::snapshot`], consumed by
//! [`crate::Engine::restore`]. JSON rather than a binary codec, matching
//! the teacher's preference for `serde_json` at every wire boundary.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::state::StateSnapshot;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    version: u32,
    pub results: HashMap<String, Value>,
    pub skipped: HashSet<String>,
    pub node_executions: u64,
    pub http_calls: u64,
    /// Time remaining until `MaxExecutionTime` at the moment of the
    /// snapshot, not an absolute deadline — `Instant` cannot cross a
    /// process boundary.
    pub remaining: Duration,
    pub state: StateSnapshot,
}

impl EngineSnapshot {
    pub fn new(
        results: HashMap<String, Value>,
        skipped: HashSet<String>,
        node_executions: u64,
        http_calls: u64,
        remaining: Duration,
        state: StateSnapshot,
    ) -> Self {
        Self { version: SNAPSHOT_VERSION, results, skipped, node_executions, http_calls, remaining, state }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EngineError> {
        serde_json::to_vec(self).map_err(|e| EngineError::InvalidJson(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EngineError> {
        let snapshot: Self = serde_json::from_slice(bytes).map_err(|e| EngineError::InvalidJson(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(EngineError::InvalidJson(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }
}
