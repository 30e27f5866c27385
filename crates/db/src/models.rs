//! The persisted shape a [`crate::WorkflowStore`] holds.
//!
//! Deliberately opaque to `engine::Workflow`'s actual node/edge types — this
//! crate only knows `definition` as a JSON blob, so it never needs a
//! dependency on `engine` (which already depends on `db`). Callers
//! (`api`, `cli`) serialize/deserialize the blob into `engine::Workflow`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted workflow: enough to look it up by id or by webhook path
/// without parsing `definition`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredWorkflow {
    pub id: Uuid,
    pub name: String,
    /// Present only for workflows triggered by `Trigger::Webhook`; indexed
    /// for `WorkflowStore::get_by_webhook_path`.
    pub webhook_path: Option<String>,
    /// The full `engine::Workflow` serialized to JSON.
    pub definition: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
