//! In-memory workflow storage.
//!
//! spec.md explicitly scopes "persistent workflow storage beyond an
//! in-memory key/value store interface" out of the engine's core — this is
//! that interface, grounded on the teacher's `repository::workflows`
//! function set (`create`, `get_by_id`, `list`, `delete`) but backed by a
//! `Mutex<HashMap>` rather than sqlx/Postgres.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::DbError;
use crate::models::StoredWorkflow;

/// The persistence collaborator the `api`/`cli` layers consume.
///
/// A trait (rather than a concrete struct) so a future backend can be
/// swapped in without touching callers — though only [`InMemoryWorkflowStore`]
/// is provided here.
pub trait WorkflowStore: Send + Sync {
    fn insert(&self, workflow: StoredWorkflow) -> Result<(), DbError>;
    fn get(&self, id: Uuid) -> Result<StoredWorkflow, DbError>;
    fn get_by_webhook_path(&self, path: &str) -> Result<StoredWorkflow, DbError>;
    fn list(&self) -> Vec<StoredWorkflow>;
    fn delete(&self, id: Uuid) -> Result<(), DbError>;
}

#[derive(Default)]
pub struct InMemoryWorkflowStore {
    workflows: Mutex<HashMap<Uuid, StoredWorkflow>>,
    webhook_index: Mutex<HashMap<String, Uuid>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn insert(&self, workflow: StoredWorkflow) -> Result<(), DbError> {
        let mut workflows = self.workflows.lock().unwrap();
        if workflows.contains_key(&workflow.id) {
            return Err(DbError::DuplicateId(workflow.id));
        }
        if let Some(path) = &workflow.webhook_path {
            self.webhook_index.lock().unwrap().insert(path.clone(), workflow.id);
        }
        workflows.insert(workflow.id, workflow);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<StoredWorkflow, DbError> {
        self.workflows.lock().unwrap().get(&id).cloned().ok_or(DbError::NotFound)
    }

    fn get_by_webhook_path(&self, path: &str) -> Result<StoredWorkflow, DbError> {
        let id = *self.webhook_index.lock().unwrap().get(path).ok_or(DbError::NotFound)?;
        self.get(id)
    }

    fn list(&self) -> Vec<StoredWorkflow> {
        let mut workflows: Vec<StoredWorkflow> = self.workflows.lock().unwrap().values().cloned().collect();
        workflows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        workflows
    }

    fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let removed = self.workflows.lock().unwrap().remove(&id).ok_or(DbError::NotFound)?;
        if let Some(path) = removed.webhook_path {
            self.webhook_index.lock().unwrap().remove(&path);
        }
        Ok(())
    }
}
