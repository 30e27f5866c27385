use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use db::StoredWorkflow;
use engine::{Trigger, Workflow};

use crate::AppState;

#[derive(serde::Deserialize)]
pub struct CreateWorkflowDto {
    pub name: String,
    pub definition: Value,
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<StoredWorkflow>> {
    Json(state.store.list())
}

pub async fn get(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<StoredWorkflow>, StatusCode> {
    match state.store.get(id) {
        Ok(wf) => Ok(Json(wf)),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkflowDto>,
) -> Result<(StatusCode, Json<StoredWorkflow>), StatusCode> {
    let workflow: Workflow = serde_json::from_value(payload.definition.clone())
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let webhook_path = match &workflow.trigger {
        Trigger::Webhook { path } => Some(path.clone()),
        _ => None,
    };

    let stored = StoredWorkflow {
        id: workflow.id,
        name: payload.name,
        webhook_path,
        definition: payload.definition,
        created_at: Utc::now(),
    };

    match state.store.insert(stored.clone()) {
        Ok(()) => Ok((StatusCode::CREATED, Json(stored))),
        Err(db::DbError::DuplicateId(_)) => Err(StatusCode::CONFLICT),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn delete(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, StatusCode> {
    match state.store.delete(id) {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
