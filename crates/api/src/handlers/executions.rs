use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::AppState;

#[derive(serde::Deserialize)]
pub struct ExecuteWorkflowDto {
    #[serde(default)]
    pub input: Value,
}

pub async fn execute(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<ExecuteWorkflowDto>,
) -> Result<Json<engine::ExecutionOutcome>, StatusCode> {
    let stored = match state.store.get(id) {
        Ok(wf) => wf,
        Err(db::DbError::NotFound) => return Err(StatusCode::NOT_FOUND),
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let eng = super::build_engine(&state, &stored, payload.input).map_err(|e| {
        tracing::warn!(error = %e, "workflow failed to build for execution");
        StatusCode::BAD_REQUEST
    })?;

    let (outcome, _snapshot) = eng.execute().await;
    Ok(Json(outcome))
}
