use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::AppState;

pub async fn handle_webhook(
    Path(path): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<engine::ExecutionOutcome>, StatusCode> {
    let stored = match state.store.get_by_webhook_path(&path) {
        Ok(wf) => wf,
        Err(db::DbError::NotFound) => return Err(StatusCode::NOT_FOUND),
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let eng = super::build_engine(&state, &stored, payload).map_err(|e| {
        tracing::warn!(error = %e, "webhook-triggered workflow failed to build");
        StatusCode::BAD_REQUEST
    })?;

    let (outcome, _snapshot) = eng.execute().await;
    Ok(Json(outcome))
}
