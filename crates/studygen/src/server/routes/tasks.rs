//! Task status endpoints polled by clients

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::error::Result;
use crate::processing::RegistryStats;
use crate::server::state::AppState;

/// GET /api/tasks/:id - Status snapshot, `{}` when unknown or expired
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Value>> {
    let body = match state.registry().snapshot(&task_id) {
        Some(snapshot) => serde_json::to_value(snapshot)?,
        None => Value::Object(Default::default()),
    };
    Ok(Json(body))
}

/// GET /api/tasks - Registry statistics
pub async fn task_stats(State(state): State<AppState>) -> Json<RegistryStats> {
    Json(state.registry().stats())
}
