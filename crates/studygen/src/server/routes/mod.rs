//! API routes for the conversion server

pub mod convert;
pub mod tasks;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::get,
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_body_size: usize) -> Router<AppState> {
    Router::new()
        // Conversions
        .route(
            "/convert",
            get(convert::get_conversion).post(convert::start_conversion),
        )
        // Task polling
        .route("/tasks", get(tasks::task_stats))
        .route("/tasks/:id", get(tasks::get_task))
        // Info
        .route("/info", get(info))
        .layer(DefaultBodyLimit::max(max_body_size))
}

/// API info endpoint, including whether the generation backend answers
async fn info(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    let generator = state.generator();
    let healthy = match generator.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Generator health check failed: {}", e);
            false
        }
    };

    axum::Json(serde_json::json!({
        "name": "studygen",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Background conversion of documents into flashcards, keywords and test questions",
        "generator": {
            "name": generator.name(),
            "model": generator.model(),
            "healthy": healthy
        },
        "endpoints": {
            "POST /api/convert": "Start a conversion (text, flashcards, keywords, test)",
            "GET /api/convert": "Fetch stored conversion results",
            "GET /api/tasks": "Task registry statistics",
            "GET /api/tasks/:id": "Poll a task's status, progress and attributes"
        }
    }))
}
