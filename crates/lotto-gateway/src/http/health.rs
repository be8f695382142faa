use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness plus scheduler status.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let tasks = state.scheduler.task_keys().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "scheduler_running": state.scheduler.is_running().await,
        "tasks": tasks.len(),
        "utc_offset_hours": state.config.draw.utc_offset_hours,
    }))
}
