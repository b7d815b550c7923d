//! Operational endpoints: healthcheck and debug counters.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

/// `GET /v1/healthcheck`
pub async fn healthcheck(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "available",
        "system_info": {
            "environment": state.config.environment,
            "version": env!("CARGO_PKG_VERSION"),
        },
    }))
}

/// `GET /debug/vars`
pub async fn debug_vars(State(state): State<AppState>) -> Json<serde_json::Value> {
    let metrics = state.metrics.snapshot();
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().timestamp(),
        "background_tasks": state.tasks.in_flight(),
        "metrics": metrics,
    }))
}
