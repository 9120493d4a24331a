use crate::server::state::AppState;
use axum::{Json, extract::State};
use serde_json::{Value, json};

/// Health check with version and uptime.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}
