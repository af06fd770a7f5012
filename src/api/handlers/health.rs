use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub metadata_tool: String,
    pub upload_dir: String,
    pub active_sessions: usize,
    pub version: String,
    pub checked_at: DateTime<Utc>,
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let tool_ok = state.tool.health_check().await;
    let upload_dir_ok = tokio::fs::metadata(state.intake.upload_dir())
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    Json(HealthResponse {
        status: if tool_ok && upload_dir_ok { "ok" } else { "degraded" }.to_string(),
        metadata_tool: if tool_ok { "available" } else { "unavailable" }.to_string(),
        upload_dir: if upload_dir_ok { "present" } else { "missing" }.to_string(),
        active_sessions: state.sessions.len(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checked_at: Utc::now(),
    })
}
