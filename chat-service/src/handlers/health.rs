use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::startup::AppState;

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Hello from the chat relay service!" }))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "chat-service",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.text_provider.model(),
        "archive": if state.archive.is_some() { "enabled" } else { "disabled" },
    }))
}
