use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::models::ChatRecord;
use crate::services::ArchiveSink;
use crate::startup::AppState;

const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Serialize)]
pub struct ArchiveStatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub chat_history: Vec<ChatRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ChatLogsResponse {
    pub chat_logs: Vec<ChatRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ChatCountResponse {
    pub total_chats: usize,
    pub bucket: String,
}

fn archive(state: &AppState) -> Result<&ArchiveSink, AppError> {
    state
        .archive
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Archive storage not configured".to_string()))
}

pub async fn archive_status(State(state): State<AppState>) -> Json<ArchiveStatusResponse> {
    let Some(archive) = state.archive.as_ref() else {
        return Json(ArchiveStatusResponse {
            status: "disabled",
            bucket: None,
            accessible: None,
            message: Some("Archive bucket not configured".to_string()),
        });
    };

    let bucket = Some(archive.bucket().to_string());
    if archive.check_reachable().await {
        Json(ArchiveStatusResponse {
            status: "connected",
            bucket,
            accessible: Some(true),
            message: None,
        })
    } else {
        Json(ArchiveStatusResponse {
            status: "error",
            bucket,
            accessible: Some(false),
            message: Some("Cannot access bucket".to_string()),
        })
    }
}

#[tracing::instrument(skip_all)]
pub async fn chat_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<ChatHistoryResponse>, AppError> {
    let Query(query) = query?;
    let records = archive(&state)?
        .recent_records(query.limit.min(MAX_HISTORY_LIMIT))
        .await;

    Ok(Json(ChatHistoryResponse {
        count: records.len(),
        chat_history: records,
    }))
}

#[tracing::instrument(skip_all)]
pub async fn chat_logs(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<ChatLogsResponse>, AppError> {
    let Query(query) = query?;
    let records = archive(&state)?
        .recent_records(query.limit.min(MAX_HISTORY_LIMIT))
        .await;

    Ok(Json(ChatLogsResponse {
        count: records.len(),
        chat_logs: records,
    }))
}

pub async fn chat_count(State(state): State<AppState>) -> Result<Json<ChatCountResponse>, AppError> {
    let archive = archive(&state)?;

    Ok(Json(ChatCountResponse {
        total_chats: archive.count_records().await,
        bucket: archive.bucket().to_string(),
    }))
}
