use axum::{extract::rejection::JsonRejection, extract::State, Json};
use service_core::error::AppError;
use tracing::Instrument;
use validator::Validate;

use crate::models::{ChatRequest, ChatResponse};
use crate::services::ArchiveSink;
use crate::startup::AppState;

/// Relay the prompt, answer with the generated text, and archive the
/// exchange in the background.
#[tracing::instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let response = state
        .text_provider
        .generate(&request.prompt)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, model = %state.text_provider.model(), "Relay failed");
            AppError::from(e)
        })?;

    if let Some(archive) = state.archive.clone() {
        spawn_archive(archive, request.prompt, response.clone());
    }

    Ok(Json(ChatResponse { response }))
}

/// Fire-and-forget: the outcome is logged and never reaches the caller.
fn spawn_archive(archive: ArchiveSink, prompt: String, response: String) {
    tokio::spawn(
        async move {
            match archive.archive_chat(&prompt, &response).await {
                Ok(key) => tracing::info!(key = %key, "Archived chat record"),
                Err(e) => tracing::warn!(error = %e, "Failed to archive chat record"),
            }
        }
        .in_current_span(),
    );
}
