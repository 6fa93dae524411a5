//! Inference provider abstraction.
//!
//! Handlers depend on `TextProvider` so tests can swap the Gemini client
//! for a mock server or a stub.

pub mod gemini;

use async_trait::async_trait;
use service_core::error::AppError;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0}")]
    NotConfigured(String),

    #[error("Gemini API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to parse response: {0}")]
    InvalidResponse(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
            other => AppError::UpstreamError(other.to_string()),
        }
    }
}

/// Single-shot text generation.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Relay `prompt` and return the generated text. A response without a
    /// text part yields an empty string rather than an error.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Model identifier used in logs and metrics.
    fn model(&self) -> &str;
}
