//! Application startup and lifecycle management.

use crate::config::{ArchiveBackend, ChatConfig};
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;
use crate::services::{ArchiveSink, LocalStorage, S3Storage, Storage};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use service_core::error::AppError;
use service_core::middleware::{make_request_span, metrics_middleware, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub text_provider: Arc<dyn TextProvider>,
    /// `None` when no bucket is configured.
    pub archive: Option<ArchiveSink>,
}

impl AppState {
    /// Construct the relay client and, if a bucket is configured, the
    /// archive sink for the selected backend.
    pub async fn from_config(config: &ChatConfig) -> Result<Self, AppError> {
        let gemini_config = GeminiConfig {
            api_key: config.gemini.api_key.clone(),
            model: config.gemini.model.clone(),
            api_base: config.gemini.api_base.clone(),
        };
        let text_provider = GeminiTextProvider::new(gemini_config)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

        if config.gemini.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; /chat will fail until it is configured");
        }
        tracing::info!(model = %config.gemini.model, "Initialized Gemini text provider");

        let archive = match &config.archive.bucket {
            Some(bucket) => {
                let storage: Arc<dyn Storage> = match config.archive.backend {
                    ArchiveBackend::S3 => Arc::new(
                        S3Storage::from_env(
                            bucket.clone(),
                            config.archive.region.clone(),
                            config.archive.endpoint_url.clone(),
                        )
                        .await,
                    ),
                    ArchiveBackend::Local => Arc::new(
                        LocalStorage::new(&config.archive.local_path, bucket.clone())
                            .await
                            .map_err(|e| {
                                AppError::ConfigError(anyhow::anyhow!(
                                    "Failed to prepare local archive: {}",
                                    e
                                ))
                            })?,
                    ),
                };
                tracing::info!(
                    bucket = %bucket,
                    backend = ?config.archive.backend,
                    prefix = %config.archive.prefix,
                    "Chat archival enabled"
                );
                Some(ArchiveSink::new(storage, config.archive.prefix.clone()))
            }
            None => {
                tracing::info!("S3_BUCKET_NAME not set; chat archival disabled");
                None
            }
        };

        Ok(Self {
            text_provider: Arc::new(text_provider),
            archive,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
        .route("/chat", post(handlers::chat))
        .route("/s3/status", get(handlers::archive_status))
        .route("/s3/chat-history", get(handlers::chat_history))
        .route("/s3/chat-history/count", get(handlers::chat_count))
        .route("/s3/chat-logs", get(handlers::chat_logs))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(&config).await?;
        Self::with_state(&config.common.bind_address(), state).await
    }

    /// Bind `host:port` for an already assembled state (port 0 = random port).
    pub async fn with_state(bind_address: &str, state: AppState) -> Result<Self, AppError> {
        let addr: SocketAddr = bind_address.parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Invalid bind address {}: {}", bind_address, e))
        })?;

        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Chat service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
