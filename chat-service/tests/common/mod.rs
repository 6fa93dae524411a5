//! Shared helpers for chat-service integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chat_service::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use chat_service::services::providers::TextProvider;
use chat_service::services::{ArchiveError, ArchiveSink, LocalStorage, ObjectMeta, Storage};
use chat_service::startup::{AppState, Application};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "test-api-key";
pub const TEST_MODEL: &str = "gemini-2.5-flash";
pub const GENERATE_PATH: &str = "/models/gemini-2.5-flash:generateContent";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Serve `state` on a random local port.
    pub async fn spawn(state: AppState) -> Self {
        let app = Application::with_state("127.0.0.1:0", state)
            .await
            .expect("Failed to build test application");
        let address = format!("http://127.0.0.1:{}", app.port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        for _ in 0..50 {
            if client.get(format!("{}/health", address)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp { address, client }
    }

    pub async fn post_chat(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/chat", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get(&self, route: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, route))
            .send()
            .await
            .expect("Failed to send request")
    }
}

/// Gemini client pointed at a mock server.
pub fn gemini_provider(api_base: &str, api_key: Option<&str>) -> Arc<dyn TextProvider> {
    Arc::new(
        GeminiTextProvider::new(GeminiConfig {
            api_key: api_key.map(str::to_string),
            model: TEST_MODEL.to_string(),
            api_base: api_base.to_string(),
        })
        .expect("Failed to build Gemini client"),
    )
}

pub fn candidate_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP"
        }]
    })
}

/// Mount a generateContent mock that always answers with `text`.
pub async fn mock_generate(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body(text)))
        .mount(server)
        .await;
}

pub fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("chat-archive-test-{}", Uuid::new_v4()))
}

pub async fn local_archive(base: &PathBuf) -> ArchiveSink {
    let storage = LocalStorage::new(base, "test-bucket")
        .await
        .expect("Failed to create local storage");
    ArchiveSink::new(Arc::new(storage), "chat-logs/")
}

/// Poll until the archive holds `expected` records (archival runs detached).
pub async fn wait_for_records(archive: &ArchiveSink, expected: usize) -> usize {
    let mut count = 0;
    for _ in 0..100 {
        count = archive.count_records().await;
        if count >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    count
}

/// A store whose every operation fails.
pub struct FailingStorage;

#[async_trait]
impl Storage for FailingStorage {
    fn bucket(&self) -> &str {
        "unreachable-bucket"
    }

    async fn upload(
        &self,
        _key: &str,
        _data: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ArchiveError> {
        Err(ArchiveError::Store("access denied".to_string()))
    }

    async fn download(&self, _key: &str) -> Result<Vec<u8>, ArchiveError> {
        Err(ArchiveError::Store("access denied".to_string()))
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<ObjectMeta>, ArchiveError> {
        Err(ArchiveError::Store("access denied".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), ArchiveError> {
        Err(ArchiveError::Store("access denied".to_string()))
    }

    async fn head_bucket(&self) -> Result<(), ArchiveError> {
        Err(ArchiveError::Store("access denied".to_string()))
    }
}
