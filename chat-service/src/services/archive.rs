//! Best-effort persistence of chat exchanges.
//!
//! `ArchiveSink` turns every store failure into a log line and a fallback
//! value (`false`, `None`, empty list). Only `archive_chat` returns a
//! `Result`, so the caller decides explicitly what to do with a failed write.

use super::storage::{ArchiveError, ObjectMeta, Storage};
use crate::models::ChatRecord;
use metrics::counter;
use std::sync::Arc;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Clone)]
pub struct ArchiveSink {
    storage: Arc<dyn Storage>,
    prefix: String,
}

impl ArchiveSink {
    pub fn new(storage: Arc<dyn Storage>, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        self.storage.bucket()
    }

    #[tracing::instrument(skip(self, content), fields(bucket = %self.bucket(), size = content.len()))]
    pub async fn put(&self, key: &str, content: Vec<u8>, content_type: &str) -> bool {
        match self.storage.upload(key, content, content_type).await {
            Ok(()) => {
                tracing::info!("Uploaded object");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to upload object");
                false
            }
        }
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket()))]
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        match self.storage.download(key).await {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::error!(error = %e, "Failed to download object");
                None
            }
        }
    }

    /// Keys under `prefix` in store-native order.
    pub async fn list(&self, prefix: &str) -> Vec<String> {
        self.list_objects(prefix)
            .await
            .into_iter()
            .map(|o| o.key)
            .collect()
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket()))]
    pub async fn list_objects(&self, prefix: &str) -> Vec<ObjectMeta> {
        match self.storage.list(prefix).await {
            Ok(objects) => {
                tracing::debug!(count = objects.len(), "Listed objects");
                objects
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to list objects");
                Vec::new()
            }
        }
    }

    #[tracing::instrument(skip(self), fields(bucket = %self.bucket()))]
    pub async fn delete(&self, key: &str) -> bool {
        match self.storage.delete(key).await {
            Ok(()) => {
                tracing::info!("Deleted object");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to delete object");
                false
            }
        }
    }

    pub async fn check_reachable(&self) -> bool {
        match self.storage.head_bucket().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(bucket = %self.bucket(), error = %e, "Bucket is not reachable");
                false
            }
        }
    }

    /// Serialize and store one exchange, returning the key it was written to.
    pub async fn archive_chat(
        &self,
        user_prompt: &str,
        ai_response: &str,
    ) -> Result<String, ArchiveError> {
        let record = ChatRecord::new(user_prompt, ai_response);
        let key = record.object_key(&self.prefix);
        let body = serde_json::to_vec_pretty(&record)?;

        let result = self.storage.upload(&key, body, JSON_CONTENT_TYPE).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        counter!("archive_writes_total", "outcome" => outcome).increment(1);

        result.map(|()| key)
    }

    /// Up to `limit` archived records, newest first. Objects that cannot be
    /// read or parsed are skipped and the next one is read in their place.
    pub async fn recent_records(&self, limit: usize) -> Vec<ChatRecord> {
        let mut objects = self.list_objects(&self.prefix).await;
        objects.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.key.cmp(&a.key))
        });

        let mut records = Vec::with_capacity(limit.min(objects.len()));
        for object in objects {
            if records.len() >= limit {
                break;
            }
            let Some(bytes) = self.get(&object.key).await else {
                continue;
            };
            match serde_json::from_slice::<ChatRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(key = %object.key, error = %e, "Skipping unreadable chat record")
                }
            }
        }
        records
    }

    pub async fn count_records(&self) -> usize {
        self.list_objects(&self.prefix).await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory store with a switch to fail every call.
    #[derive(Default)]
    struct MemoryStorage {
        objects: Mutex<BTreeMap<String, Vec<u8>>>,
        failing: bool,
    }

    impl MemoryStorage {
        fn failing() -> Self {
            Self {
                failing: true,
                ..Default::default()
            }
        }

        fn check(&self) -> Result<(), ArchiveError> {
            if self.failing {
                Err(ArchiveError::Store("store offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        fn bucket(&self) -> &str {
            "memory"
        }

        async fn upload(
            &self,
            key: &str,
            data: Vec<u8>,
            _content_type: &str,
        ) -> Result<(), ArchiveError> {
            self.check()?;
            self.objects.lock().unwrap().insert(key.to_string(), data);
            Ok(())
        }

        async fn download(&self, key: &str) -> Result<Vec<u8>, ArchiveError> {
            self.check()?;
            self.objects
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| ArchiveError::NotFound(key.to_string()))
        }

        async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, ArchiveError> {
            self.check()?;
            Ok(self
                .objects
                .lock()
                .unwrap()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .map(|k| ObjectMeta {
                    key: k.clone(),
                    last_modified: None,
                })
                .collect())
        }

        async fn delete(&self, key: &str) -> Result<(), ArchiveError> {
            self.check()?;
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        async fn head_bucket(&self) -> Result<(), ArchiveError> {
            self.check()
        }
    }

    fn sink(storage: MemoryStorage) -> ArchiveSink {
        ArchiveSink::new(Arc::new(storage), "chat-logs/")
    }

    #[tokio::test]
    async fn list_returns_every_put_key_under_prefix() {
        let sink = sink(MemoryStorage::default());

        assert!(sink.put("chat-logs/a-chat.json", b"{}".to_vec(), JSON_CONTENT_TYPE).await);
        assert!(sink.put("chat-logs/b-chat.json", b"{}".to_vec(), JSON_CONTENT_TYPE).await);
        assert!(sink.put("other/c.json", b"{}".to_vec(), JSON_CONTENT_TYPE).await);

        let mut keys = sink.list("chat-logs/").await;
        keys.sort();
        assert_eq!(keys, vec!["chat-logs/a-chat.json", "chat-logs/b-chat.json"]);
    }

    #[tokio::test]
    async fn failures_become_fallback_values() {
        let sink = sink(MemoryStorage::failing());

        assert!(!sink.put("chat-logs/x", b"{}".to_vec(), JSON_CONTENT_TYPE).await);
        assert!(sink.get("chat-logs/x").await.is_none());
        assert!(sink.list("chat-logs/").await.is_empty());
        assert!(!sink.delete("chat-logs/x").await);
        assert!(!sink.check_reachable().await);
        assert_eq!(sink.count_records().await, 0);
    }

    #[tokio::test]
    async fn archive_chat_surfaces_store_failure() {
        let sink = sink(MemoryStorage::failing());

        let err = sink.archive_chat("hi", "hello").await.unwrap_err();
        assert!(matches!(err, ArchiveError::Store(_)));
    }

    #[tokio::test]
    async fn archived_chat_reads_back_as_record() {
        let sink = sink(MemoryStorage::default());

        let key = sink.archive_chat("What is Rust?", "A language.").await.unwrap();
        assert!(key.starts_with("chat-logs/"));
        assert!(key.ends_with("-chat.json"));

        let bytes = sink.get(&key).await.expect("record should exist");
        let record: ChatRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(record.user_prompt, "What is Rust?");
        assert_eq!(record.ai_response, "A language.");
    }

    #[tokio::test]
    async fn recent_records_fill_limit_past_unreadable_objects() {
        let sink = sink(MemoryStorage::default());
        for (ts, prompt) in [("2025-01-01", "first"), ("2025-01-02", "second"), ("2025-01-03", "third")] {
            let record = ChatRecord {
                timestamp: ts.to_string(),
                user_prompt: prompt.to_string(),
                ai_response: "ok".to_string(),
            };
            let body = serde_json::to_vec(&record).unwrap();
            sink.put(&record.object_key("chat-logs/"), body, JSON_CONTENT_TYPE)
                .await;
        }
        sink.put("chat-logs/9999-broken-chat.json", b"not json".to_vec(), JSON_CONTENT_TYPE)
            .await;

        let records = sink.recent_records(3).await;
        let prompts: Vec<_> = records.iter().map(|r| r.user_prompt.as_str()).collect();
        assert_eq!(prompts, vec!["third", "second", "first"]);
        assert_eq!(sink.count_records().await, 4);

        let records = sink.recent_records(2).await;
        let prompts: Vec<_> = records.iter().map(|r| r.user_prompt.as_str()).collect();
        assert_eq!(prompts, vec!["third", "second"]);
        assert!(sink.recent_records(0).await.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let sink = sink(MemoryStorage::default());
        sink.put("chat-logs/a", b"{}".to_vec(), JSON_CONTENT_TYPE).await;

        assert!(sink.delete("chat-logs/a").await);
        assert!(sink.list("chat-logs/").await.is_empty());
    }
}
