use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Raw key/object store access. Every call is a single remote operation
/// with no retry.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Container the store writes into.
    fn bucket(&self) -> &str;

    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str)
        -> Result<(), ArchiveError>;
    async fn download(&self, key: &str) -> Result<Vec<u8>, ArchiveError>;
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, ArchiveError>;
    async fn delete(&self, key: &str) -> Result<(), ArchiveError>;

    /// Existence/permission check on the container without reading objects.
    async fn head_bucket(&self) -> Result<(), ArchiveError>;
}

/// Directory-backed store. The bucket is a directory under `base_path` and
/// keys map to relative paths beneath it.
pub struct LocalStorage {
    root: PathBuf,
    bucket: String,
}

impl LocalStorage {
    pub async fn new(
        base_path: impl Into<PathBuf>,
        bucket: impl Into<String>,
    ) -> Result<Self, ArchiveError> {
        let bucket = bucket.into();
        let root = base_path.into().join(&bucket);
        if !root.exists() {
            fs::create_dir_all(&root).await?;
        }
        Ok(Self { root, bucket })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, ArchiveError> {
        let relative = Path::new(key);
        let is_plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !is_plain {
            return Err(ArchiveError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ArchiveError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, ArchiveError> {
        let path = self.object_path(key)?;
        match fs::read(path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArchiveError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, ArchiveError> {
        let mut objects = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Some(key) = self.key_for(&path) else {
                    continue;
                };
                if !key.starts_with(prefix) {
                    continue;
                }

                objects.push(ObjectMeta {
                    key,
                    last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                });
            }
        }

        // S3 lists in UTF-8 key order.
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn delete(&self, key: &str) -> Result<(), ArchiveError> {
        let path = self.object_path(key)?;
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn head_bucket(&self) -> Result<(), ArchiveError> {
        let metadata = fs::metadata(&self.root).await?;
        if metadata.is_dir() {
            Ok(())
        } else {
            Err(ArchiveError::Store(format!(
                "{} is not a directory",
                self.root.display()
            )))
        }
    }
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Build a client from the ambient AWS credential chain (environment,
    /// profile, or instance role). `endpoint_url` targets S3-compatible
    /// servers and switches to path-style addressing.
    pub async fn from_env(
        bucket: String,
        region: Option<String>,
        endpoint_url: Option<String>,
    ) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url).force_path_style(true);
        }

        tracing::info!(bucket = %bucket, "S3 client initialized");
        Self::new(S3Client::from_conf(builder.build()), bucket)
    }
}

#[async_trait]
impl Storage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ArchiveError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                ArchiveError::Store(format!("S3 upload failed: {}", DisplayErrorContext(&e)))
            })?;
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, ArchiveError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    ArchiveError::NotFound(key.to_string())
                } else {
                    ArchiveError::Store(format!("S3 download failed: {}", DisplayErrorContext(&e)))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ArchiveError::Store(format!("S3 body collection failed: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, ArchiveError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                ArchiveError::Store(format!("S3 list failed: {}", DisplayErrorContext(&e)))
            })?;

            for object in page.contents() {
                if let Some(key) = object.key() {
                    objects.push(ObjectMeta {
                        key: key.to_string(),
                        last_modified: object
                            .last_modified()
                            .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos())),
                    });
                }
            }
        }

        Ok(objects)
    }

    async fn delete(&self, key: &str) -> Result<(), ArchiveError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                ArchiveError::Store(format!("S3 delete failed: {}", DisplayErrorContext(&e)))
            })?;
        Ok(())
    }

    async fn head_bucket(&self) -> Result<(), ArchiveError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                ArchiveError::Store(format!(
                    "Cannot access bucket {}: {}",
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }
}
