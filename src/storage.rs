use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object upload failed: {0}")]
    Upload(String),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

/// StorageService
///
/// Contract for the object storage layer holding user avatars. Handlers only see
/// this trait, so tests swap the S3 client for `MockStorageService`.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if it is missing. Only called in `Env::Local`
    /// to provision MinIO.
    async fn ensure_bucket_exists(&self);

    /// Stores `bytes` under `key` and returns the public URL of the object.
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// S3StorageClient
///
/// AWS SDK client pointed at any S3-compatible endpoint (MinIO locally, a hosted
/// bucket in production). Path-style addressing keeps MinIO working.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_base_url: String,
}

impl S3StorageClient {
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_base_url: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket fails harmlessly when the bucket is already there.
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        tracing::info!(bucket = %self.bucket_name, key = %key, "object stored");
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a key can never climb out of its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// In-memory stand-in used by tests. Records every stored key so assertions can
/// inspect what the handlers uploaded.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    stored: Arc<Mutex<Vec<(String, usize, String)>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Keys, sizes and content types of all stored objects, oldest first.
    pub fn stored_objects(&self) -> Vec<(String, usize, String)> {
        self.stored.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Unavailable(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }

        let key = sanitize_key(key);
        if let Ok(mut stored) = self.stored.lock() {
            stored.push((key.clone(), bytes.len(), content_type.to_string()));
        }
        Ok(format!("http://localhost:9000/mock-bucket/{}", key))
    }
}

/// StorageState
///
/// Shared handle to the storage service held in `AppState`.
pub type StorageState = Arc<dyn StorageService>;
