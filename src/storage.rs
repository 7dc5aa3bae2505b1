use crate::error::ApiError;
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::sync::Arc;
use uuid::Uuid;

/// StoredObject
///
/// The outcome of a successful upload: the public URL for display plus the
/// stable object key used later to delete the file or address it inside an
/// ordered collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
}

/// StorageService
///
/// Abstract contract for the object-storage layer: put bytes under a folder,
/// delete by key. Swappable between the real S3 client in production and the
/// in-memory mock in tests without touching the handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in the local setup to
    /// provision the bucket in MinIO; idempotent, so safe at startup.
    async fn ensure_bucket_exists(&self);

    /// Stores `bytes` under `folder/<uuid>.<ext>`, with the extension taken
    /// from the client-supplied filename.
    async fn put(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<StoredObject, ApiError>;

    /// Deletes the object addressed by `key`.
    async fn delete(&self, key: &str) -> Result<(), ApiError>;
}

/// StorageState
///
/// The concrete type used to share the storage service across the
/// application state.
pub type StorageState = Arc<dyn StorageService>;

/// Builds the object key for an upload: a sanitized folder segment plus a
/// fresh UUID, keeping the original file extension.
fn build_key(folder: &str, filename: &str) -> String {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    format!("{}/{}.{}", sanitize_key(folder), Uuid::new_v4(), extension)
}

/// Strips directory navigation components (`..`, `.`) from a user-provided
/// key segment to prevent path traversal.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// S3StorageClient
///
/// The concrete implementation using the AWS SDK for S3. S3 compatibility
/// covers both the local Dockerized MinIO instance and production object
/// storage; `force_path_style(true)` is required for MinIO-style gateways.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    endpoint: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
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
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    fn public_url(&self, key: &str) -> String {
        // Path-style addressing, matching force_path_style above.
        format!("{}/{}/{}", self.endpoint, self.bucket_name, key)
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn put(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<StoredObject, ApiError> {
        let key = build_key(folder, filename);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(StoredObject {
            url: self.public_url(&key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), ApiError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// MockStorageService
///
/// In-memory implementation used in tests, isolating the handler logic from
/// the network boundary.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {
        // No-op in the mock.
    }

    async fn put(
        &self,
        _bytes: Vec<u8>,
        folder: &str,
        filename: &str,
        _content_type: &str,
    ) -> Result<StoredObject, ApiError> {
        if self.should_fail {
            return Err(ApiError::Storage("mock storage failure".to_string()));
        }

        let key = build_key(folder, filename);
        Ok(StoredObject {
            url: format!("http://localhost:9000/mock-bucket/{key}"),
            key,
        })
    }

    async fn delete(&self, _key: &str) -> Result<(), ApiError> {
        if self.should_fail {
            return Err(ApiError::Storage("mock storage failure".to_string()));
        }
        Ok(())
    }
}
