//! Artifact store client.
//!
//! Wraps an [`ObjectStore`] backend (S3 in production, local filesystem or
//! in-memory for development and tests) behind the handful of operations the
//! pipeline needs: put, list, read back and download links.

pub mod paths;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload, RetryConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("unsupported artifact store url: {0}")]
    UnsupportedUrl(String),

    #[error("artifact is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Listing entry for a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMeta {
    pub key: String,
    pub size: usize,
    pub last_modified: DateTime<Utc>,
}

/// Shared handle to the artifact store. Cheap to clone.
#[derive(Clone)]
pub struct ArtifactStore {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    base_url: String,
    // LocalFileSystem rejects put attributes
    supports_attributes: bool,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArtifactStore<{}>", self.base_url)
    }
}

impl ArtifactStore {
    /// Build a store from `s3://bucket`, `file:///dir` or `memory://`.
    pub fn from_url(url: &str) -> Result<Self, StorageError> {
        if let Some(bucket) = url.strip_prefix("s3://") {
            let bucket = bucket.trim_end_matches('/');
            if bucket.is_empty() || bucket.contains('/') {
                return Err(StorageError::UnsupportedUrl(url.to_string()));
            }
            return Self::s3(bucket);
        }

        if let Some(dir) = url.strip_prefix("file://") {
            return Self::local(dir);
        }

        if url.starts_with("memory:") {
            return Ok(Self::in_memory());
        }

        Err(StorageError::UnsupportedUrl(url.to_string()))
    }

    /// S3 bucket using credentials and region from the standard AWS environment.
    pub fn s3(bucket: &str) -> Result<Self, StorageError> {
        let s3 = Arc::new(
            AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .with_retry(RetryConfig::default())
                .build()?,
        );

        Ok(Self {
            store: s3.clone(),
            signer: Some(s3 as Arc<dyn Signer>),
            base_url: format!("s3://{bucket}"),
            supports_attributes: true,
        })
    }

    /// Local directory, created if missing.
    pub fn local(dir: &str) -> Result<Self, StorageError> {
        std::fs::create_dir_all(dir)?;
        let store = LocalFileSystem::new_with_prefix(dir)?;

        Ok(Self {
            store: Arc::new(store),
            signer: None,
            base_url: format!("file://{}", dir.trim_end_matches('/')),
            supports_attributes: false,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            signer: None,
            base_url: "memory://".to_string(),
            supports_attributes: true,
        }
    }

    /// Addressable location of a key, e.g. `s3://bucket/raw-data/id/data.json`.
    pub fn location(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Write a new artifact.
    pub async fn put(
        &self,
        key: &str,
        body: impl Into<Bytes>,
        content_type: &'static str,
    ) -> Result<(), StorageError> {
        let path = Path::from(key);
        let payload = PutPayload::from(body.into());

        let mut opts = PutOptions::default();
        if self.supports_attributes {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.into());
            opts.attributes = attributes;
        }

        self.store.put_opts(&path, payload, opts).await?;
        debug!("Stored artifact {}", self.location(key));
        Ok(())
    }

    /// List artifacts under a key prefix, sorted by key.
    pub async fn list(&self, prefix: &str) -> Result<Vec<ArtifactMeta>, StorageError> {
        let prefix = Path::from(prefix.trim_end_matches('/'));

        let mut entries: Vec<ArtifactMeta> = self
            .store
            .list(Some(&prefix))
            .map_ok(|meta| ArtifactMeta {
                key: meta.location.to_string(),
                size: meta.size,
                last_modified: meta.last_modified,
            })
            .try_collect()
            .await?;

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// Read an artifact back as text.
    pub async fn get_text(&self, key: &str) -> Result<String, StorageError> {
        let bytes = self.store.get(&Path::from(key)).await?.bytes().await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Time-limited retrieval link. Backends that cannot sign return the
    /// plain store location.
    pub async fn download_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        match &self.signer {
            Some(signer) => {
                let url = signer
                    .signed_url(http::Method::GET, &Path::from(key), ttl)
                    .await?;
                Ok(url.to_string())
            }
            None => Ok(self.location(key)),
        }
    }
}
