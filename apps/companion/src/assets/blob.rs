use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::StoreError;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A binary payload and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBlob {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobMeta {
    pub key: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub stored_at: DateTime<Utc>,
}

/// Durable binary storage keyed by cache key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Overwrites any previous entry under `meta.key`.
    async fn put(&self, meta: &BlobMeta, bytes: Bytes) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<(BlobMeta, Bytes)>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn list(&self) -> Result<Vec<BlobMeta>, StoreError>;
}

/// Stand-in when no durable backend can be opened: every read misses and
/// every write is refused.
pub struct DisabledBlobStore;

#[async_trait]
impl BlobStore for DisabledBlobStore {
    async fn put(&self, _meta: &BlobMeta, _bytes: Bytes) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn get(&self, _key: &str) -> Result<Option<(BlobMeta, Bytes)>, StoreError> {
        Ok(None)
    }

    async fn delete(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list(&self) -> Result<Vec<BlobMeta>, StoreError> {
        Ok(Vec::new())
    }
}
