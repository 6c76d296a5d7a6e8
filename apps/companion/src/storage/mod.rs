//! Local key-value storage.
//!
//! Everything kept on the device side of the sync boundary (cached profile,
//! energy state, session, feedback flag, outbox) lives behind `KeyValueStore`.
//! `LocalRepository` layers one typed accessor per entity on top of it so call
//! sites never touch raw keys.

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod redis_store;
pub mod repo;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use repo::LocalRepository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Storage unavailable")]
    Unavailable,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Writes `new` only if the stored value still equals `expected`
    /// (`None` meaning "absent"). Returns whether the write happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
    ) -> Result<bool, StoreError>;
}
