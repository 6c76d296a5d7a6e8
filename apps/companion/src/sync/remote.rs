//! Contracts for the remote side of the sync boundary: a document store with
//! Firestore-like paths (`collection/id/subcollection/...`) and an auth
//! provider that can hand out anonymous identities.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub type Fields = Map<String, Value>;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RemoteError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RemoteError::Unavailable(e.to_string())
            }
            other => RemoteError::Database(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, path: &str) -> Result<Option<Fields>, RemoteError>;

    /// With `merge`, fields absent from `fields` are preserved (nested objects
    /// merge key by key). Without it the document is replaced.
    async fn set_document(&self, path: &str, fields: Fields, merge: bool)
        -> Result<(), RemoteError>;

    /// Appends a document with a store-assigned id and returns that id.
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, RemoteError>;

    async fn query_collection(
        &self,
        collection: &str,
        order_by: &str,
        direction: Direction,
        limit: usize,
    ) -> Result<Vec<Document>, RemoteError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub anonymous: bool,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_anonymously(&self) -> Result<Identity, RemoteError>;

    /// Re-establishes a previously issued identity. `Ok(false)` means the
    /// provider no longer knows it.
    async fn resume(&self, identity: &Identity) -> Result<bool, RemoteError>;

    fn current_identity(&self) -> Option<Identity>;
}

/// Handles to a configured remote backend. Absent entirely in local-only mode.
#[derive(Clone)]
pub struct Remote {
    pub docs: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthProvider>,
}

/// Deep-merges `patch` into `target`: objects merge recursively, any other
/// value replaces what was there.
pub fn merge_fields(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        match value {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = target.get_mut(&key) {
                    merge_fields(existing, incoming);
                    continue;
                }
                target.insert(key, Value::Object(incoming));
            }
            value => {
                target.insert(key, value);
            }
        }
    }
}

/// Splits `users/abc` into (`users`, `abc`).
pub fn split_document_path(path: &str) -> Result<(&str, &str), RemoteError> {
    match path.rsplit_once('/') {
        Some((collection, id)) if !collection.is_empty() && !id.is_empty() => Ok((collection, id)),
        _ => Err(RemoteError::InvalidPath(path.to_string())),
    }
}

/// Field names are interpolated into ordering clauses, so only plain
/// identifiers are accepted.
pub fn validate_field_name(field: &str) -> Result<(), RemoteError> {
    if !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(RemoteError::InvalidPath(format!("field '{field}'")))
    }
}
