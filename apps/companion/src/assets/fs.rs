use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{info, warn};

use super::blob::{BlobMeta, BlobStore};
use crate::storage::StoreError;

/// Stores each entry as `<sha256(key)>.bin` plus a `<sha256(key)>.json`
/// metadata sidecar. Both are written to a temp file and renamed into place;
/// an entry is only visible once its sidecar exists.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        info!("Audio cache directory: {}", root.display());
        Ok(Self { root })
    }

    fn stem(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }

    fn payload_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.bin", Self::stem(key)))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", Self::stem(key)))
    }
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match fs::read(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn remove_optional(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, meta: &BlobMeta, bytes: Bytes) -> Result<(), StoreError> {
        write_atomic(&self.payload_path(&meta.key), &bytes).await?;
        let sidecar = serde_json::to_vec(meta)?;
        write_atomic(&self.meta_path(&meta.key), &sidecar).await
    }

    async fn get(&self, key: &str) -> Result<Option<(BlobMeta, Bytes)>, StoreError> {
        let Some(sidecar) = read_optional(&self.meta_path(key)).await? else {
            return Ok(None);
        };
        let meta: BlobMeta = serde_json::from_slice(&sidecar)?;
        let Some(payload) = read_optional(&self.payload_path(key)).await? else {
            return Ok(None);
        };
        Ok(Some((meta, Bytes::from(payload))))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        remove_optional(&self.meta_path(key)).await?;
        remove_optional(&self.payload_path(key)).await
    }

    async fn list(&self) -> Result<Vec<BlobMeta>, StoreError> {
        let mut metas = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read(&path).await?;
            match serde_json::from_slice::<BlobMeta>(&contents) {
                Ok(meta) => metas.push(meta),
                Err(e) => warn!("Skipping unreadable cache sidecar {}: {e}", path.display()),
            }
        }
        Ok(metas)
    }
}
