//! Durable audio cache.
//!
//! `AssetCache` sits in front of a `BlobStore` and keeps an in-memory LRU
//! index so the total size stays under a byte budget. Reads and writes never
//! surface errors to callers: a broken backend behaves like an empty cache.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;

pub mod blob;
pub mod fs;
pub mod index;
pub mod key;
pub mod s3;

pub use blob::{AudioBlob, BlobMeta, BlobStore, DisabledBlobStore};
pub use fs::FsBlobStore;
pub use key::AudioKey;
pub use s3::S3BlobStore;

use index::CacheIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub items: usize,
    pub total_bytes: u64,
    pub max_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheState {
    index: CacheIndex,
    /// Keys whose payload is stale but could not be deleted yet.
    tombstones: HashSet<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

pub struct AssetCache {
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    max_bytes: u64,
    state: Mutex<CacheState>,
}

impl AssetCache {
    /// Builds the LRU index from whatever the backend already holds, oldest
    /// first, evicting down to `max_bytes` if the budget shrank since the last
    /// run. An unreadable backend starts with an empty index.
    pub async fn open(store: Arc<dyn BlobStore>, clock: Arc<dyn Clock>, max_bytes: u64) -> Self {
        let mut existing = match store.list().await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("Audio cache listing failed ({e}), starting empty");
                Vec::new()
            }
        };
        existing.sort_by_key(|meta| meta.stored_at);

        let mut index = CacheIndex::new(max_bytes);
        let mut evicted = Vec::new();
        for meta in &existing {
            evicted.extend(index.insert(&meta.key, meta.size_bytes));
        }
        for key in &evicted {
            if let Err(e) = store.delete(key).await {
                warn!("Failed to evict cached audio {key}: {e}");
            }
        }

        info!(
            "Audio cache ready: {} entries, {} bytes (budget {max_bytes})",
            index.len(),
            index.total_bytes()
        );

        Self {
            store,
            clock,
            max_bytes,
            state: Mutex::new(CacheState {
                index,
                tombstones: HashSet::new(),
                hits: 0,
                misses: 0,
                evictions: evicted.len() as u64,
            }),
        }
    }

    /// Stores `blob` under `key`, replacing any previous entry. A payload that
    /// cannot be stored drops the previous entry instead, so the key reads as
    /// a miss rather than stale audio.
    pub async fn save_audio(&self, key: &str, blob: &AudioBlob) {
        let size_bytes = blob.bytes.len() as u64;
        if size_bytes > self.max_bytes {
            warn!(
                "Not caching {key}: {size_bytes} bytes exceeds budget of {}",
                self.max_bytes
            );
            self.discard(key).await;
            return;
        }

        let meta = BlobMeta {
            key: key.to_string(),
            content_type: blob.content_type.clone(),
            size_bytes,
            stored_at: self.clock.now(),
        };
        if let Err(e) = self.store.put(&meta, blob.bytes.clone()).await {
            error!("Failed to cache audio {key}: {e}");
            self.discard(key).await;
            return;
        }

        let evicted = {
            let mut state = self.state.lock().await;
            state.tombstones.remove(key);
            let evicted = state.index.insert(key, size_bytes);
            state.evictions += evicted.len() as u64;
            evicted
        };
        self.delete_all(&evicted).await;
        debug!("Cached audio {key} ({size_bytes} bytes, evicted {})", evicted.len());
    }

    async fn discard(&self, key: &str) {
        {
            let mut state = self.state.lock().await;
            state.index.remove(key);
            state.tombstones.insert(key.to_string());
        }
        match self.store.delete(key).await {
            Ok(()) => {
                self.state.lock().await.tombstones.remove(key);
            }
            Err(e) => warn!("Failed to drop cached audio {key}: {e}"),
        }
    }

    async fn delete_all(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.store.delete(key).await {
                warn!("Failed to evict cached audio {key}: {e}");
            }
        }
    }

    /// Returns the cached payload for `key`, or `None` when absent or when the
    /// backend fails.
    pub async fn get_audio(&self, key: &str) -> Option<AudioBlob> {
        if self.state.lock().await.tombstones.contains(key) {
            self.discard(key).await;
            self.state.lock().await.misses += 1;
            return None;
        }

        let found = match self.store.get(key).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Audio cache read failed for {key}: {e}");
                None
            }
        };

        let mut state = self.state.lock().await;
        match found {
            Some((meta, bytes)) => {
                let mut evicted = Vec::new();
                if !state.index.touch(key) {
                    // Written by another process sharing the backend.
                    evicted = state.index.insert(key, bytes.len() as u64);
                    state.evictions += evicted.len() as u64;
                }
                state.hits += 1;
                drop(state);
                self.delete_all(&evicted).await;
                debug!("Audio cache hit: {key}");
                Some(AudioBlob {
                    bytes,
                    content_type: meta.content_type,
                })
            }
            None => {
                state.index.remove(key);
                state.misses += 1;
                None
            }
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            items: state.index.len(),
            total_bytes: state.index.total_bytes(),
            max_bytes: self.max_bytes,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }
}
