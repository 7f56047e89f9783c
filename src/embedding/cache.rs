//! Content-addressed embedding cache.
//!
//! Maps a stable hash of input text to its embedding vector. The full map is
//! loaded at startup and written wholesale on checkpoint; a missing or
//! corrupt file simply starts the cache empty. There is no eviction — the
//! corpus is small enough that unbounded growth over a process lifetime is
//! an accepted tradeoff.

use std::collections::HashMap;
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::core::errors::ApiError;

pub struct EmbeddingCache {
    path: PathBuf,
    entries: RwLock<HashMap<String, Vec<f32>>>,
}

impl EmbeddingCache {
    /// Load the cache from disk. Any read or parse failure yields an empty
    /// cache rather than an error.
    pub fn load(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, Vec<f32>>>(&contents) {
                Ok(map) => map,
                Err(err) => {
                    tracing::warn!(
                        "Ignoring corrupt embedding cache at {}: {}",
                        path.display(),
                        err
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        tracing::debug!("Loaded {} cached embeddings", entries.len());
        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    pub fn content_hash(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn get(&self, text: &str) -> Option<Vec<f32>> {
        let key = Self::content_hash(text);
        self.entries.read().await.get(&key).cloned()
    }

    /// Store a vector for the given text. Concurrent writers for the same
    /// text race last-write-wins; values are deterministic per provider so
    /// either write is correct.
    pub async fn put(&self, text: &str, vector: Vec<f32>) {
        let key = Self::content_hash(text);
        self.entries.write().await.insert(key, vector);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Serialize the whole cache to disk, writing to a temp file and
    /// renaming so a crash mid-write cannot corrupt the previous snapshot.
    pub async fn flush(&self) -> Result<(), ApiError> {
        let snapshot = self.entries.read().await.clone();
        let serialized = serde_json::to_string(&snapshot).map_err(ApiError::internal)?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, serialized)
            .await
            .map_err(ApiError::internal)?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(ApiError::internal)?;

        tracing::debug!("Checkpointed {} cached embeddings", snapshot.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache_path() -> PathBuf {
        std::env::temp_dir().join(format!("embedding-cache-{}.json", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn put_and_get_by_content() {
        let cache = EmbeddingCache::load(temp_cache_path());

        assert!(cache.get("tuition").await.is_none());
        cache.put("tuition", vec![0.1, 0.2]).await;
        assert_eq!(cache.get("tuition").await.unwrap(), vec![0.1, 0.2]);
        assert!(cache.get("housing").await.is_none());
    }

    #[tokio::test]
    async fn flush_and_reload_round_trip() {
        let path = temp_cache_path();

        let cache = EmbeddingCache::load(path.clone());
        cache.put("tuition", vec![0.25, 0.5, 0.75]).await;
        cache.put("deadlines", vec![1.0, 0.0, 0.0]).await;
        cache.flush().await.unwrap();

        let reloaded = EmbeddingCache::load(path);
        assert_eq!(reloaded.len().await, 2);
        let vector = reloaded.get("tuition").await.unwrap();
        for (a, b) in vector.iter().zip([0.25f32, 0.5, 0.75].iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let path = temp_cache_path();
        std::fs::write(&path, "not json at all {{{").unwrap();

        let cache = EmbeddingCache::load(path);
        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(
            EmbeddingCache::content_hash("hello"),
            EmbeddingCache::content_hash("hello")
        );
        assert_ne!(
            EmbeddingCache::content_hash("hello"),
            EmbeddingCache::content_hash("hello ")
        );
    }
}
