use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{expires_at, is_expired, AnalysisCache, CacheError};

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// Process-local cache. Sweeps run under the write lock, so the expiry
/// check and the removal are a single step.
#[derive(Debug, Default)]
pub struct MemoryAnalysisCache {
    entries: RwLock<HashMap<(String, String), Entry>>,
}

impl MemoryAnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries held, including expired ones not yet swept.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl AnalysisCache for MemoryAnalysisCache {
    async fn get(&self, job_id: &str, kind: &str) -> Result<Option<Value>, CacheError> {
        let entries = self.entries.read().await;
        let key = (job_id.to_string(), kind.to_string());
        Ok(entries
            .get(&key)
            .filter(|e| !is_expired(e.expires_at, Utc::now()))
            .map(|e| e.value.clone()))
    }

    async fn put(
        &self,
        job_id: &str,
        kind: &str,
        value: Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let entry = Entry {
            value,
            expires_at: expires_at(Utc::now(), ttl),
        };
        self.entries
            .write()
            .await
            .insert((job_id.to_string(), kind.to_string()), entry);
        Ok(())
    }

    async fn sweep(&self) -> Result<usize, CacheError> {
        let mut entries = self.entries.write().await;
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|_, e| !is_expired(e.expires_at, now));
        Ok(before - entries.len())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KIND: &str = "resume_match";

    #[tokio::test]
    async fn test_put_then_get_with_positive_ttl() {
        let cache = MemoryAnalysisCache::new();
        cache
            .put("1", KIND, json!({"score": 70}), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("1", KIND).await.unwrap(), Some(json!({"score": 70})));
    }

    #[tokio::test]
    async fn test_zero_ttl_reads_absent_after_delay() {
        let cache = MemoryAnalysisCache::new();
        cache.put("1", KIND, json!(1), Duration::ZERO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get("1", KIND).await.unwrap(), None);
        // lazily expired, not yet purged
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_kinds_are_separate_keys() {
        let cache = MemoryAnalysisCache::new();
        cache.put("1", KIND, json!("a"), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("1", "keywords").await.unwrap(), None);
        assert_eq!(cache.get("2", KIND).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value_and_resets_expiry() {
        let cache = MemoryAnalysisCache::new();
        cache.put("1", KIND, json!("old"), Duration::ZERO).await.unwrap();
        cache.put("1", KIND, json!("new"), Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get("1", KIND).await.unwrap(), Some(json!("new")));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let cache = MemoryAnalysisCache::new();
        cache.put("stale", KIND, json!(1), Duration::ZERO).await.unwrap();
        cache.put("fresh", KIND, json!(2), Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(cache.sweep().await.unwrap(), 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("fresh", KIND).await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_refreshed_entry_survives_sweep() {
        let cache = MemoryAnalysisCache::new();
        cache.put("1", KIND, json!("old"), Duration::ZERO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put("1", KIND, json!("new"), Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.sweep().await.unwrap(), 0);
        assert_eq!(cache.get("1", KIND).await.unwrap(), Some(json!("new")));
    }
}
