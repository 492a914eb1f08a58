// Analysis cache: one entry per (job_id, analysis kind) with lazy expiry.
// Backends: in-process map (default) and Redis (when REDIS_URL is set).

pub mod memory;
pub mod redis_cache;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

pub use self::memory::MemoryAnalysisCache;
pub use self::redis_cache::RedisAnalysisCache;

/// Cache kind for resume-match analyses.
pub const ANALYSIS_RESUME_MATCH: &str = "resume_match";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache payload error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait AnalysisCache: Send + Sync {
    /// Returns the stored value unless it has expired. Expired entries read
    /// as absent whether or not they have been purged.
    async fn get(&self, job_id: &str, kind: &str) -> Result<Option<Value>, CacheError>;

    /// Replaces any entry for the key; the TTL window starts now.
    async fn put(&self, job_id: &str, kind: &str, value: Value, ttl: Duration)
        -> Result<(), CacheError>;

    /// Purges entries that are expired at sweep time. An entry refreshed
    /// while the sweep runs must survive. Returns how many were removed.
    async fn sweep(&self) -> Result<usize, CacheError>;

    fn backend(&self) -> &'static str;
}

/// Expiry instant for a TTL starting at `now`.
pub fn expires_at(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// An entry is live strictly before its expiry instant.
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at <= now
}
