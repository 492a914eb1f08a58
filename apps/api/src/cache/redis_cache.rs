use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::Script;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{expires_at, is_expired, AnalysisCache, CacheError};

const KEY_PREFIX: &str = "jobscout:analysis";

/// Redis keeps each key this long past its logical expiry so that
/// lazy expiry, not Redis eviction, decides what a reader sees.
const KEY_TTL_BUFFER: Duration = Duration::from_secs(3600);

const SCAN_BATCH: usize = 200;

/// Deletes KEYS[1] only if it still holds the exact payload ARGV[1].
const COMPARE_AND_DELETE: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Stored value: the payload plus its logical expiry.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    value: Value,
    expires_at: DateTime<Utc>,
}

pub struct RedisAnalysisCache {
    conn: MultiplexedConnection,
    compare_and_delete: Script,
}

impl RedisAnalysisCache {
    pub async fn connect(client: &redis::Client) -> Result<Self, CacheError> {
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Redis analysis cache connected");
        Ok(Self {
            conn,
            compare_and_delete: Script::new(COMPARE_AND_DELETE),
        })
    }

    async fn scan_keys(&self) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{KEY_PREFIX}:*");
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                return Ok(keys);
            }
            cursor = next;
        }
    }
}

fn cache_key(job_id: &str, kind: &str) -> String {
    format!("{KEY_PREFIX}:{kind}:{job_id}")
}

/// Live value of a raw stored envelope at `now`.
fn decode(raw: &str, now: DateTime<Utc>) -> Result<Option<Value>, CacheError> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if is_expired(envelope.expires_at, now) {
        Ok(None)
    } else {
        Ok(Some(envelope.value))
    }
}

#[async_trait]
impl AnalysisCache for RedisAnalysisCache {
    async fn get(&self, job_id: &str, kind: &str) -> Result<Option<Value>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(cache_key(job_id, kind))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(raw) => decode(&raw, Utc::now()),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        job_id: &str,
        kind: &str,
        value: Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let envelope = Envelope {
            value,
            expires_at: expires_at(Utc::now(), ttl),
        };
        let raw = serde_json::to_string(&envelope)?;
        let px = u64::try_from(ttl.saturating_add(KEY_TTL_BUFFER).as_millis()).unwrap_or(u64::MAX);

        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(cache_key(job_id, kind))
            .arg(raw)
            .arg("PX")
            .arg(px)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    /// SCAN, then compare-and-delete each expired key against the exact
    /// payload observed, so a concurrent `put` is never undone.
    async fn sweep(&self) -> Result<usize, CacheError> {
        let keys = self.scan_keys().await?;
        let mut conn = self.conn.clone();
        let mut removed = 0usize;

        for key in keys {
            let raw: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut conn).await?;
            let Some(raw) = raw else { continue };

            let expired = match decode(&raw, Utc::now()) {
                Ok(value) => value.is_none(),
                Err(_) => true,
            };
            if !expired {
                continue;
            }

            let deleted: i64 = self
                .compare_and_delete
                .key(&key)
                .arg(&raw)
                .invoke_async(&mut conn)
                .await?;
            if deleted == 0 {
                debug!("Cache key {key} refreshed during sweep, kept");
            }
            removed += deleted as usize;
        }

        Ok(removed)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_layout() {
        assert_eq!(cache_key("3901", "resume_match"), "jobscout:analysis:resume_match:3901");
    }

    #[test]
    fn test_decode_respects_expiry() {
        let now = Utc::now();
        let live = serde_json::to_string(&Envelope {
            value: json!({"overall_match_score": 61.0}),
            expires_at: now + chrono::Duration::seconds(30),
        })
        .unwrap();
        assert_eq!(decode(&live, now).unwrap(), Some(json!({"overall_match_score": 61.0})));

        let stale = serde_json::to_string(&Envelope {
            value: json!(1),
            expires_at: now,
        })
        .unwrap();
        assert_eq!(decode(&stale, now).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not json", Utc::now()).is_err());
    }
}
