use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted totals of one pipeline run. Per-record outcomes are only
/// returned to the caller that started the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub total: i64,
    pub inserted: i64,
    pub merged: i64,
    pub appended: i64,
    pub log_duplicates: i64,
    pub failed: i64,
    pub cache_hits: i64,
    /// Records scored at or above the high-match threshold.
    pub high_matches: i64,
    pub tier_counts: BTreeMap<String, i64>,
}
