// Sinks: the primary store (update-in-place merges) and the external log
// (append-only, skip on duplicate). The coordinator owns job_id uniqueness
// across both. The primary store also keeps run history and the candidate
// profile.

pub mod coordinator;
pub mod csv_log;
pub mod log_row;
#[cfg(test)]
pub mod memory;
pub mod merge;
pub mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::job::{JobListing, JobStatus};
use crate::models::profile::CandidateProfile;
use crate::models::run::RunSummary;

pub use self::coordinator::{AppendOutcome, PersistOutcome, SinkCoordinator};
pub use self::csv_log::CsvExternalLog;
pub use self::log_row::LogRow;
pub use self::postgres::PgJobStore;

/// Matches at or above this score count as high-match in statistics.
pub const HIGH_MATCH_THRESHOLD: f64 = 80.0;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;
pub const DEFAULT_RECENT_RUNS: i64 = 10;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("stored record is invalid: {0}")]
    Corrupt(String),

    #[error("background task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSort {
    /// Highest match score first, unscored last, then newest.
    #[default]
    Score,
    /// Most recently scraped first.
    Newest,
}

/// Query over the primary store. All filters are optional and combine with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub min_score: Option<f64>,
    /// Case-insensitive substring of title or description.
    pub query: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub sort: JobSort,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl JobFilter {
    pub fn page_size(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn page_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatistics {
    pub total_jobs: i64,
    pub applied_jobs: i64,
    pub high_match_jobs: i64,
    pub average_match_score: Option<f64>,
}

/// Durable record of truth, keyed by `job_id`.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn find(&self, job_id: &str) -> Result<Option<JobListing>, SinkError>;

    /// Inserts a new record; fails if the job_id already exists.
    async fn insert(&self, job: &JobListing) -> Result<(), SinkError>;

    /// Replaces the stored record with an already merged one.
    async fn update(&self, job: &JobListing) -> Result<(), SinkError>;

    /// Ordered per `filter.sort`, then paginated.
    async fn list(&self, filter: &JobFilter) -> Result<Vec<JobListing>, SinkError>;

    /// Returns false when the job does not exist.
    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        notes: Option<String>,
    ) -> Result<bool, SinkError>;

    async fn statistics(&self) -> Result<JobStatistics, SinkError>;

    /// Deletes jobs scraped more than `days` ago that were never saved or applied to.
    async fn purge_stale(&self, days: u32) -> Result<u64, SinkError>;
}

/// Append-only, human-facing log. Existing rows are never rewritten.
#[async_trait]
pub trait ExternalLog: Send + Sync {
    /// Every identifier currently in the log.
    async fn job_ids(&self) -> Result<HashSet<String>, SinkError>;

    /// Exact-match scan of the identifier column.
    async fn contains(&self, job_id: &str) -> Result<bool, SinkError> {
        Ok(self.job_ids().await?.contains(job_id))
    }

    async fn append_rows(&self, rows: &[LogRow]) -> Result<(), SinkError>;
}

/// Summaries of completed runs.
#[async_trait]
pub trait RunHistory: Send + Sync {
    async fn record_run(&self, run: &RunSummary) -> Result<(), SinkError>;

    async fn find_run(&self, run_id: Uuid) -> Result<Option<RunSummary>, SinkError>;

    /// Newest first by start time.
    async fn recent_runs(&self, limit: i64) -> Result<Vec<RunSummary>, SinkError>;
}

/// The single stored candidate profile.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load_profile(&self) -> Result<Option<CandidateProfile>, SinkError>;

    /// Replaces the stored profile, creating it on first save.
    async fn save_profile(&self, profile: &CandidateProfile) -> Result<(), SinkError>;
}
