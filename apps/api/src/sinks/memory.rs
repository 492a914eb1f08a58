//! In-memory sinks for tests, with switchable failure injection.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ExternalLog, JobFilter, JobSort, JobStatistics, JobStore, LogRow, ProfileStore, RunHistory,
    SinkError, HIGH_MATCH_THRESHOLD,
};
use crate::models::job::{JobListing, JobStatus};
use crate::models::profile::CandidateProfile;
use crate::models::run::RunSummary;

fn injected(what: &str) -> SinkError {
    SinkError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        format!("injected {what} failure"),
    ))
}

/// Jobs, run history and the profile. `fail_lookups` and `fail_writes`
/// apply to all three.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, JobListing>>,
    runs: RwLock<Vec<RunSummary>>,
    profile: RwLock<Option<CandidateProfile>>,
    pub fail_lookups: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl MemoryJobStore {
    pub async fn get(&self, job_id: &str) -> Option<JobListing> {
        self.jobs.read().await.get(job_id).cloned()
    }

    pub async fn stored_profile(&self) -> Option<CandidateProfile> {
        self.profile.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find(&self, job_id: &str) -> Result<Option<JobListing>, SinkError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(injected("lookup"));
        }
        Ok(self.get(job_id).await)
    }

    async fn insert(&self, job: &JobListing) -> Result<(), SinkError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.job_id) {
            return Err(SinkError::Corrupt(format!("duplicate job_id {}", job.job_id)));
        }
        jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn update(&self, job: &JobListing) -> Result<(), SinkError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        self.jobs.write().await.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<JobListing>, SinkError> {
        let jobs = self.jobs.read().await;
        let query = filter.query.as_ref().map(|q| q.to_lowercase());
        let mut matched: Vec<JobListing> = jobs
            .values()
            .filter(|j| filter.status.map_or(true, |s| j.status == s))
            .filter(|j| {
                filter
                    .min_score
                    .map_or(true, |min| j.resume_match_score.is_some_and(|s| s >= min))
            })
            .filter(|j| {
                query.as_ref().map_or(true, |q| {
                    j.title.to_lowercase().contains(q) || j.description.to_lowercase().contains(q)
                })
            })
            .filter(|j| {
                filter
                    .company
                    .as_ref()
                    .map_or(true, |c| j.company.to_lowercase().contains(&c.to_lowercase()))
            })
            .filter(|j| {
                filter
                    .location
                    .as_ref()
                    .map_or(true, |l| j.location.to_lowercase().contains(&l.to_lowercase()))
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| match filter.sort {
            JobSort::Score => {
                let a_score = a.resume_match_score.unwrap_or(-1.0);
                let b_score = b.resume_match_score.unwrap_or(-1.0);
                b_score
                    .total_cmp(&a_score)
                    .then_with(|| b.scraped_at.cmp(&a.scraped_at))
            }
            JobSort::Newest => b.scraped_at.cmp(&a.scraped_at),
        });
        Ok(matched
            .into_iter()
            .skip(filter.page_offset() as usize)
            .take(filter.page_size() as usize)
            .collect())
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        notes: Option<String>,
    ) -> Result<bool, SinkError> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(job_id) else {
            return Ok(false);
        };
        job.status = status;
        if notes.is_some() {
            job.notes = notes;
        }
        job.last_updated = Some(Utc::now());
        Ok(true)
    }

    async fn statistics(&self) -> Result<JobStatistics, SinkError> {
        let jobs = self.jobs.read().await;
        let scores: Vec<f64> = jobs.values().filter_map(|j| j.resume_match_score).collect();
        Ok(JobStatistics {
            total_jobs: jobs.len() as i64,
            applied_jobs: jobs.values().filter(|j| j.status == JobStatus::Applied).count() as i64,
            high_match_jobs: scores.iter().filter(|s| **s >= HIGH_MATCH_THRESHOLD).count() as i64,
            average_match_score: (!scores.is_empty())
                .then(|| scores.iter().sum::<f64>() / scores.len() as f64),
        })
    }

    async fn purge_stale(&self, days: u32) -> Result<u64, SinkError> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days));
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, j| {
            j.scraped_at >= cutoff || matches!(j.status, JobStatus::Applied | JobStatus::Saved)
        });
        Ok((before - jobs.len()) as u64)
    }
}

#[async_trait]
impl RunHistory for MemoryJobStore {
    async fn record_run(&self, run: &RunSummary) -> Result<(), SinkError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        self.runs.write().await.push(run.clone());
        Ok(())
    }

    async fn find_run(&self, run_id: Uuid) -> Result<Option<RunSummary>, SinkError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(injected("lookup"));
        }
        Ok(self.runs.read().await.iter().find(|r| r.run_id == run_id).cloned())
    }

    async fn recent_runs(&self, limit: i64) -> Result<Vec<RunSummary>, SinkError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(injected("lookup"));
        }
        let mut runs = self.runs.read().await.clone();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(runs)
    }
}

#[async_trait]
impl ProfileStore for MemoryJobStore {
    async fn load_profile(&self) -> Result<Option<CandidateProfile>, SinkError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(injected("lookup"));
        }
        Ok(self.stored_profile().await)
    }

    async fn save_profile(&self, profile: &CandidateProfile) -> Result<(), SinkError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("write"));
        }
        *self.profile.write().await = Some(profile.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryExternalLog {
    rows: RwLock<Vec<LogRow>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub id_scans: AtomicUsize,
}

impl MemoryExternalLog {
    pub async fn rows(&self) -> Vec<LogRow> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl ExternalLog for MemoryExternalLog {
    async fn job_ids(&self) -> Result<HashSet<String>, SinkError> {
        self.id_scans.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        Ok(self.rows.read().await.iter().map(|r| r.job_id.clone()).collect())
    }

    async fn append_rows(&self, rows: &[LogRow]) -> Result<(), SinkError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(injected("append"));
        }
        self.rows.write().await.extend_from_slice(rows);
        Ok(())
    }
}
