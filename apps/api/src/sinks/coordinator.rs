use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::log_row::LogRow;
use super::merge::merge_into;
use super::{ExternalLog, JobStore, SinkError};
use crate::models::analysis::JobAnalysis;
use crate::models::job::JobListing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistOutcome {
    Inserted,
    Merged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendOutcome {
    Appended,
    Duplicate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchAppendReport {
    pub appended: usize,
    pub duplicates: usize,
}

/// Decides insert-vs-merge for the primary store and append-vs-skip for
/// the external log, independently.
///
/// Lookup failures never drop a record: a failed store lookup reads as
/// "not found" (the unique index on `job_id` turns a wrong guess into an
/// insert error), and a failed log scan reads as "not a duplicate".
#[derive(Clone)]
pub struct SinkCoordinator {
    store: Arc<dyn JobStore>,
    log: Arc<dyn ExternalLog>,
}

impl SinkCoordinator {
    pub fn new(store: Arc<dyn JobStore>, log: Arc<dyn ExternalLog>) -> Self {
        Self { store, log }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Exact `job_id` lookup in the primary store.
    pub async fn lookup(&self, job_id: &str) -> Option<JobListing> {
        match self.store.find(job_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Store lookup for job {job_id} failed, treating as new: {e}");
                None
            }
        }
    }

    /// Inserts `job`, or merges it into `existing` field by field.
    pub async fn persist(
        &self,
        job: &JobListing,
        existing: Option<JobListing>,
    ) -> Result<PersistOutcome, SinkError> {
        match existing {
            Some(mut stored) => {
                merge_into(&mut stored, job, Utc::now());
                self.store.update(&stored).await?;
                debug!("Job {} merged into stored record", job.job_id);
                Ok(PersistOutcome::Merged)
            }
            None => {
                self.store.insert(job).await?;
                debug!("Job {} inserted", job.job_id);
                Ok(PersistOutcome::Inserted)
            }
        }
    }

    /// Appends one row unless the identifier is already logged.
    pub async fn append_log(
        &self,
        job: &JobListing,
        analysis: Option<&JobAnalysis>,
    ) -> Result<AppendOutcome, SinkError> {
        let duplicate = match self.log.contains(&job.job_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!("External log check for job {} failed, appending anyway: {e}", job.job_id);
                false
            }
        };
        if duplicate {
            debug!("Job {} already in external log, skipped", job.job_id);
            return Ok(AppendOutcome::Duplicate);
        }
        self.log
            .append_rows(&[LogRow::from_listing(job, analysis)])
            .await?;
        Ok(AppendOutcome::Appended)
    }

    /// Batch variant: one identifier scan for the whole batch, then a single
    /// append. Repeats inside the batch are dropped as duplicates too.
    pub async fn append_log_batch(&self, jobs: &[JobListing]) -> Result<BatchAppendReport, SinkError> {
        let mut seen: HashSet<String> = match self.log.job_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("External log scan failed, treating batch as new: {e}");
                HashSet::new()
            }
        };

        let mut report = BatchAppendReport::default();
        let mut rows = Vec::with_capacity(jobs.len());
        for job in jobs {
            if seen.insert(job.job_id.clone()) {
                rows.push(LogRow::from_listing(job, None));
            } else {
                report.duplicates += 1;
            }
        }

        self.log.append_rows(&rows).await?;
        report.appended = rows.len();
        info!(
            "External log batch: {} appended, {} duplicates skipped",
            report.appended, report.duplicates
        );
        Ok(report)
    }
}
