// Enrichment pipeline: scraped record → extract → cache/score → store + log.
// One record's failure never stops the run; every stage outcome is reported.

pub mod handlers;
pub mod locks;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::{AnalysisCache, ANALYSIS_RESUME_MATCH};
use crate::extraction::{extract_job_listing, ScrapedJob};
use crate::models::analysis::JobAnalysis;
use crate::models::job::JobListing;
use crate::models::profile::CandidateProfile;
use crate::models::run::RunSummary;
use crate::scoring::{ScoringChain, HEURISTIC_LABEL};
use crate::sinks::{AppendOutcome, PersistOutcome, SinkCoordinator, HIGH_MATCH_THRESHOLD};

use self::locks::JobLocks;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub cache_ttl: Duration,
    /// Pause between records, applied by the run driver.
    pub record_delay: Duration,
    /// Records in flight at once; 1 means strictly sequential.
    pub concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(24 * 3600),
            record_delay: Duration::from_millis(500),
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Persist,
    Log,
    Task,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

/// What happened to one record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub scorer: Option<String>,
    pub match_score: Option<f64>,
    pub cache_hit: bool,
    pub persisted: Option<PersistOutcome>,
    pub logged: Option<AppendOutcome>,
    pub failures: Vec<StageFailure>,
}

impl RecordOutcome {
    fn empty(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            title: String::new(),
            company: String::new(),
            scorer: None,
            match_score: None,
            cache_hit: false,
            persisted: None,
            logged: None,
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, stage: Stage, message: impl Into<String>) {
        self.failures.push(StageFailure {
            stage,
            message: message.into(),
        });
    }

    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Summary of one run over a batch of scraped records.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub inserted: usize,
    pub merged: usize,
    pub appended: usize,
    pub log_duplicates: usize,
    pub failed: usize,
    pub cache_hits: usize,
    /// Fresh scorings per tier label; cache hits are not counted here.
    pub tier_counts: BTreeMap<String, usize>,
    /// Input order.
    pub records: Vec<RecordOutcome>,
}

impl RunReport {
    fn tally(run_id: Uuid, started_at: DateTime<Utc>, records: Vec<RecordOutcome>) -> Self {
        let mut report = Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total: records.len(),
            inserted: 0,
            merged: 0,
            appended: 0,
            log_duplicates: 0,
            failed: 0,
            cache_hits: 0,
            tier_counts: BTreeMap::new(),
            records: Vec::new(),
        };
        for record in &records {
            match record.persisted {
                Some(PersistOutcome::Inserted) => report.inserted += 1,
                Some(PersistOutcome::Merged) => report.merged += 1,
                None => {}
            }
            match record.logged {
                Some(AppendOutcome::Appended) => report.appended += 1,
                Some(AppendOutcome::Duplicate) => report.log_duplicates += 1,
                None => {}
            }
            if !record.succeeded() {
                report.failed += 1;
            }
            if record.cache_hit {
                report.cache_hits += 1;
            } else if let Some(scorer) = &record.scorer {
                *report.tier_counts.entry(scorer.clone()).or_default() += 1;
            }
        }
        report.records = records;
        report
    }
}

impl From<&RunReport> for RunSummary {
    fn from(report: &RunReport) -> Self {
        let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
        let high_matches = report
            .records
            .iter()
            .filter(|r| r.match_score.is_some_and(|s| s >= HIGH_MATCH_THRESHOLD))
            .count();
        RunSummary {
            run_id: report.run_id,
            started_at: report.started_at,
            finished_at: report.finished_at,
            duration_seconds: (report.finished_at - report.started_at)
                .to_std()
                .map(|d| d.as_secs_f64())
                .unwrap_or_default(),
            total: count(report.total),
            inserted: count(report.inserted),
            merged: count(report.merged),
            appended: count(report.appended),
            log_duplicates: count(report.log_duplicates),
            failed: count(report.failed),
            cache_hits: count(report.cache_hits),
            high_matches: count(high_matches),
            tier_counts: report
                .tier_counts
                .iter()
                .map(|(tier, n)| (tier.clone(), count(*n)))
                .collect(),
        }
    }
}

/// The enrichment pipeline with its collaborators injected.
#[derive(Clone)]
pub struct Pipeline {
    chain: Arc<ScoringChain>,
    cache: Arc<dyn AnalysisCache>,
    sinks: SinkCoordinator,
    locks: JobLocks,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        chain: Arc<ScoringChain>,
        cache: Arc<dyn AnalysisCache>,
        sinks: SinkCoordinator,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            chain,
            cache,
            sinks,
            locks: JobLocks::new(),
            settings,
        }
    }

    pub fn sinks(&self) -> &SinkCoordinator {
        &self.sinks
    }

    /// Runs every record against one profile snapshot.
    pub async fn run(&self, records: Vec<ScrapedJob>, profile: Arc<CandidateProfile>) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            "Run {run_id}: {} record(s), concurrency {}, tiers [{}]",
            records.len(),
            self.settings.concurrency,
            self.chain.tier_labels().join(", ")
        );

        let outcomes = if self.settings.concurrency <= 1 {
            self.run_sequential(records, &profile).await
        } else {
            self.run_concurrent(records, profile).await
        };

        let report = RunReport::tally(run_id, started_at, outcomes);
        info!(
            "Run {run_id} done: {} inserted, {} merged, {} logged, {} failed, {} cache hits",
            report.inserted, report.merged, report.appended, report.failed, report.cache_hits
        );
        report
    }

    async fn run_sequential(
        &self,
        records: Vec<ScrapedJob>,
        profile: &CandidateProfile,
    ) -> Vec<RecordOutcome> {
        let mut outcomes = Vec::with_capacity(records.len());
        for (i, raw) in records.into_iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }
            outcomes.push(self.process_record(raw, profile).await);
        }
        outcomes
    }

    async fn run_concurrent(
        &self,
        records: Vec<ScrapedJob>,
        profile: Arc<CandidateProfile>,
    ) -> Vec<RecordOutcome> {
        let permits = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut slots: Vec<Option<RecordOutcome>> = vec![None; records.len()];
        let ids: Vec<String> = records.iter().map(|r| r.job_id.clone()).collect();
        let mut tasks = JoinSet::new();

        for (i, raw) in records.into_iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let pipeline = self.clone();
            let profile = profile.clone();
            tasks.spawn(async move {
                let _permit = permit;
                (i, pipeline.process_record(raw, &profile).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((i, outcome)) => slots[i] = Some(outcome),
                Err(e) => error!("Pipeline task failed: {e}"),
            }
        }

        slots
            .into_iter()
            .zip(ids)
            .map(|(slot, job_id)| {
                slot.unwrap_or_else(|| {
                    let mut outcome = RecordOutcome::empty(&job_id);
                    outcome.fail(Stage::Task, "record task did not complete");
                    outcome
                })
            })
            .collect()
    }

    async fn pause(&self) {
        if !self.settings.record_delay.is_zero() {
            tokio::time::sleep(self.settings.record_delay).await;
        }
    }

    /// Extract, score (cache first), persist, log. Holds the job_id lock for
    /// the whole read-modify-write sequence.
    pub async fn process_record(&self, raw: ScrapedJob, profile: &CandidateProfile) -> RecordOutcome {
        let job_id = raw.job_id.trim().to_string();
        let mut outcome = RecordOutcome::empty(&job_id);
        if job_id.is_empty() {
            warn!("Skipping scraped record without job_id ({:?})", raw.title);
            outcome.fail(Stage::Validate, "job_id is empty");
            return outcome;
        }

        let _guard = self.locks.acquire(&job_id).await;

        let mut job = extract_job_listing(&raw);
        outcome.title = job.title.clone();
        outcome.company = job.company.clone();

        let existing = self.sinks.lookup(&job.job_id).await;

        let (analysis, cache_hit) = self.analyze(&mut job, profile).await;
        outcome.scorer = Some(analysis.scorer_backend.clone());
        outcome.match_score = job.resume_match_score;
        outcome.cache_hit = cache_hit;

        match self.sinks.persist(&job, existing).await {
            Ok(persisted) => outcome.persisted = Some(persisted),
            Err(e) => {
                error!("Job {job_id}: primary store write failed: {e}");
                outcome.fail(Stage::Persist, e.to_string());
            }
        }

        match self.sinks.append_log(&job, Some(&analysis)).await {
            Ok(logged) => outcome.logged = Some(logged),
            Err(e) => {
                error!("Job {job_id}: external log append failed: {e}");
                outcome.fail(Stage::Log, e.to_string());
            }
        }

        outcome
    }

    /// Cached analysis when a live, applicable one exists; otherwise the
    /// scoring chain. Only AI-tier results are written back to the cache.
    async fn analyze(&self, job: &mut JobListing, profile: &CandidateProfile) -> (JobAnalysis, bool) {
        if let Some(analysis) = self.cached_analysis(job).await {
            return (analysis, true);
        }

        let analysis = self.chain.score(job, profile).await;
        if analysis.scorer_backend != HEURISTIC_LABEL {
            self.store_analysis(&analysis).await;
        }
        (analysis, false)
    }

    async fn cached_analysis(&self, job: &mut JobListing) -> Option<JobAnalysis> {
        let value = match self.cache.get(&job.job_id, ANALYSIS_RESUME_MATCH).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read for job {} failed: {e}", job.job_id);
                return None;
            }
        };

        let analysis: JobAnalysis = match serde_json::from_value(value) {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("Discarding unreadable cached analysis for job {}: {e}", job.job_id);
                return None;
            }
        };
        if let Err(e) = analysis.apply_to(job) {
            warn!("Discarding cached analysis for job {}: {e}", job.job_id);
            return None;
        }
        debug!("Cache hit for job {} ({})", job.job_id, analysis.scorer_backend);
        Some(analysis)
    }

    async fn store_analysis(&self, analysis: &JobAnalysis) {
        let value = match serde_json::to_value(analysis) {
            Ok(value) => value,
            Err(e) => {
                warn!("Analysis for job {} not cacheable: {e}", analysis.job_id);
                return;
            }
        };
        if let Err(e) = self
            .cache
            .put(&analysis.job_id, ANALYSIS_RESUME_MATCH, value, self.settings.cache_ttl)
            .await
        {
            warn!("Cache write for job {} failed: {e}", analysis.job_id);
        }
    }
}
