//! Axum route handlers for pipeline runs, run history, extraction previews
//! and log sync.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{extract_job_listing, ScrapedJob};
use crate::models::job::JobListing;
use crate::models::run::RunSummary;
use crate::pipeline::RunReport;
use crate::sinks::coordinator::BatchAppendReport;
use crate::sinks::{JobFilter, JobSort, DEFAULT_RECENT_RUNS, MAX_PAGE_SIZE};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub jobs: Vec<ScrapedJob>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RunListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RunListResponse {
    pub runs: Vec<RunSummary>,
    pub count: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogSyncRequest {
    /// Newest stored jobs to export; defaults to the maximum page size.
    pub limit: Option<i64>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/runs
///
/// Enriches, scores and stores a batch of scraped records. Per-record
/// failures are reported in the body; the request itself only fails on
/// an empty batch. The run summary is recorded in the run history; failing
/// to record it is logged and does not fail the request.
pub async fn handle_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunReport>, AppError> {
    if request.jobs.is_empty() {
        return Err(AppError::Validation("jobs cannot be empty".to_string()));
    }

    let profile = state.profile_snapshot().await;
    if profile.resume_text.is_empty() && profile.skills.is_empty() {
        warn!("Running pipeline with an empty candidate profile");
    }

    let report = state.pipeline.run(request.jobs, profile).await;
    if let Err(e) = state.runs.record_run(&RunSummary::from(&report)).await {
        warn!("Run {} summary not recorded: {e}", report.run_id);
    }
    Ok(Json(report))
}

/// GET /api/v1/runs
pub async fn handle_list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunListQuery>,
) -> Result<Json<RunListResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_RUNS);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be within 1-{MAX_PAGE_SIZE}"
        )));
    }
    let runs = state.runs.recent_runs(limit).await?;
    Ok(Json(RunListResponse {
        count: runs.len(),
        runs,
    }))
}

/// GET /api/v1/runs/:run_id
pub async fn handle_get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunSummary>, AppError> {
    state
        .runs
        .find_run(run_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("run {run_id}")))
}

/// POST /api/v1/extract
///
/// Field extraction preview. Nothing is scored or stored.
pub async fn handle_extract(Json(raw): Json<ScrapedJob>) -> Result<Json<JobListing>, AppError> {
    if raw.text.trim().is_empty() && raw.title.trim().is_empty() {
        return Err(AppError::Validation("text or title is required".to_string()));
    }
    Ok(Json(extract_job_listing(&raw)))
}

/// POST /api/v1/log/sync
///
/// Exports stored jobs, newest first, to the external log through the
/// batch path. Jobs already logged are skipped.
pub async fn handle_log_sync(
    State(state): State<AppState>,
    request: Option<Json<LogSyncRequest>>,
) -> Result<Json<BatchAppendReport>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let filter = JobFilter {
        sort: JobSort::Newest,
        limit: Some(request.limit.unwrap_or(MAX_PAGE_SIZE)),
        ..Default::default()
    };

    let jobs = state.store().list(&filter).await?;
    let report = state.pipeline.sinks().append_log_batch(&jobs).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use crate::sinks::memory::{MemoryExternalLog, MemoryJobStore};
    use crate::state::tests::app_state;

    fn scraped(id: &str) -> ScrapedJob {
        ScrapedJob {
            job_id: id.to_string(),
            title: "Backend Engineer".to_string(),
            company: "Initech".to_string(),
            text: "Requirements:\n- 3+ years of experience with Go and PostgreSQL".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_is_recorded_and_listed() {
        let store = Arc::new(MemoryJobStore::default());
        let state = app_state(store.clone(), Arc::new(MemoryExternalLog::default()));

        let Json(report) = handle_run(
            State(state.clone()),
            Json(RunRequest {
                jobs: vec![scraped("501"), scraped("502")],
            }),
        )
        .await
        .unwrap();

        let Json(listed) = handle_list_runs(State(state.clone()), Query(RunListQuery::default()))
            .await
            .unwrap();
        assert_eq!(listed.count, 1);
        assert_eq!(listed.runs[0].run_id, report.run_id);
        assert_eq!(listed.runs[0].inserted, 2);

        let Json(found) = handle_get_run(State(state.clone()), Path(report.run_id))
            .await
            .unwrap();
        assert_eq!(found.total, 2);
    }

    #[tokio::test]
    async fn test_unknown_run_is_not_found() {
        let state = app_state(
            Arc::new(MemoryJobStore::default()),
            Arc::new(MemoryExternalLog::default()),
        );
        let result = handle_get_run(State(state), Path(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_history_write_failure_still_returns_report() {
        let store = Arc::new(MemoryJobStore::default());
        let state = app_state(store.clone(), Arc::new(MemoryExternalLog::default()));
        store.fail_writes.store(true, Ordering::SeqCst);

        let Json(report) = handle_run(
            State(state.clone()),
            Json(RunRequest {
                jobs: vec![scraped("503")],
            }),
        )
        .await
        .unwrap();
        assert_eq!(report.failed, 1);

        store.fail_writes.store(false, Ordering::SeqCst);
        let Json(listed) = handle_list_runs(State(state), Query(RunListQuery::default()))
            .await
            .unwrap();
        assert_eq!(listed.count, 0);
    }

    #[tokio::test]
    async fn test_run_list_limit_is_validated() {
        let state = app_state(
            Arc::new(MemoryJobStore::default()),
            Arc::new(MemoryExternalLog::default()),
        );
        let result = handle_list_runs(State(state), Query(RunListQuery { limit: Some(0) })).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let state = app_state(
            Arc::new(MemoryJobStore::default()),
            Arc::new(MemoryExternalLog::default()),
        );
        let result = handle_run(State(state), Json(RunRequest { jobs: vec![] })).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
