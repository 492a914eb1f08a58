//! Axum route handlers over the primary store.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::models::job::{JobListing, JobStatus};
use crate::sinks::{JobFilter, JobStatistics};
use crate::state::AppState;

const DEFAULT_RETENTION_DAYS: u32 = 30;

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobListing>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: JobStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CleanupRequest {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: u64,
    pub older_than_days: u32,
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(filter): Query<JobFilter>,
) -> Result<Json<JobListResponse>, AppError> {
    if filter.min_score.is_some_and(|s| !(0.0..=100.0).contains(&s)) {
        return Err(AppError::Validation("min_score must be within 0-100".to_string()));
    }
    let jobs = state.store().list(&filter).await?;
    Ok(Json(JobListResponse {
        count: jobs.len(),
        jobs,
    }))
}

/// GET /api/v1/jobs/:job_id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobListing>, AppError> {
    state
        .store()
        .find(&job_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("job {job_id}")))
}

/// PUT /api/v1/jobs/:job_id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<JobListing>, AppError> {
    let updated = state
        .store()
        .update_status(&job_id, request.status, request.notes)
        .await?;
    if !updated {
        return Err(AppError::NotFound(format!("job {job_id}")));
    }
    info!("Job {job_id} marked {}", request.status);

    state
        .store()
        .find(&job_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("job {job_id}")))
}

/// GET /api/v1/statistics
pub async fn handle_statistics(
    State(state): State<AppState>,
) -> Result<Json<JobStatistics>, AppError> {
    Ok(Json(state.store().statistics().await?))
}

/// POST /api/v1/cleanup
///
/// Deletes stale jobs that were never saved or applied to.
pub async fn handle_cleanup(
    State(state): State<AppState>,
    request: Option<Json<CleanupRequest>>,
) -> Result<Json<CleanupResponse>, AppError> {
    let days = request
        .and_then(|Json(r)| r.days)
        .unwrap_or(DEFAULT_RETENTION_DAYS);
    if days == 0 {
        return Err(AppError::Validation("days must be at least 1".to_string()));
    }

    let deleted = state.store().purge_stale(days).await?;
    info!("Cleanup removed {deleted} job(s) older than {days} days");
    Ok(Json(CleanupResponse {
        deleted,
        older_than_days: days,
    }))
}
