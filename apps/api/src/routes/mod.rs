pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::pipeline::handlers as pipeline;
use crate::profile::handlers as profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Pipeline
        .route(
            "/api/v1/runs",
            get(pipeline::handle_list_runs).post(pipeline::handle_run),
        )
        .route("/api/v1/runs/:run_id", get(pipeline::handle_get_run))
        .route("/api/v1/extract", post(pipeline::handle_extract))
        .route("/api/v1/log/sync", post(pipeline::handle_log_sync))
        // Stored jobs
        .route("/api/v1/jobs", get(jobs::handle_list_jobs))
        .route("/api/v1/jobs/:job_id", get(jobs::handle_get_job))
        .route(
            "/api/v1/jobs/:job_id/status",
            put(jobs::handle_update_status),
        )
        .route("/api/v1/statistics", get(jobs::handle_statistics))
        .route("/api/v1/cleanup", post(jobs::handle_cleanup))
        // Candidate profile
        .route(
            "/api/v1/profile",
            get(profile::handle_get_profile).put(profile::handle_put_profile),
        )
        .route(
            "/api/v1/profile/resume",
            post(profile::handle_upload_resume),
        )
        .with_state(state)
}
