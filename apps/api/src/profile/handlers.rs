//! Axum route handlers for the candidate profile.

use std::path::Path;

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::profile::{resume_text_from_bytes, CandidateProfile};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub resume_text: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

/// GET /api/v1/profile
pub async fn handle_get_profile(State(state): State<AppState>) -> Json<CandidateProfile> {
    Json(state.profile_snapshot().await.as_ref().clone())
}

/// PUT /api/v1/profile
///
/// Replaces the profile. Omitting `resume_text` keeps the current resume.
pub async fn handle_put_profile(
    State(state): State<AppState>,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<CandidateProfile>, AppError> {
    let current = state.profile_snapshot().await;
    let resume_text = request
        .resume_text
        .unwrap_or_else(|| current.resume_text.clone());

    let mut profile = CandidateProfile::new(resume_text, request.skills);
    profile.experience = request.experience;
    profile.education = request.education;
    profile.certifications = request.certifications;

    let profile = state.replace_profile(profile).await?;
    info!("Profile updated: {} skills", profile.skills.len());
    Ok(Json(profile.as_ref().clone()))
}

/// POST /api/v1/profile/resume
///
/// Multipart upload of a PDF, text or markdown resume in the `resume` field.
/// Explicit skills already on the profile are kept; skills parsed from the
/// previous resume are replaced by those parsed from the new one.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CandidateProfile>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("resume") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
        upload = Some((file_name, data));
    }

    let Some((file_name, data)) = upload else {
        return Err(AppError::Validation("missing 'resume' file field".to_string()));
    };
    if data.is_empty() {
        return Err(AppError::Validation("uploaded resume is empty".to_string()));
    }

    let extension = Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let text = resume_text_from_bytes(&extension, data.to_vec()).await?;

    let current = state.profile_snapshot().await;
    let profile = state.replace_profile(current.with_resume(text)).await?;
    info!(
        "Resume '{file_name}' uploaded ({} chars, {} skills)",
        profile.resume_text.len(),
        profile.skills.len()
    );
    Ok(Json(profile.as_ref().clone()))
}
