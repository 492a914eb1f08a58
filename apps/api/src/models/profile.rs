use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::extraction::skills::find_vocabulary_skills;

/// Resume text sent to the AI tiers is truncated to this many characters.
pub const PROMPT_RESUME_CHARS: usize = 3000;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("I/O error reading resume: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("unsupported resume format '{0}' (expected pdf, txt or md)")]
    UnsupportedFormat(String),

    #[error("resume is not valid UTF-8")]
    Encoding,
}

/// The candidate a scoring pass measures jobs against.
///
/// Treated as immutable while a run is in flight; updates replace the whole
/// profile rather than mutating it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub resume_text: String,
    /// Explicit skills first, then skills parsed from the resume text.
    pub skills: Vec<String>,
    /// Skills given directly (config or API), kept apart so a new resume
    /// replaces only the parsed ones.
    #[serde(default)]
    pub explicit_skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

impl CandidateProfile {
    pub fn new(resume_text: impl Into<String>, explicit_skills: Vec<String>) -> Self {
        let resume_text = resume_text.into();
        let explicit_skills = merge_skills(explicit_skills, "");
        let skills = merge_skills(explicit_skills.clone(), &resume_text);
        Self {
            resume_text,
            skills,
            explicit_skills,
            ..Default::default()
        }
    }

    /// Same profile with a new resume. Skills parsed from the previous
    /// resume are dropped; explicit skills and the other sections carry over.
    pub fn with_resume(&self, resume_text: impl Into<String>) -> Self {
        let resume_text = resume_text.into();
        Self {
            skills: merge_skills(self.explicit_skills.clone(), &resume_text),
            resume_text,
            ..self.clone()
        }
    }

    /// Loads a profile from a resume file (PDF, plain text or markdown).
    pub async fn from_file(path: &Path, explicit_skills: Vec<String>) -> Result<Self, ProfileError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let bytes = tokio::fs::read(path).await?;
        let text = resume_text_from_bytes(&extension, bytes).await?;
        info!("Loaded resume from {} ({} chars)", path.display(), text.len());
        Ok(Self::new(text, explicit_skills))
    }

    /// Resume excerpt plus skills, as embedded in scoring prompts.
    pub fn summary(&self) -> String {
        let excerpt: String = self.resume_text.chars().take(PROMPT_RESUME_CHARS).collect();
        let mut summary = format!("Resume:\n{}\n\nKnown Skills:\n{}", excerpt.trim(), self.skills.join(", "));
        if !self.experience.is_empty() {
            summary.push_str(&format!("\n\nExperience:\n{}", self.experience.join("\n")));
        }
        if !self.education.is_empty() {
            summary.push_str(&format!("\n\nEducation:\n{}", self.education.join("\n")));
        }
        if !self.certifications.is_empty() {
            summary.push_str(&format!(
                "\n\nCertifications:\n{}",
                self.certifications.join(", ")
            ));
        }
        summary
    }

    /// Resume text and skills lowercased together, for token lookups.
    pub fn searchable_text(&self) -> String {
        let mut text = self.resume_text.to_lowercase();
        for skill in &self.skills {
            text.push('\n');
            text.push_str(&skill.to_lowercase());
        }
        text
    }
}

/// Decodes an uploaded or on-disk resume. PDF parsing runs on the blocking pool.
pub async fn resume_text_from_bytes(extension: &str, bytes: Vec<u8>) -> Result<String, ProfileError> {
    match extension {
        "pdf" => tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ProfileError::Pdf(e.to_string()))?
            .map_err(|e| ProfileError::Pdf(e.to_string())),
        "txt" | "md" => String::from_utf8(bytes).map_err(|_| ProfileError::Encoding),
        other => Err(ProfileError::UnsupportedFormat(other.to_string())),
    }
}

/// Merges explicit skills with vocabulary skills found in the resume text.
/// Explicit order is kept; parsed skills are appended unless already present
/// (case-insensitive).
pub fn merge_skills(explicit: Vec<String>, resume_text: &str) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(explicit.len());
    for skill in explicit.into_iter().map(|s| s.trim().to_string()) {
        if !skill.is_empty() && !merged.iter().any(|m| m.eq_ignore_ascii_case(&skill)) {
            merged.push(skill);
        }
    }
    for parsed in find_vocabulary_skills(resume_text) {
        if !merged.iter().any(|m| m.eq_ignore_ascii_case(parsed)) {
            merged.push(parsed.to_string());
        }
    }
    merged
}

/// Splits a comma-separated skill list, dropping blanks.
pub fn parse_skill_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
