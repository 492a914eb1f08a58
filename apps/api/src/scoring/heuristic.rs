//! Deterministic keyword scorer. The last tier of the chain; it cannot fail.
//!
//! skills score = |job skills found in the resume| / |job skills| × 100,
//! or 50 when the job names no vocabulary skill. Experience is a flat 50.

use async_trait::async_trait;
use chrono::Utc;

use crate::extraction::skills::{contains_token, find_vocabulary_skills};
use crate::models::analysis::JobAnalysis;
use crate::models::job::JobListing;
use crate::models::profile::CandidateProfile;
use crate::scoring::{MatchAnalyzer, ProviderError};

pub const HEURISTIC_LABEL: &str = "heuristic";

const NEUTRAL_SCORE: f64 = 50.0;

const SOFT_SKILLS: &[&str] = &[
    "communication",
    "leadership",
    "teamwork",
    "problem-solving",
    "collaboration",
    "mentoring",
    "ownership",
];

pub struct HeuristicMatchAnalyzer;

impl HeuristicMatchAnalyzer {
    pub fn score(&self, job: &JobListing, profile: &CandidateProfile) -> JobAnalysis {
        let job_text = job.scoring_text();
        let job_text_lower = job_text.to_lowercase();
        let resume = profile.searchable_text();

        let technical: Vec<String> = find_vocabulary_skills(&job_text)
            .into_iter()
            .map(String::from)
            .collect();
        let (matching, missing): (Vec<String>, Vec<String>) = technical
            .iter()
            .cloned()
            .partition(|skill| contains_token(&resume, &skill.to_lowercase()));

        let soft: Vec<String> = SOFT_SKILLS
            .iter()
            .filter(|s| contains_token(&job_text_lower, s))
            .map(|s| s.to_string())
            .collect();

        let skills_score = if technical.is_empty() {
            NEUTRAL_SCORE
        } else {
            matching.len() as f64 / technical.len() as f64 * 100.0
        };

        let mut recommendations = Vec::new();
        if !missing.is_empty() {
            recommendations.push(format!("Address gaps in: {}", missing.join(", ")));
        }
        recommendations.push("Review job requirements carefully".to_string());
        recommendations.push("Tailor your resume to match".to_string());

        JobAnalysis {
            job_id: job.job_id.clone(),
            tools_technologies: technical.clone(),
            technical_skills: technical,
            soft_skills: soft,
            certifications: Vec::new(),
            overall_match_score: skills_score,
            skills_match_score: skills_score,
            experience_match_score: NEUTRAL_SCORE,
            ai_fit_assessment: format!(
                "Keyword match only: {} of {} technical skills found in the resume",
                matching.len(),
                matching.len() + missing.len()
            ),
            matching_skills: matching,
            missing_skills: missing,
            recommendations,
            ai_summary: "AI analysis unavailable".to_string(),
            interview_tips: vec![
                "Research the company".to_string(),
                "Prepare examples of your work".to_string(),
            ],
            analysis_timestamp: Utc::now(),
            scorer_backend: HEURISTIC_LABEL.to_string(),
        }
    }
}

#[async_trait]
impl MatchAnalyzer for HeuristicMatchAnalyzer {
    fn label(&self) -> &str {
        HEURISTIC_LABEL
    }

    async fn analyze(
        &self,
        job: &JobListing,
        profile: &CandidateProfile,
    ) -> Result<JobAnalysis, ProviderError> {
        Ok(self.score(job, profile))
    }
}
