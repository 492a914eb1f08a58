use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::llm_client::{LlmClient, LlmError};
use crate::models::analysis::JobAnalysis;
use crate::models::job::JobListing;
use crate::models::profile::CandidateProfile;
use crate::scoring::prompts::{build_match_prompt, match_system_prompt};
use crate::scoring::{MatchAnalyzer, ProviderError};

/// The JSON object every AI tier must return. Missing fields, extra fields
/// and wrong types all fail deserialization, which counts as a provider
/// failure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisPayload {
    pub technical_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub tools_technologies: Vec<String>,
    pub certifications: Vec<String>,
    pub overall_match_score: f64,
    pub skills_match_score: f64,
    pub experience_match_score: f64,
    pub missing_skills: Vec<String>,
    pub matching_skills: Vec<String>,
    pub recommendations: Vec<String>,
    pub ai_summary: String,
    pub ai_fit_assessment: String,
    pub interview_tips: Vec<String>,
}

impl AnalysisPayload {
    /// Scores must already be within 0–100; nothing is clamped here.
    pub fn validate(&self) -> Result<(), String> {
        for (name, score) in [
            ("overall_match_score", self.overall_match_score),
            ("skills_match_score", self.skills_match_score),
            ("experience_match_score", self.experience_match_score),
        ] {
            if !(0.0..=100.0).contains(&score) {
                return Err(format!("{name} = {score} is outside 0-100"));
            }
        }
        Ok(())
    }

    pub fn into_analysis(self, job_id: &str, backend: &str) -> JobAnalysis {
        JobAnalysis {
            job_id: job_id.to_string(),
            technical_skills: self.technical_skills,
            soft_skills: self.soft_skills,
            tools_technologies: self.tools_technologies,
            certifications: self.certifications,
            overall_match_score: self.overall_match_score,
            skills_match_score: self.skills_match_score,
            experience_match_score: self.experience_match_score,
            missing_skills: self.missing_skills,
            matching_skills: self.matching_skills,
            recommendations: self.recommendations,
            ai_summary: self.ai_summary,
            ai_fit_assessment: self.ai_fit_assessment,
            interview_tips: self.interview_tips,
            analysis_timestamp: Utc::now(),
            scorer_backend: backend.to_string(),
        }
    }
}

/// AI tier backed by one provider client.
pub struct LlmMatchAnalyzer {
    client: LlmClient,
}

impl LlmMatchAnalyzer {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MatchAnalyzer for LlmMatchAnalyzer {
    fn label(&self) -> &str {
        self.client.provider().label()
    }

    async fn analyze(
        &self,
        job: &JobListing,
        profile: &CandidateProfile,
    ) -> Result<JobAnalysis, ProviderError> {
        let prompt = build_match_prompt(job, profile);
        let payload: AnalysisPayload = self
            .client
            .call_json(&prompt, &match_system_prompt())
            .await
            .map_err(|e| match e {
                LlmError::Parse(err) => ProviderError::InvalidResponse {
                    tier: self.label().to_string(),
                    reason: err.to_string(),
                },
                other => ProviderError::Llm {
                    tier: self.label().to_string(),
                    source: other,
                },
            })?;

        payload
            .validate()
            .map_err(|reason| ProviderError::InvalidResponse {
                tier: self.label().to_string(),
                reason,
            })?;

        Ok(payload.into_analysis(&job.job_id, self.label()))
    }
}
