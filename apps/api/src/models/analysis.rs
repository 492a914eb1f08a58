use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::job::{InvalidScore, JobListing};

/// Result of scoring one job against the candidate profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub job_id: String,

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

    pub analysis_timestamp: DateTime<Utc>,
    /// Which tier produced this analysis ("groq", "openai", "heuristic", ...).
    pub scorer_backend: String,
}

impl JobAnalysis {
    /// Writes the score and skill fields back onto the listing.
    ///
    /// Only `resume_match_score`, `keywords` and `skills` are touched.
    pub fn apply_to(&self, job: &mut JobListing) -> Result<(), InvalidScore> {
        job.set_match_score(self.overall_match_score)?;
        job.keywords = self
            .technical_skills
            .iter()
            .chain(self.soft_skills.iter())
            .cloned()
            .collect();
        job.skills = self.technical_skills.clone();
        Ok(())
    }
}
