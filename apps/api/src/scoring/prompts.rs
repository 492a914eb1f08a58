// Prompts for the AI scoring tiers. Every AI tier receives the same prompt
// and must answer with the same JSON shape, which keeps tiers interchangeable.

use crate::llm_client::prompts::{join_or_none, JSON_ONLY_SYSTEM};
use crate::models::job::JobListing;
use crate::models::profile::CandidateProfile;

pub fn match_system_prompt() -> String {
    format!("You are an expert career advisor and resume analyst. {JSON_ONLY_SYSTEM}")
}

/// Job fields plus the profile summary, followed by the required response shape.
pub fn build_match_prompt(job: &JobListing, profile: &CandidateProfile) -> String {
    let job_type = job.job_type.map(|t| t.to_string());
    let level = job.experience_level.map(|l| l.to_string());

    format!(
        r#"Analyze the job-candidate fit.

JOB DETAILS:
Title: {title}
Company: {company}
Location: {location}
Type: {job_type}
Experience Level: {level}

Description:
{description}

Requirements:
{requirements}

Qualifications:
{qualifications}

Responsibilities:
{responsibilities}

CANDIDATE PROFILE:
{profile}

Return ONLY a JSON object with exactly these fields:
{{
  "technical_skills": [string],
  "soft_skills": [string],
  "tools_technologies": [string],
  "certifications": [string],
  "overall_match_score": number 0-100,
  "skills_match_score": number 0-100,
  "experience_match_score": number 0-100,
  "missing_skills": [string],
  "matching_skills": [string],
  "recommendations": [3-5 actionable recommendations],
  "ai_summary": "brief job summary, about 100 words",
  "ai_fit_assessment": "assessment of candidate fit, about 100 words",
  "interview_tips": [3-5 interview preparation tips]
}}

Be specific and accurate in your scoring."#,
        title = job.title,
        company = job.company,
        location = job.location,
        job_type = job_type.as_deref().unwrap_or("Not specified"),
        level = level.as_deref().unwrap_or("Not specified"),
        description = job.description,
        requirements = join_or_none(&job.requirements),
        qualifications = join_or_none(&job.qualifications),
        responsibilities = join_or_none(&job.responsibilities),
        profile = profile.summary(),
    )
}
