use serde::{Deserialize, Serialize};

use crate::models::analysis::JobAnalysis;
use crate::models::job::JobListing;

/// Column order of the external log. `Job ID` trails the fifteen
/// human-facing columns and is the column the dedup scan reads.
pub const LOG_HEADERS: [&str; 16] = [
    "Date",
    "Time",
    "Role",
    "Company",
    "Location",
    "Job Type",
    "Level",
    "Link",
    "Job Responsibilities",
    "Preferred Skills",
    "Matching Skills",
    "Role Match %",
    "Salary",
    "Posted",
    "Number of Applicants",
    "Job ID",
];

pub const JOB_ID_COLUMN: usize = 15;

const MAX_LOGGED_RESPONSIBILITIES: usize = 5;
const MAX_PREFERRED_SKILLS: usize = 3;
const MAX_MATCHING_SKILLS: usize = 5;
const DESCRIPTION_EXCERPT_CHARS: usize = 500;
const PREFERRED_SKILL_MARKERS: [&str; 4] = ["skill", "experience", "knowledge", "proficient"];

/// One external log row. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    pub date: String,
    pub time: String,
    pub role: String,
    pub company: String,
    pub location: String,
    pub job_type: String,
    pub level: u32,
    pub link: String,
    pub responsibilities: String,
    pub preferred_skills: String,
    pub matching_skills: String,
    pub role_match: f64,
    pub salary: String,
    pub posted: String,
    pub applicant_count: String,
    pub job_id: String,
}

impl LogRow {
    /// Flattens a listing. Matching skills come from the analysis when one
    /// is at hand, else from the stored match reasons, else from skills.
    pub fn from_listing(job: &JobListing, analysis: Option<&JobAnalysis>) -> Self {
        let responsibilities = if job.responsibilities.is_empty() {
            excerpt(&job.description, DESCRIPTION_EXCERPT_CHARS)
        } else {
            job.responsibilities
                .iter()
                .take(MAX_LOGGED_RESPONSIBILITIES)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n• ")
        };

        let skill_requirements: Vec<&str> = job
            .requirements
            .iter()
            .filter(|r| {
                let r = r.to_lowercase();
                PREFERRED_SKILL_MARKERS.iter().any(|m| r.contains(m))
            })
            .take(MAX_PREFERRED_SKILLS)
            .map(String::as_str)
            .collect();
        let preferred_skills = if skill_requirements.is_empty() {
            job.skills.join(", ")
        } else {
            skill_requirements.join(", ")
        };

        let matching_source = match analysis {
            Some(a) if !a.matching_skills.is_empty() => &a.matching_skills,
            _ if !job.match_reasons.is_empty() => &job.match_reasons,
            _ => &job.skills,
        };
        let matching_skills = matching_source
            .iter()
            .take(MAX_MATCHING_SKILLS)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            date: job.scraped_at.format("%Y-%m-%d").to_string(),
            time: job.scraped_at.format("%H:%M:%S").to_string(),
            role: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            job_type: job.job_type.map(|t| t.to_string()).unwrap_or_default(),
            level: job.level.unwrap_or(0),
            link: job.url.clone().unwrap_or_default(),
            responsibilities,
            preferred_skills,
            matching_skills,
            role_match: job.resume_match_score.unwrap_or(0.0),
            salary: job
                .salary_range
                .clone()
                .unwrap_or_else(|| "Not specified".to_string()),
            posted: job.posted_date.clone().unwrap_or_default(),
            applicant_count: job.applicants_count.clone().unwrap_or_default(),
            job_id: job.job_id.clone(),
        }
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobType;
    use chrono::{TimeZone, Utc};

    fn listing() -> JobListing {
        let mut job = JobListing::new("4021");
        job.title = "Data Engineer".to_string();
        job.company = "Initech".to_string();
        job.location = "Austin, TX".to_string();
        job.url = Some("https://www.linkedin.com/jobs/view/4021".to_string());
        job.scraped_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        job.job_type = Some(JobType::FullTime);
        job.level = Some(4);
        job.responsibilities = vec!["Build pipelines".to_string(), "Own dashboards".to_string()];
        job.requirements = vec![
            "4+ years of experience required".to_string(),
            "Team player".to_string(),
            "Strong SQL knowledge".to_string(),
        ];
        job.skills = vec!["SQL".to_string(), "Python".to_string()];
        job.resume_match_score = Some(67.5);
        job
    }

    #[test]
    fn test_row_fields() {
        let row = LogRow::from_listing(&listing(), None);
        assert_eq!(row.date, "2026-03-14");
        assert_eq!(row.time, "09:26:53");
        assert_eq!(row.job_type, "full-time");
        assert_eq!(row.level, 4);
        assert_eq!(row.responsibilities, "Build pipelines\n• Own dashboards");
        assert_eq!(
            row.preferred_skills,
            "4+ years of experience required, Strong SQL knowledge"
        );
        assert_eq!(row.matching_skills, "SQL, Python");
        assert_eq!(row.role_match, 67.5);
        assert_eq!(row.salary, "Not specified");
        assert_eq!(row.job_id, "4021");
    }

    #[test]
    fn test_analysis_matching_skills_preferred() {
        let mut analysis = crate::scoring::tests::fixed_analysis("4021", "groq", 67.5);
        analysis.matching_skills = vec!["Python".to_string()];
        let row = LogRow::from_listing(&listing(), Some(&analysis));
        assert_eq!(row.matching_skills, "Python");
    }

    #[test]
    fn test_missing_responsibilities_fall_back_to_description() {
        let mut job = listing();
        job.responsibilities.clear();
        job.description = "d".repeat(600);
        job.level = None;
        job.resume_match_score = None;
        let row = LogRow::from_listing(&job, None);
        assert_eq!(row.responsibilities.len(), 503);
        assert!(row.responsibilities.ends_with("..."));
        assert_eq!(row.level, 0);
        assert_eq!(row.role_match, 0.0);
    }

    #[test]
    fn test_headers_match_row_width() {
        assert_eq!(LOG_HEADERS.len(), 16);
        assert_eq!(LOG_HEADERS[JOB_ID_COLUMN], "Job ID");
    }
}
