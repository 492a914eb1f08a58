// Field extraction: scraped text blob + card metadata → JobListing.
// Best effort throughout; a missing section is an empty list or None, never an error.

pub mod experience;
pub mod metadata;
pub mod sections;
pub mod skills;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::job::{ExperienceLevel, JobListing, RESPONSIBILITIES_PLACEHOLDER};

use self::experience::{append_degree_requirement, extract_years, level_from_keywords, years_requirement};
use self::metadata::{job_type_from_text, non_blank, salary_from_text};
use self::sections::{collect_section, MAX_SECTION_ITEMS};

/// Texts shorter than this (after trimming) only get the placeholder fallback.
pub const MIN_TEXT_CHARS: usize = 40;

/// One scraped posting as handed over by the browser collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedJob {
    #[serde(default)]
    pub job_id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub posted_date: Option<String>,
    #[serde(default)]
    pub applicants_count: Option<String>,
    #[serde(default)]
    pub salary_fragment: Option<String>,
    /// Metadata chips shown on the card ("Full-time", "Mid-Senior level", ...).
    #[serde(default)]
    pub badges: Vec<String>,
}

/// Builds a listing from a scraped record.
pub fn extract_job_listing(raw: &ScrapedJob) -> JobListing {
    let mut job = JobListing::new(raw.job_id.trim());
    job.title = raw.title.trim().to_string();
    job.company = raw.company.trim().to_string();
    job.location = raw.location.trim().to_string();
    job.url = non_blank(raw.url.as_deref());
    job.posted_date = non_blank(raw.posted_date.as_deref());
    job.applicants_count = non_blank(raw.applicants_count.as_deref());
    job.description = raw.text.trim().to_string();
    job.job_type = raw
        .badges
        .iter()
        .find_map(|b| job_type_from_text(b))
        .or_else(|| job_type_from_text(&job.title));

    let text = raw.text.trim();
    if text.chars().count() < MIN_TEXT_CHARS {
        debug!("Job {}: text below threshold, using placeholder fields", job.job_id);
        job.responsibilities = vec![RESPONSIBILITIES_PLACEHOLDER.to_string()];
        job.salary_range = non_blank(raw.salary_fragment.as_deref());
        return job;
    }

    job.responsibilities = collect_section(text, &sections::RESPONSIBILITIES, MAX_SECTION_ITEMS);
    if job.responsibilities.is_empty() {
        job.responsibilities = vec![RESPONSIBILITIES_PLACEHOLDER.to_string()];
    }

    let years = extract_years(text);
    job.level = years;
    job.requirements = build_requirements(text, years);
    job.qualifications = collect_section(text, &sections::QUALIFICATIONS, MAX_SECTION_ITEMS);
    job.benefits = collect_section(text, &sections::BENEFITS, MAX_SECTION_ITEMS);

    // Numeric years always win over level keywords.
    job.experience_level = match years {
        Some(y) => Some(ExperienceLevel::from_years(y)),
        None => raw
            .badges
            .iter()
            .find_map(|b| level_from_keywords(b))
            .or_else(|| level_from_keywords(&job.title)),
    };

    job.salary_range =
        non_blank(raw.salary_fragment.as_deref()).or_else(|| salary_from_text(text));
    job.skills = skills::extract_skills(text);

    debug!(
        "Job {}: {} responsibilities, {} requirements, {} skills, years={:?}",
        job.job_id,
        job.responsibilities.len(),
        job.requirements.len(),
        job.skills.len(),
        job.level
    );

    job
}

/// Years entry first, then the scanned requirements region, then a degree
/// line; the whole list is capped afterwards.
fn build_requirements(text: &str, years: Option<u32>) -> Vec<String> {
    let mut requirements = Vec::new();
    if let Some(y) = years {
        requirements.push(years_requirement(y));
    }
    let remaining = MAX_SECTION_ITEMS - requirements.len();
    requirements.extend(collect_section(text, &sections::REQUIREMENTS, remaining));
    append_degree_requirement(text, &mut requirements);
    requirements.truncate(MAX_SECTION_ITEMS);
    requirements
}
