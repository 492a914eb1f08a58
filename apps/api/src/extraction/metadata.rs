use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::job::JobType;

static SALARY_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\$\s?\d[\d,]*(?:\.\d+)?(?:\s?[km]\b)?\s*(?:-|–|to)\s*\$\s?\d[\d,]*(?:\.\d+)?(?:\s?[km]\b)?",
    )
        .expect("salary regex is valid")
});

/// Maps badge or title text onto a job type.
pub fn job_type_from_text(text: &str) -> Option<JobType> {
    let t = text.to_lowercase();
    if t.contains("full-time") || t.contains("full time") {
        Some(JobType::FullTime)
    } else if t.contains("part-time") || t.contains("part time") {
        Some(JobType::PartTime)
    } else if t.contains("contract") {
        Some(JobType::Contract)
    } else if t.contains("temporary") {
        Some(JobType::Temporary)
    } else if t.contains("internship") || t.split(|c: char| !c.is_alphanumeric()).any(|w| w == "intern") {
        Some(JobType::Internship)
    } else if t.contains("volunteer") {
        Some(JobType::Volunteer)
    } else {
        None
    }
}

/// First dollar range in the text, e.g. "$120,000 - $150,000" or "$90k to $110k".
pub fn salary_from_text(text: &str) -> Option<String> {
    SALARY_RANGE.find(text).map(|m| m.as_str().trim().to_string())
}

/// Trims a free-text metadata value, mapping blanks to `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_from_badges() {
        assert_eq!(job_type_from_text("Full-time"), Some(JobType::FullTime));
        assert_eq!(job_type_from_text("Part time · Remote"), Some(JobType::PartTime));
        assert_eq!(job_type_from_text("Summer Intern"), Some(JobType::Internship));
        assert_eq!(job_type_from_text("International team"), None);
    }

    #[test]
    fn test_salary_range_in_text() {
        assert_eq!(
            salary_from_text("Pay: $120,000 - $150,000 per year").as_deref(),
            Some("$120,000 - $150,000")
        );
        assert_eq!(salary_from_text("$90k to $110k").as_deref(), Some("$90k to $110k"));
        assert_eq!(salary_from_text("Competitive pay"), None);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  3 days ago ")).as_deref(), Some("3 days ago"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
