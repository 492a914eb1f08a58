//! Years-of-experience, seniority and degree inference.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::job::ExperienceLevel;

/// Tried in order; the first pattern with a match wins regardless of where
/// in the text other patterns would have matched.
static YEARS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(\d+)\+?\s*years?\s*(?:of\s*)?(?:experience|exp)",
        r"(\d+)\s*(?:[\-–]|to)\s*\d+\s*years?\s*(?:of\s*)?(?:experience|exp)",
        r"minimum\s*(?:of\s*)?(\d+)\s*years?",
        r"at\s*least\s*(\d+)\s*years?",
        r"(\d+)\s*years?\s*minimum",
        r"requires?\s*(\d+)\s*years?",
        r"(\d+)\s*years?\s*required",
        r"(\d+)\s*years?\s*preferred",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("years pattern is valid"))
    .collect()
});

/// Text ending in the lower half of a range ("3-", "3 – ", "3 to ").
/// A number after it is an upper bound, left to the range pattern.
static RANGE_LOWER_BOUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d[ \t]*(?:[\-–]|to)[ \t]*$").expect("range bound regex is valid")
});

const ENTRY_LEVEL_PHRASES: &[&str] = &[
    "entry level",
    "entry-level",
    "0-2 years",
    "fresh graduate",
    "new graduate",
];

static BACHELOR_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bbachelor|\bb\.?[sa]\.?\s+(?:degree|in)\b").expect("bachelor regex is valid")
});

static MASTER_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bmaster(?:'s|’s|s)?\s+(?:degree|in)\b|\bmba\b|\bm\.?s\.?\s+(?:degree|in)\b")
        .expect("master regex is valid")
});

pub const BACHELOR_REQUIREMENT: &str = "Bachelor's degree required";
pub const MASTER_REQUIREMENT: &str = "Master's degree preferred";

/// Extracts a numeric years-of-experience figure.
///
/// Returns `Some(0)` for entry-level phrasing without a number and `None`
/// when neither is present.
pub fn extract_years(text: &str) -> Option<u32> {
    let lowered = text.to_lowercase();

    for (i, pattern) in YEARS_PATTERNS.iter().enumerate() {
        // the first pattern would otherwise read a range's upper bound
        let years = pattern
            .captures_iter(&lowered)
            .filter_map(|caps| caps.get(1))
            .find(|m| i > 0 || !RANGE_LOWER_BOUND.is_match(&lowered[..m.start()]))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        if years.is_some() {
            return years;
        }
    }

    if ENTRY_LEVEL_PHRASES.iter().any(|p| lowered.contains(p)) {
        return Some(0);
    }

    None
}

/// The synthetic requirement line recorded for an extracted years figure.
pub fn years_requirement(years: u32) -> String {
    format!("{years}+ years of experience required")
}

/// Appends a synthetic degree requirement when the text names a degree that
/// no existing requirement already covers. Bachelor's takes precedence;
/// entries are only ever appended.
pub fn append_degree_requirement(text: &str, requirements: &mut Vec<String>) {
    let lowered = text.to_lowercase();
    let mentions_degree = requirements.iter().any(|r| {
        let r = r.to_lowercase();
        r.contains("degree") || r.contains("bachelor") || r.contains("master")
    });
    if mentions_degree {
        return;
    }

    if BACHELOR_MARKER.is_match(&lowered) {
        requirements.push(BACHELOR_REQUIREMENT.to_string());
    } else if MASTER_MARKER.is_match(&lowered) {
        requirements.push(MASTER_REQUIREMENT.to_string());
    }
}

/// Keyword-based seniority, used only when no numeric years are available.
pub fn level_from_keywords(text: &str) -> Option<ExperienceLevel> {
    let t = format!(" {} ", text.to_lowercase());

    if t.contains("entry") || t.contains("junior") || t.contains(" jr. ") || t.contains(" jr ") {
        Some(ExperienceLevel::Entry)
    } else if t.contains("associate") {
        Some(ExperienceLevel::Associate)
    } else if t.contains("mid-senior") || t.contains("mid senior") {
        Some(ExperienceLevel::MidSenior)
    } else if t.contains("senior") || t.contains(" sr. ") || t.contains(" sr ") {
        Some(ExperienceLevel::MidSenior)
    } else if t.contains(" vp ") || t.contains("vice president") || t.contains("executive") {
        Some(ExperienceLevel::Executive)
    } else if t.contains("director")
        || t.contains(" lead ")
        || t.contains("principal")
        || t.contains("manager")
    {
        Some(ExperienceLevel::Director)
    } else {
        None
    }
}
