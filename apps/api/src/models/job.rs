use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when no responsibilities section could be located.
pub const RESPONSIBILITIES_PLACEHOLDER: &str = "See job posting for full responsibilities";

/// Employment type advertised on the posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
    Volunteer,
    Other,
}

/// Seniority bucket, either mapped from numeric years or inferred from keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExperienceLevel {
    Entry,
    Associate,
    MidSenior,
    Director,
    Executive,
}

/// Application status, owned by the user once a job is tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    #[default]
    New,
    Viewed,
    Saved,
    Applied,
    Interviewing,
    Rejected,
    Offer,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(JobType, "job type", {
    FullTime => "full-time",
    PartTime => "part-time",
    Contract => "contract",
    Temporary => "temporary",
    Internship => "internship",
    Volunteer => "volunteer",
    Other => "other",
});

string_enum!(ExperienceLevel, "experience level", {
    Entry => "entry",
    Associate => "associate",
    MidSenior => "mid-senior",
    Director => "director",
    Executive => "executive",
});

string_enum!(JobStatus, "job status", {
    New => "new",
    Viewed => "viewed",
    Saved => "saved",
    Applied => "applied",
    Interviewing => "interviewing",
    Rejected => "rejected",
    Offer => "offer",
});

impl ExperienceLevel {
    /// Strict numeric mapping: 0–2 entry, 3–5 associate, 6–8 mid-senior,
    /// 9–12 director, anything above executive.
    pub fn from_years(years: u32) -> Self {
        match years {
            0..=2 => ExperienceLevel::Entry,
            3..=5 => ExperienceLevel::Associate,
            6..=8 => ExperienceLevel::MidSenior,
            9..=12 => ExperienceLevel::Director,
            _ => ExperienceLevel::Executive,
        }
    }
}

/// A single tracked job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: Option<String>,

    pub description: String,
    pub requirements: Vec<String>,
    pub qualifications: Vec<String>,
    pub responsibilities: Vec<String>,
    pub benefits: Vec<String>,

    pub job_type: Option<JobType>,
    pub experience_level: Option<ExperienceLevel>,
    /// Years of experience as a number, when the posting states one.
    pub level: Option<u32>,
    pub salary_range: Option<String>,

    pub posted_date: Option<String>,
    pub applicants_count: Option<String>,

    pub scraped_at: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
    pub source: String,
    pub status: JobStatus,

    pub keywords: Vec<String>,
    pub skills: Vec<String>,
    /// 0–100 when present.
    pub resume_match_score: Option<f64>,
    pub match_reasons: Vec<String>,

    pub notes: Option<String>,
    pub tags: Vec<String>,
}

impl JobListing {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            title: String::new(),
            company: String::new(),
            location: String::new(),
            url: None,
            description: String::new(),
            requirements: Vec::new(),
            qualifications: Vec::new(),
            responsibilities: Vec::new(),
            benefits: Vec::new(),
            job_type: None,
            experience_level: None,
            level: None,
            salary_range: None,
            posted_date: None,
            applicants_count: None,
            scraped_at: Utc::now(),
            last_updated: None,
            source: "LinkedIn".to_string(),
            status: JobStatus::New,
            keywords: Vec::new(),
            skills: Vec::new(),
            resume_match_score: None,
            match_reasons: Vec::new(),
            notes: None,
            tags: Vec::new(),
        }
    }

    /// Sets the match score, rejecting values outside 0–100.
    pub fn set_match_score(&mut self, score: f64) -> Result<(), InvalidScore> {
        if !(0.0..=100.0).contains(&score) {
            return Err(InvalidScore(score));
        }
        self.resume_match_score = Some(score);
        Ok(())
    }

    /// Text the scorers read: title, description and every parsed section.
    pub fn scoring_text(&self) -> String {
        let mut text = String::with_capacity(self.description.len() + 256);
        text.push_str(&self.title);
        text.push('\n');
        text.push_str(&self.description);
        for section in [&self.requirements, &self.qualifications, &self.responsibilities] {
            for line in section {
                text.push('\n');
                text.push_str(line);
            }
        }
        text
    }

    pub fn has_placeholder_responsibilities(&self) -> bool {
        self.responsibilities.len() == 1 && self.responsibilities[0] == RESPONSIBILITIES_PLACEHOLDER
    }
}

#[derive(Debug, thiserror::Error)]
#[error("match score {0} is outside 0-100")]
pub struct InvalidScore(pub f64);
