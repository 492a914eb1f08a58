//! Field-level merge of an incoming listing into the stored one.
//!
//! Every field except `job_id` and `last_updated` has exactly one entry in
//! [`MERGE_POLICY`]; `last_updated` is always refreshed.

use chrono::{DateTime, Utc};

use crate::models::job::{JobListing, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Incoming value replaces the stored one, even when empty.
    AlwaysOverwrite,
    /// Incoming value replaces the stored one only when non-empty.
    OverwriteIfNonEmpty,
    /// Owned by the stored record (user edits, first-seen metadata).
    KeepStored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobField {
    Title,
    Company,
    Location,
    Url,
    Description,
    Requirements,
    Qualifications,
    Responsibilities,
    Benefits,
    JobType,
    ExperienceLevel,
    Level,
    SalaryRange,
    PostedDate,
    ApplicantsCount,
    ResumeMatchScore,
    Keywords,
    Skills,
    MatchReasons,
    Status,
    Notes,
    Tags,
    ScrapedAt,
    Source,
}

pub const MERGE_POLICY: &[(JobField, MergeRule)] = &[
    (JobField::Title, MergeRule::AlwaysOverwrite),
    (JobField::Company, MergeRule::AlwaysOverwrite),
    (JobField::Location, MergeRule::AlwaysOverwrite),
    (JobField::Url, MergeRule::OverwriteIfNonEmpty),
    (JobField::Description, MergeRule::OverwriteIfNonEmpty),
    (JobField::Requirements, MergeRule::OverwriteIfNonEmpty),
    (JobField::Qualifications, MergeRule::OverwriteIfNonEmpty),
    (JobField::Responsibilities, MergeRule::OverwriteIfNonEmpty),
    (JobField::Benefits, MergeRule::OverwriteIfNonEmpty),
    (JobField::JobType, MergeRule::OverwriteIfNonEmpty),
    (JobField::ExperienceLevel, MergeRule::OverwriteIfNonEmpty),
    (JobField::Level, MergeRule::OverwriteIfNonEmpty),
    (JobField::SalaryRange, MergeRule::OverwriteIfNonEmpty),
    (JobField::PostedDate, MergeRule::OverwriteIfNonEmpty),
    (JobField::ApplicantsCount, MergeRule::OverwriteIfNonEmpty),
    (JobField::ResumeMatchScore, MergeRule::OverwriteIfNonEmpty),
    (JobField::Keywords, MergeRule::OverwriteIfNonEmpty),
    (JobField::Skills, MergeRule::OverwriteIfNonEmpty),
    (JobField::MatchReasons, MergeRule::KeepStored),
    (JobField::Status, MergeRule::KeepStored),
    (JobField::Notes, MergeRule::KeepStored),
    (JobField::Tags, MergeRule::KeepStored),
    (JobField::ScrapedAt, MergeRule::KeepStored),
    (JobField::Source, MergeRule::KeepStored),
];

trait Mergeable: Clone {
    fn is_blank(&self) -> bool;
}

impl Mergeable for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Mergeable for Vec<String> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Clone> Mergeable for Option<T> {
    fn is_blank(&self) -> bool {
        self.is_none()
    }
}

impl Mergeable for JobStatus {
    fn is_blank(&self) -> bool {
        false
    }
}

impl Mergeable for DateTime<Utc> {
    fn is_blank(&self) -> bool {
        false
    }
}

fn merge_value<T: Mergeable>(rule: MergeRule, stored: &mut T, incoming: &T) {
    match rule {
        MergeRule::AlwaysOverwrite => *stored = incoming.clone(),
        MergeRule::OverwriteIfNonEmpty if !incoming.is_blank() => *stored = incoming.clone(),
        MergeRule::OverwriteIfNonEmpty | MergeRule::KeepStored => {}
    }
}

fn merge_field(field: JobField, rule: MergeRule, stored: &mut JobListing, incoming: &JobListing) {
    match field {
        JobField::Title => merge_value(rule, &mut stored.title, &incoming.title),
        JobField::Company => merge_value(rule, &mut stored.company, &incoming.company),
        JobField::Location => merge_value(rule, &mut stored.location, &incoming.location),
        JobField::Url => merge_value(rule, &mut stored.url, &incoming.url),
        JobField::Description => merge_value(rule, &mut stored.description, &incoming.description),
        JobField::Requirements => merge_value(rule, &mut stored.requirements, &incoming.requirements),
        JobField::Qualifications => {
            merge_value(rule, &mut stored.qualifications, &incoming.qualifications)
        }
        JobField::Responsibilities => {
            // A placeholder never replaces real responsibilities.
            if incoming.has_placeholder_responsibilities() && !stored.responsibilities.is_empty() {
                return;
            }
            merge_value(rule, &mut stored.responsibilities, &incoming.responsibilities)
        }
        JobField::Benefits => merge_value(rule, &mut stored.benefits, &incoming.benefits),
        JobField::JobType => merge_value(rule, &mut stored.job_type, &incoming.job_type),
        JobField::ExperienceLevel => {
            merge_value(rule, &mut stored.experience_level, &incoming.experience_level)
        }
        JobField::Level => merge_value(rule, &mut stored.level, &incoming.level),
        JobField::SalaryRange => merge_value(rule, &mut stored.salary_range, &incoming.salary_range),
        JobField::PostedDate => merge_value(rule, &mut stored.posted_date, &incoming.posted_date),
        JobField::ApplicantsCount => {
            merge_value(rule, &mut stored.applicants_count, &incoming.applicants_count)
        }
        JobField::ResumeMatchScore => {
            merge_value(rule, &mut stored.resume_match_score, &incoming.resume_match_score)
        }
        JobField::Keywords => merge_value(rule, &mut stored.keywords, &incoming.keywords),
        JobField::Skills => merge_value(rule, &mut stored.skills, &incoming.skills),
        JobField::MatchReasons => merge_value(rule, &mut stored.match_reasons, &incoming.match_reasons),
        JobField::Status => merge_value(rule, &mut stored.status, &incoming.status),
        JobField::Notes => merge_value(rule, &mut stored.notes, &incoming.notes),
        JobField::Tags => merge_value(rule, &mut stored.tags, &incoming.tags),
        JobField::ScrapedAt => merge_value(rule, &mut stored.scraped_at, &incoming.scraped_at),
        JobField::Source => merge_value(rule, &mut stored.source, &incoming.source),
    }
}

/// Applies [`MERGE_POLICY`] field by field and stamps `last_updated`.
pub fn merge_into(stored: &mut JobListing, incoming: &JobListing, now: DateTime<Utc>) {
    for &(field, rule) in MERGE_POLICY {
        merge_field(field, rule, stored, incoming);
    }
    stored.last_updated = Some(now);
}
