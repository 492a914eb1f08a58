use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use super::{
    JobFilter, JobSort, JobStatistics, JobStore, ProfileStore, RunHistory, SinkError,
    HIGH_MATCH_THRESHOLD,
};
use crate::models::job::{JobListing, JobStatus};
use crate::models::profile::CandidateProfile;
use crate::models::run::RunSummary;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id                  BIGSERIAL PRIMARY KEY,
        job_id              TEXT NOT NULL,
        title               TEXT NOT NULL,
        company             TEXT NOT NULL,
        location            TEXT NOT NULL,
        url                 TEXT,
        description         TEXT NOT NULL DEFAULT '',
        requirements        TEXT[] NOT NULL DEFAULT '{}',
        qualifications      TEXT[] NOT NULL DEFAULT '{}',
        responsibilities    TEXT[] NOT NULL DEFAULT '{}',
        benefits            TEXT[] NOT NULL DEFAULT '{}',
        job_type            TEXT,
        experience_level    TEXT,
        level               INTEGER,
        salary_range        TEXT,
        posted_date         TEXT,
        applicants_count    TEXT,
        scraped_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        last_updated        TIMESTAMPTZ,
        source              TEXT NOT NULL DEFAULT 'LinkedIn',
        status              TEXT NOT NULL DEFAULT 'new',
        keywords            TEXT[] NOT NULL DEFAULT '{}',
        skills              TEXT[] NOT NULL DEFAULT '{}',
        resume_match_score  DOUBLE PRECISION,
        match_reasons       TEXT[] NOT NULL DEFAULT '{}',
        notes               TEXT,
        tags                TEXT[] NOT NULL DEFAULT '{}'
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS jobs_job_id_key ON jobs (job_id)",
    "CREATE INDEX IF NOT EXISTS jobs_score_idx ON jobs (resume_match_score DESC NULLS LAST)",
    "CREATE INDEX IF NOT EXISTS jobs_scraped_at_idx ON jobs (scraped_at)",
    r#"
    CREATE TABLE IF NOT EXISTS runs (
        run_id              UUID PRIMARY KEY,
        started_at          TIMESTAMPTZ NOT NULL,
        finished_at         TIMESTAMPTZ NOT NULL,
        duration_seconds    DOUBLE PRECISION NOT NULL,
        total               BIGINT NOT NULL,
        inserted            BIGINT NOT NULL,
        merged              BIGINT NOT NULL,
        appended            BIGINT NOT NULL,
        log_duplicates      BIGINT NOT NULL,
        failed              BIGINT NOT NULL,
        cache_hits          BIGINT NOT NULL,
        high_matches        BIGINT NOT NULL,
        tier_counts         JSONB NOT NULL DEFAULT '{}'
    )
    "#,
    "CREATE INDEX IF NOT EXISTS runs_started_at_idx ON runs (started_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS candidate_profile (
        id                  SMALLINT PRIMARY KEY CHECK (id = 1),
        resume_text         TEXT NOT NULL DEFAULT '',
        explicit_skills     TEXT[] NOT NULL DEFAULT '{}',
        skills              TEXT[] NOT NULL DEFAULT '{}',
        experience          TEXT[] NOT NULL DEFAULT '{}',
        education           TEXT[] NOT NULL DEFAULT '{}',
        certifications      TEXT[] NOT NULL DEFAULT '{}',
        updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

const RUN_COLUMNS: &str = "run_id, started_at, finished_at, duration_seconds, total, inserted, \
    merged, appended, log_duplicates, failed, cache_hits, high_matches, tier_counts";

const COLUMNS: &str = "job_id, title, company, location, url, description, requirements, \
    qualifications, responsibilities, benefits, job_type, experience_level, level, salary_range, \
    posted_date, applicants_count, scraped_at, last_updated, source, status, keywords, skills, \
    resume_match_score, match_reasons, notes, tags";

#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
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
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub level: Option<i32>,
    pub salary_range: Option<String>,
    pub posted_date: Option<String>,
    pub applicants_count: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
    pub source: String,
    pub status: String,
    pub keywords: Vec<String>,
    pub skills: Vec<String>,
    pub resume_match_score: Option<f64>,
    pub match_reasons: Vec<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

impl TryFrom<JobRow> for JobListing {
    type Error = SinkError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::models::job::ParseEnumError| {
            SinkError::Corrupt(format!("job {}: {e}", row.job_id))
        };
        let job_type = row.job_type.as_deref().map(str::parse).transpose().map_err(corrupt)?;
        let experience_level = row
            .experience_level
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(corrupt)?;
        let status = row.status.parse().map_err(corrupt)?;

        Ok(JobListing {
            job_id: row.job_id,
            title: row.title,
            company: row.company,
            location: row.location,
            url: row.url,
            description: row.description,
            requirements: row.requirements,
            qualifications: row.qualifications,
            responsibilities: row.responsibilities,
            benefits: row.benefits,
            job_type,
            experience_level,
            level: row.level.and_then(|l| u32::try_from(l).ok()),
            salary_range: row.salary_range,
            posted_date: row.posted_date,
            applicants_count: row.applicants_count,
            scraped_at: row.scraped_at,
            last_updated: row.last_updated,
            source: row.source,
            status,
            keywords: row.keywords,
            skills: row.skills,
            resume_match_score: row.resume_match_score,
            match_reasons: row.match_reasons,
            notes: row.notes,
            tags: row.tags,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RunRow {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub total: i64,
    pub inserted: i64,
    pub merged: i64,
    pub appended: i64,
    pub log_duplicates: i64,
    pub failed: i64,
    pub cache_hits: i64,
    pub high_matches: i64,
    pub tier_counts: Json<BTreeMap<String, i64>>,
}

impl From<RunRow> for RunSummary {
    fn from(row: RunRow) -> Self {
        RunSummary {
            run_id: row.run_id,
            started_at: row.started_at,
            finished_at: row.finished_at,
            duration_seconds: row.duration_seconds,
            total: row.total,
            inserted: row.inserted,
            merged: row.merged,
            appended: row.appended,
            log_duplicates: row.log_duplicates,
            failed: row.failed,
            cache_hits: row.cache_hits,
            high_matches: row.high_matches,
            tier_counts: row.tier_counts.0,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub resume_text: String,
    pub explicit_skills: Vec<String>,
    pub skills: Vec<String>,
    pub experience: Vec<String>,
    pub education: Vec<String>,
    pub certifications: Vec<String>,
}

impl From<ProfileRow> for CandidateProfile {
    fn from(row: ProfileRow) -> Self {
        CandidateProfile {
            resume_text: row.resume_text,
            skills: row.skills,
            explicit_skills: row.explicit_skills,
            experience: row.experience,
            education: row.education,
            certifications: row.certifications,
        }
    }
}

/// `%term%` for ILIKE, with the pattern metacharacters in `term` escaped.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Primary store on PostgreSQL.
#[derive(Clone)]
pub struct PgJobStore {
    db: PgPool,
}

impl PgJobStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Creates the jobs, runs and profile tables and their indexes when missing.
    pub async fn ensure_schema(&self) -> Result<(), SinkError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.db).await?;
        }
        info!("jobs, runs and profile schema ready");
        Ok(())
    }
}

/// Binds every column of `job` in `COLUMNS` order.
fn push_job_values(b: &mut QueryBuilder<'_, Postgres>, job: &JobListing) {
    let mut sep = b.separated(", ");
    sep.push_bind(job.job_id.clone())
        .push_bind(job.title.clone())
        .push_bind(job.company.clone())
        .push_bind(job.location.clone())
        .push_bind(job.url.clone())
        .push_bind(job.description.clone())
        .push_bind(job.requirements.clone())
        .push_bind(job.qualifications.clone())
        .push_bind(job.responsibilities.clone())
        .push_bind(job.benefits.clone())
        .push_bind(job.job_type.map(|t| t.as_str()))
        .push_bind(job.experience_level.map(|l| l.as_str()))
        .push_bind(job.level.and_then(|l| i32::try_from(l).ok()))
        .push_bind(job.salary_range.clone())
        .push_bind(job.posted_date.clone())
        .push_bind(job.applicants_count.clone())
        .push_bind(job.scraped_at)
        .push_bind(job.last_updated)
        .push_bind(job.source.clone())
        .push_bind(job.status.as_str())
        .push_bind(job.keywords.clone())
        .push_bind(job.skills.clone())
        .push_bind(job.resume_match_score)
        .push_bind(job.match_reasons.clone())
        .push_bind(job.notes.clone())
        .push_bind(job.tags.clone());
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find(&self, job_id: &str) -> Result<Option<JobListing>, SinkError> {
        let row: Option<JobRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM jobs WHERE job_id = $1"))
                .bind(job_id)
                .fetch_optional(&self.db)
                .await?;
        row.map(JobListing::try_from).transpose()
    }

    async fn insert(&self, job: &JobListing) -> Result<(), SinkError> {
        let mut b = QueryBuilder::<Postgres>::new(format!("INSERT INTO jobs ({COLUMNS}) VALUES ("));
        push_job_values(&mut b, job);
        b.push(")");
        b.build().execute(&self.db).await?;
        Ok(())
    }

    async fn update(&self, job: &JobListing) -> Result<(), SinkError> {
        let mut b = QueryBuilder::<Postgres>::new(format!("UPDATE jobs SET ({COLUMNS}) = ROW("));
        push_job_values(&mut b, job);
        b.push(") WHERE job_id = ");
        b.push_bind(job.job_id.clone());
        b.build().execute(&self.db).await?;
        Ok(())
    }

    async fn list(&self, filter: &JobFilter) -> Result<Vec<JobListing>, SinkError> {
        let mut b = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM jobs WHERE TRUE"));
        if let Some(status) = filter.status {
            b.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(min) = filter.min_score {
            b.push(" AND resume_match_score >= ").push_bind(min);
        }
        if let Some(q) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = contains_pattern(q.trim());
            b.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(company) = filter.company.as_deref() {
            b.push(" AND company ILIKE ").push_bind(contains_pattern(company));
        }
        if let Some(location) = filter.location.as_deref() {
            b.push(" AND location ILIKE ").push_bind(contains_pattern(location));
        }
        b.push(match filter.sort {
            JobSort::Score => " ORDER BY resume_match_score DESC NULLS LAST, scraped_at DESC",
            JobSort::Newest => " ORDER BY scraped_at DESC",
        });
        b.push(" LIMIT ")
            .push_bind(filter.page_size())
            .push(" OFFSET ")
            .push_bind(filter.page_offset());

        let rows: Vec<JobRow> = b.build_query_as().fetch_all(&self.db).await?;
        rows.into_iter().map(JobListing::try_from).collect()
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        notes: Option<String>,
    ) -> Result<bool, SinkError> {
        let result = sqlx::query(
            "UPDATE jobs SET status = $2, notes = COALESCE($3, notes), last_updated = NOW() \
             WHERE job_id = $1",
        )
        .bind(job_id)
        .bind(status.as_str())
        .bind(notes)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn statistics(&self) -> Result<JobStatistics, SinkError> {
        let (total_jobs, applied_jobs, high_match_jobs, average_match_score): (
            i64,
            i64,
            i64,
            Option<f64>,
        ) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'applied'),
                COUNT(*) FILTER (WHERE resume_match_score >= $1),
                AVG(resume_match_score)
            FROM jobs
            "#,
        )
        .bind(HIGH_MATCH_THRESHOLD)
        .fetch_one(&self.db)
        .await?;

        Ok(JobStatistics {
            total_jobs,
            applied_jobs,
            high_match_jobs,
            average_match_score,
        })
    }

    async fn purge_stale(&self, days: u32) -> Result<u64, SinkError> {
        let days = i32::try_from(days).unwrap_or(i32::MAX);
        let result = sqlx::query(
            "DELETE FROM jobs \
             WHERE scraped_at < NOW() - make_interval(days => $1) \
               AND status NOT IN ('applied', 'saved')",
        )
        .bind(days)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RunHistory for PgJobStore {
    async fn record_run(&self, run: &RunSummary) -> Result<(), SinkError> {
        sqlx::query(&format!(
            "INSERT INTO runs ({RUN_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(run.run_id)
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.duration_seconds)
        .bind(run.total)
        .bind(run.inserted)
        .bind(run.merged)
        .bind(run.appended)
        .bind(run.log_duplicates)
        .bind(run.failed)
        .bind(run.cache_hits)
        .bind(run.high_matches)
        .bind(Json(&run.tier_counts))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find_run(&self, run_id: Uuid) -> Result<Option<RunSummary>, SinkError> {
        let row: Option<RunRow> =
            sqlx::query_as(&format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_id = $1"))
                .bind(run_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(row.map(RunSummary::from))
    }

    async fn recent_runs(&self, limit: i64) -> Result<Vec<RunSummary>, SinkError> {
        let rows: Vec<RunRow> = sqlx::query_as(&format!(
            "SELECT {RUN_COLUMNS} FROM runs ORDER BY started_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(RunSummary::from).collect())
    }
}

#[async_trait]
impl ProfileStore for PgJobStore {
    async fn load_profile(&self) -> Result<Option<CandidateProfile>, SinkError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT resume_text, explicit_skills, skills, experience, education, certifications \
             FROM candidate_profile WHERE id = 1",
        )
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(CandidateProfile::from))
    }

    async fn save_profile(&self, profile: &CandidateProfile) -> Result<(), SinkError> {
        sqlx::query(
            r#"
            INSERT INTO candidate_profile
                (id, resume_text, explicit_skills, skills, experience, education, certifications, updated_at)
            VALUES (1, $1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (id) DO UPDATE SET
                resume_text = EXCLUDED.resume_text,
                explicit_skills = EXCLUDED.explicit_skills,
                skills = EXCLUDED.skills,
                experience = EXCLUDED.experience,
                education = EXCLUDED.education,
                certifications = EXCLUDED.certifications,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&profile.resume_text)
        .bind(&profile.explicit_skills)
        .bind(&profile.skills)
        .bind(&profile.experience)
        .bind(&profile.education)
        .bind(&profile.certifications)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{ExperienceLevel, JobType};

    fn row() -> JobRow {
        JobRow {
            job_id: "881".to_string(),
            title: "SRE".to_string(),
            company: "Globex".to_string(),
            location: "Remote".to_string(),
            url: None,
            description: String::new(),
            requirements: vec![],
            qualifications: vec![],
            responsibilities: vec![],
            benefits: vec![],
            job_type: Some("contract".to_string()),
            experience_level: Some("mid-senior".to_string()),
            level: Some(7),
            salary_range: None,
            posted_date: None,
            applicants_count: None,
            scraped_at: Utc::now(),
            last_updated: None,
            source: "LinkedIn".to_string(),
            status: "interviewing".to_string(),
            keywords: vec![],
            skills: vec!["Go".to_string()],
            resume_match_score: Some(91.0),
            match_reasons: vec![],
            notes: None,
            tags: vec![],
        }
    }

    #[test]
    fn test_row_converts_enums() {
        let job = JobListing::try_from(row()).unwrap();
        assert_eq!(job.job_type, Some(JobType::Contract));
        assert_eq!(job.experience_level, Some(ExperienceLevel::MidSenior));
        assert_eq!(job.status, JobStatus::Interviewing);
        assert_eq!(job.level, Some(7));
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let mut bad = row();
        bad.status = "ghosted".to_string();
        assert!(matches!(JobListing::try_from(bad), Err(SinkError::Corrupt(_))));
    }

    #[test]
    fn test_negative_level_dropped() {
        let mut odd = row();
        odd.level = Some(-3);
        assert_eq!(JobListing::try_from(odd).unwrap().level, None);
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Acme"), "%Acme%");
        assert_eq!(contains_pattern("100%_remote"), "%100\\%\\_remote%");
        assert_eq!(contains_pattern(r"C:\jobs"), r"%C:\\jobs%");
    }

    #[test]
    fn test_run_row_converts_tier_counts() {
        let started_at = Utc::now();
        let row = RunRow {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: started_at,
            duration_seconds: 0.0,
            total: 3,
            inserted: 2,
            merged: 1,
            appended: 2,
            log_duplicates: 1,
            failed: 0,
            cache_hits: 1,
            high_matches: 1,
            tier_counts: Json(BTreeMap::from([("groq".to_string(), 2)])),
        };
        let summary = RunSummary::from(row);
        assert_eq!(summary.tier_counts.get("groq"), Some(&2));
        assert_eq!(summary.inserted, 2);
    }

    #[test]
    fn test_schema_has_single_profile_row() {
        assert!(SCHEMA
            .iter()
            .any(|s| s.contains("candidate_profile") && s.contains("CHECK (id = 1)")));
    }

    #[test]
    fn test_schema_has_unique_job_id() {
        assert!(SCHEMA.iter().any(|s| s.contains("UNIQUE INDEX") && s.contains("(job_id)")));
    }
}
