// Match scoring: ordered AI tiers behind one capability trait, ending in a
// total heuristic tier. The chain never returns an error to its caller.

pub mod heuristic;
pub mod llm_analyzer;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::llm_client::LlmError;
use crate::models::analysis::JobAnalysis;
use crate::models::job::JobListing;
use crate::models::profile::CandidateProfile;

pub use heuristic::{HeuristicMatchAnalyzer, HEURISTIC_LABEL};
pub use llm_analyzer::LlmMatchAnalyzer;

/// Why a tier did not produce an analysis.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{tier} request failed: {source}")]
    Llm {
        tier: String,
        #[source]
        source: LlmError,
    },

    #[error("{tier} returned an invalid analysis: {reason}")]
    InvalidResponse { tier: String, reason: String },

    #[error("{tier} is unavailable: {reason}")]
    Unavailable { tier: String, reason: String },
}

/// One scoring tier. Implement this to add a backend without touching the
/// chain, the pipeline or the handlers.
#[async_trait]
pub trait MatchAnalyzer: Send + Sync {
    /// Short tier name recorded on every analysis it produces.
    fn label(&self) -> &str;

    async fn analyze(
        &self,
        job: &JobListing,
        profile: &CandidateProfile,
    ) -> Result<JobAnalysis, ProviderError>;
}

/// First-success combinator over the configured tiers.
pub struct ScoringChain {
    tiers: Vec<Arc<dyn MatchAnalyzer>>,
    fallback: HeuristicMatchAnalyzer,
}

impl ScoringChain {
    pub fn new(tiers: Vec<Arc<dyn MatchAnalyzer>>) -> Self {
        Self {
            tiers,
            fallback: HeuristicMatchAnalyzer,
        }
    }

    pub fn heuristic_only() -> Self {
        Self::new(Vec::new())
    }

    pub fn tier_labels(&self) -> Vec<String> {
        self.tiers
            .iter()
            .map(|t| t.label().to_string())
            .chain(std::iter::once(HEURISTIC_LABEL.to_string()))
            .collect()
    }

    /// Scores `job` and writes score, keywords and skills back onto it.
    ///
    /// A tier whose analysis cannot be applied (score out of range) is
    /// treated like any other tier failure.
    pub async fn score(&self, job: &mut JobListing, profile: &CandidateProfile) -> JobAnalysis {
        for tier in &self.tiers {
            match tier.analyze(job, profile).await {
                Ok(analysis) => match analysis.apply_to(job) {
                    Ok(()) => {
                        debug!(
                            "Job {} scored by {}: {:.1}",
                            job.job_id,
                            tier.label(),
                            analysis.overall_match_score
                        );
                        return analysis;
                    }
                    Err(e) => warn!("Tier {} failed for job {}: {e}", tier.label(), job.job_id),
                },
                Err(e) => warn!("Tier {} failed for job {}: {e}", tier.label(), job.job_id),
            }
        }

        let analysis = self.fallback.score(job, profile);
        if let Err(e) = analysis.apply_to(job) {
            error!("Heuristic analysis for job {} not applied: {e}", job.job_id);
        }
        debug!(
            "Job {} scored by {}: {:.1}",
            job.job_id, HEURISTIC_LABEL, analysis.overall_match_score
        );
        analysis
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn fixed_analysis(job_id: &str, backend: &str, score: f64) -> JobAnalysis {
        JobAnalysis {
            job_id: job_id.to_string(),
            technical_skills: vec!["Rust".to_string()],
            soft_skills: vec!["ownership".to_string()],
            tools_technologies: vec![],
            certifications: vec![],
            overall_match_score: score,
            skills_match_score: score,
            experience_match_score: score,
            missing_skills: vec![],
            matching_skills: vec!["Rust".to_string()],
            recommendations: vec![],
            ai_summary: "summary".to_string(),
            ai_fit_assessment: "fit".to_string(),
            interview_tips: vec![],
            analysis_timestamp: Utc::now(),
            scorer_backend: backend.to_string(),
        }
    }

    /// Returns a fixed score, or fails every call when `score` is `None`.
    pub(crate) struct StubAnalyzer {
        pub label: &'static str,
        pub score: Option<f64>,
        pub calls: AtomicUsize,
    }

    impl StubAnalyzer {
        pub(crate) fn ok(label: &'static str, score: f64) -> Arc<Self> {
            Arc::new(Self {
                label,
                score: Some(score),
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn failing(label: &'static str) -> Arc<Self> {
            Arc::new(Self {
                label,
                score: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MatchAnalyzer for StubAnalyzer {
        fn label(&self) -> &str {
            self.label
        }

        async fn analyze(
            &self,
            job: &JobListing,
            _profile: &CandidateProfile,
        ) -> Result<JobAnalysis, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.score {
                Some(score) => Ok(fixed_analysis(&job.job_id, self.label, score)),
                None => Err(ProviderError::Unavailable {
                    tier: self.label.to_string(),
                    reason: "stubbed outage".to_string(),
                }),
            }
        }
    }

    pub(crate) fn chain_of(stubs: &[Arc<StubAnalyzer>]) -> ScoringChain {
        ScoringChain::new(
            stubs
                .iter()
                .map(|s| s.clone() as Arc<dyn MatchAnalyzer>)
                .collect(),
        )
    }

    fn job() -> JobListing {
        let mut job = JobListing::new("100");
        job.description = "Rust, Docker and SQL".to_string();
        job
    }

    #[tokio::test]
    async fn test_primary_success_short_circuits() {
        let primary = StubAnalyzer::ok("groq", 88.0);
        let secondary = StubAnalyzer::ok("openai", 10.0);
        let chain = chain_of(&[primary.clone(), secondary.clone()]);

        let mut job = job();
        let analysis = chain.score(&mut job, &CandidateProfile::default()).await;

        assert_eq!(analysis.scorer_backend, "groq");
        assert_eq!(job.resume_match_score, Some(88.0));
        assert_eq!(job.keywords, vec!["Rust", "ownership"]);
        assert_eq!(job.skills, vec!["Rust"]);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_falls_to_secondary() {
        let primary = StubAnalyzer::failing("groq");
        let secondary = StubAnalyzer::ok("openai", 64.0);
        let chain = chain_of(&[primary.clone(), secondary.clone()]);

        let mut job = job();
        let analysis = chain.score(&mut job, &CandidateProfile::default()).await;

        assert_eq!(analysis.scorer_backend, "openai");
        assert_eq!(primary.calls(), 1);
        assert_eq!(job.resume_match_score, Some(64.0));
    }

    #[tokio::test]
    async fn test_all_ai_tiers_failing_uses_heuristic() {
        let chain = chain_of(&[StubAnalyzer::failing("groq"), StubAnalyzer::failing("openai")]);
        let profile = CandidateProfile::new("Rust services", vec![]);

        let mut job = job();
        let analysis = chain.score(&mut job, &profile).await;

        assert_eq!(analysis.scorer_backend, HEURISTIC_LABEL);
        let score = job.resume_match_score.unwrap();
        assert!((0.0..=100.0).contains(&score));
        assert_eq!(job.skills, analysis.technical_skills);
    }

    #[tokio::test]
    async fn test_out_of_range_tier_result_fails_over() {
        let chain = chain_of(&[StubAnalyzer::ok("groq", 140.0), StubAnalyzer::ok("openai", 70.0)]);
        let mut job = job();
        let analysis = chain.score(&mut job, &CandidateProfile::default()).await;
        assert_eq!(analysis.scorer_backend, "openai");
        assert_eq!(job.resume_match_score, Some(70.0));
    }

    #[test]
    fn test_tier_labels_end_with_heuristic() {
        let chain = chain_of(&[StubAnalyzer::ok("groq", 1.0)]);
        assert_eq!(chain.tier_labels(), vec!["groq", "heuristic"]);
    }
}
