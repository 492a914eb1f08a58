use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::AnalysisCache;
use crate::config::Config;
use crate::models::profile::CandidateProfile;
use crate::pipeline::Pipeline;
use crate::sinks::{JobStore, ProfileStore, RunHistory, SinkError};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    /// Backend name only; the cache itself is owned by the pipeline.
    pub cache: Arc<dyn AnalysisCache>,
    pub runs: Arc<dyn RunHistory>,
    pub profiles: Arc<dyn ProfileStore>,
    /// Replaced wholesale on update. Runs hold their own snapshot.
    pub profile: Arc<RwLock<Arc<CandidateProfile>>>,
    pub config: Config,
}

impl AppState {
    pub fn store(&self) -> &Arc<dyn JobStore> {
        self.pipeline.sinks().store()
    }

    pub async fn profile_snapshot(&self) -> Arc<CandidateProfile> {
        self.profile.read().await.clone()
    }

    /// Saves the profile, then swaps it in. A failed save leaves the
    /// current profile in place.
    pub async fn replace_profile(
        &self,
        profile: CandidateProfile,
    ) -> Result<Arc<CandidateProfile>, SinkError> {
        self.profiles.save_profile(&profile).await?;
        let profile = Arc::new(profile);
        *self.profile.write().await = profile.clone();
        Ok(profile)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use crate::cache::MemoryAnalysisCache;
    use crate::pipeline::PipelineSettings;
    use crate::scoring::ScoringChain;
    use crate::sinks::memory::{MemoryExternalLog, MemoryJobStore};
    use crate::sinks::SinkCoordinator;

    /// State over in-memory sinks, heuristic scoring and no record delay.
    pub(crate) fn app_state(store: Arc<MemoryJobStore>, log: Arc<MemoryExternalLog>) -> AppState {
        let cache: Arc<dyn AnalysisCache> = Arc::new(MemoryAnalysisCache::new());
        let settings = PipelineSettings {
            record_delay: std::time::Duration::ZERO,
            ..Default::default()
        };
        let pipeline = Pipeline::new(
            Arc::new(ScoringChain::heuristic_only()),
            cache.clone(),
            SinkCoordinator::new(store.clone(), log),
            settings,
        );
        AppState {
            pipeline,
            cache,
            runs: store.clone(),
            profiles: store,
            profile: Arc::new(RwLock::new(Arc::new(CandidateProfile::default()))),
            config: Config::for_tests(),
        }
    }

    #[tokio::test]
    async fn test_failed_save_keeps_current_profile() {
        let store = Arc::new(MemoryJobStore::default());
        let state = app_state(store.clone(), Arc::new(MemoryExternalLog::default()));

        let saved = state
            .replace_profile(CandidateProfile::new("Go and Kafka", vec![]))
            .await
            .unwrap();
        assert_eq!(store.stored_profile().await.as_ref(), Some(saved.as_ref()));

        store.fail_writes.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(state
            .replace_profile(CandidateProfile::new("Java", vec![]))
            .await
            .is_err());
        assert_eq!(state.profile_snapshot().await.skills, vec!["Kafka", "Go"]);
    }
}
