// Candidate profile API. The profile is swapped atomically; a run in flight
// keeps the snapshot it started with.

pub mod handlers;

use std::path::Path;

use tracing::{info, warn};

use crate::models::profile::CandidateProfile;
use crate::sinks::ProfileStore;

/// Startup profile. A profile saved in the primary store wins; otherwise it
/// is built from the resume file and explicit skills. An unreadable store or
/// resume is logged and skipped.
pub async fn initial_profile(
    stored: &dyn ProfileStore,
    resume_path: Option<&Path>,
    skills: Vec<String>,
) -> CandidateProfile {
    match stored.load_profile().await {
        Ok(Some(profile)) => {
            info!("Profile restored from the primary store ({} skills)", profile.skills.len());
            return profile;
        }
        Ok(None) => {}
        Err(e) => warn!("Could not read the stored profile: {e}"),
    }

    let Some(path) = resume_path else {
        info!("No RESUME_FILE_PATH set; profile has {} explicit skills", skills.len());
        return CandidateProfile::new(String::new(), skills);
    };
    match CandidateProfile::from_file(path, skills.clone()).await {
        Ok(profile) => {
            info!("Profile loaded with {} skills", profile.skills.len());
            profile
        }
        Err(e) => {
            warn!("Could not load resume from {}: {e}", path.display());
            CandidateProfile::new(String::new(), skills)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::Ordering;

    use crate::sinks::memory::MemoryJobStore;

    #[tokio::test]
    async fn test_stored_profile_wins_over_environment() {
        let store = MemoryJobStore::default();
        let saved = CandidateProfile::new("Kafka operator", vec!["Rust".to_string()]);
        store.save_profile(&saved).await.unwrap();

        let profile = initial_profile(&store, None, vec!["Java".to_string()]).await;
        assert_eq!(profile, saved);
    }

    #[tokio::test]
    async fn test_falls_back_to_resume_file_and_skills() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "Shipped Python services on AWS").unwrap();

        let store = MemoryJobStore::default();
        let profile = initial_profile(&store, Some(file.path()), vec!["SQL".to_string()]).await;
        assert_eq!(profile.skills, vec!["SQL", "Python", "AWS"]);
        assert_eq!(profile.explicit_skills, vec!["SQL"]);
    }

    #[tokio::test]
    async fn test_unreadable_store_falls_back() {
        let store = MemoryJobStore::default();
        store.fail_lookups.store(true, Ordering::SeqCst);
        let profile = initial_profile(&store, None, vec!["Go".to_string()]).await;
        assert_eq!(profile.skills, vec!["Go"]);
    }
}
