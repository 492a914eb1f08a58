use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async mutex: at most one holder per job_id at a time.
///
/// Entries nobody holds or waits on are pruned on the next acquire, so the
/// map stays proportional to the number of in-flight jobs.
#[derive(Clone, Default)]
pub struct JobLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, job_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.retain(|_, l| Arc::strong_count(l) > 1);
            map.entry(job_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}
