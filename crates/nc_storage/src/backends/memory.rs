use async_trait::async_trait;
use nc_core::{Error, NarrativeSet, NarrativeStore, Result, RunLock, SummaryState};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Default)]
struct Documents {
    narratives: Option<NarrativeSet>,
    summaries: Option<SummaryState>,
}

/// Keeps both documents in process memory. Useful for tests and one-shot runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    documents: Arc<RwLock<Documents>>,
    run_lock: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NarrativeStore for MemoryStore {
    async fn load_narratives(&self) -> Result<Option<NarrativeSet>> {
        Ok(self.documents.read().await.narratives.clone())
    }

    async fn save_narratives(&self, narratives: &NarrativeSet) -> Result<()> {
        self.documents.write().await.narratives = Some(narratives.clone());
        Ok(())
    }

    async fn load_summaries(&self) -> Result<Option<SummaryState>> {
        Ok(self.documents.read().await.summaries.clone())
    }

    async fn save_summaries(&self, state: &SummaryState) -> Result<()> {
        self.documents.write().await.summaries = Some(state.clone());
        Ok(())
    }

    async fn reset_summaries(&self) -> Result<()> {
        self.documents.write().await.summaries = None;
        Ok(())
    }

    async fn lock(&self) -> Result<RunLock> {
        let guard = self
            .run_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| Error::RunInProgress)?;
        Ok(RunLock::new(guard))
    }
}
