use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use crate::types::{NarrativeSet, SummaryState};
use crate::Result;

/// Exclusive lease on the summary state, released on drop.
pub struct RunLock {
    guard: Box<dyn Any + Send + Sync>,
}

impl RunLock {
    pub fn new<G: Any + Send + Sync>(guard: G) -> Self {
        Self { guard: Box::new(guard) }
    }

    /// The backend-specific guard, if it is a `G`.
    pub fn guard<G: Any>(&self) -> Option<&G> {
        self.guard.downcast_ref::<G>()
    }
}

impl fmt::Debug for RunLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLock").finish_non_exhaustive()
    }
}

#[async_trait]
pub trait NarrativeStore: Send + Sync {
    /// The most recently clustered narratives, if any were ever saved.
    async fn load_narratives(&self) -> Result<Option<NarrativeSet>>;

    /// Replace the clustered narratives document.
    async fn save_narratives(&self, narratives: &NarrativeSet) -> Result<()>;

    /// The persisted summarization progress, if any.
    async fn load_summaries(&self) -> Result<Option<SummaryState>>;

    /// Replace the summary state document. Used as the per-batch checkpoint.
    async fn save_summaries(&self, state: &SummaryState) -> Result<()>;

    /// Forget all summarization progress.
    async fn reset_summaries(&self) -> Result<()>;

    /// Take the run lock. Fails with [`crate::Error::RunInProgress`] when
    /// another invoker holds it.
    async fn lock(&self) -> Result<RunLock>;

    /// Confirm `lock` is still ours and mark it live. Called between batches
    /// so a long run is not mistaken for a dead one.
    async fn heartbeat(&self, _lock: &RunLock) -> Result<()> {
        Ok(())
    }
}
