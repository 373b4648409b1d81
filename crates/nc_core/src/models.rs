use async_trait::async_trait;
use std::fmt;
use crate::types::NarrativeMap;
use crate::Result;

#[async_trait]
pub trait Summarizer: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Summarize every narrative of one batch in a single upstream call.
    ///
    /// The returned map holds the batch's narratives that received a
    /// summary, keyed by the batch's own category names.
    async fn summarize_batch(&self, batch: &NarrativeMap) -> Result<NarrativeMap>;
}
