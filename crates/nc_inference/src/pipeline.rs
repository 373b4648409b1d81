//! Resumable summarization over the stored narratives.
//!
//! A run holds the store lock from start to finish, walks the outstanding
//! narratives batch by batch and writes the whole summary state after every
//! batch. A failed run leaves every earlier checkpoint in place, so the next
//! run only pays for what is still missing.

use std::sync::Arc;
use std::time::{Duration, Instant};
use nc_core::{Error, NarrativeMap, NarrativeSet, NarrativeStore, Result, Summarizer, SummaryState};
use rand::Rng;
use tracing::{debug, error, info, instrument, warn};
use crate::batch::{plan_batches, DEFAULT_BATCH_SIZE};
use crate::Config;

const MAX_BACKOFF: Duration = Duration::from_secs(30);
const MAX_JITTER_MS: u64 = 250;

pub struct Pipeline {
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn NarrativeStore>,
    batch_size: usize,
    retries: u32,
    retry_base_delay: Duration,
}

impl Pipeline {
    pub fn new(summarizer: Arc<dyn Summarizer>, store: Arc<dyn NarrativeStore>) -> Self {
        Self {
            summarizer,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            retries: 0,
            retry_base_delay: Duration::from_secs(1),
        }
    }

    pub fn from_config(
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn NarrativeStore>,
        config: &Config,
    ) -> Self {
        Self::new(summarizer, store)
            .with_batch_size(config.batch_size)
            .with_retries(config.retries, config.retry_base_delay)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Extra attempts for transient upstream failures, with exponential backoff.
    pub fn with_retries(mut self, retries: u32, base_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_base_delay = base_delay;
        self
    }

    pub fn store(&self) -> &Arc<dyn NarrativeStore> {
        &self.store
    }

    /// Summarize every valid narrative that has no summary yet and return
    /// the full set of valid narratives with their summaries.
    #[instrument(level = "info", skip_all, fields(model = self.summarizer.name(), batch_size = self.batch_size))]
    pub async fn summarize_outstanding(&self) -> Result<NarrativeMap> {
        let lock = self.store.lock().await?;

        let narratives = self
            .store
            .load_narratives()
            .await?
            .ok_or_else(|| Error::NotFound("no clustered narratives have been saved".to_string()))?;
        let stored = self.store.load_summaries().await?.unwrap_or_default();

        if narratives.valid_narratives.is_empty() {
            info!("No valid narratives to summarize");
            let state = NarrativeSet {
                valid_narratives: NarrativeMap::new(),
                excluded_narratives: narratives.excluded_narratives,
            };
            self.checkpoint(&state).await?;
            return Ok(state.valid_narratives);
        }

        let mut state = project(&narratives, &stored);
        let dropped = stored.valid_narratives.len()
            - stored
                .valid_narratives
                .keys()
                .filter(|category| state.valid_narratives.contains_key(*category))
                .count();
        if dropped > 0 {
            info!(dropped, "Dropping summaries of categories no longer clustered");
        }

        let outstanding = narratives.outstanding(&state);
        if outstanding.is_empty() {
            info!(
                narratives = narratives.valid_narratives.len(),
                "All narratives already summarized"
            );
            if state != stored {
                self.checkpoint(&state).await?;
            }
            return Ok(state.valid_narratives);
        }

        let batches = plan_batches(&outstanding, self.batch_size);
        info!(
            outstanding = outstanding.len(),
            batches = batches.len(),
            "Summarizing outstanding narratives"
        );

        let t0 = Instant::now();
        for (index, batch) in batches.iter().enumerate() {
            self.store.heartbeat(&lock).await?;
            let persisted = self.store.load_summaries().await?.unwrap_or_default();
            adopt_done(&mut state, &persisted);

            let pending: NarrativeMap = batch
                .iter()
                .filter(|(category, _)| !state.is_done(category))
                .map(|(category, narrative)| (category.clone(), narrative.clone()))
                .collect();
            if pending.is_empty() {
                debug!(batch = index + 1, "Batch already summarized, skipping");
                continue;
            }

            let summaries = match self.call_with_retries(&pending).await {
                Ok(summaries) => summaries,
                Err(e) => {
                    error!(batch = index + 1, of = batches.len(), error = %e, "Summarization failed, stopping run");
                    return Err(e);
                }
            };

            let merged = merge_batch(&mut state, &pending, summaries);
            let persisted = self.store.load_summaries().await?.unwrap_or_default();
            adopt_done(&mut state, &persisted);
            self.store.heartbeat(&lock).await?;
            self.checkpoint(&state).await?;
            info!(batch = index + 1, of = batches.len(), merged, "Checkpointed batch");
        }

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            narratives = state.valid_narratives.len(),
            "Summarization run finished"
        );
        Ok(state.valid_narratives)
    }

    async fn call_with_retries(&self, batch: &NarrativeMap) -> Result<NarrativeMap> {
        let mut attempt = 0;
        loop {
            match self.summarizer.summarize_batch(batch).await {
                Ok(summaries) => return Ok(summaries),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    let delay = backoff(self.retry_base_delay, attempt);
                    attempt += 1;
                    warn!(
                        attempt,
                        retries = self.retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient upstream failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn checkpoint(&self, state: &SummaryState) -> Result<()> {
        self.store.save_summaries(state).await.map_err(|e| match e {
            Error::Persistence(_) => e,
            other => Error::Persistence(other.to_string()),
        })
    }
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt)).min(MAX_BACKOFF);
    let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
    exp + Duration::from_millis(jitter)
}

/// Working state for the current clustering: its valid categories in
/// order, carrying over finished summaries, and its excluded set.
fn project(narratives: &NarrativeSet, stored: &SummaryState) -> SummaryState {
    let valid_narratives = narratives
        .valid_narratives
        .iter()
        .map(|(category, narrative)| match stored.valid_narratives.get(category) {
            Some(done) if done.is_done() => (category.clone(), done.clone()),
            _ => (category.clone(), narrative.clone()),
        })
        .collect();
    SummaryState {
        valid_narratives,
        excluded_narratives: narratives.excluded_narratives.clone(),
    }
}

/// Copy done entries another writer persisted for categories in `state`.
/// Never replaces a done entry.
fn adopt_done(state: &mut SummaryState, persisted: &SummaryState) {
    for (category, narrative) in &persisted.valid_narratives {
        if !narrative.is_done() || state.is_done(category) {
            continue;
        }
        if let Some(slot) = state.valid_narratives.get_mut(category) {
            debug!(%category, "Adopting summary persisted by another run");
            *slot = narrative.clone();
        }
    }
}

/// Merge summaries for `batch` into `state`, returning how many landed.
fn merge_batch(state: &mut SummaryState, batch: &NarrativeMap, mut summaries: NarrativeMap) -> usize {
    let mut merged = 0;
    for (category, narrative) in batch {
        match summaries.shift_remove(category) {
            Some(summarized) if summarized.is_done() => {
                if state.is_done(category) {
                    continue;
                }
                let mut narrative = narrative.clone();
                narrative.summary = summarized.summary;
                state.valid_narratives.insert(category.clone(), narrative);
                merged += 1;
            }
            _ => warn!(%category, "No summary returned, narrative stays outstanding"),
        }
    }
    for extra in summaries.keys() {
        warn!(category = %extra, "Discarding summary for a category outside the batch");
    }
    merged
}
