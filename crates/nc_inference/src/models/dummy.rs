use std::fmt;
use nc_core::{NarrativeMap, Result, Summarizer};

/// Offline summarizer: lists the member headlines instead of calling a model.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Summarizer for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn summarize_batch(&self, batch: &NarrativeMap) -> Result<NarrativeMap> {
        Ok(batch
            .iter()
            .map(|(category, narrative)| {
                let titles: Vec<&str> = narrative.articles.iter().map(|a| a.title.as_str()).collect();
                let mut summarized = narrative.clone();
                summarized.summary = Some(format!(
                    "{} articles: {}",
                    narrative.articles.len(),
                    titles.join("; ")
                ));
                (category.clone(), summarized)
            })
            .collect())
    }
}
