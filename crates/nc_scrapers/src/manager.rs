use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use futures::future::join_all;
use nc_core::{Article, Error, NarrativeMap, NarrativeStore, Result};
use nc_inference::Pipeline;
use nc_narratives::{cluster_with, ClusterOptions};
use tracing::{error, info, instrument, warn};
use crate::scrapers::{HeadlineScraper, Scraper, SourceConfig};

type BoxedScraper = Box<dyn Scraper>;

/// Outcome of scraping every source once.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// Deduplicated articles, in source order.
    pub articles: Vec<Article>,
    /// One `SourceFetch` error per source that failed.
    pub failures: Vec<Error>,
}

pub struct ScraperManager {
    scrapers: Vec<BoxedScraper>,
    pipeline: Arc<Pipeline>,
    cluster_options: ClusterOptions,
}

impl ScraperManager {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            scrapers: Vec::new(),
            pipeline,
            cluster_options: ClusterOptions::default(),
        }
    }

    /// A manager with one [`HeadlineScraper`] per configured source.
    pub fn from_sources(sources: &[SourceConfig], pipeline: Arc<Pipeline>, timeout: Duration) -> Result<Self> {
        let mut manager = Self::new(pipeline);
        for source in sources {
            manager.add_scraper(Box::new(HeadlineScraper::with_timeout(source.clone(), timeout)?));
        }
        Ok(manager)
    }

    pub fn add_scraper(&mut self, scraper: BoxedScraper) {
        self.scrapers.push(scraper);
    }

    pub fn with_cluster_options(mut self, options: ClusterOptions) -> Self {
        self.cluster_options = options;
        self
    }

    pub fn sources(&self) -> Vec<&str> {
        self.scrapers.iter().map(|s| s.source()).collect()
    }

    pub fn store(&self) -> &Arc<dyn NarrativeStore> {
        self.pipeline.store()
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Fetch every source. A failing source is recorded and skipped.
    pub async fn scrape_all(&self) -> ScrapeReport {
        let results = join_all(self.scrapers.iter().map(|s| s.fetch_headlines())).await;

        let mut report = ScrapeReport::default();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for (scraper, result) in self.scrapers.iter().zip(results) {
            match result {
                Ok(articles) => {
                    let total = articles.len();
                    let before = report.articles.len();
                    for article in articles {
                        let (title, url) = article.identity();
                        if seen.insert((title.to_string(), url.to_string())) {
                            report.articles.push(article);
                        }
                    }
                    info!("📰 {}: {} headlines ({} new)", scraper.source(), total, report.articles.len() - before);
                }
                Err(e) => {
                    let e = match e {
                        e @ Error::SourceFetch { .. } => e,
                        other => Error::SourceFetch {
                            source_name: scraper.source().to_string(),
                            message: other.to_string(),
                        },
                    };
                    warn!("⚠️ Skipping source: {}", e);
                    report.failures.push(e);
                }
            }
        }
        report
    }

    /// Scrape, cluster, store the narratives and summarize what is outstanding.
    #[instrument(level = "info", skip_all)]
    pub async fn run_cycle(&self) -> Result<NarrativeMap> {
        let mut report = self.scrape_all().await;
        if report.articles.is_empty() && !report.failures.is_empty() {
            error!("❌ Every source failed, keeping the stored narratives");
            return Err(report.failures.remove(0));
        }

        let narratives = cluster_with(&report.articles, &self.cluster_options);
        info!(
            "🧩 {} articles -> {} valid, {} excluded narratives",
            report.articles.len(),
            narratives.valid_narratives.len(),
            narratives.excluded_narratives.len()
        );
        self.store().save_narratives(&narratives).await?;

        let summarized = self.pipeline.summarize_outstanding().await?;
        info!("✨ {} narratives summarized", summarized.len());
        Ok(summarized)
    }
}
