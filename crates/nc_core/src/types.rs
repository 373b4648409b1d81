use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Narratives with fewer members than this are excluded from summarization.
pub const MIN_NARRATIVE_ARTICLES: usize = 2;

pub const EXCLUDED_REASON: &str = "Less than 2 articles in the narrative.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Article {
    pub fn new(title: impl Into<String>, url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            content: None,
        }
    }

    /// Two articles with the same identity are the same story.
    pub fn identity(&self) -> (&str, &str) {
        (&self.title, &self.url)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub articles: Vec<Article>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Narrative {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles,
            summary: None,
            reason: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.articles.len() >= MIN_NARRATIVE_ARTICLES
    }

    /// A narrative is done once it carries a non-blank summary.
    pub fn is_done(&self) -> bool {
        self.summary.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

/// Category name to narrative, in cluster formation order.
pub type NarrativeMap = IndexMap<String, Narrative>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeSet {
    #[serde(default)]
    pub valid_narratives: NarrativeMap,
    #[serde(default)]
    pub excluded_narratives: NarrativeMap,
}

/// The persisted summarization progress. Same shape as a [`NarrativeSet`];
/// valid entries gain a `summary` as batches complete.
pub type SummaryState = NarrativeSet;

impl NarrativeSet {
    pub fn is_done(&self, category: &str) -> bool {
        self.valid_narratives
            .get(category)
            .is_some_and(Narrative::is_done)
    }

    /// Valid categories of `self` that have no finished summary in `state`.
    pub fn outstanding(&self, state: &SummaryState) -> NarrativeMap {
        self.valid_narratives
            .iter()
            .filter(|(category, _)| !state.is_done(category))
            .map(|(category, narrative)| (category.clone(), narrative.clone()))
            .collect()
    }

    pub fn article_count(&self) -> usize {
        self.valid_narratives
            .values()
            .chain(self.excluded_narratives.values())
            .map(|n| n.articles.len())
            .sum()
    }
}
