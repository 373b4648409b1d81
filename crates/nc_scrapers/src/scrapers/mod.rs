use std::path::Path;
use async_trait::async_trait;
use lazy_static::lazy_static;
use nc_core::{Article, Error, Result};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

pub mod headline;

pub use headline::HeadlineScraper;

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Returns the name of the news source
    fn source(&self) -> &str;

    /// Returns the headlines currently on the source page, in page order
    async fn fetch_headlines(&self) -> Result<Vec<Article>>;
}

/// One headline page and the CSS selector matching its headline elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub selector: String,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            selector: selector.into(),
        }
    }
}

pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new("cnn", "https://www.cnn.com/politics", "span.container__headline-text"),
        SourceConfig::new("fox", "https://www.foxnews.com/politics", "h4.title"),
    ]
}

/// Read a JSON array of `{name, url, selector}` objects.
pub fn load_sources(path: &Path) -> Result<Vec<SourceConfig>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!("cannot read sources file {}: {}", path.display(), e))
    })?;
    let sources: Vec<SourceConfig> = serde_json::from_str(&text).map_err(|e| {
        Error::Configuration(format!("invalid sources file {}: {}", path.display(), e))
    })?;
    if sources.is_empty() {
        return Err(Error::Configuration(format!(
            "sources file {} lists no sources",
            path.display()
        )));
    }
    Ok(sources)
}

lazy_static! {
    static ref LINK: Selector = Selector::parse("a[href]").unwrap();
}

/// Extract headline articles from a source page.
///
/// Titles are trimmed with inner whitespace collapsed. The link comes from
/// the element itself, its nearest `a[href]` ancestor or its first
/// `a[href]` descendant, resolved against the source URL. Elements without
/// a title or a usable link are skipped.
pub fn parse_headlines(html: &str, source: &SourceConfig) -> Result<Vec<Article>> {
    let selector = Selector::parse(&source.selector).map_err(|e| Error::SourceFetch {
        source_name: source.name.clone(),
        message: format!("invalid selector '{}': {}", source.selector, e),
    })?;
    let base = Url::parse(&source.url).map_err(|e| Error::SourceFetch {
        source_name: source.name.clone(),
        message: format!("invalid source URL '{}': {}", source.url, e),
    })?;

    let document = Html::parse_document(html);
    let articles = document
        .select(&selector)
        .filter_map(|element| {
            let title = collapse_whitespace(&element.text().collect::<String>());
            if title.is_empty() {
                return None;
            }
            let href = link_for(element)?;
            let url = base.join(href.trim()).ok()?;
            Some(Article::new(title, url.to_string(), source.name.clone()))
        })
        .collect();
    Ok(articles)
}

fn link_for(element: ElementRef<'_>) -> Option<&str> {
    if element.value().name() == "a" {
        if let Some(href) = element.value().attr("href") {
            return Some(href);
        }
    }
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find_map(|ancestor| match ancestor.value().name() {
            "a" => ancestor.value().attr("href"),
            _ => None,
        })
        .or_else(|| {
            element
                .select(&LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
        })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
