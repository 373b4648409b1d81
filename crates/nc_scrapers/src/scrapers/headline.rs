use std::time::Duration;
use async_trait::async_trait;
use nc_core::{Article, Error, Result};
use reqwest::Client;
use tracing::{debug, instrument};
use super::{parse_headlines, Scraper, SourceConfig};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Scrapes headlines from a single configured page.
#[derive(Debug, Clone)]
pub struct HeadlineScraper {
    config: SourceConfig,
    client: Client,
}

impl HeadlineScraper {
    pub fn new(config: SourceConfig) -> Result<Self> {
        Self::with_timeout(config, DEFAULT_FETCH_TIMEOUT)
    }

    pub fn with_timeout(config: SourceConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn fetch_error(&self, message: impl Into<String>) -> Error {
        Error::SourceFetch {
            source_name: self.config.name.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Scraper for HeadlineScraper {
    fn source(&self) -> &str {
        &self.config.name
    }

    #[instrument(level = "debug", skip_all, fields(source = %self.config.name))]
    async fn fetch_headlines(&self) -> Result<Vec<Article>> {
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| self.fetch_error(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.fetch_error(format!("{} returned {}", self.config.url, status)));
        }
        let html = response
            .text()
            .await
            .map_err(|e| self.fetch_error(e.to_string()))?;

        let articles = parse_headlines(&html, &self.config)?;
        debug!(headlines = articles.len(), "Parsed source page");
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_headlines() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/politics"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<h4 class="title"><a href="/politics/budget-vote">Budget vote delayed</a></h4>"#,
            ))
            .mount(&server)
            .await;

        let config = SourceConfig::new("local", format!("{}/politics", server.uri()), "h4.title");
        let scraper = HeadlineScraper::new(config).unwrap();
        let articles = scraper.fetch_headlines().await.unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Budget vote delayed");
        assert_eq!(articles[0].url, format!("{}/politics/budget-vote", server.uri()));
        assert_eq!(articles[0].source, "local");
    }

    #[tokio::test]
    async fn test_error_status_is_source_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let config = SourceConfig::new("blocked", server.uri(), "h4.title");
        let scraper = HeadlineScraper::new(config).unwrap();
        match scraper.fetch_headlines().await {
            Err(Error::SourceFetch { source_name, .. }) => assert_eq!(source_name, "blocked"),
            other => panic!("expected SourceFetch, got {:?}", other),
        }
    }
}
