pub mod manager;
pub mod scrapers;

pub use manager::{ScrapeReport, ScraperManager};
pub use scrapers::{default_sources, load_sources, parse_headlines, HeadlineScraper, Scraper, SourceConfig};

pub mod prelude {
    pub use super::manager::{ScrapeReport, ScraperManager};
    pub use super::scrapers::{default_sources, load_sources, HeadlineScraper, Scraper, SourceConfig};
    pub use nc_core::{Article, Error, Result};
}
