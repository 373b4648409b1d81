use std::fmt;
use std::time::Duration;

pub mod batch;
pub mod models;
pub mod pipeline;
pub mod util;

pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";
pub const DEFAULT_MODEL_NAME: &str = "grok-2";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

#[derive(Clone)]
pub struct Config {
    /// Which [`nc_core::Summarizer`] to build: `xai` or `dummy`.
    pub model: String,
    pub api_key: Option<String>,
    pub model_name: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    /// Upper bound for one summarization request, connection included.
    pub timeout: Duration,
    pub batch_size: usize,
    /// Extra attempts per batch for transient upstream failures.
    pub retries: u32,
    pub retry_base_delay: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("timeout", &self.timeout)
            .field("batch_size", &self.batch_size)
            .field("retries", &self.retries)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "xai".to_string(),
            api_key: None,
            model_name: DEFAULT_MODEL_NAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout: Duration::from_secs(120),
            batch_size: batch::DEFAULT_BATCH_SIZE,
            retries: 0,
            retry_base_delay: Duration::from_secs(1),
        }
    }
}

pub mod prelude {
    pub use super::batch::plan_batches;
    pub use super::models::create_model;
    pub use super::pipeline::Pipeline;
    pub use super::Config;
    pub use nc_core::{Error, NarrativeMap, Result, Summarizer};
}

pub use models::create_model;
pub use pipeline::Pipeline;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config {
            api_key: Some("xai-secret".to_string()),
            ..Config::default()
        };
        let printed = format!("{:?}", config);
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("xai-secret"));
    }
}
