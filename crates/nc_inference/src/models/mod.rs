use std::sync::Arc;
use nc_core::{Error, Result, Summarizer};
use tracing::info;
use crate::Config;

pub mod dummy;
pub mod xai;

pub use dummy::DummyModel;
pub use xai::XaiModel;

/// Build the summarizer named by `config.model`.
pub fn create_model(config: &Config) -> Result<Arc<dyn Summarizer>> {
    let model: Arc<dyn Summarizer> = match config.model.to_lowercase().as_str() {
        "xai" | "grok" => Arc::new(XaiModel::new(config)?),
        "dummy" => Arc::new(DummyModel::new()),
        other => {
            return Err(Error::Configuration(format!(
                "Unknown model '{}'. Available models: xai (default), dummy",
                other
            )))
        }
    };
    info!(model = model.name(), "Summarizer ready");
    Ok(model)
}
