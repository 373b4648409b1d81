use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use nc_core::{Error, NarrativeStore, Result};

pub mod backends;

pub use backends::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    #[default]
    Json,
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "json" | "file" => Ok(Self::Json),
            other => Err(Error::Configuration(format!(
                "Unknown store '{}'. Available stores: memory, json",
                other
            ))),
        }
    }
}

/// Build the result store named by `kind`. `data_dir` is only used by file backends.
pub async fn create_store(kind: StoreKind, data_dir: impl Into<PathBuf>) -> Result<Arc<dyn NarrativeStore>> {
    match kind {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Json => {
            let store = JsonStore::open(JsonConfig::new(data_dir)).await?;
            Ok(Arc::new(store))
        }
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_store, StoreKind};
}
