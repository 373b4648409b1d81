pub mod error;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use models::Summarizer;
pub use storage::{NarrativeStore, RunLock};
pub use types::{
    Article, Narrative, NarrativeMap, NarrativeSet, SummaryState, EXCLUDED_REASON,
    MIN_NARRATIVE_ARTICLES,
};
