use std::sync::Arc;
use nc_core::NarrativeStore;
use nc_scrapers::ScraperManager;

pub struct AppState {
    pub manager: Arc<ScraperManager>,
    /// Bearer token the trigger routes require. Unset rejects every trigger.
    pub cron_secret: Option<String>,
}

impl AppState {
    pub fn new(manager: Arc<ScraperManager>, cron_secret: Option<String>) -> Self {
        Self {
            manager,
            cron_secret: cron_secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn store(&self) -> &Arc<dyn NarrativeStore> {
        self.manager.store()
    }
}
