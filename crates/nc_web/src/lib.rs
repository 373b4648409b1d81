use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/cron", get(handlers::run_cycle).post(handlers::run_cycle))
        .route("/api/scrape", post(handlers::run_cycle))
        .route("/api/narratives", get(handlers::get_narratives))
        .route("/api/narratives/raw", get(handlers::get_raw_narratives))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use nc_core::{Error, NarrativeMap, Result};
    pub use crate::{create_app, AppState};
}
