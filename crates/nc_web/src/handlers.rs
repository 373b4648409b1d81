use std::sync::Arc;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use nc_core::{Error, NarrativeMap, NarrativeSet, SummaryState};
use serde_json::json;
use tracing::{error, info, warn};
use crate::AppState;

pub enum ApiError {
    Unauthorized,
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Core(e)
    }
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::RunInProgress => StatusCode::CONFLICT,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Core(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    error!(error = %e, "Request failed");
                }
                (status, e.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(secret) = state.cron_secret.as_deref() else {
        warn!("Trigger rejected: no cron secret configured");
        return Err(ApiError::Unauthorized);
    };
    let Some(auth) = headers.get(header::AUTHORIZATION) else {
        return Err(ApiError::Unauthorized);
    };
    let Ok(auth) = auth.to_str() else {
        return Err(ApiError::Unauthorized);
    };
    let expected = format!("Bearer {}", secret);
    if constant_time_eq(auth.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        warn!("Trigger rejected: bad credentials");
        Err(ApiError::Unauthorized)
    }
}

/// Scrape, cluster and summarize, answering with the valid narratives.
pub async fn run_cycle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<NarrativeMap>, ApiError> {
    authorize(&state, &headers)?;
    info!("Triggered run cycle");
    let narratives = state.manager.run_cycle().await?;
    Ok(Json(narratives))
}

pub async fn get_narratives(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SummaryState>, ApiError> {
    let summaries = state
        .store()
        .load_summaries()
        .await?
        .ok_or_else(|| Error::NotFound("no summarized narratives yet".to_string()))?;
    Ok(Json(summaries))
}

pub async fn get_raw_narratives(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NarrativeSet>, ApiError> {
    let narratives = state
        .store()
        .load_narratives()
        .await?
        .ok_or_else(|| Error::NotFound("no clustered narratives yet".to_string()))?;
    Ok(Json(narratives))
}
