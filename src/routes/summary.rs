use axum::{extract::State, routing::get, Json, Router};
use tracing::info;

use super::{ApiError, AppState};
use crate::summary::{summarize, PollutionSummary};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/summary", get(handler))
}

/// Handle `GET /summary`: cross-city statistics over the latest readings.
async fn handler(State(state): State<AppState>) -> Result<Json<PollutionSummary>, ApiError> {
    // ---
    info!("GET /summary");
    let summary = summarize(&*state.store, state.alerts.thresholds()).await?;
    Ok(Json(summary))
}
