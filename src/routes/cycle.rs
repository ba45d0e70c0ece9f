use axum::{extract::State, routing::post, Json, Router};
use tracing::info;

use super::AppState;
use crate::cycle::CycleReport;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/cycle", post(handler))
}

/// Handle `POST /cycle`: run one monitoring cycle now.
///
/// Always 200; per-step and per-city failures are inside the report.
async fn handler(State(state): State<AppState>) -> Json<CycleReport> {
    // ---
    info!("POST /cycle");
    Json(state.cycle.run_cycle().await)
}
