use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use super::{ApiError, AppState};
use crate::models::Alert;

// ---

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 1000;

/// Query parameters for listing persisted alerts.
#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    city: Option<String>,
    limit: Option<usize>,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/alerts", get(handler))
}

/// Handle `GET /alerts?city=&limit=`: newest first.
async fn handler(
    State(state): State<AppState>,
    Query(params): Query<AlertsQuery>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    // ---
    info!("GET /alerts {:?}", params);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let alerts = state
        .store
        .recent_alerts(params.city.as_deref(), limit)
        .await?;
    Ok(Json(alerts))
}
