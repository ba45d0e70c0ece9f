use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::info;

use super::{ApiError, AppState};
use crate::cycle::{forecast_cities, CityOutcome};
use crate::forecast::Forecast;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/predictions", get(all_handler))
        .route("/predictions/{city}", get(handler))
}

/// Handle `GET /predictions`: forecast every known city.
///
/// Each entry carries its own `status`; a city without data or history is an
/// error entry, not a failed request.
async fn all_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<CityOutcome<Forecast>>>, ApiError> {
    // ---
    info!("GET /predictions");
    let cities: Vec<String> = state
        .store
        .all_cities()
        .await?
        .into_iter()
        .map(|city| city.name)
        .collect();
    Ok(Json(forecast_cities(&state.forecaster, &cities).await))
}

/// Handle `GET /predictions/{city}`.
///
/// Trains a model on demand when the city has none yet; the response's
/// `source` field says so.
async fn handler(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<Forecast>, ApiError> {
    // ---
    info!("GET /predictions/{}", city);
    let forecast = state.forecaster.predict_next(&city).await?;
    Ok(Json(forecast))
}
