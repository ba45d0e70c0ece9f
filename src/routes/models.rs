use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use tracing::info;

use super::{ApiError, AppState};
use crate::forecast::TrainingResult;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/models/{city}/train", post(train))
}

/// Handle `POST /models/{city}/train`: retrain and persist the city's model.
async fn train(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<TrainingResult>, ApiError> {
    // ---
    info!("POST /models/{}/train", city);
    let result = state
        .forecaster
        .train(&city, state.train_sample_limit)
        .await?;
    Ok(Json(result))
}
