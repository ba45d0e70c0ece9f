//! HTTP routes gateway.
//!
//! Each sibling module exposes a subrouter over [`AppState`]; this gateway
//! merges them so `main.rs` never needs to know about individual endpoints.

use std::sync::Arc;

use axum::Router;

use crate::alerts::AlertEngine;
use crate::cycle::MonitoringCycle;
use crate::forecast::Forecaster;
use crate::store::TimeSeriesStore;

mod alerts;
mod cycle;
mod error;
mod health;
mod models;
mod predictions;
mod summary;

pub use error::ApiError;

// ---

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TimeSeriesStore>,
    pub forecaster: Arc<Forecaster>,
    pub alerts: Arc<AlertEngine>,
    pub cycle: Arc<MonitoringCycle>,
    pub train_sample_limit: usize,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(predictions::router())
        .merge(models::router())
        .merge(alerts::router())
        .merge(summary::router())
        .merge(cycle::router())
        .merge(health::router())
        .with_state(state)
}
