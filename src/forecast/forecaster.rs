use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::evaluation::{split_indices, ModelMetrics};
use super::registry::ModelRegistry;
use super::regressor::{AqiRegressor, ForestParams};
use super::slot::{ModelSlots, TrainedModel, MODEL_FORMAT_VERSION};
use crate::error::{MonitorError, Result};
use crate::features::{FeatureBuilder, FeatureRow, FEATURE_COLUMNS};
use crate::models::{Prediction, Trend};
use crate::store::TimeSeriesStore;

// ---

/// Fewer usable rows than this and training is refused.
pub const MIN_TRAINING_ROWS: usize = 10;

/// Samples pulled when predicting; enough to guarantee one complete row.
pub const PREDICTION_WINDOW: usize = 10;

/// Samples pulled when a prediction has to bootstrap a model.
pub const DEFAULT_TRAIN_LIMIT: usize = 200;

pub const TEST_FRACTION: f64 = 0.2;
pub const SPLIT_SEED: u64 = 42;

/// Shuffles per feature when ranking permutation importance.
const IMPORTANCE_ROUNDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    // ---
    pub feature: String,
    pub importance: f64,
}

/// Outcome of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    // ---
    pub city: String,
    pub trained_at: DateTime<Utc>,
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_metrics: ModelMetrics,
    pub train_metrics: ModelMetrics,
    /// Sorted by importance, highest first.
    pub feature_importance: Vec<FeatureImportance>,
}

/// Where the model behind a forecast came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSource {
    Resident,
    Loaded,
    Bootstrapped { training: TrainingResult },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    // ---
    pub prediction: Prediction,
    pub trend: Trend,
    pub source: ModelSource,
}

/// Per-city AQI forecasting: training, slot persistence and prediction.
pub struct Forecaster {
    builder: FeatureBuilder,
    slots: ModelSlots,
    registry: Arc<ModelRegistry>,
    params: ForestParams,
    train_limit: usize,
}

impl Forecaster {
    // ---
    pub fn new(store: Arc<dyn TimeSeriesStore>, model_dir: impl Into<PathBuf>) -> Self {
        // ---
        Self {
            builder: FeatureBuilder::new(store),
            slots: ModelSlots::new(model_dir),
            registry: Arc::new(ModelRegistry::new()),
            params: ForestParams::default(),
            train_limit: DEFAULT_TRAIN_LIMIT,
        }
    }

    pub fn with_params(mut self, params: ForestParams) -> Self {
        self.params = params;
        self
    }

    /// Sample limit used when a prediction bootstraps a model.
    pub fn with_train_limit(mut self, train_limit: usize) -> Self {
        self.train_limit = train_limit;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn slots(&self) -> &ModelSlots {
        &self.slots
    }

    /// Train a model for `city` from up to `sample_limit` recent samples,
    /// persist it to the city's slot and make it resident.
    #[tracing::instrument(skip(self))]
    pub async fn train(&self, city: &str, sample_limit: usize) -> Result<TrainingResult> {
        // ---
        let slot = self.registry.slot(city);
        let mut resident = slot.lock().await;

        let (model, result) = self.train_locked(city, sample_limit).await?;
        *resident = Some(model);
        Ok(result)
    }

    /// Make the persisted model for `city` resident. `Ok(false)` when the
    /// city has no slot.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, city: &str) -> Result<bool> {
        // ---
        let slot = self.registry.slot(city);
        let mut resident = slot.lock().await;

        match self.read_slot(city).await? {
            Some(model) => {
                *resident = Some(Arc::new(model));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn is_resident(&self, city: &str) -> bool {
        self.registry.resident(city).await.is_some()
    }

    /// Forecast the next AQI for `city` from its most recent feature row.
    ///
    /// Uses the resident model, else the persisted one, else trains a new
    /// model first. The returned [`ModelSource`] says which happened.
    #[tracing::instrument(skip(self))]
    pub async fn predict_next(&self, city: &str) -> Result<Forecast> {
        // ---
        let slot = self.registry.slot(city);
        let mut resident = slot.lock().await;

        let cached = resident.clone();
        let (model, source) = match cached {
            Some(model) => (model, ModelSource::Resident),
            None => match self.read_slot(city).await {
                Ok(Some(model)) => (Arc::new(model), ModelSource::Loaded),
                Ok(None) => self.bootstrap(city).await?,
                Err(err) => {
                    warn!(error = %err, "unreadable model slot, retraining");
                    self.bootstrap(city).await?
                }
            },
        };
        *resident = Some(model.clone());

        let rows = self.builder.rows(city, PREDICTION_WINDOW).await?;
        let latest = rows.last().ok_or_else(|| MonitorError::NoData {
            city: city.to_string(),
        })?;
        let estimate = model
            .predict_row(latest)
            .map_err(|reason| MonitorError::training(city, reason))?;

        let prediction = Prediction::from_estimate(city, latest.aqi, estimate);
        let trend = prediction.trend();
        debug!(
            current = prediction.current_aqi,
            predicted = prediction.predicted_aqi,
            ?trend,
            "forecast ready"
        );

        Ok(Forecast {
            prediction,
            trend,
            source,
        })
    }

    async fn bootstrap(&self, city: &str) -> Result<(Arc<TrainedModel>, ModelSource)> {
        // ---
        info!("no model available, training on demand");
        let (model, training) = self.train_locked(city, self.train_limit).await?;
        Ok((model, ModelSource::Bootstrapped { training }))
    }

    /// Fit and persist; the caller holds the city's lock.
    async fn train_locked(
        &self,
        city: &str,
        sample_limit: usize,
    ) -> Result<(Arc<TrainedModel>, TrainingResult)> {
        // ---
        let rows = self.builder.rows(city, sample_limit).await?;
        if rows.len() < MIN_TRAINING_ROWS {
            return Err(MonitorError::InsufficientData {
                city: city.to_string(),
                rows: rows.len(),
                required: MIN_TRAINING_ROWS,
            });
        }

        let owned_city = city.to_string();
        let slots = self.slots.clone();
        let params = self.params;
        let (model, result) =
            tokio::task::spawn_blocking(move || fit_and_persist(&owned_city, &rows, &params, &slots))
                .await
                .map_err(|e| MonitorError::training(city, e))??;

        info!(
            rows = result.rows,
            test_mae = result.test_metrics.mae,
            test_rmse = result.test_metrics.rmse,
            test_r2 = result.test_metrics.r2,
            "model trained"
        );
        Ok((Arc::new(model), result))
    }

    async fn read_slot(&self, city: &str) -> Result<Option<TrainedModel>> {
        // ---
        let slots = self.slots.clone();
        let owned_city = city.to_string();
        tokio::task::spawn_blocking(move || slots.load(&owned_city))
            .await
            .map_err(|e| MonitorError::persistence(city, e))?
    }
}

fn fit_and_persist(
    city: &str,
    rows: &[FeatureRow],
    params: &ForestParams,
    slots: &ModelSlots,
) -> Result<(TrainedModel, TrainingResult)> {
    // ---
    let (train_idx, test_idx) = split_indices(rows.len(), TEST_FRACTION, SPLIT_SEED);

    let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| rows[i].features().to_vec()).collect();
    let y_train: Vec<f64> = train_idx.iter().map(|&i| rows[i].target()).collect();
    let forest =
        AqiRegressor::fit(&x_train, &y_train, params).map_err(|e| MonitorError::training(city, e))?;

    let metrics_for = |indices: &[usize]| -> Result<ModelMetrics> {
        let x: Vec<Vec<f64>> = indices.iter().map(|&i| rows[i].features().to_vec()).collect();
        let actual: Vec<f64> = indices.iter().map(|&i| rows[i].target()).collect();
        let predicted = forest
            .predict_rows(&x)
            .map_err(|e| MonitorError::training(city, e))?;
        Ok(ModelMetrics::compute(&actual, &predicted))
    };
    let test_metrics = metrics_for(&test_idx)?;
    let train_metrics = metrics_for(&train_idx)?;

    let importances = forest
        .permutation_importances(&x_train, &y_train, IMPORTANCE_ROUNDS, params.seed)
        .map_err(|e| MonitorError::training(city, e))?;
    let mut feature_importance: Vec<FeatureImportance> = FEATURE_COLUMNS
        .iter()
        .zip(importances)
        .map(|(name, importance)| FeatureImportance {
            feature: name.to_string(),
            importance,
        })
        .collect();
    feature_importance.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    let trained_at = Utc::now();
    let model = TrainedModel {
        format_version: MODEL_FORMAT_VERSION,
        city: city.to_string(),
        feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        trained_at,
        performance: test_metrics,
        model: forest,
    };
    slots.save(&model)?;

    let result = TrainingResult {
        city: city.to_string(),
        trained_at,
        rows: rows.len(),
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
        test_metrics,
        train_metrics,
        feature_importance,
    };
    Ok((model, result))
}
