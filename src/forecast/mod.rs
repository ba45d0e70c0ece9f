//! AQI forecasting gateway.
//!
//! [`Forecaster`] trains one random-forest model per city, persists it to a
//! JSON slot and predicts the next AQI from the latest feature row. Resident
//! models live in an explicit [`ModelRegistry`] with one lock per city.

mod evaluation;
mod forecaster;
mod registry;
mod regressor;
mod slot;

pub use evaluation::{split_indices, ModelMetrics};
pub use forecaster::{
    FeatureImportance, Forecast, Forecaster, ModelSource, TrainingResult, DEFAULT_TRAIN_LIMIT,
    MIN_TRAINING_ROWS, PREDICTION_WINDOW, SPLIT_SEED, TEST_FRACTION,
};
pub use registry::ModelRegistry;
pub use regressor::{AqiRegressor, ForestParams, RegressorError};
pub use slot::{ModelSlots, TrainedModel, MODEL_FORMAT_VERSION};
