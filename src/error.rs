//! Error taxonomy for the forecasting and alerting core.
//!
//! Store implementations report [`StoreError`]; everything above the store
//! reports [`MonitorError`], which wraps store failures.

// ---

/// Failures raised by a [`crate::store::TimeSeriesStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown city: {city}")]
    UnknownCity { city: String },

    #[error("store backend error: {message}")]
    Backend { message: String },

    #[error("invalid stored row: {reason}")]
    InvalidRow { reason: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // ---
        StoreError::Backend {
            message: err.to_string(),
        }
    }
}

/// Failures raised by feature building, forecasting, collection and alerting.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("no usable samples for {city}")]
    NoData { city: String },

    #[error("insufficient training data for {city}: {rows} rows, need {required}")]
    InsufficientData {
        city: String,
        rows: usize,
        required: usize,
    },

    #[error("model persistence failed for {city}: {reason}")]
    Persistence { city: String, reason: String },

    #[error("model training failed for {city}: {reason}")]
    Training { city: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MonitorError {
    // ---
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        // ---
        match self {
            MonitorError::NoData { .. } => "no_data",
            MonitorError::InsufficientData { .. } => "insufficient_data",
            MonitorError::Persistence { .. } => "persistence",
            MonitorError::Training { .. } => "training",
            MonitorError::Store(StoreError::UnknownCity { .. }) => "unknown_city",
            MonitorError::Store(_) => "store",
        }
    }

    pub(crate) fn persistence(city: &str, reason: impl std::fmt::Display) -> Self {
        // ---
        MonitorError::Persistence {
            city: city.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn training(city: &str, reason: impl std::fmt::Display) -> Self {
        // ---
        MonitorError::Training {
            city: city.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
