//! Feature engineering over time-ordered samples.
//!
//! Turns the joined sample window of one city into supervised-learning rows:
//! calendar features, lag-1 values and 3-sample trailing means. Rows whose
//! history is too short for every derived field are dropped, so the first two
//! samples of any window never produce a row.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::models::Sample;
use crate::store::TimeSeriesStore;

// ---

/// Trailing window length of the rolling means.
pub const ROLLING_WINDOW: usize = 3;

pub const FEATURE_COUNT: usize = 17;

/// Ordered model inputs. Prediction must supply features in this order.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "pm25",
    "pm10",
    "no2",
    "so2",
    "co",
    "o3",
    "temperature",
    "humidity",
    "wind_speed",
    "pressure",
    "hour",
    "day_of_week",
    "aqi_lag_1",
    "pm25_lag_1",
    "pm10_lag_1",
    "aqi_rolling_3",
    "pm25_rolling_3",
];

/// One supervised-learning row; `aqi` is the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    // ---
    pub timestamp: DateTime<Utc>,
    pub aqi: i32,
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
    pub o3: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub pressure: f64,
    pub hour: u32,
    pub day_of_week: u32,
    pub aqi_lag_1: f64,
    pub pm25_lag_1: f64,
    pub pm10_lag_1: f64,
    pub aqi_rolling_3: f64,
    pub pm25_rolling_3: f64,
}

impl FeatureRow {
    // ---
    /// Value of a named feature column.
    pub fn value(&self, name: &str) -> Option<f64> {
        // ---
        let value = match name {
            "pm25" => self.pm25,
            "pm10" => self.pm10,
            "no2" => self.no2,
            "so2" => self.so2,
            "co" => self.co,
            "o3" => self.o3,
            "temperature" => self.temperature,
            "humidity" => self.humidity,
            "wind_speed" => self.wind_speed,
            "pressure" => self.pressure,
            "hour" => f64::from(self.hour),
            "day_of_week" => f64::from(self.day_of_week),
            "aqi_lag_1" => self.aqi_lag_1,
            "pm25_lag_1" => self.pm25_lag_1,
            "pm10_lag_1" => self.pm10_lag_1,
            "aqi_rolling_3" => self.aqi_rolling_3,
            "pm25_rolling_3" => self.pm25_rolling_3,
            _ => return None,
        };
        Some(value)
    }

    /// Feature vector in the order given by `columns`.
    ///
    /// Returns the first unknown column name on failure.
    pub fn vector<S: AsRef<str>>(&self, columns: &[S]) -> std::result::Result<Vec<f64>, String> {
        // ---
        columns
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.value(name).ok_or_else(|| name.to_string())
            })
            .collect()
    }

    /// Feature vector in [`FEATURE_COLUMNS`] order.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        // ---
        [
            self.pm25,
            self.pm10,
            self.no2,
            self.so2,
            self.co,
            self.o3,
            self.temperature,
            self.humidity,
            self.wind_speed,
            self.pressure,
            f64::from(self.hour),
            f64::from(self.day_of_week),
            self.aqi_lag_1,
            self.pm25_lag_1,
            self.pm10_lag_1,
            self.aqi_rolling_3,
            self.pm25_rolling_3,
        ]
    }

    pub fn target(&self) -> f64 {
        f64::from(self.aqi)
    }
}

/// Derive feature rows from one city's samples, ordered oldest first.
pub fn build_rows(samples: &[Sample]) -> Vec<FeatureRow> {
    // ---
    samples
        .windows(ROLLING_WINDOW)
        .map(|window| {
            let current = &window[ROLLING_WINDOW - 1];
            let previous = &window[ROLLING_WINDOW - 2];
            let aqi_mean = window.iter().map(|s| f64::from(s.aqi)).sum::<f64>()
                / ROLLING_WINDOW as f64;
            let pm25_mean = window.iter().map(|s| s.pm25).sum::<f64>() / ROLLING_WINDOW as f64;

            FeatureRow {
                timestamp: current.timestamp,
                aqi: current.aqi,
                pm25: current.pm25,
                pm10: current.pm10,
                no2: current.no2,
                so2: current.so2,
                co: current.co,
                o3: current.o3,
                temperature: current.temperature,
                humidity: current.humidity,
                wind_speed: current.wind_speed,
                pressure: current.pressure,
                hour: current.timestamp.hour(),
                day_of_week: current.timestamp.weekday().num_days_from_monday(),
                aqi_lag_1: f64::from(previous.aqi),
                pm25_lag_1: previous.pm25,
                pm10_lag_1: previous.pm10,
                aqi_rolling_3: aqi_mean,
                pm25_rolling_3: pm25_mean,
            }
        })
        .collect()
}

/// Reads sample windows from the store and derives feature rows.
#[derive(Clone)]
pub struct FeatureBuilder {
    store: Arc<dyn TimeSeriesStore>,
}

impl FeatureBuilder {
    // ---
    pub fn new(store: Arc<dyn TimeSeriesStore>) -> Self {
        Self { store }
    }

    /// Feature rows for the `limit` most recent joined samples of `city`.
    ///
    /// Fails with [`MonitorError::NoData`] when the join yields no sample.
    /// A non-empty join shorter than three samples yields an empty table.
    pub async fn rows(&self, city: &str, limit: usize) -> Result<Vec<FeatureRow>> {
        // ---
        let samples = self.store.sample_window(city, limit).await?;
        if samples.is_empty() {
            return Err(MonitorError::NoData {
                city: city.to_string(),
            });
        }

        let rows = build_rows(&samples);
        tracing::debug!(
            city,
            samples = samples.len(),
            rows = rows.len(),
            "built feature rows"
        );
        Ok(rows)
    }
}
