//! Time-series store gateway.
//!
//! The forecasting and alerting core only talks to the [`TimeSeriesStore`]
//! trait. Two implementations are exported:
//! - [`PgStore`]: PostgreSQL via `sqlx`, used by the service binary
//! - [`MemoryStore`]: in-process maps, used by tests and local runs
//!
//! Every method is a single read or a single write; no call relies on a
//! transaction spanning another call.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Alert, AirQualityReading, City, Sample, WeatherReading};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

// ---

#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    // ---
    /// All known cities, ordered by name.
    async fn all_cities(&self) -> Result<Vec<City>, StoreError>;

    /// Most recent air-quality reading for `city`, if any.
    async fn latest_reading(&self, city: &str) -> Result<Option<AirQualityReading>, StoreError>;

    /// Most recent weather reading for `city`, if any.
    async fn latest_weather(&self, city: &str) -> Result<Option<WeatherReading>, StoreError>;

    /// Up to `max_count` most recent samples for `city`, oldest first.
    ///
    /// A sample exists only where an air-quality and a weather reading share
    /// the same timestamp truncated to the second. When several weather
    /// readings fall in that second, the first one written is used, so each
    /// air-quality reading yields at most one sample.
    async fn sample_window(&self, city: &str, max_count: usize)
        -> Result<Vec<Sample>, StoreError>;

    /// Append an air-quality reading. Returns `false` when a reading for the
    /// same (city, timestamp) already exists and nothing was written.
    async fn append_air_quality(&self, reading: &AirQualityReading) -> Result<bool, StoreError>;

    async fn append_weather(&self, reading: &WeatherReading) -> Result<(), StoreError>;

    async fn append_alert(&self, alert: &Alert) -> Result<(), StoreError>;

    /// Persisted alerts, newest first, optionally restricted to one city.
    async fn recent_alerts(&self, city: Option<&str>, limit: usize)
        -> Result<Vec<Alert>, StoreError>;
}
