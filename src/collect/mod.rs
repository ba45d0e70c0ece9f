//! Data collection gateway.
//!
//! A [`Collector`] writes fresh readings for every city known to the store:
//! - [`SimulatedCollector`]: paired air-quality and weather readings around
//!   per-city baselines
//! - [`WeatherCollector`]: current weather from the OpenWeatherMap API
//! - [`FallbackCollector`]: a primary collector backed by a fallback

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::store::TimeSeriesStore;

mod fallback;
mod simulated;
mod weather;

pub use fallback::FallbackCollector;
pub use simulated::SimulatedCollector;
pub use weather::{WeatherCollector, DEFAULT_WEATHER_API_URL};

// ---

/// Per-run collection counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    // ---
    pub source: String,
    pub collected: usize,
    /// Air-quality readings skipped because one already existed.
    pub duplicates: usize,
    pub failed: usize,
}

impl CollectionSummary {
    pub(crate) fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Collect one round of readings. Per-city failures are counted in the
    /// summary; only a failure to list cities fails the call.
    async fn collect(&self, store: &dyn TimeSeriesStore) -> Result<CollectionSummary>;
}
