use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::{CollectionSummary, Collector};
use crate::error::Result;
use crate::models::{AirQualityReading, WeatherReading};
use crate::store::TimeSeriesStore;

// ---

const DEFAULT_BASE_AQI: i32 = 150;
const DEFAULT_BASE_TEMPERATURE: f64 = 28.0;

/// (city, base AQI, base temperature in °C)
const BASELINES: &[(&str, i32, f64)] = &[
    ("Delhi", 280, 28.0),
    ("Mumbai", 155, 32.0),
    ("Kolkata", 195, 30.0),
    ("Chennai", 130, 34.0),
    ("Bangalore", 110, 26.0),
    ("Hyderabad", 145, 29.0),
    ("Pune", 120, 27.0),
    ("Ahmedabad", 175, 31.0),
];

fn baseline(city: &str) -> (i32, f64) {
    // ---
    BASELINES
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(city))
        .map(|&(_, aqi, temperature)| (aqi, temperature))
        .unwrap_or((DEFAULT_BASE_AQI, DEFAULT_BASE_TEMPERATURE))
}

/// Generates plausible readings around per-city baselines.
///
/// Each round writes one weather and one air-quality reading per city, all
/// sharing a single timestamp so they pair into samples.
pub struct SimulatedCollector {
    rng: Mutex<StdRng>,
}

impl Default for SimulatedCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCollector {
    // ---
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible readings for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn generate(&self, city: &str, timestamp: DateTime<Utc>) -> (WeatherReading, AirQualityReading) {
        // ---
        let (base_aqi, base_temperature) = baseline(city);
        let mut rng = self.rng.lock().expect("simulated collector rng poisoned");

        let weather = WeatherReading {
            city: city.to_string(),
            timestamp,
            temperature: base_temperature + rng.gen_range(-3.0..=3.0),
            humidity: f64::from(rng.gen_range(40..=80)),
            wind_speed: rng.gen_range(5.0..=20.0),
            pressure: rng.gen_range(1010.0..=1020.0),
        };

        let aqi = base_aqi + rng.gen_range(-20..=20);
        let air = AirQualityReading {
            city: city.to_string(),
            timestamp,
            aqi,
            pm25: f64::from(aqi) * 0.5 + rng.gen_range(-10.0..=10.0),
            pm10: f64::from(aqi) * 0.7 + rng.gen_range(-15.0..=15.0),
            no2: rng.gen_range(30.0..=60.0),
            so2: rng.gen_range(10.0..=25.0),
            co: rng.gen_range(0.8..=2.5),
            o3: rng.gen_range(40.0..=80.0),
        };

        (weather, air)
    }

    /// Write one round of readings stamped with `timestamp`.
    pub async fn collect_at(
        &self,
        store: &dyn TimeSeriesStore,
        timestamp: DateTime<Utc>,
    ) -> Result<CollectionSummary> {
        // ---
        let mut summary = CollectionSummary::new(self.name());

        for city in store.all_cities().await? {
            let (weather, air) = self.generate(&city.name, timestamp);

            if let Err(err) = store.append_weather(&weather).await {
                warn!(city = %city.name, error = %err, "simulated weather not stored");
                summary.failed += 1;
                continue;
            }
            match store.append_air_quality(&air).await {
                Ok(true) => summary.collected += 1,
                Ok(false) => {
                    debug!(city = %city.name, %timestamp, "duplicate air-quality reading");
                    summary.duplicates += 1;
                }
                Err(err) => {
                    warn!(city = %city.name, error = %err, "simulated air quality not stored");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

#[async_trait]
impl Collector for SimulatedCollector {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn collect(&self, store: &dyn TimeSeriesStore) -> Result<CollectionSummary> {
        self.collect_at(store, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn test_round_writes_pairable_samples() {
        // ---
        let store = MemoryStore::with_cities(["Delhi", "Pune", "Shimla"]);
        let collector = SimulatedCollector::seeded(7);
        let t0 = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();

        let summary = collector.collect_at(&store, t0).await.unwrap();
        assert_eq!(summary.collected, 3);
        assert_eq!(summary.failed, 0);

        for city in ["Delhi", "Pune", "Shimla"] {
            let window = store.sample_window(city, 10).await.unwrap();
            assert_eq!(window.len(), 1, "{city}");
        }
    }

    #[tokio::test]
    async fn test_values_stay_within_bands() {
        // ---
        let store = MemoryStore::with_cities(["Delhi", "Bangalore"]);
        let collector = SimulatedCollector::seeded(11);
        let t0 = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
        for i in 0..20 {
            collector
                .collect_at(&store, t0 + Duration::minutes(i))
                .await
                .unwrap();
        }

        for sample in store.sample_window("Delhi", 100).await.unwrap() {
            assert!((260..=300).contains(&sample.aqi));
            assert!((25.0..=31.0).contains(&sample.temperature));
            assert!((40.0..=80.0).contains(&sample.humidity));
            assert!((1010.0..=1020.0).contains(&sample.pressure));
        }
        for sample in store.sample_window("Bangalore", 100).await.unwrap() {
            assert!((90..=130).contains(&sample.aqi));
        }
    }

    #[tokio::test]
    async fn test_repeated_timestamp_counts_duplicates() {
        // ---
        let store = MemoryStore::with_cities(["Mumbai"]);
        let collector = SimulatedCollector::seeded(3);
        let t0 = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();

        collector.collect_at(&store, t0).await.unwrap();
        let again = collector.collect_at(&store, t0).await.unwrap();
        assert_eq!(again.collected, 0);
        assert_eq!(again.duplicates, 1);
    }

    #[test]
    fn test_seeded_collectors_agree() {
        // ---
        let t0 = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();
        let a = SimulatedCollector::seeded(42).generate("Kolkata", t0);
        let b = SimulatedCollector::seeded(42).generate("Kolkata", t0);
        assert_eq!(a, b);
    }
}
