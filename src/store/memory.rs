use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};

use super::TimeSeriesStore;
use crate::error::StoreError;
use crate::models::{Alert, AirQualityReading, City, Sample, WeatherReading};

// ---

#[derive(Debug, Default)]
struct Tables {
    cities: Vec<City>,
    air_quality: HashMap<String, BTreeMap<DateTime<Utc>, AirQualityReading>>,
    weather: HashMap<String, Vec<WeatherReading>>,
    alerts: Vec<Alert>,
}

impl Tables {
    // ---
    fn require_city(&self, city: &str) -> Result<(), StoreError> {
        // ---
        if self.cities.iter().any(|c| c.name == city) {
            Ok(())
        } else {
            Err(StoreError::UnknownCity {
                city: city.to_string(),
            })
        }
    }
}

/// In-memory [`TimeSeriesStore`] with the same contract as the Postgres store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cities<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // ---
        let store = Self::new();
        for name in names {
            store.add_city(City::named(name));
        }
        store
    }

    /// Register a city. Re-registering an existing name is a no-op.
    pub fn add_city(&self, city: City) {
        // ---
        let mut tables = self.tables.write().expect("memory store lock poisoned");
        if !tables.cities.iter().any(|c| c.name == city.name) {
            tables.cities.push(city);
            tables.cities.sort_by(|a, b| a.name.cmp(&b.name));
        }
    }

    pub fn alert_count(&self) -> usize {
        // ---
        self.tables
            .read()
            .expect("memory store lock poisoned")
            .alerts
            .len()
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    // ---
    async fn all_cities(&self) -> Result<Vec<City>, StoreError> {
        // ---
        let tables = self.tables.read().expect("memory store lock poisoned");
        Ok(tables.cities.clone())
    }

    async fn latest_reading(&self, city: &str) -> Result<Option<AirQualityReading>, StoreError> {
        // ---
        let tables = self.tables.read().expect("memory store lock poisoned");
        Ok(tables
            .air_quality
            .get(city)
            .and_then(|readings| readings.values().next_back())
            .cloned())
    }

    async fn latest_weather(&self, city: &str) -> Result<Option<WeatherReading>, StoreError> {
        // ---
        let tables = self.tables.read().expect("memory store lock poisoned");
        Ok(tables
            .weather
            .get(city)
            .and_then(|readings| readings.iter().max_by_key(|w| w.timestamp))
            .cloned())
    }

    async fn sample_window(
        &self,
        city: &str,
        max_count: usize,
    ) -> Result<Vec<Sample>, StoreError> {
        // ---
        let tables = self.tables.read().expect("memory store lock poisoned");
        let Some(readings) = tables.air_quality.get(city) else {
            return Ok(Vec::new());
        };
        let weather = tables.weather.get(city).map(Vec::as_slice).unwrap_or(&[]);

        let mut window: Vec<Sample> = readings
            .values()
            .rev()
            .filter_map(|air| {
                let second = air.timestamp.trunc_subsecs(0);
                weather
                    .iter()
                    .find(|w| w.timestamp.trunc_subsecs(0) == second)
                    .map(|w| Sample::join(air, w))
            })
            .take(max_count)
            .collect();
        window.reverse();

        Ok(window)
    }

    async fn append_air_quality(&self, reading: &AirQualityReading) -> Result<bool, StoreError> {
        // ---
        let mut tables = self.tables.write().expect("memory store lock poisoned");
        tables.require_city(&reading.city)?;

        let readings = tables.air_quality.entry(reading.city.clone()).or_default();
        if readings.contains_key(&reading.timestamp) {
            return Ok(false);
        }
        readings.insert(reading.timestamp, reading.clone());
        Ok(true)
    }

    async fn append_weather(&self, reading: &WeatherReading) -> Result<(), StoreError> {
        // ---
        let mut tables = self.tables.write().expect("memory store lock poisoned");
        tables.require_city(&reading.city)?;

        tables
            .weather
            .entry(reading.city.clone())
            .or_default()
            .push(reading.clone());
        Ok(())
    }

    async fn append_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        // ---
        let mut tables = self.tables.write().expect("memory store lock poisoned");
        tables.require_city(&alert.city)?;

        tables.alerts.push(alert.clone());
        Ok(())
    }

    async fn recent_alerts(
        &self,
        city: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError> {
        // ---
        let tables = self.tables.read().expect("memory store lock poisoned");
        Ok(tables
            .alerts
            .iter()
            .rev()
            .filter(|alert| city.map_or(true, |name| alert.city == name))
            .take(limit)
            .cloned()
            .collect())
    }
}
