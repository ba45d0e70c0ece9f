#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use airwatch::alerts::{Notification, Notifier, NotifyError};
use airwatch::collect::{CollectionSummary, Collector};
use airwatch::error::StoreError;
use airwatch::models::{Alert, AirQualityReading, City, Sample, WeatherReading};
use airwatch::store::{MemoryStore, TimeSeriesStore};
use airwatch::MonitorError;

// ---

pub fn base_time() -> DateTime<Utc> {
    // 2025-01-06 is a Monday
    Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap()
}

/// Hourly paired readings for `city`, one per entry of `aqis`.
pub async fn seed_city(store: &dyn TimeSeriesStore, city: &str, aqis: &[i32]) {
    // ---
    for (i, &aqi) in aqis.iter().enumerate() {
        let timestamp = base_time() + Duration::hours(i as i64);
        let wobble = (i % 7) as f64;
        let sample = Sample {
            city: city.to_string(),
            timestamp,
            aqi,
            pm25: f64::from(aqi) * 0.5 + wobble,
            pm10: f64::from(aqi) * 0.7 - wobble,
            no2: 35.0 + wobble * 2.0,
            so2: 12.0 + (i % 3) as f64,
            co: 1.0 + wobble / 10.0,
            o3: 50.0 + (i % 5) as f64 * 4.0,
            temperature: 27.0 + (i % 4) as f64,
            humidity: 50.0 + (i % 6) as f64 * 3.0,
            wind_speed: 8.0 + (i % 5) as f64,
            pressure: 1012.0 + (i % 3) as f64,
        };
        store.append_weather(&sample.weather()).await.unwrap();
        assert!(store.append_air_quality(&sample.air_quality()).await.unwrap());
    }
}

/// A gently oscillating AQI series of length `n` around `base`.
pub fn wavy_series(n: usize, base: i32) -> Vec<i32> {
    (0..n)
        .map(|i| base + ((i * 37) % 41) as i32 - 20 + (i / 5) as i32)
        .collect()
}

// ---

/// Delegates to a [`MemoryStore`], with switchable failures.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_alerts: bool,
    pub fail_latest_for: Option<String>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_alerts: false,
            fail_latest_for: None,
        }
    }
}

fn backend(message: &str) -> StoreError {
    StoreError::Backend {
        message: message.to_string(),
    }
}

#[async_trait]
impl TimeSeriesStore for FlakyStore {
    async fn all_cities(&self) -> Result<Vec<City>, StoreError> {
        self.inner.all_cities().await
    }

    async fn latest_reading(&self, city: &str) -> Result<Option<AirQualityReading>, StoreError> {
        if self.fail_latest_for.as_deref() == Some(city) {
            return Err(backend("read timed out"));
        }
        self.inner.latest_reading(city).await
    }

    async fn latest_weather(&self, city: &str) -> Result<Option<WeatherReading>, StoreError> {
        self.inner.latest_weather(city).await
    }

    async fn sample_window(
        &self,
        city: &str,
        max_count: usize,
    ) -> Result<Vec<Sample>, StoreError> {
        self.inner.sample_window(city, max_count).await
    }

    async fn append_air_quality(&self, reading: &AirQualityReading) -> Result<bool, StoreError> {
        self.inner.append_air_quality(reading).await
    }

    async fn append_weather(&self, reading: &WeatherReading) -> Result<(), StoreError> {
        self.inner.append_weather(reading).await
    }

    async fn append_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        if self.fail_alerts {
            return Err(backend("disk full"));
        }
        self.inner.append_alert(alert).await
    }

    async fn recent_alerts(
        &self,
        city: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Alert>, StoreError> {
        self.inner.recent_alerts(city, limit).await
    }
}

// ---

/// Collector that writes nothing.
pub struct IdleCollector;

#[async_trait]
impl Collector for IdleCollector {
    fn name(&self) -> &'static str {
        "idle"
    }

    async fn collect(&self, _store: &dyn TimeSeriesStore) -> airwatch::Result<CollectionSummary> {
        Ok(CollectionSummary {
            source: "idle".to_string(),
            ..CollectionSummary::default()
        })
    }
}

/// Collector that always fails.
pub struct BrokenCollector;

#[async_trait]
impl Collector for BrokenCollector {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn collect(&self, _store: &dyn TimeSeriesStore) -> airwatch::Result<CollectionSummary> {
        Err(MonitorError::Store(backend("connection refused")))
    }
}

/// Notifier that records every notification it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
