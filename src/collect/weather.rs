use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{CollectionSummary, Collector};
use crate::error::Result;
use crate::models::WeatherReading;
use crate::store::TimeSeriesStore;

// ---

pub const DEFAULT_WEATHER_API_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Subset of the current-weather response that is stored.
#[derive(Debug, Deserialize)]
struct CurrentWeather {
    main: MainBlock,
    wind: WindBlock,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: f64,
}

/// Current weather per city from the OpenWeatherMap API, metric units.
///
/// Writes weather readings only.
pub struct WeatherCollector {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl WeatherCollector {
    // ---
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> reqwest::Result<Self> {
        // ---
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }

    async fn fetch(&self, city: &str) -> reqwest::Result<CurrentWeather> {
        // ---
        let query = format!("{city},IN");
        debug!(city, url = %self.api_url, "fetching current weather");

        self.client
            .get(&self.api_url)
            .query(&[
                ("q", query.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<CurrentWeather>()
            .await
    }
}

#[async_trait]
impl Collector for WeatherCollector {
    fn name(&self) -> &'static str {
        "openweather"
    }

    async fn collect(&self, store: &dyn TimeSeriesStore) -> Result<CollectionSummary> {
        // ---
        let mut summary = CollectionSummary::new(self.name());

        for city in store.all_cities().await? {
            let current = match self.fetch(&city.name).await {
                Ok(current) => current,
                Err(err) => {
                    warn!(city = %city.name, error = %err, "weather request failed");
                    summary.failed += 1;
                    continue;
                }
            };

            let reading = WeatherReading {
                city: city.name.clone(),
                timestamp: Utc::now(),
                temperature: current.main.temp,
                humidity: current.main.humidity,
                wind_speed: current.wind.speed,
                pressure: current.main.pressure,
            };
            match store.append_weather(&reading).await {
                Ok(()) => summary.collected += 1,
                Err(err) => {
                    warn!(city = %city.name, error = %err, "weather reading not stored");
                    summary.failed += 1;
                }
            }
        }

        info!(
            collected = summary.collected,
            failed = summary.failed,
            "weather collection finished"
        );
        Ok(summary)
    }
}
