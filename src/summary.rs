//! Cross-city pollution summary built from each city's latest reading and
//! latest weather.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alerts::{classify, Thresholds};
use crate::error::Result;
use crate::models::{AirQualityReading, AlertType, AqiCategory, Severity, WeatherReading};
use crate::store::TimeSeriesStore;

// ---

/// AQI above which a city counts as dangerous.
pub const DANGEROUS_AQI: i32 = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityStatus {
    // ---
    pub city: String,
    pub aqi: i32,
    pub category: AqiCategory,
    pub severity: Severity,
    pub alert_level: Option<AlertType>,
    pub pm25: f64,
    pub pm10: f64,
    pub measured_at: DateTime<Utc>,
    /// `None` when the city has no weather reading yet.
    pub weather: Option<CurrentWeather>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentWeather {
    // ---
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub measured_at: DateTime<Utc>,
}

impl From<&WeatherReading> for CurrentWeather {
    fn from(reading: &WeatherReading) -> Self {
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            wind_speed: reading.wind_speed,
            measured_at: reading.timestamp,
        }
    }
}

/// Latest air-quality reading of one city plus its latest weather, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct CityLatest {
    pub reading: AirQualityReading,
    pub weather: Option<WeatherReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAqi {
    pub city: String,
    pub aqi: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutionSummary {
    // ---
    pub cities: Vec<CityStatus>,
    pub most_polluted: Option<CityAqi>,
    pub least_polluted: Option<CityAqi>,
    pub average_aqi: Option<f64>,
    pub dangerous_count: usize,
}

impl PollutionSummary {
    // ---
    /// Summarize `latest`, one reading per city, in the order given.
    ///
    /// Ties for most or least polluted go to the earliest city.
    pub fn from_latest(latest: &[CityLatest], thresholds: &Thresholds) -> Self {
        // ---
        let cities: Vec<CityStatus> = latest
            .iter()
            .map(|CityLatest { reading, weather }| {
                let (category, severity) = classify(reading.aqi);
                CityStatus {
                    city: reading.city.clone(),
                    aqi: reading.aqi,
                    category,
                    severity,
                    alert_level: thresholds.alert_type_for(reading.aqi),
                    pm25: reading.pm25,
                    pm10: reading.pm10,
                    measured_at: reading.timestamp,
                    weather: weather.as_ref().map(CurrentWeather::from),
                }
            })
            .collect();

        let mut most: Option<&CityStatus> = None;
        let mut least: Option<&CityStatus> = None;
        for status in &cities {
            if most.map_or(true, |m| status.aqi > m.aqi) {
                most = Some(status);
            }
            if least.map_or(true, |l| status.aqi < l.aqi) {
                least = Some(status);
            }
        }
        let to_city_aqi = |s: &CityStatus| CityAqi {
            city: s.city.clone(),
            aqi: s.aqi,
        };
        let most_polluted = most.map(to_city_aqi);
        let least_polluted = least.map(to_city_aqi);

        let average_aqi = (!cities.is_empty()).then(|| {
            cities.iter().map(|s| f64::from(s.aqi)).sum::<f64>() / cities.len() as f64
        });
        let dangerous_count = cities.iter().filter(|s| s.aqi > DANGEROUS_AQI).count();

        Self {
            cities,
            most_polluted,
            least_polluted,
            average_aqi,
            dangerous_count,
        }
    }
}

/// Summary over every city in the store that has at least one reading.
pub async fn summarize(
    store: &dyn TimeSeriesStore,
    thresholds: &Thresholds,
) -> Result<PollutionSummary> {
    // ---
    let mut latest = Vec::new();
    for city in store.all_cities().await? {
        if let Some(reading) = store.latest_reading(&city.name).await? {
            let weather = store.latest_weather(&city.name).await?;
            latest.push(CityLatest { reading, weather });
        }
    }
    Ok(PollutionSummary::from_latest(&latest, thresholds))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn reading(city: &str, aqi: i32) -> CityLatest {
        // ---
        CityLatest {
            reading: AirQualityReading {
                city: city.to_string(),
                timestamp: Utc::now(),
                aqi,
                pm25: 80.0,
                pm10: 120.0,
                no2: 40.0,
                so2: 12.0,
                co: 1.0,
                o3: 50.0,
            },
            weather: None,
        }
    }

    #[test]
    fn test_summary_statistics() {
        // ---
        let latest = vec![
            reading("Bangalore", 110),
            reading("Delhi", 290),
            reading("Kolkata", 205),
            reading("Pune", 110),
        ];
        let summary = PollutionSummary::from_latest(&latest, &Thresholds::default());

        assert_eq!(summary.most_polluted.unwrap().city, "Delhi");
        assert_eq!(summary.least_polluted.unwrap().city, "Bangalore");
        assert_eq!(summary.average_aqi, Some(178.75));
        assert_eq!(summary.dangerous_count, 2);

        let kolkata = &summary.cities[2];
        assert_eq!(kolkata.alert_level, Some(AlertType::HighAlert));
        assert_eq!(kolkata.category, AqiCategory::Poor);
        assert_eq!(summary.cities[0].alert_level, None);
    }

    #[test]
    fn test_empty_summary() {
        // ---
        let summary = PollutionSummary::from_latest(&[], &Thresholds::default());
        assert!(summary.cities.is_empty());
        assert!(summary.most_polluted.is_none());
        assert!(summary.average_aqi.is_none());
        assert_eq!(summary.dangerous_count, 0);
    }

    #[test]
    fn test_exactly_dangerous_threshold_is_not_counted() {
        // ---
        let summary = PollutionSummary::from_latest(&[reading("Delhi", 200)], &Thresholds::default());
        assert_eq!(summary.dangerous_count, 0);
    }

    #[test]
    fn test_weather_is_reported_when_present() {
        // ---
        let mut delhi = reading("Delhi", 240);
        delhi.weather = Some(WeatherReading {
            city: "Delhi".to_string(),
            timestamp: delhi.reading.timestamp,
            temperature: 31.5,
            humidity: 48.0,
            wind_speed: 6.5,
            pressure: 1009.0,
        });
        let summary =
            PollutionSummary::from_latest(&[delhi, reading("Goa", 60)], &Thresholds::default());

        let weather = summary.cities[0].weather.as_ref().unwrap();
        assert_eq!(weather.temperature, 31.5);
        assert_eq!(weather.humidity, 48.0);
        assert_eq!(weather.wind_speed, 6.5);
        assert!(summary.cities[1].weather.is_none());
    }
}
