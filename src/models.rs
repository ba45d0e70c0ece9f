//! Data models for air-quality and weather samples, predictions and alerts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// A monitored city as listed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct City {
    // ---
    pub name: String,
    pub state: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl City {
    // ---
    pub fn named(name: impl Into<String>) -> Self {
        // ---
        Self {
            name: name.into(),
            state: None,
            latitude: None,
            longitude: None,
        }
    }
}

/// One air-quality measurement. At most one per (city, timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AirQualityReading {
    // ---
    pub city: String,
    pub timestamp: DateTime<Utc>,
    pub aqi: i32,
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
    pub so2: f64,
    pub co: f64,
    pub o3: f64,
}

/// One weather measurement, paired with air quality by truncated timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeatherReading {
    // ---
    pub city: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub pressure: f64,
}

/// Air-quality reading joined with the weather reading taken in the same second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Sample {
    // ---
    pub city: String,
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
}

impl Sample {
    // ---
    pub fn join(air: &AirQualityReading, weather: &WeatherReading) -> Self {
        // ---
        Self {
            city: air.city.clone(),
            timestamp: air.timestamp,
            aqi: air.aqi,
            pm25: air.pm25,
            pm10: air.pm10,
            no2: air.no2,
            so2: air.so2,
            co: air.co,
            o3: air.o3,
            temperature: weather.temperature,
            humidity: weather.humidity,
            wind_speed: weather.wind_speed,
            pressure: weather.pressure,
        }
    }

    /// The air-quality half of the sample.
    pub fn air_quality(&self) -> AirQualityReading {
        // ---
        AirQualityReading {
            city: self.city.clone(),
            timestamp: self.timestamp,
            aqi: self.aqi,
            pm25: self.pm25,
            pm10: self.pm10,
            no2: self.no2,
            so2: self.so2,
            co: self.co,
            o3: self.o3,
        }
    }

    /// The weather half of the sample.
    pub fn weather(&self) -> WeatherReading {
        // ---
        WeatherReading {
            city: self.city.clone(),
            timestamp: self.timestamp,
            temperature: self.temperature,
            humidity: self.humidity,
            wind_speed: self.wind_speed,
            pressure: self.pressure,
        }
    }
}

// ---

/// Direction of a forecast relative to the current reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Worsening,
    Stable,
    Improving,
}

/// Single-step AQI forecast for a city. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    // ---
    pub city: String,
    pub current_aqi: i32,
    pub predicted_aqi: i32,
    pub change: i32,
    pub timestamp: DateTime<Utc>,
}

impl Prediction {
    // ---
    /// Build a prediction from the model's real-valued output.
    ///
    /// The output is truncated toward zero, not rounded.
    pub fn from_estimate(city: &str, current_aqi: i32, estimate: f64) -> Self {
        // ---
        let predicted_aqi = estimate.trunc() as i32;
        Self {
            city: city.to_string(),
            current_aqi,
            predicted_aqi,
            change: predicted_aqi - current_aqi,
            timestamp: Utc::now(),
        }
    }

    /// Changes of more than five AQI points count as a trend.
    pub fn trend(&self) -> Trend {
        // ---
        if self.change > 5 {
            Trend::Worsening
        } else if self.change < -5 {
            Trend::Improving
        } else {
            Trend::Stable
        }
    }
}

// ---

/// Six-band AQI category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
    Severe,
}

impl AqiCategory {
    // ---
    pub fn label(self) -> &'static str {
        // ---
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Satisfactory => "Satisfactory",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Poor => "Poor",
            AqiCategory::VeryPoor => "Very Poor",
            AqiCategory::Severe => "Severe",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Severe,
}

impl Severity {
    // ---
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Severe => "severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "severe" => Ok(Severity::Severe),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Alert tier, ordered by escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertType {
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "HIGH ALERT")]
    HighAlert,
    #[serde(rename = "SEVERE ALERT")]
    SevereAlert,
}

impl AlertType {
    // ---
    pub fn label(self) -> &'static str {
        // ---
        match self {
            AlertType::Warning => "WARNING",
            AlertType::HighAlert => "HIGH ALERT",
            AlertType::SevereAlert => "SEVERE ALERT",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s {
            "WARNING" => Ok(AlertType::Warning),
            "HIGH ALERT" => Ok(AlertType::HighAlert),
            "SEVERE ALERT" => Ok(AlertType::SevereAlert),
            other => Err(format!("unknown alert type '{other}'")),
        }
    }
}

/// A persisted health alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    // ---
    pub city: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub aqi_value: i32,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn create_test_sample() -> Sample {
        // ---
        Sample {
            city: "Delhi".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap(),
            aqi: 287,
            pm25: 145.0,
            pm10: 198.0,
            no2: 45.0,
            so2: 12.0,
            co: 1.2,
            o3: 55.0,
            temperature: 28.5,
            humidity: 45.0,
            wind_speed: 12.3,
            pressure: 1013.25,
        }
    }

    #[test]
    fn test_sample_split_and_join() {
        // ---
        let sample = create_test_sample();
        let joined = Sample::join(&sample.air_quality(), &sample.weather());

        assert_eq!(joined, sample);
    }

    #[test]
    fn test_prediction_truncates_estimate() {
        // ---
        let up = Prediction::from_estimate("Delhi", 280, 291.97);
        assert_eq!(up.predicted_aqi, 291);
        assert_eq!(up.change, 11);

        let down = Prediction::from_estimate("Delhi", 280, 270.99);
        assert_eq!(down.predicted_aqi, 270);
        assert_eq!(down.change, -10);
    }

    #[test]
    fn test_prediction_trend() {
        // ---
        assert_eq!(Prediction::from_estimate("Pune", 100, 106.0).trend(), Trend::Worsening);
        assert_eq!(Prediction::from_estimate("Pune", 100, 105.0).trend(), Trend::Stable);
        assert_eq!(Prediction::from_estimate("Pune", 100, 95.0).trend(), Trend::Stable);
        assert_eq!(Prediction::from_estimate("Pune", 100, 94.0).trend(), Trend::Improving);
    }

    #[test]
    fn test_alert_type_labels_round_trip() {
        // ---
        for kind in [AlertType::Warning, AlertType::HighAlert, AlertType::SevereAlert] {
            assert_eq!(kind.label().parse::<AlertType>(), Ok(kind));
        }
        assert!("ALERT".parse::<AlertType>().is_err());
        assert_eq!(
            serde_json::to_string(&AlertType::SevereAlert).unwrap(),
            "\"SEVERE ALERT\""
        );
    }

    #[test]
    fn test_alert_types_order_by_escalation() {
        // ---
        assert!(AlertType::Warning < AlertType::HighAlert);
        assert!(AlertType::HighAlert < AlertType::SevereAlert);
        assert!(Severity::Medium < Severity::High);
    }
}
