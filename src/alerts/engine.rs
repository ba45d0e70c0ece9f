use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::classify::{classify, health_message, recommendations, Thresholds};
use crate::error::Result;
use crate::models::{Alert, AlertType, AirQualityReading, AqiCategory, Severity};
use crate::store::TimeSeriesStore;

// ---

/// When repeated evaluations of an alerting city produce new alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// Every evaluation at or above the warning threshold fires.
    #[default]
    EveryEvaluation,
    /// Fire once per episode; escalations to a higher tier fire again.
    OncePerEpisode,
}

impl FromStr for DedupPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // ---
        match s.trim().to_ascii_lowercase().as_str() {
            "every-evaluation" => Ok(DedupPolicy::EveryEvaluation),
            "once-per-episode" => Ok(DedupPolicy::OncePerEpisode),
            other => Err(format!(
                "unknown dedup policy '{other}' (expected every-evaluation or once-per-episode)"
            )),
        }
    }
}

/// An alert produced by an evaluation, with the context that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FiredAlert {
    // ---
    pub alert: Alert,
    pub category: AqiCategory,
    pub recommendations: Vec<String>,
    pub pm25: f64,
    pub pm10: f64,
    /// `false` when the alert could not be written to the store.
    pub persisted: bool,
}

impl FiredAlert {
    pub fn needs_notification(&self) -> bool {
        matches!(self.alert.severity, Severity::High | Severity::Severe)
    }
}

/// Threshold evaluation and alert persistence.
pub struct AlertEngine {
    store: Arc<dyn TimeSeriesStore>,
    thresholds: Thresholds,
    dedup: DedupPolicy,
    /// Highest tier fired in each city's open episode, keyed by lowercased name.
    episodes: Mutex<HashMap<String, AlertType>>,
}

impl AlertEngine {
    // ---
    pub fn new(store: Arc<dyn TimeSeriesStore>) -> Self {
        // ---
        Self {
            store,
            thresholds: Thresholds::default(),
            dedup: DedupPolicy::default(),
            episodes: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Evaluate `latest` for `city`; fires and persists an alert when the AQI
    /// reaches the warning threshold.
    ///
    /// A failed write does not fail the evaluation. The alert is returned
    /// with `persisted == false`.
    #[tracing::instrument(skip(self, latest), fields(aqi = latest.aqi))]
    pub async fn evaluate(&self, city: &str, latest: &AirQualityReading) -> Option<FiredAlert> {
        // ---
        let aqi = latest.aqi;
        let Some(alert_type) = self.thresholds.alert_type_for(aqi) else {
            self.close_episode(city);
            return None;
        };
        if !self.should_fire(city, alert_type) {
            debug!(%alert_type, "suppressed within open episode");
            return None;
        }

        let (category, severity) = classify(aqi);
        let alert = Alert {
            city: city.to_string(),
            alert_type,
            severity,
            aqi_value: aqi,
            message: health_message(aqi).to_string(),
            sent_at: Utc::now(),
        };

        let persisted = match self.store.append_alert(&alert).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "alert not persisted");
                false
            }
        };
        info!(%alert_type, %severity, persisted, "alert fired");

        Some(FiredAlert {
            alert,
            category,
            recommendations: recommendations(aqi).into_iter().map(String::from).collect(),
            pm25: latest.pm25,
            pm10: latest.pm10,
            persisted,
        })
    }

    /// Evaluate each city in `cities` order against its entry in `latest`.
    /// Cities without a reading are skipped.
    pub async fn evaluate_all(
        &self,
        cities: &[String],
        latest: &HashMap<String, AirQualityReading>,
    ) -> Vec<FiredAlert> {
        // ---
        let mut fired = Vec::new();
        for city in cities {
            if let Some(reading) = latest.get(city) {
                fired.extend(self.evaluate(city, reading).await);
            }
        }
        fired
    }

    /// Read the latest reading of `city` from the store and evaluate it.
    pub async fn check_city(&self, city: &str) -> Result<Option<FiredAlert>> {
        // ---
        match self.store.latest_reading(city).await? {
            Some(reading) => Ok(self.evaluate(city, &reading).await),
            None => Ok(None),
        }
    }

    fn should_fire(&self, city: &str, alert_type: AlertType) -> bool {
        // ---
        if self.dedup == DedupPolicy::EveryEvaluation {
            return true;
        }
        let mut episodes = self.episodes.lock().expect("alert episode lock poisoned");
        match episodes.get(&city.to_lowercase()) {
            Some(&open) if open >= alert_type => false,
            _ => {
                episodes.insert(city.to_lowercase(), alert_type);
                true
            }
        }
    }

    fn close_episode(&self, city: &str) {
        // ---
        let mut episodes = self.episodes.lock().expect("alert episode lock poisoned");
        episodes.remove(&city.to_lowercase());
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::store::MemoryStore;

    fn reading(city: &str, aqi: i32) -> AirQualityReading {
        // ---
        AirQualityReading {
            city: city.to_string(),
            timestamp: Utc::now(),
            aqi,
            pm25: f64::from(aqi) * 0.5,
            pm10: f64::from(aqi) * 0.7,
            no2: 45.0,
            so2: 15.0,
            co: 1.4,
            o3: 60.0,
        }
    }

    fn create_test_engine(dedup: DedupPolicy) -> (Arc<MemoryStore>, AlertEngine) {
        // ---
        let store = Arc::new(MemoryStore::with_cities(["Delhi", "Mumbai"]));
        let engine = AlertEngine::new(store.clone()).with_dedup(dedup);
        (store, engine)
    }

    #[tokio::test]
    async fn test_below_warning_fires_nothing() {
        // ---
        let (store, engine) = create_test_engine(DedupPolicy::EveryEvaluation);
        assert!(engine.evaluate("Delhi", &reading("Delhi", 149)).await.is_none());
        assert_eq!(store.alert_count(), 0);
    }

    #[tokio::test]
    async fn test_boundary_between_warning_and_high_alert() {
        // ---
        let (_store, engine) = create_test_engine(DedupPolicy::EveryEvaluation);

        let warning = engine.evaluate("Delhi", &reading("Delhi", 199)).await.unwrap();
        assert_eq!(warning.alert.alert_type, AlertType::Warning);
        assert_eq!(warning.alert.severity, Severity::Medium);

        let high = engine.evaluate("Delhi", &reading("Delhi", 200)).await.unwrap();
        assert_eq!(high.alert.alert_type, AlertType::HighAlert);
        assert_eq!(high.alert.severity, Severity::Medium);
        assert!(!high.needs_notification());
    }

    #[tokio::test]
    async fn test_fired_alert_carries_context() {
        // ---
        let (store, engine) = create_test_engine(DedupPolicy::EveryEvaluation);
        let fired = engine.evaluate("Delhi", &reading("Delhi", 320)).await.unwrap();

        assert_eq!(fired.category, AqiCategory::VeryPoor);
        assert_eq!(fired.recommendations.len(), 8);
        assert_eq!(fired.pm25, 160.0);
        assert!(fired.persisted);
        assert!(fired.needs_notification());
        assert_eq!(store.alert_count(), 1);
    }

    #[tokio::test]
    async fn test_every_evaluation_fires_repeatedly() {
        // ---
        let (store, engine) = create_test_engine(DedupPolicy::EveryEvaluation);
        for _ in 0..3 {
            assert!(engine.evaluate("Mumbai", &reading("Mumbai", 180)).await.is_some());
        }
        assert_eq!(store.alert_count(), 3);
    }

    #[tokio::test]
    async fn test_once_per_episode_suppresses_until_recovery() {
        // ---
        let (store, engine) = create_test_engine(DedupPolicy::OncePerEpisode);

        assert!(engine.evaluate("Delhi", &reading("Delhi", 210)).await.is_some());
        // Same or lower tier inside the episode is suppressed.
        assert!(engine.evaluate("Delhi", &reading("Delhi", 220)).await.is_none());
        assert!(engine.evaluate("Delhi", &reading("Delhi", 160)).await.is_none());
        // Escalation fires.
        let escalated = engine.evaluate("Delhi", &reading("Delhi", 310)).await.unwrap();
        assert_eq!(escalated.alert.alert_type, AlertType::SevereAlert);
        // Recovery closes the episode.
        assert!(engine.evaluate("Delhi", &reading("Delhi", 90)).await.is_none());
        assert!(engine.evaluate("Delhi", &reading("Delhi", 160)).await.is_some());

        assert_eq!(store.alert_count(), 3);
    }

    #[tokio::test]
    async fn test_evaluate_all_preserves_order() {
        // ---
        let (_store, engine) = create_test_engine(DedupPolicy::EveryEvaluation);
        let latest: HashMap<String, AirQualityReading> = [
            ("Delhi".to_string(), reading("Delhi", 250)),
            ("Mumbai".to_string(), reading("Mumbai", 170)),
        ]
        .into_iter()
        .collect();
        let cities = vec!["Mumbai".to_string(), "Pune".to_string(), "Delhi".to_string()];

        let fired = engine.evaluate_all(&cities, &latest).await;
        let order: Vec<&str> = fired.iter().map(|f| f.alert.city.as_str()).collect();
        assert_eq!(order, vec!["Mumbai", "Delhi"]);
    }

    #[test]
    fn test_dedup_policy_parsing() {
        // ---
        assert_eq!(
            "once-per-episode".parse::<DedupPolicy>(),
            Ok(DedupPolicy::OncePerEpisode)
        );
        assert_eq!(
            " Every-Evaluation ".parse::<DedupPolicy>(),
            Ok(DedupPolicy::EveryEvaluation)
        );
        assert!("sometimes".parse::<DedupPolicy>().is_err());
    }
}
