mod common;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use airwatch::alerts::{recommendations, AlertEngine, DedupPolicy};
use airwatch::models::{AlertType, AqiCategory, Severity};
use airwatch::store::{MemoryStore, TimeSeriesStore};

use common::{seed_city, FlakyStore};

// ---

#[tokio::test]
async fn testville_fires_severe_alert() -> Result<()> {
    // ---
    let aqis = [140, 155, 170, 186, 201, 217, 232, 248, 263, 279, 294, 310];
    let store = Arc::new(MemoryStore::with_cities(["Testville"]));
    seed_city(&*store, "Testville", &aqis).await;
    let engine = AlertEngine::new(store.clone());

    let fired = engine.check_city("Testville").await?.unwrap();
    assert_eq!(fired.alert.alert_type, AlertType::SevereAlert);
    assert_eq!(fired.alert.severity, Severity::Severe);
    assert_eq!(fired.category, AqiCategory::VeryPoor);
    assert_eq!(fired.alert.aqi_value, 310);
    assert!(fired.persisted);
    assert!(fired.needs_notification());
    assert_eq!(fired.recommendations.len(), 8);

    let stored = store.recent_alerts(Some("Testville"), 10).await?;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0], fired.alert);
    Ok(())
}

#[tokio::test]
async fn danger_boundary_is_inclusive() -> Result<()> {
    // ---
    let store = Arc::new(MemoryStore::with_cities(["Agra", "Noida"]));
    seed_city(&*store, "Agra", &[199]).await;
    seed_city(&*store, "Noida", &[200]).await;
    let engine = AlertEngine::new(store);

    let agra = engine.check_city("Agra").await?.unwrap();
    assert_eq!(agra.alert.alert_type, AlertType::Warning);
    assert_eq!(agra.alert.severity, Severity::Medium);
    assert!(!agra.needs_notification());

    let noida = engine.check_city("Noida").await?.unwrap();
    assert_eq!(noida.alert.alert_type, AlertType::HighAlert);
    // 200 still sits in the Moderate band.
    assert_eq!(noida.category, AqiCategory::Moderate);
    Ok(())
}

#[tokio::test]
async fn clean_air_and_missing_readings_fire_nothing() -> Result<()> {
    // ---
    let store = Arc::new(MemoryStore::with_cities(["Shillong", "Leh"]));
    seed_city(&*store, "Shillong", &[42]).await;
    let engine = AlertEngine::new(store.clone());

    assert!(engine.check_city("Shillong").await?.is_none());
    assert!(engine.check_city("Leh").await?.is_none());
    assert_eq!(store.alert_count(), 0);
    Ok(())
}

#[test]
fn recommendations_only_grow_with_aqi() {
    // ---
    let mut previous = recommendations(0);
    for aqi in (10..=500).step_by(10) {
        let current = recommendations(aqi);
        assert!(current.len() >= previous.len(), "shrank at {aqi}");
        assert!(previous.iter().all(|r| current.contains(r)));
        previous = current;
    }
}

#[tokio::test]
async fn failed_write_still_returns_unsent_alert() -> Result<()> {
    // ---
    let mut flaky = FlakyStore::new(MemoryStore::with_cities(["Delhi"]));
    seed_city(&flaky, "Delhi", &[320]).await;
    flaky.fail_alerts = true;
    let store = Arc::new(flaky);
    let engine = AlertEngine::new(store.clone());

    let fired = engine.check_city("Delhi").await?.unwrap();
    assert!(!fired.persisted);
    assert_eq!(fired.alert.alert_type, AlertType::SevereAlert);
    assert_eq!(store.inner.alert_count(), 0);
    Ok(())
}

#[tokio::test]
async fn once_per_episode_fires_on_escalation_only() -> Result<()> {
    // ---
    let store = Arc::new(MemoryStore::with_cities(["Patna"]));
    seed_city(&*store, "Patna", &[180, 185, 230, 190, 120, 175]).await;
    let engine = AlertEngine::new(store.clone()).with_dedup(DedupPolicy::OncePerEpisode);

    let mut fired = Vec::new();
    for sample in store.sample_window("Patna", 10).await? {
        let reading = sample.air_quality();
        fired.push(
            engine
                .evaluate("Patna", &reading)
                .await
                .map(|f| f.alert.alert_type),
        );
    }

    assert_eq!(
        fired,
        vec![
            Some(AlertType::Warning),
            None,
            Some(AlertType::HighAlert),
            None,
            None,
            Some(AlertType::Warning),
        ]
    );
    assert_eq!(store.alert_count(), 3);
    Ok(())
}

#[tokio::test]
async fn every_evaluation_fires_each_time() -> Result<()> {
    // ---
    let store = Arc::new(MemoryStore::with_cities(["Kanpur"]));
    seed_city(&*store, "Kanpur", &[260]).await;
    let engine = AlertEngine::new(store.clone());

    for _ in 0..3 {
        assert!(engine.check_city("Kanpur").await?.is_some());
    }
    assert_eq!(store.alert_count(), 3);
    Ok(())
}

#[tokio::test]
async fn evaluate_all_follows_city_order() -> Result<()> {
    // ---
    let store = Arc::new(MemoryStore::with_cities(["Delhi", "Mumbai", "Pune"]));
    seed_city(&*store, "Delhi", &[350]).await;
    seed_city(&*store, "Mumbai", &[90]).await;
    seed_city(&*store, "Pune", &[160]).await;
    let engine = AlertEngine::new(store.clone());

    let cities: Vec<String> = ["Pune", "Mumbai", "Delhi", "Goa"]
        .into_iter()
        .map(String::from)
        .collect();
    let mut latest = HashMap::new();
    for city in &cities {
        if let Some(reading) = store.latest_reading(city).await? {
            latest.insert(city.clone(), reading);
        }
    }

    let fired = engine.evaluate_all(&cities, &latest).await;
    let names: Vec<&str> = fired.iter().map(|f| f.alert.city.as_str()).collect();
    assert_eq!(names, ["Pune", "Delhi"]);

    // Newest first, optionally filtered and limited.
    let recent = store.recent_alerts(None, 10).await?;
    assert_eq!(recent[0].city, "Delhi");
    assert_eq!(recent[1].city, "Pune");
    assert_eq!(store.recent_alerts(None, 1).await?.len(), 1);
    assert!(store.recent_alerts(Some("Mumbai"), 10).await?.is_empty());
    Ok(())
}
