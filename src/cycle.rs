//! One monitoring cycle: collect, evaluate alerts, notify and forecast.
//!
//! Every step and every city is isolated. A failure is recorded in the
//! [`CycleReport`] as a typed per-city outcome and the cycle carries on.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::alerts::{AlertEngine, FiredAlert, Notification, Notifier};
use crate::collect::{CollectionSummary, Collector};
use crate::error::MonitorError;
use crate::forecast::{Forecast, Forecaster};
use crate::store::TimeSeriesStore;

// ---

/// Result of one step for one city.
#[derive(Debug)]
pub struct CityOutcome<T> {
    pub city: String,
    pub result: Result<T, MonitorError>,
}

impl<T> CityOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl<T: Serialize> Serialize for CityOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // ---
        let mut state = serializer.serialize_struct("CityOutcome", 3)?;
        state.serialize_field("city", &self.city)?;
        match &self.result {
            Ok(value) => {
                state.serialize_field("status", "ok")?;
                state.serialize_field("value", value)?;
            }
            Err(err) => {
                state.serialize_field("status", "error")?;
                state.serialize_field("error", &ErrorBody::from(err))?;
            }
        }
        state.end()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl From<&MonitorError> for ErrorBody {
    fn from(err: &MonitorError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Failure of a whole step, such as listing cities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepError {
    pub step: &'static str,
    pub kind: &'static str,
    pub message: String,
}

impl StepError {
    fn new(step: &'static str, err: &MonitorError) -> Self {
        Self {
            step,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationOutcome {
    pub city: String,
    pub delivered: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CycleReport {
    // ---
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub collection: Option<CollectionSummary>,
    pub evaluations: Vec<CityOutcome<Option<FiredAlert>>>,
    pub notifications: Vec<NotificationOutcome>,
    pub predictions: Vec<CityOutcome<Forecast>>,
    pub step_errors: Vec<StepError>,
}

impl CycleReport {
    /// Alerts fired during this cycle, in evaluation order.
    pub fn fired(&self) -> impl Iterator<Item = &FiredAlert> {
        self.evaluations
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok().and_then(Option::as_ref))
    }
}

/// Owns the collaborators of a cycle. Cycles never overlap.
pub struct MonitoringCycle {
    store: Arc<dyn TimeSeriesStore>,
    collector: Box<dyn Collector>,
    alerts: Arc<AlertEngine>,
    forecaster: Arc<Forecaster>,
    notifier: Arc<dyn Notifier>,
    prediction_cities: Vec<String>,
    running: Mutex<()>,
}

impl MonitoringCycle {
    // ---
    pub fn new(
        store: Arc<dyn TimeSeriesStore>,
        collector: Box<dyn Collector>,
        alerts: Arc<AlertEngine>,
        forecaster: Arc<Forecaster>,
        notifier: Arc<dyn Notifier>,
        prediction_cities: Vec<String>,
    ) -> Self {
        // ---
        Self {
            store,
            collector,
            alerts,
            forecaster,
            notifier,
            prediction_cities,
            running: Mutex::new(()),
        }
    }

    pub fn prediction_cities(&self) -> &[String] {
        &self.prediction_cities
    }

    pub async fn run_cycle(&self) -> CycleReport {
        // ---
        let run_id = Uuid::new_v4();
        self.run(run_id)
            .instrument(info_span!("cycle", %run_id))
            .await
    }

    async fn run(&self, run_id: Uuid) -> CycleReport {
        // ---
        let _running = self.running.lock().await;
        let started_at = Utc::now();
        let mut step_errors = Vec::new();
        info!("monitoring cycle started");

        // Step 1: collection
        let collection = match self.collector.collect(&*self.store).await {
            Ok(summary) => {
                info!(
                    source = %summary.source,
                    collected = summary.collected,
                    failed = summary.failed,
                    "collection finished"
                );
                Some(summary)
            }
            Err(err) => {
                error!(error = %err, "collection failed");
                step_errors.push(StepError::new("collect", &err));
                None
            }
        };

        // Step 2: alert evaluation for every known city
        let mut evaluations = Vec::new();
        match self.store.all_cities().await {
            Ok(cities) => {
                for city in cities {
                    let result = self.alerts.check_city(&city.name).await;
                    if let Err(err) = &result {
                        warn!(city = %city.name, error = %err, "alert evaluation failed");
                    }
                    evaluations.push(CityOutcome {
                        city: city.name,
                        result,
                    });
                }
            }
            Err(err) => {
                let err = MonitorError::from(err);
                error!(error = %err, "could not list cities");
                step_errors.push(StepError::new("evaluate", &err));
            }
        }

        // Step 3: notify for high and severe alerts
        let mut notifications = Vec::new();
        for fired in evaluations
            .iter()
            .filter_map(|o| o.result.as_ref().ok().and_then(Option::as_ref))
            .filter(|f| f.needs_notification())
        {
            let notification = Notification::from(fired);
            let outcome = match self.notifier.notify(&notification).await {
                Ok(()) => NotificationOutcome {
                    city: notification.city,
                    delivered: true,
                    error: None,
                },
                Err(err) => {
                    warn!(error = %err, "notification failed");
                    NotificationOutcome {
                        city: notification.city,
                        delivered: false,
                        error: Some(err.to_string()),
                    }
                }
            };
            notifications.push(outcome);
        }

        // Step 4: forecasts
        let predictions = forecast_cities(&self.forecaster, &self.prediction_cities).await;

        let report = CycleReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            collection,
            evaluations,
            notifications,
            predictions,
            step_errors,
        };
        info!(
            alerts = report.fired().count(),
            notifications = report.notifications.len(),
            "monitoring cycle finished"
        );
        report
    }
}

/// Forecast each city in order. One city's failure never stops the rest.
pub async fn forecast_cities(
    forecaster: &Forecaster,
    cities: &[String],
) -> Vec<CityOutcome<Forecast>> {
    // ---
    let mut predictions = Vec::with_capacity(cities.len());
    for city in cities {
        let result = forecaster.predict_next(city).await;
        match &result {
            Ok(forecast) => info!(
                city = %city,
                current = forecast.prediction.current_aqi,
                predicted = forecast.prediction.predicted_aqi,
                trend = ?forecast.trend,
                "forecast"
            ),
            Err(err) => warn!(city = %city, error = %err, "forecast failed"),
        }
        predictions.push(CityOutcome {
            city: city.clone(),
            result,
        });
    }
    predictions
}

/// Run a cycle every `every`, starting immediately.
pub fn spawn_schedule(cycle: Arc<MonitoringCycle>, every: Duration) -> JoinHandle<()> {
    // ---
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            cycle.run_cycle().await;
        }
    })
}
