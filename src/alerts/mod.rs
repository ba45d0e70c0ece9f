//! Alerting gateway.
//!
//! Classifies AQI readings into categories and severities, fires and persists
//! alerts at configurable thresholds and hands high and severe alerts to a
//! [`Notifier`].

mod classify;
mod engine;
mod notifier;

pub use classify::{classify, health_message, recommendations, Thresholds};
pub use engine::{AlertEngine, DedupPolicy, FiredAlert};
pub use notifier::{LogNotifier, Notification, Notifier, NotifyError};
