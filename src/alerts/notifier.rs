use async_trait::async_trait;
use serde::Serialize;

use super::engine::FiredAlert;
use crate::models::AqiCategory;

// ---

/// Payload handed to a [`Notifier`] for a high or severe alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    // ---
    pub city: String,
    pub aqi: i32,
    pub category: AqiCategory,
    pub health_message: String,
}

impl From<&FiredAlert> for Notification {
    fn from(fired: &FiredAlert) -> Self {
        // ---
        Self {
            city: fired.alert.city.clone(),
            aqi: fired.alert.aqi_value,
            category: fired.category,
            health_message: fired.alert.message.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("notification for {city} not delivered: {reason}")]
pub struct NotifyError {
    pub city: String,
    pub reason: String,
}

/// Outbound channel for alert notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log at `warn` level.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        // ---
        tracing::warn!(
            city = %notification.city,
            aqi = notification.aqi,
            category = %notification.category,
            "{}",
            notification.health_message
        );
        Ok(())
    }
}
