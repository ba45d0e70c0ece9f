use serde::Serialize;

use crate::models::{AlertType, AqiCategory, Severity};

// ---

/// AQI levels at which each alert tier starts. Strictly ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    // ---
    warning: i32,
    danger: i32,
    severe: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        // ---
        Self {
            warning: 150,
            danger: 200,
            severe: 300,
        }
    }
}

impl Thresholds {
    // ---
    pub fn new(warning: i32, danger: i32, severe: i32) -> Result<Self, String> {
        // ---
        if warning <= 0 {
            return Err(format!("warning threshold must be positive, got {warning}"));
        }
        if !(warning < danger && danger < severe) {
            return Err(format!(
                "thresholds must be strictly ascending, got {warning}/{danger}/{severe}"
            ));
        }
        Ok(Self {
            warning,
            danger,
            severe,
        })
    }

    pub fn warning(&self) -> i32 {
        self.warning
    }

    pub fn danger(&self) -> i32 {
        self.danger
    }

    pub fn severe(&self) -> i32 {
        self.severe
    }

    /// Highest tier whose threshold `aqi` meets, if any.
    pub fn alert_type_for(&self, aqi: i32) -> Option<AlertType> {
        // ---
        if aqi >= self.severe {
            Some(AlertType::SevereAlert)
        } else if aqi >= self.danger {
            Some(AlertType::HighAlert)
        } else if aqi >= self.warning {
            Some(AlertType::Warning)
        } else {
            None
        }
    }
}

/// Category and severity band of an AQI value.
pub fn classify(aqi: i32) -> (AqiCategory, Severity) {
    // ---
    match aqi {
        i32::MIN..=50 => (AqiCategory::Good, Severity::Low),
        51..=100 => (AqiCategory::Satisfactory, Severity::Low),
        101..=200 => (AqiCategory::Moderate, Severity::Medium),
        201..=300 => (AqiCategory::Poor, Severity::High),
        301..=400 => (AqiCategory::VeryPoor, Severity::Severe),
        _ => (AqiCategory::Severe, Severity::Severe),
    }
}

pub fn health_message(aqi: i32) -> &'static str {
    // ---
    match aqi {
        i32::MIN..=50 => "Air quality is good. Enjoy outdoor activities!",
        51..=100 => {
            "Air quality is acceptable. Sensitive individuals should limit prolonged outdoor activities."
        }
        101..=200 => {
            "Sensitive groups should reduce prolonged outdoor exertion. General public should limit outdoor activities."
        }
        201..=300 => {
            "Everyone should avoid prolonged outdoor exertion. Wear N95 masks if going outside is necessary."
        }
        301..=400 => {
            "Health alert! Avoid outdoor activities. Stay indoors with air purifiers. Use N95 masks outdoors."
        }
        _ => "EMERGENCY! Avoid all outdoor activities. Stay indoors. Seal windows. Use air purifiers.",
    }
}

/// Protective actions for `aqi`. Higher values only ever add actions.
pub fn recommendations(aqi: i32) -> Vec<&'static str> {
    // ---
    let mut actions = Vec::new();
    if aqi > 150 {
        actions.extend(["Keep windows and doors closed", "Use air purifiers indoors"]);
    }
    if aqi > 200 {
        actions.extend([
            "Avoid outdoor exercise",
            "Wear N95 masks if going outside",
            "Limit travel",
        ]);
    }
    if aqi > 300 {
        actions.extend([
            "Stay indoors as much as possible",
            "Check on elderly and children",
            "Keep emergency medications ready",
        ]);
    }
    actions
}
