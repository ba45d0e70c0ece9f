//! Configuration loader for the `codemetal-airwatch` service.
//!
//! All runtime settings and their defaults are read here, from environment
//! variables (with optional `.env` support provided by the caller), so no
//! other module calls `env::var`.
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::alerts::{DedupPolicy, Thresholds};
use crate::collect::DEFAULT_WEATHER_API_URL;

/// Parse an optional environment variable with a default value.
macro_rules! parse_env {
    ($lookup:ident, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Read a required string environment variable.
macro_rules! require_env {
    ($lookup:ident, $var_name:expr) => {
        $lookup($var_name).ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Immutable application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// HTTP listen address.
    pub bind_addr: SocketAddr,

    /// Directory holding one model slot per city.
    pub model_dir: PathBuf,

    /// Samples pulled when training.
    pub train_sample_limit: usize,

    /// Cities forecast on every monitoring cycle.
    pub prediction_cities: Vec<String>,

    /// Scheduler cadence in minutes; 0 disables the scheduled cycle.
    pub cycle_interval_minutes: u64,

    /// Enables the OpenWeatherMap collector when set.
    pub openweather_api_key: Option<String>,

    pub openweather_api_url: String,

    pub alert_dedup: DedupPolicy,

    pub thresholds: Thresholds,
}

/// Load configuration from the process environment.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Everything else is optional; see [`load_from`] for the full list.
pub fn load_from_env() -> Result<Config> {
    load_from(|name| env::var(name).ok())
}

/// Load configuration through `lookup`, which maps a variable name to its
/// value.
///
/// Optional variables and defaults:
/// - `DB_POOL_MAX` (5), `BIND_ADDR` (`0.0.0.0:8080`), `MODEL_DIR` (`data/models`)
/// - `TRAIN_SAMPLE_LIMIT` (200), `PREDICTION_CITIES` (`Delhi,Mumbai,Kolkata`)
/// - `CYCLE_INTERVAL_MINUTES` (60), `OPENWEATHER_API_KEY` (unset)
/// - `OPENWEATHER_API_URL`, `ALERT_DEDUP` (`every-evaluation`)
/// - `AQI_WARNING_THRESHOLD` (150), `AQI_DANGER_THRESHOLD` (200),
///   `AQI_SEVERE_THRESHOLD` (300)
///
/// Returns an error if a required variable is missing or any value is invalid.
pub fn load_from<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let db_url = require_env!(lookup, "DATABASE_URL");
    let db_pool_max = parse_env!(lookup, "DB_POOL_MAX", u32, 5);
    let bind_addr = parse_env!(
        lookup,
        "BIND_ADDR",
        SocketAddr,
        SocketAddr::from(([0, 0, 0, 0], 8080))
    );
    let model_dir = lookup("MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/models"));
    let train_sample_limit = parse_env!(lookup, "TRAIN_SAMPLE_LIMIT", usize, 200);
    let cycle_interval_minutes = parse_env!(lookup, "CYCLE_INTERVAL_MINUTES", u64, 60);

    let prediction_cities: Vec<String> = lookup("PREDICTION_CITIES")
        .unwrap_or_else(|| "Delhi,Mumbai,Kolkata".to_string())
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();

    let openweather_api_key = lookup("OPENWEATHER_API_KEY").filter(|k| !k.trim().is_empty());
    let openweather_api_url =
        lookup("OPENWEATHER_API_URL").unwrap_or_else(|| DEFAULT_WEATHER_API_URL.to_string());

    let alert_dedup = lookup("ALERT_DEDUP")
        .map(|v| v.parse::<DedupPolicy>())
        .transpose()
        .map_err(|e| anyhow!("Invalid ALERT_DEDUP: {}", e))?
        .unwrap_or_default();

    let defaults = Thresholds::default();
    let thresholds = Thresholds::new(
        parse_env!(lookup, "AQI_WARNING_THRESHOLD", i32, defaults.warning()),
        parse_env!(lookup, "AQI_DANGER_THRESHOLD", i32, defaults.danger()),
        parse_env!(lookup, "AQI_SEVERE_THRESHOLD", i32, defaults.severe()),
    )
    .map_err(|e| anyhow!("Invalid AQI thresholds: {}", e))?;

    Ok(Config {
        db_url,
        db_pool_max,
        bind_addr,
        model_dir,
        train_sample_limit,
        prediction_cities,
        cycle_interval_minutes,
        openweather_api_key,
        openweather_api_url,
        alert_dedup,
        thresholds,
    })
}

/// Replace the password in a connection URL with `****`.
fn mask_db_url(db_url: &str) -> String {
    // ---
    if let Some(at_pos) = db_url.rfind('@') {
        if let Some(colon_pos) = db_url[..at_pos].rfind(':') {
            // Scheme separator, no password present
            if !db_url[colon_pos..].starts_with("://") {
                return format!("{}:****{}", &db_url[..colon_pos], &db_url[at_pos..]);
            }
        }
    }
    db_url.to_string()
}

impl Config {
    /// Log the loaded configuration with the database password masked.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL           : {}", mask_db_url(&self.db_url));
        tracing::info!("  DB_POOL_MAX            : {}", self.db_pool_max);
        tracing::info!("  BIND_ADDR              : {}", self.bind_addr);
        tracing::info!("  MODEL_DIR              : {}", self.model_dir.display());
        tracing::info!("  TRAIN_SAMPLE_LIMIT     : {}", self.train_sample_limit);
        tracing::info!("  PREDICTION_CITIES      : {}", self.prediction_cities.join(","));
        tracing::info!("  CYCLE_INTERVAL_MINUTES : {}", self.cycle_interval_minutes);
        tracing::info!(
            "  OPENWEATHER_API_KEY    : {}",
            if self.openweather_api_key.is_some() { "****" } else { "(unset)" }
        );
        tracing::info!("  OPENWEATHER_API_URL    : {}", self.openweather_api_url);
        tracing::info!("  ALERT_DEDUP            : {:?}", self.alert_dedup);
        tracing::info!(
            "  AQI THRESHOLDS         : {}/{}/{}",
            self.thresholds.warning(),
            self.thresholds.danger(),
            self.thresholds.severe()
        );
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        // ---
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_from(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        // ---
        let cfg = load(&[("DATABASE_URL", "postgres://u:p@localhost/airwatch")]).unwrap();

        assert_eq!(cfg.db_pool_max, 5);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(cfg.model_dir, PathBuf::from("data/models"));
        assert_eq!(cfg.train_sample_limit, 200);
        assert_eq!(cfg.prediction_cities, vec!["Delhi", "Mumbai", "Kolkata"]);
        assert_eq!(cfg.cycle_interval_minutes, 60);
        assert!(cfg.openweather_api_key.is_none());
        assert_eq!(cfg.openweather_api_url, DEFAULT_WEATHER_API_URL);
        assert_eq!(cfg.alert_dedup, DedupPolicy::EveryEvaluation);
        assert_eq!(cfg.thresholds, Thresholds::default());
    }

    #[test]
    fn test_missing_database_url() {
        // ---
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        // ---
        let cfg = load(&[
            ("DATABASE_URL", "postgres://localhost/airwatch"),
            ("DB_POOL_MAX", "12"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("PREDICTION_CITIES", " Pune, ,Chennai "),
            ("CYCLE_INTERVAL_MINUTES", "0"),
            ("OPENWEATHER_API_KEY", "abc123"),
            ("ALERT_DEDUP", "once-per-episode"),
            ("AQI_WARNING_THRESHOLD", "120"),
        ])
        .unwrap();

        assert_eq!(cfg.db_pool_max, 12);
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.prediction_cities, vec!["Pune", "Chennai"]);
        assert_eq!(cfg.cycle_interval_minutes, 0);
        assert_eq!(cfg.openweather_api_key.as_deref(), Some("abc123"));
        assert_eq!(cfg.alert_dedup, DedupPolicy::OncePerEpisode);
        assert_eq!(cfg.thresholds.warning(), 120);
        assert_eq!(cfg.thresholds.danger(), 200);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        // ---
        let url = ("DATABASE_URL", "postgres://localhost/airwatch");
        assert!(load(&[url, ("DB_POOL_MAX", "many")]).is_err());
        assert!(load(&[url, ("ALERT_DEDUP", "never")]).is_err());
        assert!(load(&[url, ("AQI_DANGER_THRESHOLD", "100")]).is_err());
    }

    #[test]
    fn test_password_is_masked() {
        // ---
        assert_eq!(
            mask_db_url("postgres://airwatch:s3cret@db:5432/airwatch"),
            "postgres://airwatch:****@db:5432/airwatch"
        );
        assert_eq!(
            mask_db_url("postgres://localhost/airwatch"),
            "postgres://localhost/airwatch"
        );
    }
}
