//! Application entry point for the `codemetal-airwatch` service.
//!
//! Startup sequence:
//! - Load configuration from environment variables or `.env`
//! - Initialize structured logging/tracing
//! - Connect the PostgreSQL pool and create the schema if missing
//! - Wire the store, forecaster, alert engine and monitoring cycle
//! - Start the scheduled cycle unless `CYCLE_INTERVAL_MINUTES=0`
//! - Mount all API routes via the `routes` gateway and serve
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `AIRWATCH_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AIRWATCH_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the remaining settings.
use std::{env, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use airwatch::alerts::{AlertEngine, LogNotifier};
use airwatch::collect::{Collector, FallbackCollector, SimulatedCollector, WeatherCollector};
use airwatch::cycle::{spawn_schedule, MonitoringCycle};
use airwatch::forecast::Forecaster;
use airwatch::routes::{self, AppState};
use airwatch::store::{PgStore, TimeSeriesStore};
use airwatch::{config, schema, Config};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;

    let store: Arc<dyn TimeSeriesStore> = Arc::new(PgStore::new(pool));
    let forecaster = Arc::new(
        Forecaster::new(store.clone(), &cfg.model_dir).with_train_limit(cfg.train_sample_limit),
    );
    let alerts = Arc::new(
        AlertEngine::new(store.clone())
            .with_thresholds(cfg.thresholds)
            .with_dedup(cfg.alert_dedup),
    );
    let cycle = Arc::new(MonitoringCycle::new(
        store.clone(),
        build_collector(&cfg)?,
        alerts.clone(),
        forecaster.clone(),
        Arc::new(LogNotifier),
        cfg.prediction_cities.clone(),
    ));

    if cfg.cycle_interval_minutes > 0 {
        let every = Duration::from_secs(cfg.cycle_interval_minutes * 60);
        tracing::info!("Scheduling monitoring cycle every {:?}", every);
        spawn_schedule(cycle.clone(), every);
    } else {
        tracing::info!("Scheduled monitoring cycle disabled");
    }

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(AppState {
        store,
        forecaster,
        alerts,
        cycle,
        train_sample_limit: cfg.train_sample_limit,
    });

    tracing::info!("Listening on {}", cfg.bind_addr);

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Weather API with simulated fallback when a key is configured, otherwise
/// simulated data only.
fn build_collector(cfg: &Config) -> Result<Box<dyn Collector>> {
    // ---
    let simulated: Box<dyn Collector> = Box::new(SimulatedCollector::new());
    let Some(key) = &cfg.openweather_api_key else {
        return Ok(simulated);
    };

    let weather = WeatherCollector::new(cfg.openweather_api_url.clone(), key.clone())
        .context("Failed to build weather API client")?;
    let collector: Box<dyn Collector> =
        Box::new(FallbackCollector::new(Box::new(weather), simulated));
    Ok(collector)
}

/// Initialize the global tracing subscriber.
///
/// - Color output follows TTY detection unless `FORCE_COLOR` is
///   `1|true|yes` (on) or `0|false|no` (off)
/// - `AIRWATCH_SPAN_EVENTS`: `"full"` for ENTER, EXIT and CLOSE, `"enter_exit"`
///   for ENTER and EXIT, anything else for CLOSE only
/// - `RUST_LOG` wins when set; otherwise `AIRWATCH_LOG_LEVEL` (default `debug`)
///
/// Call once, before any logging.
fn init_tracing() {
    // ---
    let span_events = match env::var("AIRWATCH_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AIRWATCH_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
