//! Air quality forecasting and health alerting.
//!
//! Readings flow from a [`collect::Collector`] into a
//! [`store::TimeSeriesStore`]. From there [`forecast::Forecaster`] trains and
//! applies per-city AQI models, [`alerts::AlertEngine`] fires threshold
//! alerts and [`cycle::MonitoringCycle`] runs all of it on a schedule. The
//! `routes` gateway exposes the same operations over HTTP.

pub mod alerts;
pub mod collect;
pub mod config;
pub mod cycle;
pub mod error;
pub mod features;
pub mod forecast;
pub mod models;
pub mod routes;
pub mod schema;
pub mod store;
pub mod summary;

pub use config::Config;
pub use error::{MonitorError, Result, StoreError};
