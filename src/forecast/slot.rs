use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::evaluation::ModelMetrics;
use super::regressor::AqiRegressor;
use crate::error::{MonitorError, Result};
use crate::features::{FeatureRow, FEATURE_COLUMNS};

// ---

/// Version of the on-disk model bundle. Bundles with another version are
/// rejected on load.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Fitted model plus the metadata needed to use it after a restart.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    // ---
    pub format_version: u32,
    pub city: String,
    pub feature_columns: Vec<String>,
    pub trained_at: DateTime<Utc>,
    pub performance: ModelMetrics,
    pub model: AqiRegressor,
}

impl TrainedModel {
    // ---
    /// Model output for one feature row, assembled in the bundle's column order.
    pub fn predict_row(&self, row: &FeatureRow) -> std::result::Result<f64, String> {
        // ---
        let features = row
            .vector(&self.feature_columns)
            .map_err(|name| format!("unknown feature column '{name}'"))?;
        self.model.predict(&features).map_err(|e| e.to_string())
    }
}

/// Directory of per-city model slots, one JSON file per city.
#[derive(Debug, Clone)]
pub struct ModelSlots {
    dir: PathBuf,
}

impl ModelSlots {
    // ---
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Slot path for `city`: `aqi_model_<lowercased name>.json`. Bytes
    /// outside `[a-z0-9]` are written as `%xx`, so distinct lowercased
    /// names never share a slot.
    pub fn path(&self, city: &str) -> PathBuf {
        // ---
        let mut stem = String::new();
        for byte in city.to_lowercase().bytes() {
            if byte.is_ascii_lowercase() || byte.is_ascii_digit() {
                stem.push(char::from(byte));
            } else {
                let _ = write!(stem, "%{byte:02x}");
            }
        }
        self.dir.join(format!("aqi_model_{stem}.json"))
    }

    /// Write the bundle to a temporary file and rename it over the slot.
    pub fn save(&self, model: &TrainedModel) -> Result<PathBuf> {
        // ---
        let city = model.city.as_str();
        let path = self.path(city);
        fs::create_dir_all(&self.dir).map_err(|e| MonitorError::persistence(city, e))?;

        let tmp = NamedTempFile::new_in(&self.dir).map_err(|e| MonitorError::persistence(city, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, model)
                .map_err(|e| MonitorError::persistence(city, e))?;
            writer.flush().map_err(|e| MonitorError::persistence(city, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| MonitorError::persistence(city, e))?;
        tmp.persist(&path)
            .map_err(|e| MonitorError::persistence(city, e.error))?;

        Ok(path)
    }

    /// Read the slot for `city`. A missing slot is `Ok(None)`; a bundle for
    /// another city, another format version or with columns that do not fit
    /// the model is a persistence error.
    pub fn load(&self, city: &str) -> Result<Option<TrainedModel>> {
        // ---
        let path = self.path(city);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(MonitorError::persistence(city, e)),
        };

        let model: TrainedModel = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| MonitorError::persistence(city, format!("{}: {e}", path.display())))?;

        if model.format_version != MODEL_FORMAT_VERSION {
            return Err(MonitorError::persistence(
                city,
                format!(
                    "unsupported model format version {} (expected {MODEL_FORMAT_VERSION})",
                    model.format_version
                ),
            ));
        }
        if model.city.to_lowercase() != city.to_lowercase() {
            return Err(MonitorError::persistence(
                city,
                format!("slot holds the model for '{}'", model.city),
            ));
        }
        check_columns(&model).map_err(|reason| MonitorError::persistence(city, reason))?;
        Ok(Some(model))
    }
}

/// Column list must match the model's input width and name known features.
fn check_columns(model: &TrainedModel) -> std::result::Result<(), String> {
    // ---
    let expected = model.model.n_features();
    if model.feature_columns.len() != expected {
        return Err(format!(
            "{} feature columns for a model of {expected} features",
            model.feature_columns.len()
        ));
    }
    match model
        .feature_columns
        .iter()
        .find(|name| !FEATURE_COLUMNS.contains(&name.as_str()))
    {
        Some(name) => Err(format!("unknown feature column '{name}'")),
        None => Ok(()),
    }
}
