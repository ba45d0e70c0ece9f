//! Random forest regressor for AQI.
//!
//! Wraps smartcore's `RandomForestRegressor` with shape checks, single-row
//! prediction and permutation feature importances. Fitting is seeded, so the
//! same data and parameters give the same forest, and the fitted forest
//! serializes with `serde`.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

// ---

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, thiserror::Error)]
pub enum RegressorError {
    #[error("cannot fit a forest on an empty training set")]
    EmptyTrainingSet,

    #[error("feature count mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("{targets} targets for {rows} feature rows")]
    TargetMismatch { rows: usize, targets: usize },

    #[error("random forest: {0}")]
    Backend(String),
}

impl From<smartcore::error::Failed> for RegressorError {
    fn from(err: smartcore::error::Failed) -> Self {
        RegressorError::Backend(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    // ---
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        // ---
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// Fitted forest plus the input width it was trained on.
#[derive(Serialize, Deserialize)]
pub struct AqiRegressor {
    n_features: usize,
    params: ForestParams,
    forest: Forest,
}

impl fmt::Debug for AqiRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AqiRegressor")
            .field("n_features", &self.n_features)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl AqiRegressor {
    // ---
    /// Fit on `x` (one row per sample) against `y`. Every split considers
    /// all features.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> Result<Self, RegressorError> {
        // ---
        let Some(first) = x.first() else {
            return Err(RegressorError::EmptyTrainingSet);
        };
        if x.len() != y.len() {
            return Err(RegressorError::TargetMismatch {
                rows: x.len(),
                targets: y.len(),
            });
        }
        let n_features = first.len();
        check_width(x, n_features)?;

        let parameters = RandomForestRegressorParameters::default()
            .with_n_trees(params.n_trees.max(1))
            .with_max_depth(params.max_depth)
            .with_min_samples_split(params.min_samples_split)
            .with_m(n_features)
            .with_seed(params.seed);

        let matrix = DenseMatrix::from_2d_vec(&x.to_vec())?;
        let forest = RandomForestRegressor::fit(&matrix, &y.to_vec(), parameters)?;

        Ok(Self {
            n_features,
            params: *params,
            forest,
        })
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64, RegressorError> {
        // ---
        let rows = [features.to_vec()];
        let predicted = self.predict_rows(&rows)?;
        predicted
            .first()
            .copied()
            .ok_or_else(|| RegressorError::Backend("empty prediction".to_string()))
    }

    /// One prediction per row of `x`, in row order.
    pub fn predict_rows(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, RegressorError> {
        // ---
        if x.is_empty() {
            return Ok(Vec::new());
        }
        check_width(x, self.n_features)?;
        let matrix = DenseMatrix::from_2d_vec(&x.to_vec())?;
        Ok(self.forest.predict(&matrix)?)
    }

    /// Mean increase in squared error when one feature column is shuffled,
    /// averaged over `rounds` shuffles and normalized to sum to 1.
    ///
    /// All zeros when no feature moves the error.
    pub fn permutation_importances(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        rounds: usize,
        seed: u64,
    ) -> Result<Vec<f64>, RegressorError> {
        // ---
        if x.len() != y.len() {
            return Err(RegressorError::TargetMismatch {
                rows: x.len(),
                targets: y.len(),
            });
        }
        if x.is_empty() {
            return Ok(vec![0.0; self.n_features]);
        }

        let rounds = rounds.max(1);
        let baseline = mean_squared_error(y, &self.predict_rows(x)?);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut permuted = x.to_vec();
        let mut importances = vec![0.0; self.n_features];

        for (feature, importance) in importances.iter_mut().enumerate() {
            let column: Vec<f64> = x.iter().map(|row| row[feature]).collect();
            let mut increase = 0.0;
            for _ in 0..rounds {
                let mut shuffled = column.clone();
                shuffled.shuffle(&mut rng);
                for (row, value) in permuted.iter_mut().zip(&shuffled) {
                    row[feature] = *value;
                }
                increase += mean_squared_error(y, &self.predict_rows(&permuted)?) - baseline;
            }
            for (row, value) in permuted.iter_mut().zip(&column) {
                row[feature] = *value;
            }
            *importance = (increase / rounds as f64).max(0.0);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }
        Ok(importances)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.params.n_trees.max(1)
    }
}

fn check_width(x: &[Vec<f64>], expected: usize) -> Result<(), RegressorError> {
    // ---
    match x.iter().find(|row| row.len() != expected) {
        Some(row) => Err(RegressorError::DimensionMismatch {
            expected,
            found: row.len(),
        }),
        None => Ok(()),
    }
}

fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    // ---
    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    sum / actual.len() as f64
}
