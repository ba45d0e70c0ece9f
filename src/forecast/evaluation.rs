use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

// ---

/// Shuffled train/test partition of `0..n`.
///
/// The test partition holds `ceil(test_fraction * n)` indices. Both halves are
/// returned in ascending index order.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    // ---
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let test_len = ((n as f64) * test_fraction).ceil() as usize;
    let test_len = test_len.min(n);
    let mut test = indices[..test_len].to_vec();
    let mut train = indices[test_len..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    (train, test)
}

/// Regression quality on one partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    // ---
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl ModelMetrics {
    // ---
    /// Metrics of `predicted` against `actual`. Both slices must have the same
    /// non-zero length.
    ///
    /// With constant actuals R² is 1 for a perfect fit and 0 otherwise.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        // ---
        debug_assert_eq!(actual.len(), predicted.len());
        let n = actual.len().max(1) as f64;

        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (a, p) in actual.iter().zip(predicted) {
            let err = a - p;
            abs_sum += err.abs();
            sq_sum += err * err;
        }

        let mean = actual.iter().sum::<f64>() / n;
        let total: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();
        let r2 = if total > 0.0 {
            1.0 - sq_sum / total
        } else if sq_sum == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            mae: abs_sum / n,
            rmse: (sq_sum / n).sqrt(),
            r2,
        }
    }
}
