//! Spectral MLE: a spectral seed refined by coordinate-wise likelihood search.
//!
//! # Algorithm
//!
//! 1. Run [`SpectralRanker`] on the init half of the edges → `w_spec`.
//! 2. For each item `i`, grid-search `τ ∈ [w_min, w_max]` (101 points) for the
//!    maximum of the BTL log-likelihood of the iter half, holding every other
//!    item at its seed value:
//!
//!    ```text
//!    ℓ_i(τ) = Σ_{j ≠ i, E[i][j] ≠ 0}  E[i][j] · log2(τ / (τ + w_j))
//!                                  + (1 − E[i][j]) · log2(w_j / (τ + w_j))
//!    ```
//!
//! 3. Replace `w_spec[i]` by the grid maximiser only when they differ by more
//!    than the adaptive threshold
//!
//!    ```text
//!    E_t = E_min + 2^(−t) · (E_max − E_min)
//!    E_min = √(log2 n / (n ε L)),  E_max = √(log2 n / (ε L))
//!    ```
//!
//! Only round `t = 0` runs. The output is not renormalised.
//!
//! A row of the iter half with no data scores every `τ` as 0, so the first
//! grid point (`w_min`) wins; that case is logged at debug level.

use tracing::{debug, instrument};

use super::spectral::SpectralRanker;
use crate::compare::ComparisonMatrix;
use crate::error::{RankError, Result};

/// Grid resolution of the coordinate search (inclusive of both ends).
pub const GRID_POINTS: usize = 101;

/// Calibration and trial parameters for the refiner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MleParams {
    /// Lower end of the search grid (smallest normalised true score).
    pub w_min: f64,
    /// Upper end of the search grid (largest normalised true score).
    pub w_max: f64,
    /// Comparison probability of the trial.
    pub epsilon: f64,
    /// Repeated comparisons per pair in the trial.
    pub comparisons: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MleResult {
    /// Refined scores.
    pub scores: Vec<f64>,
    /// Spectral seed from the init half.
    pub seed: Vec<f64>,
    /// Per-item grid maximisers.
    pub candidates: Vec<f64>,
    /// Threshold `E_0` used for acceptance.
    pub threshold: f64,
    /// How many items took their grid maximiser.
    pub replaced: usize,
}

#[derive(Debug, Clone)]
pub struct SpectralMleRefiner {
    params: MleParams,
    spectral: SpectralRanker,
}

impl SpectralMleRefiner {
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] for non-finite or inverted
    /// bounds, `epsilon ∉ (0, 1]`, or zero comparisons.
    pub fn new(params: MleParams, spectral: SpectralRanker) -> Result<Self> {
        if !params.w_min.is_finite() || !params.w_max.is_finite() || params.w_min > params.w_max {
            return Err(RankError::InvalidParameter(format!(
                "search bounds [{}, {}] are not a finite interval",
                params.w_min, params.w_max
            )));
        }
        if !(params.epsilon > 0.0 && params.epsilon <= 1.0) {
            return Err(RankError::InvalidParameter(format!(
                "comparison probability must be in (0, 1], got {}",
                params.epsilon
            )));
        }
        if params.comparisons == 0 {
            return Err(RankError::InvalidParameter(
                "comparisons per pair must be at least 1".into(),
            ));
        }
        Ok(Self { params, spectral })
    }

    /// Seed from `init`, then refine against `iter`.
    ///
    /// # Errors
    ///
    /// - [`RankError::InvalidParameter`] if the halves differ in size or
    ///   there are fewer than two items.
    /// - Any error from the spectral seed.
    #[instrument(skip(self, init, iter), fields(n = init.len()))]
    pub fn refine(&self, init: &ComparisonMatrix, iter: &ComparisonMatrix) -> Result<MleResult> {
        if init.len() != iter.len() {
            return Err(RankError::InvalidParameter(format!(
                "init half has {} items but iter half has {}",
                init.len(),
                iter.len()
            )));
        }
        let seed = self.spectral.rank(init)?.scores;
        self.refine_from_seed(seed, iter)
    }

    /// Refine an explicit seed against `iter`.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] if `seed` and `iter` disagree
    /// on the item count or there are fewer than two items.
    pub fn refine_from_seed(&self, seed: Vec<f64>, iter: &ComparisonMatrix) -> Result<MleResult> {
        let n = iter.len();
        if seed.len() != n {
            return Err(RankError::InvalidParameter(format!(
                "seed has {} entries for {n} items",
                seed.len()
            )));
        }
        if n < 2 {
            return Err(RankError::InvalidParameter(
                "spectral MLE needs at least two items".into(),
            ));
        }

        let grid = self.grid();
        let candidates: Vec<f64> = (0..n)
            .map(|i| {
                if !(0..n).any(|j| j != i && iter.get(i, j) != 0.0) {
                    debug!(item = i, "no iter comparisons; falling back to grid start");
                }
                best_tau(i, iter, &seed, &grid)
            })
            .collect();

        let threshold = adaptive_threshold(n, self.params.epsilon, self.params.comparisons, 0);

        let mut replaced = 0;
        let scores: Vec<f64> = seed
            .iter()
            .zip(candidates.iter())
            .map(|(&spec, &mle)| {
                if (mle - spec).abs() > threshold {
                    replaced += 1;
                    mle
                } else {
                    spec
                }
            })
            .collect();

        debug!(threshold, replaced, "coordinate-wise refinement done");

        Ok(MleResult {
            scores,
            seed,
            candidates,
            threshold,
            replaced,
        })
    }

    /// Uniform grid `w_min + k · (w_max − w_min) / 100`, `k = 0..=100`.
    #[allow(clippy::cast_precision_loss)]
    fn grid(&self) -> Vec<f64> {
        let span = self.params.w_max - self.params.w_min;
        let step = span / (GRID_POINTS - 1) as f64;
        (0..GRID_POINTS)
            .map(|k| step.mul_add(k as f64, self.params.w_min))
            .collect()
    }
}

/// Adaptive acceptance threshold for round `round`.
#[must_use]
pub fn adaptive_threshold(n: usize, epsilon: f64, comparisons: u64, round: u32) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let (n_f64, l_f64) = (n as f64, comparisons as f64);
    let log_n = n_f64.log2();
    let e_min = (log_n / (n_f64 * epsilon * l_f64)).sqrt();
    let e_max = (log_n / (epsilon * l_f64)).sqrt();
    let decay = 0.5_f64.powi(i32::try_from(round).unwrap_or(i32::MAX));
    decay.mul_add(e_max - e_min, e_min)
}

/// BTL log-likelihood (base 2) of item `i` scoring `tau` against `seed`.
fn log_likelihood(i: usize, tau: f64, iter: &ComparisonMatrix, seed: &[f64]) -> f64 {
    iter.row(i)
        .filter(|&(j, p)| j != i && p != 0.0)
        .map(|(j, p)| {
            let wj = seed[j];
            let denom = tau + wj;
            p.mul_add((tau / denom).log2(), (1.0 - p) * (wj / denom).log2())
        })
        .sum()
}

/// First grid point with the strictly largest likelihood.
fn best_tau(i: usize, iter: &ComparisonMatrix, seed: &[f64], grid: &[f64]) -> f64 {
    let mut best = grid.first().copied().unwrap_or_default();
    let mut best_ll = f64::NEG_INFINITY;
    for &tau in grid {
        let ll = log_likelihood(i, tau, iter, seed);
        if ll > best_ll {
            best_ll = ll;
            best = tau;
        }
    }
    best
}
