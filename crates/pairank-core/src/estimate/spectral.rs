//! Rank Centrality: scores as the stationary distribution of a random walk
//! that moves from losers to winners.
//!
//! # Algorithm
//!
//! With `Q = Pᵀ` (so `Q[i][j]` is the frequency with which `j` beat `i`) and
//! `d = max_i Σ_j Q[i][j]`:
//!
//! ```text
//! T[i][j] = Q[i][j] / d             i ≠ j, Q[i][j] > 0
//! T[i][i] = 1 − (Σ_j Q[i][j]) / d   lazy self-loop
//! ```
//!
//! Each row is then rescaled to sum to exactly one, and the stationary
//! distribution `π T = π` is read off the unit eigenvalue of `T`.
//!
//! # Failure
//!
//! A graph with no comparisons at all, or one split into several closed
//! classes (several unit eigenvalues), is reported as
//! [`RankError::ConvergenceFailure`] instead of returning an arbitrary
//! eigenvector. A single item with no comparisons in an otherwise compared
//! graph is [`RankError::DegenerateInput`].

use nalgebra::{DMatrix, Schur};
use tracing::{debug, instrument};

use crate::compare::ComparisonMatrix;
use crate::error::{RankError, Result};

/// Default distance from 1 within which an eigenvalue counts as the unit one.
pub const DEFAULT_EIGEN_TOLERANCE: f64 = 1e-6;

const SCHUR_MAX_ITER: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralConfig {
    /// Eigenvalues within this distance of `1 + 0i` count as unit.
    pub eigen_tolerance: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            eigen_tolerance: DEFAULT_EIGEN_TOLERANCE,
        }
    }
}

/// Stationary distribution and the eigenvalue it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralResult {
    /// Non-negative scores summing to one.
    pub scores: Vec<f64>,
    /// The computed eigenvalue closest to one (real part).
    pub unit_eigenvalue: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SpectralRanker {
    config: SpectralConfig,
}

impl SpectralRanker {
    #[must_use]
    pub const fn new(config: SpectralConfig) -> Self {
        Self { config }
    }

    /// Stationary distribution of the lazy walk built from `p`.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::ConvergenceFailure`] when the walk has no unique
    /// stationary distribution, and [`RankError::DegenerateInput`] for an
    /// empty matrix or an uncompared item.
    #[instrument(skip(self, p), fields(n = p.len()))]
    pub fn rank(&self, p: &ComparisonMatrix) -> Result<SpectralResult> {
        let transition = transition_matrix(p)?;
        let result = stationary_distribution(&transition, self.config.eigen_tolerance)?;
        debug!(
            unit_eigenvalue = result.unit_eigenvalue,
            "stationary distribution found"
        );
        Ok(result)
    }
}

/// Row-stochastic lazy transition matrix for `p`.
///
/// # Errors
///
/// - [`RankError::DegenerateInput`] if `p` has no items, or if some item has
///   no recorded comparisons while others do.
/// - [`RankError::ConvergenceFailure`] if no pair was compared at all, or a
///   row has no mass left to normalise.
pub fn transition_matrix(p: &ComparisonMatrix) -> Result<DMatrix<f64>> {
    let size = p.len();
    if size == 0 {
        return Err(RankError::DegenerateInput("comparison matrix is empty".into()));
    }
    let has_partner = |item: usize| (0..size).any(|other| p.is_compared(item, other));
    match (0..size).find(|&item| !has_partner(item)) {
        None => {}
        Some(_) if !(0..size).any(has_partner) => {
            return Err(RankError::ConvergenceFailure(
                "no pair was compared; the walk has no stationary distribution".into(),
            ));
        }
        Some(item) => {
            return Err(RankError::DegenerateInput(format!(
                "item {item} has no recorded comparisons"
            )));
        }
    }

    let beaten_by = p.as_matrix().transpose();
    let row_sums: Vec<f64> = beaten_by.row_iter().map(|row| row.sum()).collect();
    let max_weight = row_sums.iter().copied().fold(0.0_f64, f64::max);
    if max_weight <= 0.0 {
        return Err(RankError::ConvergenceFailure(
            "comparison matrix carries no weight".into(),
        ));
    }

    let mut transition = DMatrix::from_fn(size, size, |from, to| {
        let weight = beaten_by[(from, to)];
        if weight == 0.0 {
            0.0
        } else if from == to {
            1.0 - row_sums[from] / max_weight
        } else {
            weight / max_weight
        }
    });

    for (from, mut row) in transition.row_iter_mut().enumerate() {
        let total = row.sum();
        if total <= 0.0 {
            return Err(RankError::ConvergenceFailure(format!(
                "transition row {from} has no mass"
            )));
        }
        row /= total;
    }

    Ok(transition)
}

/// Left eigenvector of `transition` for eigenvalue one, normalised to sum to one.
///
/// # Errors
///
/// Returns [`RankError::ConvergenceFailure`] unless exactly one eigenvalue
/// lies within `tolerance` of one.
pub fn stationary_distribution(
    transition: &DMatrix<f64>,
    tolerance: f64,
) -> Result<SpectralResult> {
    let size = transition.nrows();
    let tt = transition.transpose();

    let schur = Schur::try_new(tt.clone(), f64::EPSILON, SCHUR_MAX_ITER).ok_or_else(|| {
        RankError::ConvergenceFailure("eigenvalue decomposition did not converge".into())
    })?;
    let eigenvalues = schur.complex_eigenvalues();

    let unit: Vec<f64> = eigenvalues
        .iter()
        .filter(|ev| (ev.re - 1.0).abs() <= tolerance && ev.im.abs() <= tolerance)
        .map(|ev| ev.re)
        .collect();
    let unit_eigenvalue = match unit.as_slice() {
        [] => {
            return Err(RankError::ConvergenceFailure(format!(
                "no eigenvalue within {tolerance} of 1"
            )));
        }
        [only] => *only,
        many => {
            return Err(RankError::ConvergenceFailure(format!(
                "{} eigenvalues within {tolerance} of 1; comparison graph is disconnected",
                many.len()
            )));
        }
    };

    // π spans the null space of Tᵀ − I: the right singular vector of the
    // smallest singular value.
    let shifted = tt - DMatrix::identity(size, size);
    let svd = shifted.svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| {
        RankError::ConvergenceFailure("singular vectors were not computed".into())
    })?;
    let smallest = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|lhs, rhs| lhs.1.total_cmp(rhs.1))
        .map(|(index, _)| index)
        .ok_or_else(|| RankError::DegenerateInput("transition matrix is empty".into()))?;

    let mut pi: Vec<f64> = v_t.row(smallest).iter().copied().collect();
    if pi[0] < 0.0 {
        for value in &mut pi {
            *value = -*value;
        }
    }
    let total: f64 = pi.iter().sum();
    if total.abs() <= f64::EPSILON {
        return Err(RankError::ConvergenceFailure(
            "stationary vector sums to zero".into(),
        ));
    }
    let scores = pi.into_iter().map(|value| value / total).collect();

    Ok(SpectralResult {
        scores,
        unit_eigenvalue,
    })
}
