//! Link-function estimator: an L1 fit of score differences to transformed
//! win frequencies.
//!
//! # Algorithm
//!
//! 1. Transform each observed frequency with the model's link:
//!
//!    ```text
//!    BTL        link[i][j] = log2(P[i][j] / (1 − P[i][j]))
//!    Thurstone  link[i][j] = Φ⁻¹(P[i][j])
//!    ```
//!
//! 2. Solve
//!
//!    ```text
//!    minimise  Σ mask[i][j] · z[i][j]
//!    s.t.      −z[i][j] ≤ (x[i] − x[j]) − link[i][j] ≤ z[i][j]
//!              x ∈ [0, 1]ⁿ,  z ≥ 0
//!    ```
//!
//! 3. Undo the transform (`2^x` for BTL, `x` for Thurstone) and normalise to
//!    sum to one.
//!
//! Entries outside the mask have zero cost and a free slack, so they never
//! constrain `x` and are not handed to the solver at all.

use nalgebra::DMatrix;
use tracing::{debug, instrument};

use super::lp::{LinearProgram, LpFailure, LpSolver, Relation, SimplexSolver};
use crate::compare::ComparisonMatrix;
use crate::error::{RankError, Result};
use crate::model::{Model, normal_inv_cdf};

/// Slack allowed when checking solver output against the `[0, 1]` bounds.
const BOUND_SLACK: f64 = 1e-9;

/// Link-transformed frequencies and the entries that enter the objective.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkMatrix {
    pub model: Model,
    pub values: DMatrix<f64>,
    pub mask: DMatrix<bool>,
}

impl LinkMatrix {
    /// Log-odds (base 2) of the BTL frequencies.
    ///
    /// `P = 0` (never compared) and `P = 1` (log-odds undefined) are stored as
    /// 0 and left out of the mask. The `P = 1` case is an approximation, not
    /// a true link value.
    #[must_use]
    pub fn btl(btl: &ComparisonMatrix) -> Self {
        let n = btl.len();
        let mut values = DMatrix::zeros(n, n);
        let mut mask = DMatrix::from_element(n, n, false);
        for i in 0..n {
            for j in 0..n {
                let p = btl.get(i, j);
                if usable(p) {
                    values[(i, j)] = (p / (1.0 - p)).log2();
                    mask[(i, j)] = i != j;
                }
            }
        }
        Self {
            model: Model::Btl,
            values,
            mask,
        }
    }

    /// Probit of the Thurstone frequencies, masked by where the BTL data is
    /// usable. Thurstone frequencies of exactly 0 or 1 map to an infinite
    /// quantile; those entries are stored as 0 and also masked out.
    #[must_use]
    pub fn thurstone(btl: &ComparisonMatrix, thurstone: &ComparisonMatrix) -> Self {
        let n = btl.len();
        let mut values = DMatrix::zeros(n, n);
        let mut mask = DMatrix::from_element(n, n, false);
        for i in 0..n {
            for j in 0..n {
                let p = thurstone.get(i, j);
                if usable(btl.get(i, j)) && usable(p) {
                    values[(i, j)] = normal_inv_cdf(p);
                    mask[(i, j)] = i != j;
                }
            }
        }
        Self {
            model: Model::Thurstone,
            values,
            mask,
        }
    }

    /// Number of entries that enter the objective.
    #[must_use]
    pub fn active(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    /// First item with no masked entry in its row or column.
    #[must_use]
    pub fn unconstrained_item(&self) -> Option<usize> {
        let n = self.mask.nrows();
        let touches = |i: usize, j: usize| self.mask[(i, j)] || self.mask[(j, i)];
        (0..n).find(|&i| !(0..n).any(|j| touches(i, j)))
    }
}

fn usable(p: f64) -> bool {
    p > 0.0 && p < 1.0
}

/// Fits scores to link-transformed frequencies with a pluggable LP backend.
#[derive(Debug, Clone, Default)]
pub struct LinkFunctionSolver<S = SimplexSolver> {
    solver: S,
}

impl LinkFunctionSolver<SimplexSolver> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            solver: SimplexSolver,
        }
    }
}

impl<S: LpSolver> LinkFunctionSolver<S> {
    pub const fn with_solver(solver: S) -> Self {
        Self { solver }
    }

    /// BTL estimate, normalised to sum to one.
    ///
    /// # Errors
    ///
    /// See [`Self::fit`].
    pub fn estimate_btl(&self, btl: &ComparisonMatrix) -> Result<Vec<f64>> {
        let x = self.fit(&LinkMatrix::btl(btl))?;
        normalize(x.iter().map(|v| v.exp2()).collect(), Model::Btl)
    }

    /// Thurstone estimate, normalised to sum to one.
    ///
    /// # Errors
    ///
    /// See [`Self::fit`]; additionally [`RankError::DegenerateInput`] if the
    /// recovered scores sum to zero.
    pub fn estimate_thurstone(
        &self,
        btl: &ComparisonMatrix,
        thurstone: &ComparisonMatrix,
    ) -> Result<Vec<f64>> {
        if btl.len() != thurstone.len() {
            return Err(RankError::InvalidParameter(format!(
                "BTL matrix has {} items but Thurstone matrix has {}",
                btl.len(),
                thurstone.len()
            )));
        }
        let x = self.fit(&LinkMatrix::thurstone(btl, thurstone))?;
        normalize(x, Model::Thurstone)
    }

    /// Solve the L1 program for `link` and return the raw `x ∈ [0, 1]ⁿ`.
    ///
    /// # Errors
    ///
    /// - [`RankError::DegenerateInput`] if some item has no entry in the
    ///   objective, since its score would be whatever the solver picks.
    /// - [`RankError::OptimizationFailure`] if the solver finds no optimum.
    /// - [`RankError::SolverContract`] if a returned score leaves `[0, 1]`.
    #[instrument(skip(self, link), fields(model = %link.model, active = link.active()))]
    pub fn fit(&self, link: &LinkMatrix) -> Result<Vec<f64>> {
        let n = link.values.nrows();
        if let Some(item) = link.unconstrained_item() {
            return Err(RankError::DegenerateInput(format!(
                "{} item {item} has no usable comparisons",
                link.model
            )));
        }

        let mut program = LinearProgram::new();
        let x: Vec<usize> = (0..n).map(|_| program.add_variable(0.0, 0.0, 1.0)).collect();

        for i in 0..n {
            for j in 0..n {
                if !link.mask[(i, j)] {
                    continue;
                }
                let target = link.values[(i, j)];
                let z = program.add_variable(1.0, 0.0, f64::INFINITY);
                // (x_i − x_j) + z ≥ link  and  (x_i − x_j) − z ≤ link
                program.add_constraint(
                    vec![(x[i], 1.0), (x[j], -1.0), (z, 1.0)],
                    Relation::GreaterEq,
                    target,
                );
                program.add_constraint(
                    vec![(x[i], 1.0), (x[j], -1.0), (z, -1.0)],
                    Relation::LessEq,
                    target,
                );
            }
        }

        let values = self
            .solver
            .solve(&program)
            .map_err(|e: LpFailure| RankError::OptimizationFailure {
                model: link.model,
                reason: e.to_string(),
            })?;

        let scores: Vec<f64> = x.iter().map(|&idx| values[idx]).collect();
        if let Some((i, v)) = scores
            .iter()
            .enumerate()
            .find(|(_, v)| !(-BOUND_SLACK..=1.0 + BOUND_SLACK).contains(*v))
        {
            return Err(RankError::SolverContract(format!(
                "{} score {i} = {v} outside [0, 1]",
                link.model
            )));
        }

        debug!(variables = program.variables().len(), "link program solved");
        Ok(scores.into_iter().map(|v| v.clamp(0.0, 1.0)).collect())
    }
}

fn normalize(scores: Vec<f64>, model: Model) -> Result<Vec<f64>> {
    let total: f64 = scores.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(RankError::DegenerateInput(format!(
            "{model} link estimate sums to {total}"
        )));
    }
    Ok(scores.into_iter().map(|v| v / total).collect())
}
