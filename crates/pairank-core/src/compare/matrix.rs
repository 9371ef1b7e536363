//! Dense comparison matrices and the set of compared pairs.
//!
//! A [`ComparisonMatrix`] `P` is `n × n` with:
//!
//! - `P[i][i] = 0.5` for every item (an item ties with itself);
//! - for `i ≠ j`, either `P[i][j] = P[j][i] = 0` (never compared) or
//!   `P[j][i] = 1 − P[i][j]`.
//!
//! Both rules are applied by the constructors; callers only ever supply the
//! upper-triangle outcome for each compared pair.

use std::collections::BTreeSet;

use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::{RankError, Result};

/// Self-comparison probability on the diagonal.
pub const DIAGONAL: f64 = 0.5;

/// An unordered pair `(i, j)` stored with `i < j`.
pub type Edge = (usize, usize);

/// Ordered set of compared pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeSet {
    edges: BTreeSet<Edge>,
}

impl EdgeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the pair `{a, b}`. Self-pairs are ignored; returns whether the
    /// pair was newly inserted.
    pub fn insert(&mut self, a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }
        self.edges.insert((a.min(b), a.max(b)))
    }

    #[must_use]
    pub fn contains(&self, a: usize, b: usize) -> bool {
        self.edges.contains(&(a.min(b), a.max(b)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.edges.is_disjoint(&other.edges)
    }
}

impl FromIterator<Edge> for EdgeSet {
    fn from_iter<I: IntoIterator<Item = Edge>>(iter: I) -> Self {
        let mut set = Self::new();
        for (a, b) in iter {
            set.insert(a, b);
        }
        set
    }
}

/// Pairwise win-probability matrix with the diagonal and complement rules
/// enforced at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonMatrix {
    values: DMatrix<f64>,
}

impl ComparisonMatrix {
    /// Matrix for `n` items with no comparisons recorded.
    #[must_use]
    pub fn uncompared(n: usize) -> Self {
        let mut values = DMatrix::zeros(n, n);
        values.fill_diagonal(DIAGONAL);
        Self { values }
    }

    /// Build from `(i, j, p)` outcomes meaning "i beat j with empirical
    /// frequency p". The mirrored entry is set to `1 − p`.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] for out-of-range indices,
    /// self-pairs, or probabilities outside `[0, 1]`.
    pub fn from_outcomes<I>(n: usize, outcomes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut matrix = Self::uncompared(n);
        for (i, j, p) in outcomes {
            if i >= n || j >= n {
                return Err(RankError::InvalidParameter(format!(
                    "pair ({i}, {j}) out of range for {n} items"
                )));
            }
            if i == j {
                return Err(RankError::InvalidParameter(format!(
                    "item {i} cannot be compared with itself"
                )));
            }
            if !(0.0..=1.0).contains(&p) {
                return Err(RankError::InvalidParameter(format!(
                    "win frequency {p} for ({i}, {j}) is outside [0, 1]"
                )));
            }
            matrix.values[(i, j)] = p;
            matrix.values[(j, i)] = 1.0 - p;
        }
        Ok(matrix)
    }

    /// Keep only the pairs in `edges`; every other off-diagonal entry is 0.
    #[must_use]
    pub fn restricted_to(&self, edges: &EdgeSet) -> Self {
        let mut restricted = Self::uncompared(self.len());
        for &(i, j) in edges.iter() {
            restricted.values[(i, j)] = self.values[(i, j)];
            restricted.values[(j, i)] = self.values[(j, i)];
        }
        restricted
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    /// Whether `i` and `j` carry a recorded outcome. A pair where one side
    /// lost every comparison still counts (`0` on one side, `1` on the other).
    #[must_use]
    pub fn is_compared(&self, i: usize, j: usize) -> bool {
        i != j && (self.values[(i, j)] != 0.0 || self.values[(j, i)] != 0.0)
    }

    /// Row `i` as `(j, P[i][j])` pairs.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        (0..self.len()).map(move |j| (j, self.values[(i, j)]))
    }

    #[must_use]
    pub const fn as_matrix(&self) -> &DMatrix<f64> {
        &self.values
    }
}
