//! Synthetic comparison data under the BTL and Thurstone models.
//!
//! # Generation
//!
//! For each pair `i < j`, with probability `epsilon` the pair is compared
//! `L` times under each model:
//!
//! ```text
//! wins ~ Binomial(L, p_model(i, j))
//! P[i][j] = wins / L
//! P[j][i] = 1 − P[i][j]
//! ```
//!
//! The BTL and Thurstone matrices share the same compared pairs.
//!
//! # Edge split
//!
//! The spectral MLE needs two independent samples: one to seed the spectral
//! estimate and one to run the likelihood search. `⌊|E| / 2⌋` edges are drawn
//! without replacement into the init half; the rest go to the iter half,
//! except for the leftover edge of an odd-sized set, which is governed by
//! [`OddEdgePolicy`].

use std::collections::HashSet;

use rand::Rng;
use rand::seq::index;
use rand_distr::{Binomial, Distribution};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::matrix::{ComparisonMatrix, Edge, EdgeSet};
use crate::error::{RankError, Result};
use crate::model::{Model, ScoreVector};

/// What to do with the unpaired edge when the edge set has odd size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OddEdgePolicy {
    /// Discard it; both halves get `⌊|E| / 2⌋` edges.
    #[default]
    Drop,
    /// Put it in the iter half.
    KeepInIter,
}

/// Parameters shared by every trial built with one builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuilderParams {
    /// Probability that a given pair is compared at all.
    pub epsilon: f64,
    /// Repeated comparisons per compared pair (`L`).
    pub comparisons: u64,
    pub odd_edge: OddEdgePolicy,
}

/// Edge-disjoint halves of the BTL data, used by the spectral MLE.
#[derive(Debug, Clone)]
pub struct EdgeSplit {
    pub init: ComparisonMatrix,
    pub iter: ComparisonMatrix,
    pub init_edges: EdgeSet,
    pub iter_edges: EdgeSet,
    /// The leftover edge discarded under [`OddEdgePolicy::Drop`].
    pub dropped: Option<Edge>,
}

/// Everything one trial's estimators consume.
#[derive(Debug, Clone)]
pub struct ComparisonData {
    pub btl: ComparisonMatrix,
    pub thurstone: ComparisonMatrix,
    pub edges: EdgeSet,
    pub split: EdgeSplit,
}

#[derive(Debug, Clone)]
pub struct ComparisonMatrixBuilder {
    params: BuilderParams,
}

impl ComparisonMatrixBuilder {
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] unless `epsilon ∈ [0, 1]` and
    /// `comparisons ≥ 1`.
    pub fn new(params: BuilderParams) -> Result<Self> {
        if !(0.0..=1.0).contains(&params.epsilon) {
            return Err(RankError::InvalidParameter(format!(
                "comparison probability must be in [0, 1], got {}",
                params.epsilon
            )));
        }
        if params.comparisons == 0 {
            return Err(RankError::InvalidParameter(
                "comparisons per pair must be at least 1".into(),
            ));
        }
        Ok(Self { params })
    }

    #[must_use]
    pub const fn params(&self) -> &BuilderParams {
        &self.params
    }

    /// Sample both comparison matrices for `scores` and split the edge set.
    ///
    /// # Errors
    ///
    /// Propagates binomial construction failures (non-finite model
    /// probabilities) as [`RankError::InvalidParameter`].
    #[instrument(skip(self, scores, rng), fields(n = scores.len()))]
    pub fn build<R: Rng + ?Sized>(
        &self,
        scores: &ScoreVector,
        rng: &mut R,
    ) -> Result<ComparisonData> {
        let n = scores.len();
        let w = scores.as_slice();
        let trials = self.params.comparisons;

        let mut edges = EdgeSet::new();
        let mut btl_outcomes = Vec::new();
        let mut thu_outcomes = Vec::new();

        for i in 0..n {
            for j in (i + 1)..n {
                if !rng.gen_bool(self.params.epsilon) {
                    continue;
                }
                let wins_btl = sample_wins(trials, Model::Btl.win_probability(w[i], w[j]), rng)?;
                let wins_thu =
                    sample_wins(trials, Model::Thurstone.win_probability(w[i], w[j]), rng)?;
                btl_outcomes.push((i, j, frequency(wins_btl, trials)));
                thu_outcomes.push((i, j, frequency(wins_thu, trials)));
                edges.insert(i, j);
            }
        }

        let btl = ComparisonMatrix::from_outcomes(n, btl_outcomes)?;
        let thurstone = ComparisonMatrix::from_outcomes(n, thu_outcomes)?;
        let split = self.split_edges(&btl, &edges, rng);

        debug!(
            edges = edges.len(),
            init = split.init_edges.len(),
            iter = split.iter_edges.len(),
            dropped = split.dropped.is_some(),
            "comparison data built"
        );

        Ok(ComparisonData {
            btl,
            thurstone,
            edges,
            split,
        })
    }

    /// Partition `edges` into init/iter halves carrying `btl`'s outcomes.
    pub fn split_edges<R: Rng + ?Sized>(
        &self,
        btl: &ComparisonMatrix,
        edges: &EdgeSet,
        rng: &mut R,
    ) -> EdgeSplit {
        let half = edges.len() / 2;
        let chosen: HashSet<usize> = index::sample(rng, edges.len(), half).into_iter().collect();

        let mut init_edges = EdgeSet::new();
        let mut rest = Vec::with_capacity(edges.len() - half);
        for (pos, &(i, j)) in edges.iter().enumerate() {
            if chosen.contains(&pos) {
                init_edges.insert(i, j);
            } else {
                rest.push((i, j));
            }
        }

        let dropped = if rest.len() > half && self.params.odd_edge == OddEdgePolicy::Drop {
            Some(rest.swap_remove(rng.gen_range(0..rest.len())))
        } else {
            None
        };
        let iter_edges: EdgeSet = rest.into_iter().collect();

        EdgeSplit {
            init: btl.restricted_to(&init_edges),
            iter: btl.restricted_to(&iter_edges),
            init_edges,
            iter_edges,
            dropped,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn frequency(wins: u64, trials: u64) -> f64 {
    wins as f64 / trials as f64
}

fn sample_wins<R: Rng + ?Sized>(trials: u64, p: f64, rng: &mut R) -> Result<u64> {
    Binomial::new(trials, p)
        .map(|dist| dist.sample(rng))
        .map_err(|e| RankError::InvalidParameter(format!("binomial({trials}, {p}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::matrix::DIAGONAL;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn builder(epsilon: f64, comparisons: u64, odd_edge: OddEdgePolicy) -> ComparisonMatrixBuilder {
        ComparisonMatrixBuilder::new(BuilderParams {
            epsilon,
            comparisons,
            odd_edge,
        })
        .expect("valid params")
    }

    fn scores() -> ScoreVector {
        ScoreVector::from_scores(vec![0.5, 0.8, 0.9, 0.75]).expect("valid")
    }

    #[test]
    fn rejects_bad_params() {
        let bad = [(1.5, 10), (-0.1, 10), (f64::NAN, 10), (0.5, 0)];
        for (epsilon, comparisons) in bad {
            assert!(
                ComparisonMatrixBuilder::new(BuilderParams {
                    epsilon,
                    comparisons,
                    odd_edge: OddEdgePolicy::Drop,
                })
                .is_err(),
                "epsilon={epsilon} comparisons={comparisons}"
            );
        }
    }

    #[test]
    fn full_comparison_is_dense() {
        let mut rng = StdRng::seed_from_u64(11);
        let data = builder(1.0, 1000, OddEdgePolicy::Drop)
            .build(&scores(), &mut rng)
            .expect("build");
        assert_eq!(data.edges.len(), 6);
        for i in 0..4 {
            for j in 0..4 {
                if i == j {
                    assert!((data.btl.get(i, j) - DIAGONAL).abs() < f64::EPSILON);
                    assert!((data.thurstone.get(i, j) - DIAGONAL).abs() < f64::EPSILON);
                } else {
                    assert!(data.btl.get(i, j) > 0.0, "btl ({i},{j}) empty");
                    let btl_sum = data.btl.get(i, j) + data.btl.get(j, i);
                    let thu_sum = data.thurstone.get(i, j) + data.thurstone.get(j, i);
                    assert!((btl_sum - 1.0).abs() < f64::EPSILON);
                    assert!((thu_sum - 1.0).abs() < f64::EPSILON);
                }
            }
        }
    }

    #[test]
    fn zero_epsilon_compares_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        let data = builder(0.0, 50, OddEdgePolicy::Drop)
            .build(&scores(), &mut rng)
            .expect("build");
        assert!(data.edges.is_empty());
        assert_eq!(data.btl, ComparisonMatrix::uncompared(4));
        assert_eq!(data.thurstone, ComparisonMatrix::uncompared(4));
        assert!(data.split.dropped.is_none());
    }

    #[test]
    fn odd_split_drops_leftover() {
        let mut rng = StdRng::seed_from_u64(5);
        let w = ScoreVector::from_scores(vec![0.5, 0.8, 0.9]).expect("valid");
        let data = builder(1.0, 100, OddEdgePolicy::Drop)
            .build(&w, &mut rng)
            .expect("build");
        let split = &data.split;
        assert_eq!(data.edges.len(), 3);
        assert_eq!(split.init_edges.len(), 1);
        assert_eq!(split.iter_edges.len(), 1);
        let dropped = split.dropped.expect("odd edge set drops one edge");
        assert!(!split.init_edges.contains(dropped.0, dropped.1));
        assert!(!split.iter_edges.contains(dropped.0, dropped.1));
        assert!(split.init_edges.is_disjoint(&split.iter_edges));
    }

    #[test]
    fn odd_split_can_keep_leftover() {
        let mut rng = StdRng::seed_from_u64(5);
        let w = ScoreVector::from_scores(vec![0.5, 0.8, 0.9]).expect("valid");
        let data = builder(1.0, 100, OddEdgePolicy::KeepInIter)
            .build(&w, &mut rng)
            .expect("build");
        assert_eq!(data.split.init_edges.len(), 1);
        assert_eq!(data.split.iter_edges.len(), 2);
        assert!(data.split.dropped.is_none());
    }

    #[test]
    fn split_halves_carry_btl_values() {
        let mut rng = StdRng::seed_from_u64(21);
        let data = builder(1.0, 200, OddEdgePolicy::Drop)
            .build(&scores(), &mut rng)
            .expect("build");
        let split = &data.split;
        for &(i, j) in split.init_edges.iter() {
            let expected = data.btl.get(i, j);
            assert!((split.init.get(i, j) - expected).abs() < f64::EPSILON);
            assert!(!split.iter.is_compared(i, j));
        }
        for &(i, j) in split.iter_edges.iter() {
            let expected = data.btl.get(i, j);
            assert!((split.iter.get(i, j) - expected).abs() < f64::EPSILON);
            assert!(!split.init.is_compared(i, j));
        }
    }
}
