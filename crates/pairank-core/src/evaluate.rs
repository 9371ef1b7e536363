//! Scoring estimates against the ground truth.
//!
//! Two measures per estimate:
//!
//! - **Entrywise error**: `max_i |est_i − truth_i| / max_i truth_i`, a relative
//!   L∞ error against the normalised truth.
//! - **Top-k agreement**: for `k = 1..=depth`, whether the estimate's top-k
//!   item set equals the true top-k set exactly.
//!
//! Rankings order items by descending score; ties keep the lower index
//! first.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{RankError, Result};
use crate::estimate::Estimator;

/// Number of top-k columns in the result tables.
pub const DEFAULT_TOP_K: usize = 20;

/// Relative L∞ error of `estimate` against `truth`.
///
/// # Errors
///
/// Returns [`RankError::DegenerateInput`] if the lengths differ, the vectors
/// are empty, or the largest true value is not positive.
pub fn entrywise_error(estimate: &[f64], truth: &[f64]) -> Result<f64> {
    if estimate.len() != truth.len() {
        return Err(RankError::DegenerateInput(format!(
            "estimate has {} entries, truth has {}",
            estimate.len(),
            truth.len()
        )));
    }
    let scale = truth.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if scale.is_nan() || scale <= 0.0 {
        return Err(RankError::DegenerateInput(
            "ground truth has no positive entry".into(),
        ));
    }
    let worst = estimate
        .iter()
        .zip(truth.iter())
        .map(|(e, t)| (e - t).abs())
        .fold(0.0_f64, f64::max);
    Ok(worst / scale)
}

/// Item indices ordered by descending score (ties: ascending index).
#[must_use]
pub fn ranking(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order
}

/// `|top_k(truth) ∩ top_k(method)|` for `k = 1..=min(depth, n)`.
#[must_use]
pub fn true_positives(truth: &[usize], method: &[usize], depth: usize) -> Vec<usize> {
    let depth = depth.min(truth.len()).min(method.len());
    let mut seen_truth = HashSet::with_capacity(depth);
    let mut seen_method = HashSet::with_capacity(depth);
    let mut shared = 0;
    let mut counts = Vec::with_capacity(depth);
    for k in 0..depth {
        let (t, m) = (truth[k], method[k]);
        seen_truth.insert(t);
        seen_method.insert(m);
        if t == m {
            shared += 1;
        } else {
            shared += usize::from(seen_method.contains(&t));
            shared += usize::from(seen_truth.contains(&m));
        }
        counts.push(shared);
    }
    counts
}

/// Exact top-k set agreement for `k = 1..=min(depth, n)`.
#[must_use]
pub fn top_k_agreement(truth: &[usize], method: &[usize], depth: usize) -> Vec<bool> {
    true_positives(truth, method, depth)
        .into_iter()
        .enumerate()
        .map(|(k, hits)| hits == k + 1)
        .collect()
}

/// Scores for one estimator in one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub estimator: Estimator,
    pub estimate: Vec<f64>,
    pub error: f64,
    pub ranking: Vec<usize>,
    pub agreement: Vec<bool>,
}

/// Scores estimates against one trial's normalised ground truth.
#[derive(Debug, Clone)]
pub struct Evaluator {
    truth: Vec<f64>,
    truth_ranking: Vec<usize>,
    depth: usize,
}

impl Evaluator {
    /// `truth` should already be normalised to sum to one.
    #[must_use]
    pub fn new(truth: Vec<f64>, depth: usize) -> Self {
        let truth_ranking = ranking(&truth);
        Self {
            truth,
            truth_ranking,
            depth,
        }
    }

    #[must_use]
    pub fn truth(&self) -> &[f64] {
        &self.truth
    }

    #[must_use]
    pub fn truth_ranking(&self) -> &[usize] {
        &self.truth_ranking
    }

    /// # Errors
    ///
    /// See [`entrywise_error`].
    pub fn evaluate(&self, estimator: Estimator, estimate: Vec<f64>) -> Result<Evaluation> {
        let error = entrywise_error(&estimate, &self.truth)?;
        let order = ranking(&estimate);
        let agreement = top_k_agreement(&self.truth_ranking, &order, self.depth);
        Ok(Evaluation {
            estimator,
            estimate,
            error,
            ranking: order,
            agreement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_estimate_has_zero_error() {
        let truth = [0.1, 0.4, 0.3, 0.2];
        let error = entrywise_error(&truth, &truth).expect("valid");
        assert!(error.abs() < f64::EPSILON);
    }

    #[test]
    fn error_is_relative_to_largest_truth() {
        let truth = [0.2, 0.5, 0.3];
        let estimate = [0.3, 0.4, 0.3];
        let err = entrywise_error(&estimate, &truth).expect("valid");
        assert!((err - 0.2).abs() < 1e-12);
    }

    #[test]
    fn error_rejects_mismatch_and_empty() {
        assert!(entrywise_error(&[0.1], &[0.1, 0.2]).is_err());
        assert!(entrywise_error(&[], &[]).is_err());
        assert!(entrywise_error(&[0.0, 0.0], &[0.0, 0.0]).is_err());
    }

    #[test]
    fn ranking_is_descending_with_index_tiebreak() {
        assert_eq!(ranking(&[0.2, 0.9, 0.2, 0.5]), vec![1, 3, 0, 2]);
    }

    #[test]
    fn agreement_requires_exact_sets() {
        let truth = vec![3, 1, 0, 2];
        let method = vec![1, 3, 2, 0];
        assert_eq!(true_positives(&truth, &method, 20), vec![0, 2, 2, 4]);
        assert_eq!(
            top_k_agreement(&truth, &method, 20),
            vec![false, true, false, true]
        );
    }

    #[test]
    fn agreement_depth_is_capped() {
        let truth: Vec<usize> = (0..30).collect();
        assert_eq!(top_k_agreement(&truth, &truth, 20).len(), 20);
        assert_eq!(top_k_agreement(&truth[..5], &truth[..5], 20).len(), 5);
    }

    #[test]
    fn evaluator_scores_estimate() {
        let evaluator = Evaluator::new(vec![0.1, 0.4, 0.3, 0.2], DEFAULT_TOP_K);
        let eval = evaluator
            .evaluate(Estimator::Spectral, vec![0.1, 0.3, 0.4, 0.2])
            .expect("valid");
        assert_eq!(evaluator.truth_ranking(), &[1, 2, 3, 0]);
        assert_eq!(eval.ranking, vec![2, 1, 3, 0]);
        assert_eq!(eval.agreement, vec![false, true, true, true]);
        assert!((eval.error - 0.25).abs() < 1e-12);
    }
}
