//! One trial of the experiment: generate, estimate, evaluate.
//!
//! A trial never fails because an estimator fails. Each estimator's result
//! is captured as an [`AlgorithmOutcome`], so a failed estimate stays
//! distinguishable from a valid all-zero or all-equal one and the other
//! estimators still report.

use rand::Rng;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::compare::{BuilderParams, ComparisonData, ComparisonMatrixBuilder, OddEdgePolicy};
use crate::error::{ErrorCode, RankError, Result};
use crate::estimate::spectral::DEFAULT_EIGEN_TOLERANCE;
use crate::estimate::{
    Estimator, LinkFunctionSolver, LpSolver, MleParams, SimplexSolver, SpectralConfig,
    SpectralMleRefiner, SpectralRanker,
};
use crate::evaluate::{DEFAULT_TOP_K, Evaluation, Evaluator};
use crate::model::ScoreVector;

/// Parameters for one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrialParams {
    /// Number of items `n`.
    pub items: usize,
    /// Repeated comparisons per compared pair `L`.
    pub comparisons: u64,
    /// Probability that a pair is compared `ε`.
    pub epsilon: f64,
    /// Depth of the top-k agreement table.
    pub top_k: usize,
    pub eigen_tolerance: f64,
    /// What the MLE split does with a leftover edge.
    pub odd_edge: OddEdgePolicy,
}

impl TrialParams {
    #[must_use]
    pub const fn new(items: usize, comparisons: u64, epsilon: f64) -> Self {
        Self {
            items,
            comparisons,
            epsilon,
            top_k: DEFAULT_TOP_K,
            eigen_tolerance: DEFAULT_EIGEN_TOLERANCE,
            odd_edge: OddEdgePolicy::Drop,
        }
    }
}

/// Result of one estimator in one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlgorithmOutcome {
    Completed(Evaluation),
    Failed { code: ErrorCode, message: String },
}

impl AlgorithmOutcome {
    #[must_use]
    pub const fn evaluation(&self) -> Option<&Evaluation> {
        match self {
            Self::Completed(eval) => Some(eval),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmReport {
    pub estimator: Estimator,
    pub outcome: AlgorithmOutcome,
}

/// Everything a reporter needs about one trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialReport {
    pub params: TrialParams,
    /// Normalised ground truth.
    pub truth: Vec<f64>,
    pub truth_ranking: Vec<usize>,
    /// Number of compared pairs.
    pub edges: usize,
    /// Whether the odd edge of the MLE split was discarded.
    pub dropped_edge: bool,
    /// One entry per [`Estimator::ALL`], in that order.
    pub algorithms: Vec<AlgorithmReport>,
}

impl TrialReport {
    #[must_use]
    pub fn outcome(&self, estimator: Estimator) -> Option<&AlgorithmOutcome> {
        self.algorithms
            .iter()
            .find(|a| a.estimator == estimator)
            .map(|a| &a.outcome)
    }

    #[must_use]
    pub fn failures(&self) -> usize {
        self.algorithms
            .iter()
            .filter(|a| matches!(a.outcome, AlgorithmOutcome::Failed { .. }))
            .count()
    }
}

/// Pipeline for repeated trials sharing one parameter set.
#[derive(Debug, Clone)]
pub struct Trial<S = SimplexSolver> {
    params: TrialParams,
    builder: ComparisonMatrixBuilder,
    link: LinkFunctionSolver<S>,
    spectral: SpectralRanker,
}

impl Trial<SimplexSolver> {
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] for invalid trial parameters.
    pub fn new(params: TrialParams) -> Result<Self> {
        Self::with_solver(params, SimplexSolver)
    }
}

impl<S: LpSolver> Trial<S> {
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] for invalid trial parameters.
    pub fn with_solver(params: TrialParams, solver: S) -> Result<Self> {
        if params.items == 0 {
            return Err(RankError::InvalidParameter(
                "item count must be at least 1".into(),
            ));
        }
        let builder = ComparisonMatrixBuilder::new(BuilderParams {
            epsilon: params.epsilon,
            comparisons: params.comparisons,
            odd_edge: params.odd_edge,
        })?;
        Ok(Self {
            params,
            builder,
            link: LinkFunctionSolver::with_solver(solver),
            spectral: SpectralRanker::new(SpectralConfig {
                eigen_tolerance: params.eigen_tolerance,
            }),
        })
    }

    #[must_use]
    pub const fn params(&self) -> &TrialParams {
        &self.params
    }

    /// Draw fresh ground truth and run the whole pipeline.
    ///
    /// # Errors
    ///
    /// Only data-generation failures are returned; estimator failures are
    /// recorded in the report.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TrialReport> {
        let scores = ScoreVector::generate(self.params.items, rng)?;
        self.run_with_scores(&scores, rng)
    }

    /// Run the pipeline against a given ground truth.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] if `scores` does not have
    /// `items` entries, or if data generation fails.
    #[instrument(
        skip(self, scores, rng),
        fields(
            n = self.params.items,
            l = self.params.comparisons,
            epsilon = self.params.epsilon,
        )
    )]
    pub fn run_with_scores<R: Rng + ?Sized>(
        &self,
        scores: &ScoreVector,
        rng: &mut R,
    ) -> Result<TrialReport> {
        if scores.len() != self.params.items {
            return Err(RankError::InvalidParameter(format!(
                "expected {} scores, got {}",
                self.params.items,
                scores.len()
            )));
        }
        let data = self.builder.build(scores, rng)?;
        let evaluator = Evaluator::new(scores.normalized(), self.params.top_k);

        let algorithms = Estimator::ALL
            .iter()
            .map(|&estimator| {
                let outcome = match self
                    .estimate(estimator, &data, scores)
                    .and_then(|est| evaluator.evaluate(estimator, est))
                {
                    Ok(eval) => AlgorithmOutcome::Completed(eval),
                    Err(err) => {
                        warn!(%estimator, code = %err.code(), error = %err, "estimator failed");
                        AlgorithmOutcome::Failed {
                            code: err.code(),
                            message: err.to_string(),
                        }
                    }
                };
                AlgorithmReport { estimator, outcome }
            })
            .collect::<Vec<_>>();

        let report = TrialReport {
            params: self.params,
            truth: evaluator.truth().to_vec(),
            truth_ranking: evaluator.truth_ranking().to_vec(),
            edges: data.edges.len(),
            dropped_edge: data.split.dropped.is_some(),
            algorithms,
        };
        info!(
            edges = report.edges,
            failures = report.failures(),
            "trial complete"
        );
        Ok(report)
    }

    fn estimate(
        &self,
        estimator: Estimator,
        data: &ComparisonData,
        scores: &ScoreVector,
    ) -> Result<Vec<f64>> {
        match estimator {
            Estimator::BtlLp => self.link.estimate_btl(&data.btl),
            Estimator::ThurstoneLp => self.link.estimate_thurstone(&data.btl, &data.thurstone),
            Estimator::Spectral => self.spectral.rank(&data.btl).map(|r| r.scores),
            Estimator::Mle => {
                let truth = scores.normalized();
                let params = MleParams {
                    w_min: truth.iter().copied().fold(f64::INFINITY, f64::min),
                    w_max: truth.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    epsilon: self.params.epsilon,
                    comparisons: self.params.comparisons,
                };
                SpectralMleRefiner::new(params, self.spectral.clone())?
                    .refine(&data.split.init, &data.split.iter)
                    .map(|r| r.scores)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zero_items_rejected() {
        assert!(Trial::new(TrialParams::new(0, 10, 0.5)).is_err());
    }

    #[test]
    fn invalid_epsilon_rejected() {
        assert!(Trial::new(TrialParams::new(5, 10, 1.5)).is_err());
    }

    #[test]
    fn dense_trial_reports_every_estimator() {
        let trial = Trial::new(TrialParams::new(8, 500, 1.0)).expect("valid");
        let mut rng = StdRng::seed_from_u64(42);
        let report = trial.run(&mut rng).expect("generation succeeds");
        assert_eq!(report.algorithms.len(), Estimator::ALL.len());
        assert_eq!(report.edges, 28);
        for (report, expected) in report.algorithms.iter().zip(Estimator::ALL) {
            assert_eq!(report.estimator, expected);
        }
        for estimator in [Estimator::BtlLp, Estimator::ThurstoneLp, Estimator::Spectral] {
            let eval = report
                .outcome(estimator)
                .and_then(AlgorithmOutcome::evaluation)
                .expect("dense data is solvable");
            assert_eq!(eval.agreement.len(), 8);
            assert!(eval.error.is_finite());
        }
    }

    #[test]
    fn empty_graph_fails_spectral_without_aborting() {
        let trial = Trial::new(TrialParams::new(5, 10, 0.0)).expect("valid");
        let mut rng = StdRng::seed_from_u64(1);
        let report = trial.run(&mut rng).expect("generation succeeds");
        assert_eq!(report.edges, 0);
        match report.outcome(Estimator::Spectral) {
            Some(AlgorithmOutcome::Failed { code, .. }) => {
                assert_eq!(*code, ErrorCode::ConvergenceFailure);
            }
            other => panic!("expected spectral failure, got {other:?}"),
        }
        assert!(matches!(
            report.outcome(Estimator::Mle),
            Some(AlgorithmOutcome::Failed { .. })
        ));
    }

    #[test]
    fn report_serializes_outcome_status() {
        let trial = Trial::new(TrialParams::new(4, 10, 0.0)).expect("valid");
        let report = trial.run(&mut StdRng::seed_from_u64(2)).expect("trial");
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["algorithms"][2]["estimator"], "spectral");
        assert_eq!(json["algorithms"][2]["outcome"]["status"], "failed");
        assert_eq!(json["algorithms"][2]["outcome"]["code"], "E2002");
        assert_eq!(json["algorithms"][0]["outcome"]["code"], "E1002");
        assert_eq!(json["params"]["odd_edge"], "drop");
    }

    #[test]
    fn uncompared_items_fail_lp_estimators() {
        let trial = Trial::new(TrialParams::new(4, 50, 0.0)).expect("valid");
        let report = trial.run(&mut StdRng::seed_from_u64(9)).expect("trial");
        for estimator in [Estimator::BtlLp, Estimator::ThurstoneLp] {
            match report.outcome(estimator) {
                Some(AlgorithmOutcome::Failed { code, .. }) => {
                    assert_eq!(*code, ErrorCode::DegenerateInput);
                }
                other => panic!("expected {estimator} to fail, got {other:?}"),
            }
        }
    }

    #[test]
    fn kept_odd_edge_is_reported() {
        let params = TrialParams {
            odd_edge: OddEdgePolicy::KeepInIter,
            ..TrialParams::new(3, 10, 1.0)
        };
        let report = Trial::new(params)
            .expect("valid")
            .run(&mut StdRng::seed_from_u64(5))
            .expect("trial");
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["params"]["odd_edge"], "keep-in-iter");
        assert!(!report.dropped_edge);
    }

    #[test]
    fn score_count_must_match() {
        let trial = Trial::new(TrialParams::new(3, 10, 1.0)).expect("valid");
        let scores = ScoreVector::from_scores(vec![0.5, 0.9]).expect("valid");
        let mut rng = StdRng::seed_from_u64(1);
        assert!(trial.run_with_scores(&scores, &mut rng).is_err());
    }
}
