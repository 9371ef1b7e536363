//! End-to-end trials against a fixed ground truth.

use pairank_core::ErrorCode;
use pairank_core::compare::{BuilderParams, ComparisonMatrixBuilder, OddEdgePolicy};
use pairank_core::estimate::{Estimator, LinkFunctionSolver, SpectralRanker};
use pairank_core::evaluate::{Evaluator, ranking};
use pairank_core::model::ScoreVector;
use pairank_core::trial::{AlgorithmOutcome, Trial, TrialParams};
use rand::SeedableRng;
use rand::rngs::StdRng;

const TRUTH: [f64; 4] = [0.5, 0.8, 0.9, 0.75];

fn truth() -> ScoreVector {
    ScoreVector::from_scores(TRUTH.to_vec()).expect("valid scores")
}

#[test]
fn dense_noisy_btl_ranks_strongest_item_first() {
    let trial = Trial::new(TrialParams::new(4, 1000, 1.0)).expect("valid params");
    let mut top_hits = 0;
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let report = trial.run_with_scores(&truth(), &mut rng).expect("trial");
        assert_eq!(report.edges, 6);
        assert_eq!(report.truth_ranking, vec![2, 1, 3, 0]);

        let eval = report
            .outcome(Estimator::Spectral)
            .and_then(AlgorithmOutcome::evaluation)
            .expect("dense graph is connected");
        if eval.ranking[0] == 2 {
            top_hits += 1;
        }
        assert_eq!(eval.ranking[3], 0, "seed {seed}: anchor item not last");
    }
    assert!(top_hits >= 18, "item 2 first in only {top_hits}/20 trials");
}

#[test]
fn no_comparisons_fails_every_estimator() {
    let trial = Trial::new(TrialParams::new(4, 50, 0.0)).expect("valid params");
    let mut rng = StdRng::seed_from_u64(9);
    let report = trial.run_with_scores(&truth(), &mut rng).expect("trial");
    assert_eq!(report.edges, 0);
    assert_eq!(report.failures(), Estimator::ALL.len());
    match report.outcome(Estimator::Spectral) {
        Some(AlgorithmOutcome::Failed { code, message }) => {
            assert_eq!(*code, ErrorCode::ConvergenceFailure);
            assert!(!message.is_empty());
        }
        other => panic!("expected failure, got {other:?}"),
    }
    for estimator in [Estimator::BtlLp, Estimator::ThurstoneLp] {
        match report.outcome(estimator) {
            Some(AlgorithmOutcome::Failed { code, message }) => {
                assert_eq!(*code, ErrorCode::DegenerateInput);
                assert!(message.contains("item 0"), "{estimator}: {message}");
            }
            other => panic!("expected {estimator} failure, got {other:?}"),
        }
    }
}

#[test]
fn estimators_agree_with_truth_on_dense_data() {
    let builder = ComparisonMatrixBuilder::new(BuilderParams {
        epsilon: 1.0,
        comparisons: 100_000,
        odd_edge: OddEdgePolicy::Drop,
    })
    .expect("valid params");
    let mut rng = StdRng::seed_from_u64(17);
    let data = builder.build(&truth(), &mut rng).expect("build");
    let evaluator = Evaluator::new(truth().normalized(), 20);

    let spectral = SpectralRanker::default().rank(&data.btl).expect("connected");
    let eval = evaluator
        .evaluate(Estimator::Spectral, spectral.scores)
        .expect("valid");
    assert!(eval.error < 0.05, "spectral error {}", eval.error);
    assert!(eval.agreement.iter().all(|&hit| hit));

    let lp = LinkFunctionSolver::new()
        .estimate_btl(&data.btl)
        .expect("solvable");
    let eval = evaluator.evaluate(Estimator::BtlLp, lp).expect("valid");
    assert!(eval.error < 0.05, "btl-lp error {}", eval.error);
}

#[test]
fn thurstone_lp_preserves_order() {
    let builder = ComparisonMatrixBuilder::new(BuilderParams {
        epsilon: 1.0,
        comparisons: 100_000,
        odd_edge: OddEdgePolicy::Drop,
    })
    .expect("valid params");
    let mut rng = StdRng::seed_from_u64(23);
    let data = builder.build(&truth(), &mut rng).expect("build");
    let estimate = LinkFunctionSolver::new()
        .estimate_thurstone(&data.btl, &data.thurstone)
        .expect("solvable");
    assert_eq!(ranking(&estimate), vec![2, 1, 3, 0]);
}

#[test]
fn same_seed_same_report() {
    let trial = Trial::new(TrialParams::new(12, 40, 0.5)).expect("valid params");
    let a = trial.run(&mut StdRng::seed_from_u64(99)).expect("trial");
    let b = trial.run(&mut StdRng::seed_from_u64(99)).expect("trial");
    assert_eq!(a, b);
}

#[test]
fn single_item_trial_reports_failures() {
    let trial = Trial::new(TrialParams::new(1, 10, 1.0)).expect("valid params");
    let report = trial.run(&mut StdRng::seed_from_u64(1)).expect("trial");
    assert_eq!(report.edges, 0);
    assert_eq!(report.truth, vec![1.0]);
    assert!(matches!(
        report.outcome(Estimator::Mle),
        Some(AlgorithmOutcome::Failed { .. })
    ));
}
