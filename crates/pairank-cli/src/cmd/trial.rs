//! `pairank trial`: one trial, printed.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use pairank_core::compare::OddEdgePolicy;
use pairank_core::evaluate::DEFAULT_TOP_K;
use pairank_core::trial::{AlgorithmOutcome, Trial, TrialParams, TrialReport};

use super::seeded_rng;

/// Arguments for `pairank trial`.
#[derive(Args, Debug)]
pub struct TrialArgs {
    /// Number of items.
    #[arg(long)]
    pub items: usize,

    /// Comparisons per compared pair.
    #[arg(long, default_value_t = 50)]
    pub comparisons: u64,

    /// Probability that a pair is compared.
    #[arg(long, default_value_t = 0.2)]
    pub epsilon: f64,

    /// Depth of the top-k agreement table.
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Keep the leftover edge of an odd split in the MLE iter half.
    #[arg(long)]
    pub keep_odd_edge: bool,

    /// Seed for the random source.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Emit the full report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl TrialArgs {
    fn params(&self) -> TrialParams {
        TrialParams {
            top_k: self.top_k,
            odd_edge: if self.keep_odd_edge {
                OddEdgePolicy::KeepInIter
            } else {
                OddEdgePolicy::Drop
            },
            ..TrialParams::new(self.items, self.comparisons, self.epsilon)
        }
    }
}

/// Execute `pairank trial`.
pub fn run_trial(args: &TrialArgs) -> Result<()> {
    let trial = Trial::new(args.params()).context("invalid trial settings")?;
    let mut rng = seeded_rng(args.seed);
    let report = trial.run(&mut rng).context("trial failed")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        write_human(&mut out, &report)?;
    }
    Ok(())
}

fn write_human(w: &mut dyn Write, report: &TrialReport) -> io::Result<()> {
    let p = &report.params;
    let dropped = if report.dropped_edge {
        " (1 dropped from MLE split)"
    } else {
        ""
    };
    writeln!(
        w,
        "n={} L={} epsilon={} edges={}{dropped}",
        p.items, p.comparisons, p.epsilon, report.edges
    )?;
    writeln!(w, "{:-<72}", "")?;
    for algo in &report.algorithms {
        match &algo.outcome {
            AlgorithmOutcome::Completed(eval) => {
                let agreement: String = eval
                    .agreement
                    .iter()
                    .map(|&hit| if hit { '1' } else { '0' })
                    .collect();
                writeln!(
                    w,
                    "{:<10} error={:.4} top_k={}",
                    algo.estimator.label(),
                    eval.error,
                    agreement
                )?;
            }
            AlgorithmOutcome::Failed { code, message } => {
                let label = algo.estimator.label();
                writeln!(w, "{label:<10} failed [{code}] {message}")?;
            }
        }
    }
    Ok(())
}
