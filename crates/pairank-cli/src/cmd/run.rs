//! `pairank run`: the parameter sweep.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use pairank_core::config::{ExperimentConfig, load_config};
use pairank_core::estimate::Estimator;
use pairank_core::trial::{AlgorithmOutcome, Trial, TrialReport};
use tracing::info;

use super::seeded_rng;
use crate::report::ResultWriter;

/// Arguments for `pairank run`. Flags override the config file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML file with sweep settings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Item counts to sweep.
    #[arg(long, num_args = 1..)]
    pub items: Vec<usize>,

    /// Comparisons per compared pair to sweep.
    #[arg(long, num_args = 1..)]
    pub comparisons: Vec<u64>,

    /// Probability that a pair is compared.
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Trials per (items, comparisons) setting.
    #[arg(long)]
    pub trials: Option<usize>,

    /// Seed for the random source.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory for ranks.csv and errors.csv.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl RunArgs {
    /// Resolve the effective configuration.
    pub fn resolve(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) if !path.exists() => bail!("config file {} not found", path.display()),
            Some(path) => load_config(path)?,
            None => ExperimentConfig::default(),
        };
        if !self.items.is_empty() {
            config.items.clone_from(&self.items);
        }
        if !self.comparisons.is_empty() {
            config.comparisons.clone_from(&self.comparisons);
        }
        if let Some(epsilon) = self.epsilon {
            config.epsilon = epsilon;
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(out) = &self.out {
            config.output_dir.clone_from(out);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Running totals per estimator across the sweep.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    completed: usize,
    failed: usize,
    error_sum: f64,
    top_one: usize,
}

#[derive(Debug, Default)]
struct Summary {
    trials: usize,
    per_estimator: BTreeMap<&'static str, Tally>,
}

impl Summary {
    fn record(&mut self, report: &TrialReport) {
        self.trials += 1;
        for algo in &report.algorithms {
            let tally = self
                .per_estimator
                .entry(algo.estimator.label())
                .or_default();
            match &algo.outcome {
                AlgorithmOutcome::Completed(eval) => {
                    tally.completed += 1;
                    tally.error_sum += eval.error;
                    tally.top_one += usize::from(eval.agreement.first().copied().unwrap_or(false));
                }
                AlgorithmOutcome::Failed { .. } => tally.failed += 1,
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn write(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{} trials", self.trials)?;
        writeln!(
            w,
            "{:<10} {:>9} {:>6} {:>10} {:>7}",
            "estimator", "completed", "failed", "mean_error", "top_1"
        )?;
        for estimator in Estimator::ALL {
            let tally = self
                .per_estimator
                .get(estimator.label())
                .copied()
                .unwrap_or_default();
            let (mean, top) = if tally.completed == 0 {
                ("-".to_string(), "-".to_string())
            } else {
                let n = tally.completed as f64;
                (
                    format!("{:.4}", tally.error_sum / n),
                    format!("{:.2}", tally.top_one as f64 / n),
                )
            };
            writeln!(
                w,
                "{:<10} {:>9} {:>6} {:>10} {:>7}",
                estimator.label(),
                tally.completed,
                tally.failed,
                mean,
                top
            )?;
        }
        Ok(())
    }
}

/// Execute `pairank run`.
pub fn run_sweep(args: &RunArgs) -> Result<()> {
    let config = args.resolve()?;
    info!(
        items = ?config.items,
        comparisons = ?config.comparisons,
        trials = config.trials,
        out = %config.output_dir.display(),
        "starting sweep"
    );

    let mut rng = seeded_rng(config.seed);
    let mut writer = ResultWriter::create(&config.output_dir, config.top_k)?;
    let mut summary = Summary::default();

    for &items in &config.items {
        for &comparisons in &config.comparisons {
            let params = config.trial_params(items, comparisons);
            let trial = Trial::new(params)
                .with_context(|| format!("invalid trial settings n={items} L={comparisons}"))?;
            for index in 0..config.trials {
                let report = trial
                    .run(&mut rng)
                    .with_context(|| format!("trial {index} (n={items}, L={comparisons}) failed"))?;
                writer.write_trial(&report)?;
                summary.record(&report);
                info!(
                    index,
                    items,
                    comparisons,
                    epsilon = params.epsilon,
                    edges = report.edges,
                    failures = report.failures(),
                    "trial written"
                );
            }
        }
    }

    let dir = writer.finish()?;
    info!(dir = %dir.display(), trials = summary.trials, "sweep complete");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    summary.write(&mut out)?;
    Ok(())
}
