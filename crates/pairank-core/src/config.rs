use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::compare::OddEdgePolicy;
use crate::estimate::spectral::DEFAULT_EIGEN_TOLERANCE;
use crate::evaluate::DEFAULT_TOP_K;
use crate::trial::TrialParams;

/// How the comparison probability is chosen for each item count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EpsilonRule {
    /// Use `epsilon` for every `n`.
    #[default]
    Fixed,
    /// `epsilon_scale · ln n / n`, clamped to 1.
    LogScaled,
}

/// Experiment sweep settings, read from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_items")]
    pub items: Vec<usize>,
    #[serde(default = "default_comparisons")]
    pub comparisons: Vec<u64>,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default)]
    pub epsilon_rule: EpsilonRule,
    #[serde(default = "default_epsilon_scale")]
    pub epsilon_scale: f64,
    #[serde(default = "default_trials")]
    pub trials: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_eigen_tolerance")]
    pub eigen_tolerance: f64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub odd_edge: OddEdgePolicy,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            items: default_items(),
            comparisons: default_comparisons(),
            epsilon: default_epsilon(),
            epsilon_rule: EpsilonRule::default(),
            epsilon_scale: default_epsilon_scale(),
            trials: default_trials(),
            top_k: default_top_k(),
            seed: None,
            eigen_tolerance: default_eigen_tolerance(),
            output_dir: default_output_dir(),
            odd_edge: OddEdgePolicy::default(),
        }
    }
}

impl ExperimentConfig {
    /// Comparison probability for `n` items under the configured rule.
    #[must_use]
    pub fn epsilon_for(&self, n: usize) -> f64 {
        match self.epsilon_rule {
            EpsilonRule::Fixed => self.epsilon,
            EpsilonRule::LogScaled => {
                #[allow(clippy::cast_precision_loss)]
                let n = n as f64;
                if n <= 1.0 {
                    return 1.0;
                }
                (self.epsilon_scale * n.ln() / n).clamp(0.0, 1.0)
            }
        }
    }

    #[must_use]
    pub fn trial_params(&self, items: usize, comparisons: u64) -> TrialParams {
        TrialParams {
            items,
            comparisons,
            epsilon: self.epsilon_for(items),
            top_k: self.top_k,
            eigen_tolerance: self.eigen_tolerance,
            odd_edge: self.odd_edge,
        }
    }

    /// Reject settings no trial could run with.
    ///
    /// # Errors
    ///
    /// Fails on empty sweeps, zero items or comparisons, or probabilities
    /// outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() || self.items.contains(&0) {
            bail!("items must list at least one positive count");
        }
        if self.comparisons.is_empty() || self.comparisons.contains(&0) {
            bail!("comparisons must list at least one positive count");
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            bail!("epsilon must be in [0, 1], got {}", self.epsilon);
        }
        if !(self.epsilon_scale.is_finite() && self.epsilon_scale > 0.0) {
            bail!("epsilon_scale must be positive, got {}", self.epsilon_scale);
        }
        if !(self.eigen_tolerance.is_finite() && self.eigen_tolerance > 0.0) {
            bail!(
                "eigen_tolerance must be positive, got {}",
                self.eigen_tolerance
            );
        }
        Ok(())
    }
}

/// Load an experiment config; a missing file means defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<ExperimentConfig> {
    if !path.exists() {
        return Ok(ExperimentConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ExperimentConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn default_items() -> Vec<usize> {
    vec![100]
}

fn default_comparisons() -> Vec<u64> {
    vec![50]
}

const fn default_epsilon() -> f64 {
    0.2
}

const fn default_epsilon_scale() -> f64 {
    2.0
}

const fn default_trials() -> usize {
    50
}

const fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

const fn default_eigen_tolerance() -> f64 {
    DEFAULT_EIGEN_TOLERANCE
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
