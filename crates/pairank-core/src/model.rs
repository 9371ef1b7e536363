//! Ground-truth scores and the two pairwise comparison models.
//!
//! # Models
//!
//! ```text
//! BTL        P(i beats j) = w_i / (w_i + w_j)
//! Thurstone  P(i beats j) = Φ(w_i − w_j)
//! ```
//!
//! `Φ` and `Φ⁻¹` are computed from the error function in `statrs`.

use std::f64::consts::SQRT_2;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::function::erf::{erf, erfc_inv};

use crate::error::{RankError, Result};

/// Score pinned on item 0 so every trial contains one clearly weak item.
pub const ANCHOR_SCORE: f64 = 0.5;
/// Lower end of the uniform range for the remaining items.
pub const SCORE_FLOOR: f64 = 0.7;
/// Width of the uniform range: scores fall in `[0.7, 1.0)`.
pub const SCORE_SPAN: f64 = 0.3;

/// Probabilistic model that turns two scores into a win probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    /// Bradley-Terry-Luce.
    Btl,
    /// Thurstone (Case V, unit variance).
    Thurstone,
}

impl Model {
    /// Short name used in result tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Btl => "btl",
            Self::Thurstone => "thu",
        }
    }

    /// Probability that an item with score `wi` beats one with score `wj`.
    #[must_use]
    pub fn win_probability(self, wi: f64, wj: f64) -> f64 {
        match self {
            Self::Btl => wi / (wi + wj),
            Self::Thurstone => normal_cdf(wi - wj),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard normal CDF, `Φ(x)`.
#[must_use]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Standard normal quantile, `Φ⁻¹(p)`. Infinite at `p = 0` and `p = 1`.
#[must_use]
pub fn normal_inv_cdf(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Ground-truth latent scores, one positive value per item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreVector {
    scores: Vec<f64>,
}

impl ScoreVector {
    /// Draw a fresh score vector: item 0 is [`ANCHOR_SCORE`], the rest are
    /// uniform in `[0.7, 1.0)`.
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] when `n == 0`.
    pub fn generate<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<Self> {
        if n == 0 {
            return Err(RankError::InvalidParameter(
                "item count must be at least 1".into(),
            ));
        }
        let scores = (0..n)
            .map(|i| {
                if i == 0 {
                    ANCHOR_SCORE
                } else {
                    rng.gen_range(0.0_f64..1.0).mul_add(SCORE_SPAN, SCORE_FLOOR)
                }
            })
            .collect();
        Ok(Self { scores })
    }

    /// Wrap explicit scores (replays, fixtures).
    ///
    /// # Errors
    ///
    /// Returns [`RankError::InvalidParameter`] if the vector is empty or any
    /// entry is not a finite positive number.
    pub fn from_scores(scores: Vec<f64>) -> Result<Self> {
        if scores.is_empty() {
            return Err(RankError::InvalidParameter("score vector is empty".into()));
        }
        if let Some((i, w)) = scores
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w <= 0.0)
        {
            return Err(RankError::InvalidParameter(format!(
                "score {i} must be finite and positive, got {w}"
            )));
        }
        Ok(Self { scores })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    #[must_use]
    pub const fn as_slice(&self) -> &[f64] {
        self.scores.as_slice()
    }

    /// Scores divided by their sum.
    #[must_use]
    pub fn normalized(&self) -> Vec<f64> {
        let total: f64 = self.scores.iter().sum();
        self.scores.iter().map(|w| w / total).collect()
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.scores.iter().copied().fold(f64::INFINITY, f64::min)
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.scores
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }
}
