//! Ranking-recovery estimators.
//!
//! # Overview
//!
//! Each estimator turns comparison data into one score per item:
//!
//! - **Link-function LP** (`link`): L1 fit of score differences to
//!   logit/probit-transformed frequencies, one program per model.
//! - **Rank Centrality** (`spectral`): stationary distribution of a
//!   loser-to-winner random walk.
//! - **Spectral MLE** (`mle`): spectral seed on half the edges, refined by a
//!   coordinate-wise likelihood grid search on the other half.
//!
//! The LP backend is abstracted behind [`lp::LpSolver`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Model;

pub mod link;
pub mod lp;
pub mod mle;
pub mod spectral;

pub use link::{LinkFunctionSolver, LinkMatrix};
pub use lp::{LinearProgram, LpFailure, LpSolver, SimplexSolver};
pub use mle::{MleParams, MleResult, SpectralMleRefiner};
pub use spectral::{SpectralConfig, SpectralRanker, SpectralResult};

/// One (model, algorithm) combination whose estimate is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Estimator {
    BtlLp,
    ThurstoneLp,
    Spectral,
    Mle,
}

impl Estimator {
    /// Result-table order.
    pub const ALL: [Self; 4] = [Self::BtlLp, Self::ThurstoneLp, Self::Spectral, Self::Mle];

    /// Comparison model the estimate targets.
    #[must_use]
    pub const fn model(self) -> Model {
        match self {
            Self::ThurstoneLp => Model::Thurstone,
            Self::BtlLp | Self::Spectral | Self::Mle => Model::Btl,
        }
    }

    /// Algorithm column value in result tables.
    #[must_use]
    pub const fn algorithm(self) -> &'static str {
        match self {
            Self::BtlLp | Self::ThurstoneLp => "lp",
            Self::Spectral => "spec",
            Self::Mle => "mle",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BtlLp => "btl-lp",
            Self::ThurstoneLp => "thu-lp",
            Self::Spectral => "spectral",
            Self::Mle => "mle",
        }
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
