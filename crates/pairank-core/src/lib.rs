#![forbid(unsafe_code)]
//! pairank-core library.
//!
//! Generates synthetic pairwise-comparison data from a ground-truth score
//! vector, recovers the ranking with several estimators, and scores each
//! estimate against the truth.
//!
//! # Pipeline
//!
//! ```text
//! ScoreVector ─▶ ComparisonMatrixBuilder ─┬─▶ LinkFunctionSolver (btl-lp, thu-lp)
//!                                         ├─▶ SpectralRanker     (spectral)
//!                                         └─▶ SpectralMleRefiner (mle)
//!                                                     │
//!                                                     ▼
//!                                                 Evaluator
//! ```
//!
//! [`trial::Trial`] wires the whole pipeline for one trial. Persistence and
//! trial looping live in the `pairank` binary.
//!
//! # Conventions
//!
//! - **Errors**: Estimators return [`RankError`]; configuration loading uses
//!   `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod compare;
pub mod config;
pub mod error;
pub mod estimate;
pub mod evaluate;
pub mod model;
pub mod trial;

pub use error::{ErrorCode, RankError};
