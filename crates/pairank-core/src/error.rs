use std::fmt;

use serde::{Serialize, Serializer};

use crate::model::Model;

/// Machine-readable error codes, stable across releases.
///
/// Serialises as the `E####` string returned by [`ErrorCode::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidParameter,
    DegenerateInput,
    OptimizationFailure,
    ConvergenceFailure,
    SolverContract,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidParameter => "E1001",
            Self::DegenerateInput => "E1002",
            Self::OptimizationFailure => "E2001",
            Self::ConvergenceFailure => "E2002",
            Self::SolverContract => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidParameter => "Invalid trial parameter",
            Self::DegenerateInput => "Degenerate comparison data",
            Self::OptimizationFailure => "Linear program infeasible or unbounded",
            Self::ConvergenceFailure => "No stationary distribution",
            Self::SolverContract => "Solver returned an out-of-contract value",
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised while generating data or running an estimator.
///
/// All of these are local to one trial: callers abort (and report) the
/// affected estimate rather than substituting zeros.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankError {
    /// A parameter is outside its valid domain (e.g. `epsilon > 1`, `L = 0`).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The comparison data cannot support the requested computation, such
    /// as an item with no usable comparisons.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// The link-function linear program has no optimum.
    #[error("{model} linear program failed: {reason}")]
    OptimizationFailure { model: Model, reason: String },

    /// No unique unit eigenvalue; the comparison graph is reducible or empty.
    #[error("stationary distribution undefined: {0}")]
    ConvergenceFailure(String),

    /// The LP solver returned values that violate the declared bounds.
    #[error("solver contract violated: {0}")]
    SolverContract(String),
}

impl RankError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidParameter(_) => ErrorCode::InvalidParameter,
            Self::DegenerateInput(_) => ErrorCode::DegenerateInput,
            Self::OptimizationFailure { .. } => ErrorCode::OptimizationFailure,
            Self::ConvergenceFailure(_) => ErrorCode::ConvergenceFailure,
            Self::SolverContract(_) => ErrorCode::SolverContract,
        }
    }
}

pub type Result<T, E = RankError> = std::result::Result<T, E>;
