//! Comparison data: matrix types and the synthetic builder.

pub mod builder;
pub mod matrix;

pub use builder::{
    BuilderParams, ComparisonData, ComparisonMatrixBuilder, EdgeSplit, OddEdgePolicy,
};
pub use matrix::{ComparisonMatrix, DIAGONAL, Edge, EdgeSet};
