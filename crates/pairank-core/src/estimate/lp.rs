//! Linear-program contract used by the link-function estimator.
//!
//! The estimator only builds a [`LinearProgram`] and reads back one value per
//! variable; it never depends on a particular solver. [`SimplexSolver`] is
//! the default backend, a thin adapter over `minilp`.

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};

/// Sense of a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessEq,
    GreaterEq,
}

/// A bounded continuous variable with its objective coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableSpec {
    pub cost: f64,
    pub lower: f64,
    pub upper: f64,
}

/// `Σ coef · var  (≤ | ≥)  rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub terms: Vec<(usize, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

/// Minimisation problem over bounded continuous variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearProgram {
    variables: Vec<VariableSpec>,
    constraints: Vec<Constraint>,
}

impl LinearProgram {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable and return its index.
    pub fn add_variable(&mut self, cost: f64, lower: f64, upper: f64) -> usize {
        self.variables.push(VariableSpec { cost, lower, upper });
        self.variables.len() - 1
    }

    pub fn add_constraint(&mut self, terms: Vec<(usize, f64)>, relation: Relation, rhs: f64) {
        self.constraints.push(Constraint {
            terms,
            relation,
            rhs,
        });
    }

    #[must_use]
    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

/// Why a program has no optimal assignment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LpFailure {
    #[error("problem is infeasible")]
    Infeasible,
    #[error("problem is unbounded")]
    Unbounded,
    #[error("malformed program: {0}")]
    Malformed(String),
}

/// Black-box LP engine: `solve(constraints, objective) -> solution`.
pub trait LpSolver {
    /// Minimise the program's objective; returns one value per variable in
    /// declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`LpFailure`] when no optimum exists.
    fn solve(&self, program: &LinearProgram) -> Result<Vec<f64>, LpFailure>;
}

/// Default solver backed by `minilp`'s dual simplex.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSolver;

impl LpSolver for SimplexSolver {
    fn solve(&self, program: &LinearProgram) -> Result<Vec<f64>, LpFailure> {
        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let vars: Vec<_> = program
            .variables()
            .iter()
            .map(|v| problem.add_var(v.cost, (v.lower, v.upper)))
            .collect();

        for (row, constraint) in program.constraints().iter().enumerate() {
            let mut expr = LinearExpr::empty();
            for &(idx, coef) in &constraint.terms {
                let var = vars.get(idx).copied().ok_or_else(|| {
                    LpFailure::Malformed(format!("constraint {row} references variable {idx}"))
                })?;
                expr.add(var, coef);
            }
            let op = match constraint.relation {
                Relation::LessEq => ComparisonOp::Le,
                Relation::GreaterEq => ComparisonOp::Ge,
            };
            problem.add_constraint(expr, op, constraint.rhs);
        }

        let solution = problem.solve().map_err(|e| match e {
            minilp::Error::Infeasible => LpFailure::Infeasible,
            minilp::Error::Unbounded => LpFailure::Unbounded,
        })?;

        Ok(vars.iter().map(|&v| solution[v]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_small_program() {
        // min x + y  s.t.  x + y ≥ 1,  x − y ≥ 0.5,  x, y ∈ [0, 1]
        let mut lp = LinearProgram::new();
        let x = lp.add_variable(1.0, 0.0, 1.0);
        let y = lp.add_variable(1.0, 0.0, 1.0);
        lp.add_constraint(vec![(x, 1.0), (y, 1.0)], Relation::GreaterEq, 1.0);
        lp.add_constraint(vec![(x, 1.0), (y, -1.0)], Relation::GreaterEq, 0.5);

        let values = SimplexSolver.solve(&lp).expect("feasible");
        assert!((values[x] + values[y] - 1.0).abs() < 1e-9);
        assert!(values[x] - values[y] >= 0.5 - 1e-9);
    }

    #[test]
    fn reports_infeasible() {
        let mut lp = LinearProgram::new();
        let x = lp.add_variable(1.0, 0.0, 1.0);
        lp.add_constraint(vec![(x, 1.0)], Relation::GreaterEq, 2.0);
        assert_eq!(SimplexSolver.solve(&lp), Err(LpFailure::Infeasible));
    }

    #[test]
    fn rejects_unknown_variable() {
        let mut lp = LinearProgram::new();
        lp.add_variable(1.0, 0.0, 1.0);
        lp.add_constraint(vec![(3, 1.0)], Relation::LessEq, 1.0);
        assert!(matches!(SimplexSolver.solve(&lp), Err(LpFailure::Malformed(_))));
    }
}
