//! Code for solving a [`Problem`] with an external optimisation engine.
//!
//! The only backend currently provided is [HiGHS](https://highs.dev). Disjunctions are converted
//! into linear constraints with a big-M transformation before the problem is handed over.
use crate::log::is_logging_off;
use crate::problem::{Constraint, Domain, LinExpr, Problem, Sense, VarId};
use crate::settings::SolverSettings;
use anyhow::Result;
use highs::{HighsModelStatus, RowProblem};
use log::{debug, info, warn};
use std::fmt;

/// The outcome of a solve as reported by the engine
#[derive(Clone, Debug, PartialEq)]
pub enum SolveStatus {
    /// An optimal solution was found
    Optimal,
    /// The problem has no feasible solution
    Infeasible,
    /// The objective is unbounded (or the problem is infeasible)
    Unbounded,
    /// The time limit was reached
    TimeLimit,
    /// Any other status reported by the engine
    Other(String),
}

impl SolveStatus {
    /// Whether the solve produced a usable solution
    pub fn is_success(&self) -> bool {
        *self == SolveStatus::Optimal
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "optimal"),
            SolveStatus::Infeasible => write!(f, "infeasible"),
            SolveStatus::Unbounded => write!(f, "unbounded"),
            SolveStatus::TimeLimit => write!(f, "time_limit"),
            SolveStatus::Other(status) => write!(f, "{status}"),
        }
    }
}

/// The solution to an optimisation problem
#[derive(Clone, Debug)]
pub struct Solution {
    /// Status reported by the engine
    pub status: SolveStatus,
    /// Value of the objective function (NaN if there is no solution)
    pub objective_value: f64,
    values: Vec<f64>,
}

impl Solution {
    /// A solution with no values, for unsuccessful solves
    fn failed(status: SolveStatus) -> Self {
        Self {
            status,
            objective_value: f64::NAN,
            values: Vec::new(),
        }
    }

    /// Get the value of a variable.
    ///
    /// Returns NaN if the solve was not successful.
    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.index()).copied().unwrap_or(f64::NAN)
    }

    /// Get the values of a series of variables
    pub fn values<'a, I>(&self, vars: I) -> Vec<f64>
    where
        I: IntoIterator<Item = &'a VarId>,
    {
        vars.into_iter().map(|var| self.value(*var)).collect()
    }

    /// Evaluate an expression at the solution
    pub fn evaluate(&self, expr: &LinExpr) -> f64 {
        if self.values.is_empty() && !expr.is_constant() {
            return f64::NAN;
        }
        expr.evaluate(&self.values)
    }

    /// Iterate over the name and value of every variable in `problem`
    pub fn iter_named<'a>(&'a self, problem: &'a Problem) -> impl Iterator<Item = (&'a str, f64)> {
        problem
            .iter_variables()
            .map(|(id, var)| (var.name.as_str(), self.value(id)))
    }
}

/// An optimisation engine
pub trait Solver {
    /// Name of the engine, for logging
    fn name(&self) -> &str;

    /// Solve the problem.
    ///
    /// Failures of the engine to find a solution (infeasibility etc.) are reported through the
    /// returned [`SolveStatus`], not as errors.
    fn solve(&self, problem: &Problem) -> Result<Solution>;
}

/// Solves problems with HiGHS, using a big-M transformation for disjunctions
#[derive(Debug, Default, Clone)]
pub struct HighsSolver {
    settings: SolverSettings,
}

impl HighsSolver {
    /// Create a new [`HighsSolver`] with the given settings
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }
}

impl Solver for HighsSolver {
    fn name(&self) -> &str {
        "highs"
    }

    fn solve(&self, problem: &Problem) -> Result<Solution> {
        // HiGHS refuses to solve a problem with no columns
        if problem.num_variables() == 0 {
            warn!("Problem has no variables; nothing to solve");
            return Ok(Solution {
                status: SolveStatus::Optimal,
                objective_value: problem.objective().constant_part(),
                values: Vec::new(),
            });
        }

        info!("Solving problem with {}: {problem}", self.name());
        let mut highs_problem = RowProblem::default();

        // Objective coefficients are attached to the columns
        let objective = problem.objective().simplified();
        let mut col_factors = vec![0.0; problem.num_variables()];
        for (var, coeff) in objective.terms() {
            col_factors[var.index()] = *coeff;
        }

        let cols: Vec<_> = problem
            .iter_variables()
            .map(|(id, var)| {
                let factor = col_factors[id.index()];
                match var.domain {
                    Domain::Continuous => highs_problem.add_column(factor, var.lower..=var.upper),
                    Domain::Integer | Domain::Binary => {
                        highs_problem.add_integer_column(factor, var.lower..=var.upper)
                    }
                }
            })
            .collect();

        let mut add_row = |lower: f64, upper: f64, expr: &LinExpr| {
            let expr = expr.simplified();
            let offset = expr.constant_part();
            let factors: Vec<_> = expr
                .terms()
                .iter()
                .map(|(var, coeff)| (cols[var.index()], *coeff))
                .collect();
            highs_problem.add_row((lower - offset)..=(upper - offset), factors);
        };

        for constraint in problem.constraints() {
            add_row(constraint.lower, constraint.upper, &constraint.expr);
        }

        let bounds = |var: VarId| problem.bounds(var);
        for disjunction in problem.disjunctions() {
            for branch in &disjunction.branches {
                for constraint in &branch.constraints {
                    for (lower, upper, expr) in
                        big_m_rows(constraint, branch.indicator, bounds, self.settings.big_m)
                    {
                        add_row(lower, upper, &expr);
                    }
                }
            }
        }

        let sense = match problem.sense() {
            Sense::Minimise => highs::Sense::Minimise,
            Sense::Maximise => highs::Sense::Maximise,
        };
        let mut model = highs_problem.optimise(sense);

        // HiGHS writes straight to stdout rather than via our logger, so keep it quiet whenever
        // logging is off
        let console = self.settings.log_to_console && !is_logging_off();
        model.set_option("output_flag", console);
        model.set_option("log_to_console", console);
        if let Some(time_limit) = self.settings.time_limit {
            model.set_option("time_limit", time_limit);
        }
        if let Some(gap) = self.settings.mip_rel_gap {
            model.set_option("mip_rel_gap", gap);
        }

        let solved = model.solve();
        let status = match solved.status() {
            HighsModelStatus::Optimal => SolveStatus::Optimal,
            HighsModelStatus::Infeasible => SolveStatus::Infeasible,
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                SolveStatus::Unbounded
            }
            HighsModelStatus::ReachedTimeLimit => SolveStatus::TimeLimit,
            status => SolveStatus::Other(format!("{status:?}")),
        };
        debug!("HiGHS finished with status {status}");
        if !status.is_success() {
            return Ok(Solution::failed(status));
        }

        let values = solved.get_solution().columns().to_vec();
        let objective_value = problem.objective().evaluate(&values);

        Ok(Solution {
            status,
            objective_value,
            values,
        })
    }
}

/// Convert a constraint which only applies when `indicator` is one into unconditional rows.
///
/// For `expr <= upper` this gives `expr + M*indicator <= upper + M`, where `M` is the smallest
/// constant making the row redundant when the indicator is zero, computed from variable bounds.
/// The lower side is treated symmetrically. If the bounds do not give a finite value,
/// `fallback_m` is used instead.
///
/// # Returns
///
/// Rows as `(lower, upper, expr)` triples. Sides which can never be violated are dropped.
fn big_m_rows<F>(
    constraint: &Constraint,
    indicator: VarId,
    bounds: F,
    fallback_m: f64,
) -> Vec<(f64, f64, LinExpr)>
where
    F: Fn(VarId) -> (f64, f64),
{
    let (min_value, max_value) = constraint.expr.interval(bounds);
    let mut rows = Vec::with_capacity(2);

    if constraint.upper.is_finite() && max_value > constraint.upper {
        let big_m = finite_or(max_value - constraint.upper, fallback_m);
        rows.push((
            f64::NEG_INFINITY,
            constraint.upper + big_m,
            constraint.expr.clone() + indicator * big_m,
        ));
    }

    if constraint.lower.is_finite() && min_value < constraint.lower {
        let big_m = finite_or(constraint.lower - min_value, fallback_m);
        rows.push((
            constraint.lower - big_m,
            f64::INFINITY,
            constraint.expr.clone() - indicator * big_m,
        ));
    }

    rows
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn solver() -> HighsSolver {
        HighsSolver::new(SolverSettings {
            log_to_console: false,
            ..SolverSettings::default()
        })
    }

    #[test]
    fn test_big_m_rows() {
        let x = VarId(0);
        let y = VarId(1);
        let bounds = |_| (0.0, 10.0);

        // x <= 2 under indicator: M = 10 - 2 = 8
        let rows = big_m_rows(&Constraint::le(x, 2.0), y, bounds, 1e6);
        assert_eq!(rows.len(), 1);
        let (lower, upper, expr) = &rows[0];
        assert_eq!(*lower, f64::NEG_INFINITY);
        assert_approx_eq!(f64, *upper - expr.constant_part(), 10.0);

        // Equality gives two rows
        let rows = big_m_rows(&Constraint::eq(x, 5.0), y, bounds, 1e6);
        assert_eq!(rows.len(), 2);

        // Redundant constraint gives none
        let rows = big_m_rows(&Constraint::le(x, 20.0), y, bounds, 1e6);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_big_m_rows_fallback() {
        let x = VarId(0);
        let unbounded = |_| (0.0, f64::INFINITY);
        let rows = big_m_rows(&Constraint::le(x, 2.0), VarId(1), unbounded, 100.0);
        assert_eq!(rows.len(), 1);
        assert_approx_eq!(f64, rows[0].1, 100.0);
    }

    #[test]
    fn test_solve_lp() {
        let mut problem = Problem::new();
        let a = problem.add_continuous("a", 0.0..=1.0);
        let b = problem.add_continuous("b", 2.0..=4.0);
        problem.add_constraint(Constraint::le(a + 2.0, b));
        problem.add_constraint(Constraint::ge(a + 1.0, LinExpr::constant(4.0) - b));
        problem.set_objective((a - b * 0.2) * 10.0 - b, Sense::Maximise);

        let solution = solver().solve(&problem).unwrap();
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_approx_eq!(f64, solution.value(a), 1.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.value(b), 3.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.objective_value, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_disjunction_picks_one_branch() {
        // x must be either <= 2 or >= 8
        let mut problem = Problem::new();
        let x = problem.add_continuous("x", 0.0..=10.0);
        let indicators = problem.add_disjunction(
            "choice",
            [
                ("low", vec![Constraint::le(x, 2.0)]),
                ("high", vec![Constraint::ge(x, 8.0)]),
            ],
        );
        problem.add_constraint(Constraint::ge(x, 1.5));
        problem.set_objective(x, Sense::Minimise);

        let solution = solver().solve(&problem).unwrap();
        assert!(solution.status.is_success());
        assert_approx_eq!(f64, solution.value(x), 1.5, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.value(indicators[0]), 1.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.value(indicators[1]), 0.0, epsilon = 1e-6);

        // Now force x above the gap
        problem.add_constraint(Constraint::ge(x, 3.0));
        let solution = solver().solve(&problem).unwrap();
        assert_approx_eq!(f64, solution.value(x), 8.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.value(indicators[1]), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_infeasible() {
        let mut problem = Problem::new();
        let x = problem.add_continuous("x", 0.0..=1.0);
        problem.add_constraint(Constraint::ge(x, 2.0));
        problem.set_objective(x, Sense::Minimise);

        let solution = solver().solve(&problem).unwrap();
        assert!(!solution.status.is_success());
        assert!(solution.value(x).is_nan());
    }

    #[test]
    fn test_solve_empty_problem() {
        let problem = Problem::new();
        let solution = solver().solve(&problem).unwrap();
        assert!(solution.status.is_success());
        assert_approx_eq!(f64, solution.objective_value, 0.0);
    }
}
