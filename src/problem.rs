//! A solver-independent representation of a mixed-integer linear program.
//!
//! Model-building code declares variables, linear constraints, disjunctions (sets of mutually
//! exclusive branches) and an objective here. How disjunctions are turned into something a
//! solver understands is left to the [`solver`](crate::solver) backend.
use std::fmt;
use std::ops::{Bound, RangeBounds};

mod expr;
pub use expr::LinExpr;

/// A handle to a variable in a [`Problem`].
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position of the variable in the problem's variable arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// The domain of a decision variable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Domain {
    /// Real-valued
    Continuous,
    /// Integer-valued
    Integer,
    /// Either zero or one
    Binary,
}

/// The definition of a variable to be optimised
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    /// Human-readable name, used in output files
    pub name: String,
    /// The variable's minimum value (may be `-inf`)
    pub lower: f64,
    /// The variable's maximum value (may be `inf`)
    pub upper: f64,
    /// The variable's domain
    pub domain: Domain,
}

/// A linear constraint of the form `lower <= expr <= upper`.
///
/// Often, constraints will impose only a lower or an upper value, with the other set to infinity
/// or minus infinity.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    /// The constrained expression
    pub expr: LinExpr,
    /// The minimum value for the expression
    pub lower: f64,
    /// The maximum value for the expression
    pub upper: f64,
}

impl Constraint {
    /// `lhs = rhs`
    pub fn eq(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::from_difference(lhs.into() - rhs, 0.0, 0.0)
    }

    /// `lhs <= rhs`
    pub fn le(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::from_difference(lhs.into() - rhs, f64::NEG_INFINITY, 0.0)
    }

    /// `lhs >= rhs`
    pub fn ge(lhs: impl Into<LinExpr>, rhs: impl Into<LinExpr>) -> Self {
        Self::from_difference(lhs.into() - rhs, 0.0, f64::INFINITY)
    }

    /// `lower <= expr <= upper`
    pub fn between(expr: impl Into<LinExpr>, lower: f64, upper: f64) -> Self {
        Self {
            expr: expr.into(),
            lower,
            upper,
        }
    }

    fn from_difference(expr: LinExpr, lower: f64, upper: f64) -> Self {
        Self { expr, lower, upper }
    }

    /// Whether the constraint is satisfied by the given variable values, within `tolerance`
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let value = self.expr.evaluate(values);
        value >= self.lower - tolerance && value <= self.upper + tolerance
    }
}

/// One branch of a [`Disjunction`]
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    /// A short label for the branch (e.g. "off", "bracket_1")
    pub label: String,
    /// The binary variable indicating whether this branch is active
    pub indicator: VarId,
    /// Constraints which must hold when the branch is active
    pub constraints: Vec<Constraint>,
}

/// A set of mutually exclusive branches of which exactly one is active in a feasible solution
#[derive(Clone, Debug, PartialEq)]
pub struct Disjunction {
    /// Name of the disjunction, used as a prefix for its indicator variables
    pub name: String,
    /// The branches
    pub branches: Vec<Branch>,
}

/// Whether the objective is to be minimised or maximised
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sense {
    /// Minimise the objective
    Minimise,
    /// Maximise the objective
    Maximise,
}

/// A mixed-integer linear program with disjunctions
#[derive(Debug)]
pub struct Problem {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    disjunctions: Vec<Disjunction>,
    objective: LinExpr,
    sense: Sense,
}

impl Default for Problem {
    fn default() -> Self {
        Self {
            variables: Vec::new(),
            constraints: Vec::new(),
            disjunctions: Vec::new(),
            objective: LinExpr::default(),
            sense: Sense::Minimise,
        }
    }
}

impl Problem {
    /// Create a new, empty problem
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new variable.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the variable
    /// * `bounds` - Range of allowed values, e.g. `0.0..` or `0.0..=10.0`
    /// * `domain` - Whether the variable is continuous, integer or binary
    pub fn add_variable<B>(&mut self, name: impl Into<String>, bounds: B, domain: Domain) -> VarId
    where
        B: RangeBounds<f64>,
    {
        let (lower, upper) = match domain {
            Domain::Binary => (0.0, 1.0),
            _ => bounds_to_pair(&bounds),
        };
        assert!(lower <= upper, "Variable lower bound exceeds upper bound");

        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            lower,
            upper,
            domain,
        });

        id
    }

    /// Declare a non-negative or otherwise bounded continuous variable
    pub fn add_continuous<B>(&mut self, name: impl Into<String>, bounds: B) -> VarId
    where
        B: RangeBounds<f64>,
    {
        self.add_variable(name, bounds, Domain::Continuous)
    }

    /// Declare one continuous variable per time step, named `{name}[t]`
    pub fn add_time_series<B>(&mut self, name: &str, len: usize, bounds: B) -> Vec<VarId>
    where
        B: RangeBounds<f64> + Clone,
    {
        (0..len)
            .map(|t| self.add_continuous(format!("{name}[{t}]"), bounds.clone()))
            .collect()
    }

    /// Add a constraint which must always hold
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Add a disjunction: exactly one of the given branches must hold.
    ///
    /// A binary indicator variable is created for each branch, along with the constraint that the
    /// indicators sum to one.
    ///
    /// # Returns
    ///
    /// The indicator variables, in the same order as the branches.
    pub fn add_disjunction<I, S>(&mut self, name: &str, branches: I) -> Vec<VarId>
    where
        I: IntoIterator<Item = (S, Vec<Constraint>)>,
        S: Into<String>,
    {
        let branches: Vec<_> = branches
            .into_iter()
            .map(|(label, constraints)| {
                let label = label.into();
                let indicator =
                    self.add_variable(format!("{name}[{label}]"), 0.0..=1.0, Domain::Binary);
                Branch {
                    label,
                    indicator,
                    constraints,
                }
            })
            .collect();
        assert!(!branches.is_empty(), "Disjunction {name} has no branches");

        let indicators: Vec<_> = branches.iter().map(|branch| branch.indicator).collect();
        self.add_constraint(Constraint::between(
            LinExpr::sum(indicators.iter().copied()),
            1.0,
            1.0,
        ));
        self.disjunctions.push(Disjunction {
            name: name.to_string(),
            branches,
        });

        indicators
    }

    /// Set the objective function
    pub fn set_objective(&mut self, objective: impl Into<LinExpr>, sense: Sense) {
        self.objective = objective.into();
        self.sense = sense;
    }

    /// Get the definition of a variable
    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.0]
    }

    /// Get the bounds of a variable as a `(lower, upper)` pair
    pub fn bounds(&self, var: VarId) -> (f64, f64) {
        let var = self.variable(var);
        (var.lower, var.upper)
    }

    /// Iterate over all variables along with their IDs
    pub fn iter_variables(&self) -> impl Iterator<Item = (VarId, &Variable)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(idx, var)| (VarId(idx), var))
    }

    /// The unconditional constraints
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The disjunctions
    pub fn disjunctions(&self) -> &[Disjunction] {
        &self.disjunctions
    }

    /// The objective function
    pub fn objective(&self) -> &LinExpr {
        &self.objective
    }

    /// Whether the objective is minimised or maximised
    pub fn sense(&self) -> Sense {
        self.sense
    }

    /// Number of variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of unconditional constraints
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let branch_rows: usize = self
            .disjunctions
            .iter()
            .flat_map(|disjunction| &disjunction.branches)
            .map(|branch| branch.constraints.len())
            .sum();
        write!(
            f,
            "{} variables, {} constraints, {} disjunctions ({} conditional constraints)",
            self.variables.len(),
            self.constraints.len(),
            self.disjunctions.len(),
            branch_rows
        )
    }
}

/// Convert a range into a `(lower, upper)` pair, using infinities for open ends
fn bounds_to_pair<B: RangeBounds<f64>>(bounds: &B) -> (f64, f64) {
    let lower = match bounds.start_bound() {
        Bound::Included(x) | Bound::Excluded(x) => *x,
        Bound::Unbounded => f64::NEG_INFINITY,
    };
    let upper = match bounds.end_bound() {
        Bound::Included(x) | Bound::Excluded(x) => *x,
        Bound::Unbounded => f64::INFINITY,
    };

    (lower, upper)
}
