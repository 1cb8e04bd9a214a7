//! Linear expressions over problem variables.
use super::VarId;
use indexmap::IndexMap;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A linear expression of the form `a1*x1 + a2*x2 + ... + c`.
///
/// Terms are kept in insertion order. The same variable may appear more than once until the
/// expression is [`simplified`](LinExpr::simplified), which backends must do before handing rows
/// to a solver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinExpr {
    /// An expression containing only a constant
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// An expression consisting of a single term
    pub fn term(var: VarId, coeff: f64) -> Self {
        Self {
            terms: vec![(var, coeff)],
            constant: 0.0,
        }
    }

    /// Sum of variables, each with a coefficient of one
    pub fn sum<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = VarId>,
    {
        Self {
            terms: vars.into_iter().map(|var| (var, 1.0)).collect(),
            constant: 0.0,
        }
    }

    /// Add a term in place
    pub fn add_term(&mut self, var: VarId, coeff: f64) {
        self.terms.push((var, coeff));
    }

    /// The raw terms of the expression (may contain repeated variables)
    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    /// The constant part of the expression
    pub fn constant_part(&self) -> f64 {
        self.constant
    }

    /// Whether the expression has no variable terms
    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(|(_, coeff)| *coeff == 0.0)
    }

    /// Merge repeated variables and drop zero coefficients
    pub fn simplified(&self) -> Self {
        let mut merged: IndexMap<VarId, f64> = IndexMap::new();
        for (var, coeff) in &self.terms {
            *merged.entry(*var).or_insert(0.0) += coeff;
        }

        Self {
            terms: merged
                .into_iter()
                .filter(|(_, coeff)| *coeff != 0.0)
                .collect(),
            constant: self.constant,
        }
    }

    /// Evaluate the expression given a value for each variable (indexed by [`VarId`])
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.index()])
            .sum::<f64>()
            + self.constant
    }

    /// The smallest and largest values the expression can take given variable bounds.
    ///
    /// Either end may be infinite.
    pub fn interval<F>(&self, bounds: F) -> (f64, f64)
    where
        F: Fn(VarId) -> (f64, f64),
    {
        let mut low = self.constant;
        let mut high = self.constant;
        for (var, coeff) in self.simplified().terms {
            let (lower, upper) = bounds(var);
            if coeff > 0.0 {
                low += coeff * lower;
                high += coeff * upper;
            } else {
                low += coeff * upper;
                high += coeff * lower;
            }
        }

        (low, high)
    }
}

impl From<VarId> for LinExpr {
    fn from(var: VarId) -> Self {
        Self::term(var, 1.0)
    }
}

impl From<f64> for LinExpr {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

impl<T: Into<LinExpr>> Add<T> for LinExpr {
    type Output = LinExpr;

    fn add(mut self, rhs: T) -> LinExpr {
        self += rhs;
        self
    }
}

impl<T: Into<LinExpr>> AddAssign<T> for LinExpr {
    fn add_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
    }
}

impl<T: Into<LinExpr>> Sub<T> for LinExpr {
    type Output = LinExpr;

    fn sub(mut self, rhs: T) -> LinExpr {
        self -= rhs;
        self
    }
}

impl<T: Into<LinExpr>> SubAssign<T> for LinExpr {
    fn sub_assign(&mut self, rhs: T) {
        let rhs = rhs.into();
        self.terms
            .extend(rhs.terms.into_iter().map(|(var, coeff)| (var, -coeff)));
        self.constant -= rhs.constant;
    }
}

impl Mul<f64> for LinExpr {
    type Output = LinExpr;

    fn mul(mut self, rhs: f64) -> LinExpr {
        for (_, coeff) in &mut self.terms {
            *coeff *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Neg for LinExpr {
    type Output = LinExpr;

    fn neg(self) -> LinExpr {
        self * -1.0
    }
}

impl Mul<f64> for VarId {
    type Output = LinExpr;

    fn mul(self, rhs: f64) -> LinExpr {
        LinExpr::term(self, rhs)
    }
}

impl<T: Into<LinExpr>> Add<T> for VarId {
    type Output = LinExpr;

    fn add(self, rhs: T) -> LinExpr {
        LinExpr::from(self) + rhs
    }
}

impl<T: Into<LinExpr>> Sub<T> for VarId {
    type Output = LinExpr;

    fn sub(self, rhs: T) -> LinExpr {
        LinExpr::from(self) - rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_simplified_merges_terms() {
        let x = VarId(0);
        let y = VarId(1);
        let expr = (x * 2.0 + y - x * 2.0 + y * 0.5 + 3.0).simplified();
        assert_eq!(expr.terms(), &[(y, 1.5)]);
        assert_approx_eq!(f64, expr.constant_part(), 3.0);
    }

    #[test]
    fn test_evaluate() {
        let expr = VarId(0) * 2.0 - VarId(1) + 1.0;
        assert_approx_eq!(f64, expr.evaluate(&[3.0, 4.0]), 3.0);
    }

    #[test]
    fn test_interval() {
        let expr = VarId(0) * 2.0 - VarId(1) + 1.0;
        let bounds = |var: VarId| match var.index() {
            0 => (0.0, 5.0),
            _ => (1.0, 2.0),
        };
        assert_eq!(expr.interval(bounds), (-1.0, 10.0));

        let unbounded = |_| (0.0, f64::INFINITY);
        assert_eq!(expr.interval(unbounded), (f64::NEG_INFINITY, f64::INFINITY));
    }
}
