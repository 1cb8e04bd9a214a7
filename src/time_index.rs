//! The time axis of a model.
//!
//! A model either covers every hour of the year uniformly, or a reduced set of representative
//! periods each standing in for several periods of the full year. In the latter case every annual
//! sum has to be weighted by the number of times a step's period occurs.
use crate::problem::{LinExpr, VarId};
use anyhow::{Result, ensure};
use std::ops::Range;

/// Number of hours in a (non-leap) year
pub const HOURS_PER_YEAR: usize = 8760;

/// How the steps of a [`TimeIndex`] are counted when summing over a year
#[derive(Clone, Debug, PartialEq)]
pub enum Weighting {
    /// Every step counts once
    Uniform,
    /// Step `t` counts `weights[t]` times
    Clustered(Vec<f64>),
}

/// The time steps of a model
#[derive(Clone, Debug, PartialEq)]
pub struct TimeIndex {
    len: usize,
    delta_t: f64,
    weighting: Weighting,
    period_starts: Vec<usize>,
}

impl TimeIndex {
    /// A time axis of `len` hourly steps, each counted once
    pub fn uniform(len: usize) -> Self {
        Self {
            len,
            delta_t: 1.0,
            weighting: Weighting::Uniform,
            period_starts: vec![0],
        }
    }

    /// A time axis made of consecutive representative periods of `period_length` hourly steps.
    ///
    /// # Arguments
    ///
    /// * `period_length` - Number of steps in each period
    /// * `occurrences` - How often each period occurs in the full year
    pub fn clustered(period_length: usize, occurrences: &[f64]) -> Result<Self> {
        ensure!(period_length > 0, "Period length must be greater than zero");
        ensure!(
            !occurrences.is_empty(),
            "At least one representative period is required"
        );
        for &occur in occurrences {
            ensure!(
                occur.is_finite() && occur > 0.0,
                "Period occurrences must be positive, got {occur}"
            );
        }

        let weights = occurrences
            .iter()
            .flat_map(|&occur| std::iter::repeat_n(occur, period_length))
            .collect();
        let period_starts = (0..occurrences.len())
            .map(|period| period * period_length)
            .collect();

        Ok(Self {
            len: period_length * occurrences.len(),
            delta_t: 1.0,
            weighting: Weighting::Clustered(weights),
            period_starts,
        })
    }

    /// Number of time steps
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no time steps
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate over the time steps
    pub fn steps(&self) -> Range<usize> {
        0..self.len
    }

    /// Length of a time step in hours
    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    /// How steps are weighted
    pub fn weighting(&self) -> &Weighting {
        &self.weighting
    }

    /// Whether this is a clustered time axis
    pub fn is_clustered(&self) -> bool {
        matches!(self.weighting, Weighting::Clustered(_))
    }

    /// The number of times step `t` occurs in a year
    pub fn weight(&self, t: usize) -> f64 {
        match &self.weighting {
            Weighting::Uniform => 1.0,
            Weighting::Clustered(weights) => weights[t],
        }
    }

    /// The first step of each period.
    ///
    /// A uniform axis is a single period starting at zero.
    pub fn period_starts(&self) -> &[usize] {
        &self.period_starts
    }

    /// Whether `t` is the first step of a period
    pub fn is_period_start(&self, t: usize) -> bool {
        self.period_starts.binary_search(&t).is_ok()
    }

    /// The annual sum of a time series of variables, as an expression
    pub fn weighted_sum(&self, vars: &[VarId]) -> LinExpr {
        assert_eq!(vars.len(), self.len, "Time series has wrong length");

        match &self.weighting {
            Weighting::Uniform => LinExpr::sum(vars.iter().copied()),
            Weighting::Clustered(weights) => {
                let mut expr = LinExpr::default();
                for (&var, &weight) in vars.iter().zip(weights) {
                    expr.add_term(var, weight);
                }
                expr
            }
        }
    }

    /// The annual sum of a time series of values
    pub fn weighted_total(&self, values: &[f64]) -> f64 {
        match &self.weighting {
            Weighting::Uniform => values.iter().sum(),
            Weighting::Clustered(weights) => {
                values.iter().zip(weights).map(|(value, weight)| value * weight).sum()
            }
        }
    }

    /// The number of hours of the year represented by the whole axis
    pub fn total_weight(&self) -> f64 {
        match &self.weighting {
            Weighting::Uniform => self.len as f64,
            Weighting::Clustered(weights) => weights.iter().sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Problem;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_uniform() {
        let index = TimeIndex::uniform(3);
        assert_eq!(index.len(), 3);
        assert!(!index.is_clustered());
        assert_eq!(index.weight(2), 1.0);
        assert_eq!(index.period_starts(), [0]);
        assert_eq!(index.weighted_total(&[1.0, 2.0, 3.0]), 6.0);
    }

    #[test]
    fn test_clustered() {
        let index = TimeIndex::clustered(2, &[100.0, 50.0]).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.period_starts(), [0, 2]);
        assert!(index.is_period_start(2));
        assert!(!index.is_period_start(3));
        assert_eq!(index.weight(1), 100.0);
        assert_eq!(index.weight(3), 50.0);
        assert_eq!(index.total_weight(), 300.0);
    }

    #[test]
    fn test_clustered_invalid() {
        assert!(TimeIndex::clustered(0, &[1.0]).is_err());
        assert!(TimeIndex::clustered(24, &[]).is_err());
        assert!(TimeIndex::clustered(24, &[1.0, 0.0]).is_err());
    }

    #[test]
    fn test_weighted_sum_of_constant_flow() {
        let index = TimeIndex::clustered(1, &[3000.0, 5760.0]).unwrap();
        let mut problem = Problem::new();
        let flow = problem.add_time_series("flow", index.len(), 0.0..);

        let annual = index.weighted_sum(&flow);
        assert_approx_eq!(f64, annual.evaluate(&[1.0, 1.0]), HOURS_PER_YEAR as f64);
    }

    #[test]
    fn test_weighted_sum_uniform() {
        let index = TimeIndex::uniform(2);
        let mut problem = Problem::new();
        let flow = problem.add_time_series("flow", 2, 0.0..);
        assert_eq!(index.weighted_sum(&flow).evaluate(&[2.0, 3.0]), 5.0);
    }
}
