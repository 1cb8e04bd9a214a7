//! Constraints specific to storage components.
//!
//! The stored energy at the start of each step follows a first-order difference equation driven
//! by the charging and discharging flows. There is no self-discharge.
use crate::problem::{Constraint, LinExpr, Problem, VarId};
use crate::time_index::TimeIndex;
use anyhow::{Result, ensure};

/// Technical parameters of a storage
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StorageParameters {
    /// Fraction of charged energy which ends up stored
    pub input_efficiency: f64,
    /// Fraction of withdrawn stored energy which is delivered
    pub output_efficiency: f64,
    /// Lowest allowed state of charge, as a fraction of size
    pub min_soc: f64,
    /// Highest allowed state of charge, as a fraction of size
    pub max_soc: f64,
    /// State of charge at the start of each period, as a fraction of size
    pub init_soc: f64,
    /// Hours needed to fill the storage at full charging power
    pub e2p_in: f64,
    /// Hours needed to empty the storage at full discharging power
    pub e2p_out: f64,
}

impl Default for StorageParameters {
    fn default() -> Self {
        Self {
            input_efficiency: 1.0,
            output_efficiency: 1.0,
            min_soc: 0.0,
            max_soc: 1.0,
            init_soc: 0.0,
            e2p_in: 1.0,
            e2p_out: 1.0,
        }
    }
}

impl StorageParameters {
    /// Check that the parameters describe a physically meaningful storage
    pub fn validate(&self) -> Result<()> {
        for (name, efficiency) in [
            ("input_efficiency", self.input_efficiency),
            ("output_efficiency", self.output_efficiency),
        ] {
            ensure!(
                efficiency > 0.0 && efficiency <= 1.0,
                "{name} must be in (0, 1], got {efficiency}"
            );
        }
        ensure!(
            0.0 <= self.min_soc
                && self.min_soc <= self.init_soc
                && self.init_soc <= self.max_soc
                && self.max_soc <= 1.0,
            "State of charge limits must satisfy 0 <= min_soc <= init_soc <= max_soc <= 1"
        );
        ensure!(
            self.e2p_in > 0.0 && self.e2p_out > 0.0,
            "Energy-to-power ratios must be positive"
        );

        Ok(())
    }

    /// The largest charging power of a storage of the given size
    pub fn max_input(&self, size: f64) -> f64 {
        size / self.e2p_in
    }

    /// The largest discharging power of a storage of the given size
    pub fn max_output(&self, size: f64) -> f64 {
        size / self.e2p_out
    }

    /// Net change of stored energy during one step
    fn change(&self, delta_t: f64, input: VarId, output: VarId) -> LinExpr {
        (input * self.input_efficiency - output * (1.0 / self.output_efficiency)) * delta_t
    }

    /// Add the state recurrence.
    ///
    /// The stored energy is fixed to the initial state of charge at the start of every period and
    /// then follows the charging and discharging flows. The energy left at the end of each period
    /// must also lie in the allowed band.
    pub fn declare_state_recurrence(
        &self,
        problem: &mut Problem,
        time: &TimeIndex,
        size: VarId,
        stored: &[VarId],
        input: &[VarId],
        output: &[VarId],
    ) {
        let delta_t = time.delta_t();
        for t in time.steps() {
            if time.is_period_start(t) {
                problem.add_constraint(Constraint::eq(stored[t], size * self.init_soc));
            }

            let next_state = LinExpr::from(stored[t]) + self.change(delta_t, input[t], output[t]);
            let is_period_end = t + 1 == time.len() || time.is_period_start(t + 1);
            if is_period_end {
                problem.add_constraint(Constraint::ge(next_state.clone(), size * self.min_soc));
                problem.add_constraint(Constraint::le(next_state, size * self.max_soc));
            } else {
                problem.add_constraint(Constraint::eq(stored[t + 1], next_state));
            }
        }
    }

    /// Limit charging and discharging power by the energy-to-power ratios
    pub fn declare_rate_constraint(
        &self,
        problem: &mut Problem,
        size: VarId,
        input: &[VarId],
        output: &[VarId],
    ) {
        for (&input, &output) in input.iter().zip(output) {
            problem.add_constraint(Constraint::le(input, size * (1.0 / self.e2p_in)));
            problem.add_constraint(Constraint::le(output, size * (1.0 / self.e2p_out)));
        }
    }

    /// Keep the stored energy within the state-of-charge band
    pub fn declare_capacity_bounds(&self, problem: &mut Problem, size: VarId, stored: &[VarId]) {
        for &stored in stored {
            problem.add_constraint(Constraint::ge(stored, size * self.min_soc));
            problem.add_constraint(Constraint::le(stored, size * self.max_soc));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Sense;
    use crate::solver::{HighsSolver, Solver};
    use float_cmp::assert_approx_eq;

    struct StorageVars {
        size: VarId,
        stored: Vec<VarId>,
        input: Vec<VarId>,
        output: Vec<VarId>,
    }

    fn storage_problem(
        params: &StorageParameters,
        time: &TimeIndex,
        max_size: f64,
    ) -> (Problem, StorageVars) {
        let mut problem = Problem::new();
        let size = problem.add_continuous("size", 0.0..=max_size);
        let stored = problem.add_time_series("stored", time.len(), 0.0..=max_size);
        let input = problem.add_time_series("input", time.len(), 0.0..=max_size);
        let output = problem.add_time_series("output", time.len(), 0.0..=max_size);
        params.declare_state_recurrence(&mut problem, time, size, &stored, &input, &output);
        params.declare_rate_constraint(&mut problem, size, &input, &output);
        params.declare_capacity_bounds(&mut problem, size, &stored);

        let vars = StorageVars {
            size,
            stored,
            input,
            output,
        };
        (problem, vars)
    }

    fn fix(problem: &mut Problem, vars: &[VarId], values: &[f64]) {
        for (&var, &value) in vars.iter().zip(values) {
            problem.add_constraint(Constraint::eq(var, value));
        }
    }

    #[test]
    fn test_state_recurrence() {
        let params = StorageParameters::default();
        let time = TimeIndex::uniform(3);
        let (mut problem, vars) = storage_problem(&params, &time, 100.0);
        fix(&mut problem, &vars.input, &[5.0, 0.0, 0.0]);
        fix(&mut problem, &vars.output, &[0.0, 3.0, 2.0]);
        problem.set_objective(vars.size, Sense::Minimise);

        let solution = HighsSolver::default().solve(&problem).unwrap();
        assert!(solution.status.is_success());
        let stored = solution.values(&vars.stored);
        for (actual, expected) in stored.iter().zip([0.0, 5.0, 2.0]) {
            assert_approx_eq!(f64, *actual, expected, epsilon = 1e-6);
        }
        // Charging at 5 kW with an energy-to-power ratio of 1 needs at least 5 kWh
        assert_approx_eq!(f64, solution.value(vars.size), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_losses() {
        let params = StorageParameters {
            input_efficiency: 0.9,
            output_efficiency: 0.8,
            ..StorageParameters::default()
        };
        let time = TimeIndex::uniform(2);
        let (mut problem, vars) = storage_problem(&params, &time, 100.0);
        fix(&mut problem, &vars.input, &[10.0, 0.0]);
        problem.set_objective(LinExpr::from(vars.output[1]) * -1.0, Sense::Minimise);

        let solution = HighsSolver::default().solve(&problem).unwrap();
        assert!(solution.status.is_success());
        assert_approx_eq!(f64, solution.value(vars.stored[1]), 9.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.value(vars.output[1]), 7.2, epsilon = 1e-6);
    }

    #[test]
    fn test_cannot_discharge_empty_storage() {
        let params = StorageParameters::default();
        let time = TimeIndex::uniform(2);
        let (mut problem, vars) = storage_problem(&params, &time, 100.0);
        fix(&mut problem, &vars.input, &[0.0, 0.0]);
        fix(&mut problem, &vars.output, &[1.0, 0.0]);

        let solution = HighsSolver::default().solve(&problem).unwrap();
        assert!(!solution.status.is_success());
    }

    #[test]
    fn test_recurrence_restarts_each_period() {
        let params = StorageParameters {
            init_soc: 0.5,
            ..StorageParameters::default()
        };
        let time = TimeIndex::clustered(2, &[10.0, 20.0]).unwrap();
        let (mut problem, vars) = storage_problem(&params, &time, 100.0);
        problem.add_constraint(Constraint::eq(vars.size, 8.0));
        fix(&mut problem, &vars.input, &[2.0, 0.0, 0.0, 0.0]);
        fix(&mut problem, &vars.output, &[0.0, 0.0, 3.0, 0.0]);

        let solution = HighsSolver::default().solve(&problem).unwrap();
        assert!(solution.status.is_success());
        let stored = solution.values(&vars.stored);
        for (actual, expected) in stored.iter().zip([4.0, 6.0, 4.0, 1.0]) {
            assert_approx_eq!(f64, *actual, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_validate() {
        assert!(StorageParameters::default().validate().is_ok());
        let bad_soc = StorageParameters {
            min_soc: 0.5,
            init_soc: 0.2,
            ..StorageParameters::default()
        };
        assert!(bad_soc.validate().is_err());
        let bad_efficiency = StorageParameters {
            output_efficiency: 0.0,
            ..StorageParameters::default()
        };
        assert!(bad_efficiency.validate().is_err());
    }
}
