//! On/off and part-load behaviour of dispatchable generators, and the CHP performance model.
use crate::problem::{Constraint, Problem, VarId};

/// Electrical size separating small from large CHP units (kW)
pub const CHP_SIZE_EL_THRESHOLD: f64 = 50.0;

/// Performance regression for one size class of CHP units.
///
/// Size is the thermal size; the electrical size follows from it linearly. Thermal efficiency
/// drops slightly as the ambient temperature rises.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChpClass {
    /// Label used in branch names
    pub label: &'static str,
    /// Smallest electrical size in this class (kW)
    pub min_size_el: f64,
    /// Largest electrical size in this class (kW)
    pub max_size_el: f64,
    /// Electrical size per unit thermal size
    pub slope: f64,
    /// Electrical size at zero thermal size (kW)
    pub intercept: f64,
    /// Electrical efficiency (electricity out per gas in)
    pub eta_el: f64,
    /// Thermal efficiency at the reference temperature
    pub eta_th_ref: f64,
    /// Change in thermal efficiency per kelvin above the reference temperature
    pub eta_th_temperature_coeff: f64,
}

/// Ambient temperature at which [`ChpClass::eta_th_ref`] applies (°C)
const CHP_REFERENCE_TEMPERATURE: f64 = 15.0;

/// Units up to [`CHP_SIZE_EL_THRESHOLD`]
pub const CHP_SMALL: ChpClass = ChpClass {
    label: "small",
    min_size_el: 0.0,
    max_size_el: CHP_SIZE_EL_THRESHOLD,
    slope: 0.4154,
    intercept: 0.0,
    eta_el: 0.27,
    eta_th_ref: 0.65,
    eta_th_temperature_coeff: -0.001,
};

/// Units above [`CHP_SIZE_EL_THRESHOLD`]
pub const CHP_LARGE: ChpClass = ChpClass {
    label: "large",
    min_size_el: CHP_SIZE_EL_THRESHOLD,
    max_size_el: f64::INFINITY,
    slope: 0.74,
    intercept: 8.0,
    eta_el: 0.38,
    eta_th_ref: 0.50,
    eta_th_temperature_coeff: -0.001,
};

impl ChpClass {
    /// Thermal efficiency at the given ambient temperature (°C)
    pub fn thermal_efficiency(&self, temperature: f64) -> f64 {
        let eta = self.eta_th_ref
            + self.eta_th_temperature_coeff * (temperature - CHP_REFERENCE_TEMPERATURE);
        eta.clamp(0.05, 1.0 - self.eta_el)
    }

    /// Lowest thermal efficiency over a temperature series
    pub fn min_thermal_efficiency(&self, temperatures: &[f64]) -> f64 {
        temperatures
            .iter()
            .map(|&temperature| self.thermal_efficiency(temperature))
            .fold(self.eta_th_ref, f64::min)
    }
}

/// Add the part-load disjunction for one output series of a component.
///
/// In every step the component is either off (no output) or on, in which case its output is
/// between `min_part_load * size` and `size`.
///
/// # Returns
///
/// The on/off status of the component for each step (the indicators of the "on" branches)
pub fn declare_part_load(
    problem: &mut Problem,
    name: &str,
    size: VarId,
    output: &[VarId],
    min_part_load: f64,
) -> Vec<VarId> {
    output
        .iter()
        .enumerate()
        .map(|(t, &output)| {
            let indicators = problem.add_disjunction(
                &format!("{name}.part_load[{t}]"),
                [
                    ("off", vec![Constraint::eq(output, 0.0)]),
                    (
                        "on",
                        vec![
                            Constraint::ge(output, size * min_part_load),
                            Constraint::le(output, size),
                        ],
                    ),
                ],
            );
            indicators[1]
        })
        .collect()
}

/// The variables of a CHP unit
pub struct ChpVars<'a> {
    /// Thermal size
    pub size: VarId,
    /// Electrical size
    pub size_el: VarId,
    /// Gas consumption per step
    pub gas: &'a [VarId],
    /// Heat production per step
    pub heat: &'a [VarId],
    /// Electricity production per step
    pub elec: &'a [VarId],
}

/// Add the CHP size-class disjunction.
///
/// The unit is either not installed, or belongs to exactly one size class whose regression
/// links electrical to thermal size and gas consumption to heat and electricity output.
///
/// # Returns
///
/// The indicators of the "not installed" branch and each size class
pub fn declare_chp_constraints(
    problem: &mut Problem,
    name: &str,
    vars: &ChpVars,
    temperature: &[f64],
    size_epsilon: f64,
) -> Vec<VarId> {
    let not_installed = (
        "not_installed".to_string(),
        vec![
            Constraint::eq(vars.size, 0.0),
            Constraint::eq(vars.size_el, 0.0),
        ],
    );
    let classes = [CHP_SMALL, CHP_LARGE].map(|class| {
        let mut constraints = vec![
            Constraint::ge(vars.size, size_epsilon),
            Constraint::between(vars.size_el, class.min_size_el, class.max_size_el),
            Constraint::eq(vars.size_el, vars.size * class.slope + class.intercept),
        ];
        for (t, &temperature) in temperature.iter().enumerate() {
            let eta_th = class.thermal_efficiency(temperature);
            constraints.push(Constraint::eq(vars.heat[t], vars.gas[t] * eta_th));
            constraints.push(Constraint::eq(vars.elec[t], vars.gas[t] * class.eta_el));
        }
        (class.label.to_string(), constraints)
    });

    problem.add_disjunction(
        &format!("{name}.chp_class"),
        std::iter::once(not_installed).chain(classes),
    )
}
