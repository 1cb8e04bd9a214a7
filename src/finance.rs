//! General functions related to finance.
use crate::units::Dimensionless;
use serde::Deserialize;

/// Parameters used to annualise investments
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FinanceParameters {
    /// Interest rate used for discounting (e.g. 0.05 for 5%)
    pub interest_rate: Dimensionless,
    /// Number of years over which costs are assessed
    pub observation_period: u32,
}

impl Default for FinanceParameters {
    fn default() -> Self {
        Self {
            interest_rate: Dimensionless(0.05),
            observation_period: 20,
        }
    }
}

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualize capital costs over the lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }
    let factor = (Dimensionless(1.0) + discount_rate).powi(lifetime as i32);
    (discount_rate * factor) / (factor - Dimensionless(1.0))
}

/// The factor converting a net investment into an annual capital cost.
///
/// Components whose service life is shorter than the observation period are replaced (at the
/// original price) as often as needed; the residual value of the last replacement at the end of
/// the period is credited, assuming linear depreciation. All cash flows are discounted to the
/// start and annualised with the capital recovery factor of the observation period.
pub fn annuity_factor(life: f64, finance: &FinanceParameters) -> Dimensionless {
    let period = finance.observation_period;
    if life <= 0.0 || period == 0 {
        return Dimensionless(0.0);
    }

    let q = 1.0 + finance.interest_rate.value();
    let period_f = f64::from(period);
    let replacements = ((period_f / life).ceil() as u32).saturating_sub(1);
    let replacement_value: f64 = (1..=replacements)
        .map(|k| q.powf(-f64::from(k) * life))
        .sum();
    let residual = (f64::from(replacements + 1) * life - period_f) / life;
    let present_value = 1.0 + replacement_value - residual * q.powf(-period_f);

    capital_recovery_factor(period, finance.interest_rate) * Dimensionless(present_value)
}

/// The share of the investment spent each year on installation effort, maintenance and operation
pub fn operation_factor(f_inst: f64, f_w: f64, f_op: f64) -> Dimensionless {
    Dimensionless(f_inst + f_w + f_op)
}
