//! Investment cost formulations.
//!
//! Each component uses exactly one of three ways of relating its installed size to its
//! investment cost. The two non-linear ones are expressed as disjunctions.
use crate::problem::{Constraint, LinExpr, Problem, VarId};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;

/// How a component's investment depends on its size
#[derive(Clone, Debug, PartialEq)]
pub enum CostModel {
    /// `invest = size * unit_cost`
    Linear {
        /// Cost per unit of size
        unit_cost: f64,
    },
    /// Nothing is paid unless the component is installed, in which case
    /// `invest = size * unit_cost + fixed_cost`
    FixedPlusLinear {
        /// Cost per unit of size
        unit_cost: f64,
        /// Cost incurred on installing any size
        fixed_cost: f64,
    },
    /// Only the listed sizes can be bought, each at its own price
    PricePairs(Vec<PricePair>),
}

/// A purchasable size and its price
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricePair {
    /// Installed size
    pub size: f64,
    /// Investment for that size
    pub price: f64,
}

impl CostModel {
    /// The index used for this model in input files
    pub fn index(&self) -> u8 {
        match self {
            Self::Linear { .. } => 0,
            Self::FixedPlusLinear { .. } => 1,
            Self::PricePairs(_) => 2,
        }
    }

    /// The largest investment possible for a component no bigger than `max_size`
    pub fn max_investment(&self, max_size: f64) -> f64 {
        match self {
            Self::Linear { unit_cost } => unit_cost * max_size,
            Self::FixedPlusLinear {
                unit_cost,
                fixed_cost,
            } => unit_cost * max_size + fixed_cost,
            Self::PricePairs(pairs) => pairs
                .iter()
                .map(|pair| pair.price)
                .fold(0.0, f64::max),
        }
    }

    /// Add the constraints linking `size` and `invest`.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to add constraints to
    /// * `name` - Component name, used to name disjunctions
    /// * `size` - The component's size variable
    /// * `invest` - The component's investment variable
    /// * `min_size` - The component's minimum size
    /// * `size_epsilon` - Smallest size regarded as installed when `min_size` is zero
    ///
    /// # Returns
    ///
    /// The branch indicators of the cost-model disjunction (none for the linear model)
    pub fn declare_constraints(
        &self,
        problem: &mut Problem,
        name: &str,
        size: VarId,
        invest: VarId,
        min_size: f64,
        size_epsilon: f64,
    ) -> Vec<VarId> {
        match self {
            Self::Linear { unit_cost } => {
                problem.add_constraint(Constraint::eq(invest, size * *unit_cost));
                Vec::new()
            }
            Self::FixedPlusLinear {
                unit_cost,
                fixed_cost,
            } => {
                let min_size_eff = if min_size > 0.0 {
                    min_size
                } else {
                    size_epsilon
                };
                let selected_invest = size * *unit_cost + *fixed_cost;
                problem.add_disjunction(
                    &format!("{name}.cost_model"),
                    [
                        (
                            "not_selected".to_string(),
                            vec![Constraint::eq(size, 0.0), Constraint::eq(invest, 0.0)],
                        ),
                        (
                            "selected".to_string(),
                            vec![
                                Constraint::ge(size, min_size_eff),
                                Constraint::eq(invest, selected_invest),
                            ],
                        ),
                    ],
                )
            }
            Self::PricePairs(pairs) => {
                let zero = (
                    "zero".to_string(),
                    vec![Constraint::eq(size, 0.0), Constraint::eq(invest, 0.0)],
                );
                let branches = pairs.iter().enumerate().map(|(i, pair)| {
                    (
                        format!("pair_{i}"),
                        vec![
                            Constraint::eq(size, pair.size),
                            Constraint::eq(invest, pair.price),
                        ],
                    )
                });
                problem.add_disjunction(
                    &format!("{name}.cost_model"),
                    std::iter::once(zero).chain(branches),
                )
            }
        }
    }
}

/// Parse a price-pair list of the form `"size;price/size;price/..."`.
///
/// Pairs are returned sorted by size.
pub fn parse_price_pairs(s: &str) -> Result<Vec<PricePair>> {
    let pairs: Vec<_> = s
        .split('/')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (size, price) = pair
                .split_once(';')
                .with_context(|| format!("Price pair '{pair}' is not of the form size;price"))?;
            let size: f64 = size
                .trim()
                .parse()
                .with_context(|| format!("Invalid size in price pair '{pair}'"))?;
            let price: f64 = price
                .trim()
                .parse()
                .with_context(|| format!("Invalid price in price pair '{pair}'"))?;
            ensure!(
                size > 0.0 && price >= 0.0,
                "Price pair '{pair}' must have a positive size and a non-negative price"
            );

            Ok(PricePair { size, price })
        })
        .try_collect()?;
    ensure!(!pairs.is_empty(), "No price pairs given");

    Ok(pairs
        .into_iter()
        .sorted_by(|a, b| a.size.total_cmp(&b.size))
        .collect())
}

/// The annual cost of a component: annualised net investment plus running costs.
///
/// # Arguments
///
/// * `invest` - The investment expression
/// * `subsidies` - Purchase subsidies received for the component
/// * `annuity_factor` - Converts net investment into an annual capital cost
/// * `operation_factor` - Share of the (gross) investment paid every year to run the component
pub fn annual_cost_expr(
    invest: VarId,
    subsidies: &[VarId],
    annuity_factor: f64,
    operation_factor: f64,
) -> LinExpr {
    let net_investment = LinExpr::from(invest) - LinExpr::sum(subsidies.iter().copied());
    net_investment * annuity_factor + invest * operation_factor
}
