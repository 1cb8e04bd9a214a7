//! Tiered subsidy rules.
//!
//! Subsidies are granted at up to three administrative levels. Each rule is a list of brackets
//! over a dependent quantity (size, investment or floor area); the bracket containing the
//! quantity determines the subsidy, and quantities outside every bracket receive nothing.
//! Purchase subsidies reduce a component's investment; operate subsidies pay a tariff for energy
//! fed into the grid.
use crate::component::{Component, ComponentType, ComponentVars};
use crate::problem::{LinExpr, Problem, VarId};
use crate::settings::CompileSettings;
use indexmap::IndexMap;
use itertools::Itertools;
use log::warn;
use serde_string_enum::DeserializeLabeledStringEnum;

pub mod operate;
pub mod purchase;

/// The administrative level granting a subsidy.
///
/// Levels are applied in the order city, state, country.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, DeserializeLabeledStringEnum,
)]
pub enum SubsidyLevel {
    /// Granted by the city
    #[string = "city"]
    City,
    /// Granted by the state
    #[string = "state"]
    State,
    /// Granted by the country
    #[string = "country"]
    Country,
}

impl SubsidyLevel {
    /// The name of the level as used in input files and variable names
    pub fn as_str(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::State => "state",
            Self::Country => "country",
        }
    }
}

/// What a subsidy pays for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, DeserializeLabeledStringEnum)]
pub enum SubsidyType {
    /// A one-off payment towards the investment
    #[string = "purchase"]
    Purchase,
    /// A tariff paid for energy fed into the grid
    #[string = "operate"]
    Operate,
}

/// The quantity a subsidy's brackets refer to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, DeserializeLabeledStringEnum)]
pub enum DependentVar {
    /// The installed size of the component
    #[string = "size"]
    Size,
    /// The investment remaining after subsidies of earlier levels
    #[string = "investment"]
    Investment,
    /// The floor area of the building
    #[string = "area"]
    Area,
}

/// One tier of a subsidy rule: `coefficient * x + constant` for `lower <= x < upper`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bracket {
    /// Lower end of the bracket
    pub lower: f64,
    /// Upper end of the bracket, excluded from it (may be infinite)
    pub upper: f64,
    /// Subsidy per unit of the dependent quantity (or tariff per kWh for operate subsidies)
    pub coefficient: f64,
    /// Constant part of the subsidy
    pub constant: f64,
}

impl Bracket {
    /// Whether `x` lies in this bracket
    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x < self.upper
    }

    /// The subsidy for `x`, assuming it lies in this bracket
    pub fn value(&self, x: f64) -> f64 {
        self.coefficient * x + self.constant
    }

    fn check(&self) -> Result<(), String> {
        if !(self.lower.is_finite() && self.lower >= 0.0) {
            return Err(format!("lower end {} must be finite and >= 0", self.lower));
        }
        if self.upper.is_nan() || self.upper < self.lower {
            return Err(format!(
                "upper end {} is below lower end {}",
                self.upper, self.lower
            ));
        }
        if !(self.coefficient.is_finite() && self.constant.is_finite()) {
            return Err("coefficient and constant must be finite".to_string());
        }

        Ok(())
    }
}

/// A subsidy rule for one type of component at one level
#[derive(Clone, Debug, PartialEq)]
pub struct SubsidyRule {
    /// The level granting the subsidy
    pub level: SubsidyLevel,
    /// What the subsidy pays for
    pub sub_type: SubsidyType,
    /// The type of component the rule applies to
    pub component: ComponentType,
    /// The quantity the brackets refer to
    pub dependent_var: DependentVar,
    /// Non-overlapping brackets, sorted by lower end
    pub brackets: Vec<Bracket>,
}

impl SubsidyRule {
    /// Create a rule, discarding (with a warning) brackets which are malformed or overlap an
    /// earlier bracket
    pub fn new(
        level: SubsidyLevel,
        sub_type: SubsidyType,
        component: ComponentType,
        dependent_var: DependentVar,
        brackets: impl IntoIterator<Item = Bracket>,
    ) -> Self {
        let mut kept: Vec<Bracket> = Vec::new();
        let candidates = brackets
            .into_iter()
            .sorted_by(|a, b| a.lower.total_cmp(&b.lower));
        for bracket in candidates {
            if let Err(reason) = bracket.check() {
                warn!(
                    "Ignoring subsidy bracket for {component} at {} level: {reason}",
                    level.as_str()
                );
                continue;
            }
            let overlapping = kept.last().filter(|previous| bracket.lower < previous.upper);
            if let Some(previous) = overlapping {
                warn!(
                    "Ignoring subsidy bracket [{}, {}] for {component} at {} level: it overlaps \
                     [{}, {}]",
                    bracket.lower,
                    bracket.upper,
                    level.as_str(),
                    previous.lower,
                    previous.upper
                );
                continue;
            }
            kept.push(bracket);
        }

        Self {
            level,
            sub_type,
            component,
            dependent_var,
            brackets: kept,
        }
    }

    /// The subsidy paid when the dependent quantity equals `x`.
    ///
    /// Nothing is paid for zero or for values outside every bracket.
    pub fn evaluate(&self, x: f64) -> f64 {
        purchase::evaluate(&self.brackets, x)
    }
}

/// Pick the rules of one type which apply to a type of component, at most one per level.
///
/// If several rules share a level, the first is kept and the rest are ignored with a warning.
pub fn rules_by_level<'a>(
    rules: &'a [SubsidyRule],
    sub_type: SubsidyType,
    component: ComponentType,
) -> Vec<&'a SubsidyRule> {
    let mut selected: Vec<&SubsidyRule> = Vec::new();
    for rule in rules
        .iter()
        .filter(|rule| rule.sub_type == sub_type && rule.component == component)
    {
        if selected.iter().any(|other| other.level == rule.level) {
            warn!(
                "More than one {:?} subsidy rule for {component} at {} level; using the first",
                sub_type,
                rule.level.as_str()
            );
            continue;
        }
        if rule.brackets.is_empty() {
            continue;
        }
        selected.push(rule);
    }
    selected.sort_by_key(|rule| rule.level);

    selected
}

/// The largest purchase subsidy each level could pay a component.
///
/// Only levels with a purchase rule for the component's type appear in the result.
pub fn purchase_subsidy_caps(
    rules: &[SubsidyRule],
    component: &Component,
    area: f64,
) -> IndexMap<SubsidyLevel, f64> {
    let max_investment = component.cost_model.max_investment(component.max_size);
    rules_by_level(rules, SubsidyType::Purchase, component.comp_type)
        .into_iter()
        .map(|rule| {
            let cap = purchase::subsidy_cap(rule, component.max_size, max_investment, area);
            (rule.level, cap)
        })
        .collect()
}

/// Add the purchase subsidy disjunctions of a component, level by level.
///
/// For investment-dependent rules, each level sees the investment left after the subsidies of
/// the levels before it. Each level pays the smaller of its bracket value and the investment left
/// after earlier levels, so the subsidies together never exceed the investment.
///
/// # Arguments
///
/// * `problem` - The problem to add variables and constraints to
/// * `rules` - All subsidy rules of the building
/// * `component` - The component receiving the subsidies
/// * `vars` - The component's variables, including one paid subsidy variable per level
/// * `area` - Floor area of the building
/// * `epsilon` - Smallest value regarded as non-zero
pub fn declare_purchase_subsidies(
    problem: &mut Problem,
    rules: &[SubsidyRule],
    component: &Component,
    vars: &ComponentVars,
    area: f64,
    epsilon: f64,
) {
    let mut earlier = LinExpr::default();
    for rule in rules_by_level(rules, SubsidyType::Purchase, component.comp_type) {
        let Some(&paid) = vars.purchase_subsidies.get(&rule.level) else {
            continue;
        };
        let name = format!("{}.purchase_subsidy_{}", component.id, rule.level.as_str());
        let (_, cap) = problem.bounds(paid);
        let entitled = problem.add_continuous(format!("{name}_entitled"), 0.0..=cap);
        let remaining = LinExpr::from(vars.invest) - earlier.clone();
        match rule.dependent_var {
            DependentVar::Size => {
                let size = LinExpr::from(vars.size);
                purchase::declare_bracket_disjunction(
                    problem,
                    &name,
                    &size,
                    entitled,
                    &rule.brackets,
                    epsilon,
                );
            }
            DependentVar::Investment => {
                purchase::declare_bracket_disjunction(
                    problem,
                    &name,
                    &remaining,
                    entitled,
                    &rule.brackets,
                    epsilon,
                );
            }
            DependentVar::Area => {
                purchase::declare_area_disjunction(
                    problem,
                    &name,
                    vars.size,
                    entitled,
                    rule.evaluate(area),
                    epsilon,
                );
            }
        }
        purchase::declare_payment_cap(problem, &name, paid, entitled, &remaining);
        earlier += paid;
    }
}

/// Add the operate subsidies of a component.
///
/// Only size-dependent rules are supported for operate subsidies; other rules are ignored with a
/// warning.
///
/// # Arguments
///
/// * `problem` - The problem to add variables and constraints to
/// * `rules` - All subsidy rules of the building
/// * `component` - The component feeding energy into the grid
/// * `vars` - The component's variables
/// * `energy` - Annual energy the component feeds into the grid
/// * `settings` - Compilation options
///
/// # Returns
///
/// The annual payout variable of each level
pub fn declare_operate_subsidies(
    problem: &mut Problem,
    rules: &[SubsidyRule],
    component: &Component,
    vars: &ComponentVars,
    energy: &LinExpr,
    settings: &CompileSettings,
) -> IndexMap<SubsidyLevel, VarId> {
    let mut payouts = IndexMap::new();
    for rule in rules_by_level(rules, SubsidyType::Operate, component.comp_type) {
        if rule.dependent_var != DependentVar::Size {
            warn!(
                "Component {}: operate subsidies at {} level must depend on size; ignoring",
                component.id,
                rule.level.as_str()
            );
            continue;
        }

        let segments = operate::tariff_segments(
            &rule.brackets,
            component.max_size,
            settings.tariff_segments,
            settings.size_epsilon,
        );
        let max_price = segments.iter().map(|segment| segment.price).fold(0.0, f64::max);
        let (_, max_energy) = energy.interval(|var| problem.bounds(var));
        let name = format!("{}.operate_subsidy_{}", component.id, rule.level.as_str());
        let cap = (max_price * max_energy).max(0.0);
        let payout = problem.add_continuous(name.as_str(), 0.0..=cap);
        operate::declare_tariff_disjunction(
            problem,
            &name,
            vars.size,
            payout,
            energy,
            &segments,
            settings.size_epsilon,
        );
        payouts.insert(rule.level, payout);
    }

    payouts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::CompileContext;
    use crate::fixture::{component, context_data};
    use crate::problem::{Constraint, Sense};
    use crate::solver::{HighsSolver, Solver};
    use float_cmp::assert_approx_eq;

    fn bracket(lower: f64, upper: f64, coefficient: f64, constant: f64) -> Bracket {
        Bracket {
            lower,
            upper,
            coefficient,
            constant,
        }
    }

    fn rule(level: SubsidyLevel, brackets: Vec<Bracket>) -> SubsidyRule {
        SubsidyRule::new(
            level,
            SubsidyType::Purchase,
            ComponentType::PV,
            DependentVar::Investment,
            brackets,
        )
    }

    #[test]
    fn test_new_drops_bad_brackets() {
        let rule = rule(
            SubsidyLevel::City,
            vec![
                bracket(10.0, f64::INFINITY, 0.3, 2.0),
                bracket(0.0, 10.0, 0.5, 0.0),
                bracket(5.0, 8.0, 1.0, 0.0),  // Overlaps
                bracket(20.0, 15.0, 1.0, 0.0), // Upper below lower
            ],
        );
        assert_eq!(
            rule.brackets,
            [
                bracket(0.0, 10.0, 0.5, 0.0),
                bracket(10.0, f64::INFINITY, 0.3, 2.0)
            ]
        );
    }

    #[test]
    fn test_rules_by_level() {
        let rules = vec![
            rule(SubsidyLevel::Country, vec![bracket(0.0, 10.0, 0.1, 0.0)]),
            rule(SubsidyLevel::City, vec![bracket(0.0, 10.0, 0.2, 0.0)]),
            rule(SubsidyLevel::City, vec![bracket(0.0, 10.0, 0.3, 0.0)]),
        ];
        let selected = rules_by_level(&rules, SubsidyType::Purchase, ComponentType::PV);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].level, SubsidyLevel::City);
        assert_eq!(selected[0].brackets[0].coefficient, 0.2);
        assert_eq!(selected[1].level, SubsidyLevel::Country);

        assert!(rules_by_level(&rules, SubsidyType::Operate, ComponentType::PV).is_empty());
        assert!(rules_by_level(&rules, SubsidyType::Purchase, ComponentType::CHP).is_empty());
    }

    #[test]
    fn test_purchase_subsidy_caps() {
        let pv = component("pv", ComponentType::PV);
        let rules = vec![
            rule(SubsidyLevel::State, vec![bracket(0.0, f64::INFINITY, 0.5, 0.0)]),
            SubsidyRule::new(
                SubsidyLevel::City,
                SubsidyType::Purchase,
                ComponentType::PV,
                DependentVar::Area,
                vec![bracket(0.0, 500.0, 0.0, 300.0)],
            ),
        ];
        let caps = purchase_subsidy_caps(&rules, &pv, 150.0);
        assert_eq!(caps.keys().copied().collect_vec(), [SubsidyLevel::City, SubsidyLevel::State]);
        assert_approx_eq!(f64, caps[&SubsidyLevel::City], 300.0);
        let max_investment = pv.cost_model.max_investment(pv.max_size);
        assert_approx_eq!(f64, caps[&SubsidyLevel::State], 0.5 * max_investment);
    }

    #[test]
    fn test_purchase_subsidies_compose_by_level() {
        let pv = component("pv", ComponentType::PV);
        let rules = vec![
            rule(SubsidyLevel::State, vec![bracket(0.0, f64::INFINITY, 0.5, 0.0)]),
            rule(SubsidyLevel::City, vec![bracket(0.0, f64::INFINITY, 0.5, 0.0)]),
        ];
        let (time, profiles, finance, settings) = context_data(&[0.0]);
        let ctx = CompileContext {
            time: &time,
            profiles: &profiles,
            finance: &finance,
            settings: &settings,
        };

        let mut problem = Problem::new();
        let caps = purchase_subsidy_caps(&rules, &pv, 0.0);
        let vars = pv.declare_variables(&mut problem, &ctx, &caps);
        declare_purchase_subsidies(&mut problem, &rules, &pv, &vars, 0.0, 0.01);
        problem.add_constraint(Constraint::eq(vars.invest, 1000.0));
        let subsidies = LinExpr::sum(vars.purchase_subsidies.values().copied());
        problem.set_objective(subsidies * -1.0, Sense::Minimise);

        let solution = HighsSolver::default().solve(&problem).unwrap();
        assert!(solution.status.is_success());
        let city = vars.purchase_subsidies[&SubsidyLevel::City];
        let state = vars.purchase_subsidies[&SubsidyLevel::State];
        assert_approx_eq!(f64, solution.value(city), 500.0, epsilon = 1e-4);
        assert_approx_eq!(f64, solution.value(state), 250.0, epsilon = 1e-4);
    }

    #[test]
    fn test_purchase_subsidy_capped_at_investment() {
        // A flat area subsidy of 300 for a component costing 100
        let pv = component("pv", ComponentType::PV);
        let rules = vec![
            SubsidyRule::new(
                SubsidyLevel::City,
                SubsidyType::Purchase,
                ComponentType::PV,
                DependentVar::Area,
                vec![bracket(0.0, 500.0, 0.0, 300.0)],
            ),
            rule(SubsidyLevel::State, vec![bracket(0.0, f64::INFINITY, 0.5, 0.0)]),
        ];
        let (time, profiles, finance, settings) = context_data(&[0.0]);
        let ctx = CompileContext {
            time: &time,
            profiles: &profiles,
            finance: &finance,
            settings: &settings,
        };

        let mut problem = Problem::new();
        let caps = purchase_subsidy_caps(&rules, &pv, 150.0);
        let vars = pv.declare_variables(&mut problem, &ctx, &caps);
        pv.declare_investment_constraint(&mut problem, &vars, &ctx);
        declare_purchase_subsidies(&mut problem, &rules, &pv, &vars, 150.0, 0.01);
        problem.add_constraint(Constraint::eq(vars.size, 1.0));
        let subsidies = LinExpr::sum(vars.purchase_subsidies.values().copied());
        problem.set_objective(subsidies * -1.0, Sense::Minimise);

        let solution = HighsSolver::default().solve(&problem).unwrap();
        assert!(solution.status.is_success());
        let city = vars.purchase_subsidies[&SubsidyLevel::City];
        let state = vars.purchase_subsidies[&SubsidyLevel::State];
        assert_approx_eq!(f64, solution.value(vars.invest), 100.0, epsilon = 1e-4);
        assert_approx_eq!(f64, solution.value(city), 100.0, epsilon = 1e-4);
        assert_approx_eq!(f64, solution.value(state), 0.0, epsilon = 1e-4);
    }
}
