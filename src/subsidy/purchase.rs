//! Purchase subsidies: a one-off payment depending on size, investment or floor area.
use super::{Bracket, DependentVar, SubsidyRule};
use crate::problem::{Constraint, LinExpr, Problem, VarId};

/// The subsidy paid when the dependent quantity equals `x`.
///
/// Brackets exclude their upper end, so a value on a shared edge belongs to the upper bracket.
/// Nothing is paid for `x <= 0` or when `x` falls in a gap between brackets.
pub fn evaluate(brackets: &[Bracket], x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }

    brackets
        .iter()
        .find(|bracket| bracket.contains(x))
        .map_or(0.0, |bracket| bracket.value(x))
}

/// The ranges of non-negative values not covered by any bracket.
///
/// Brackets must be sorted and non-overlapping. Zero itself is not reported, since it is always
/// handled separately.
pub fn coverage_gaps(brackets: &[Bracket]) -> Vec<(f64, f64)> {
    let mut gaps = Vec::new();
    let mut covered_to = 0.0;
    for bracket in brackets {
        if bracket.lower > covered_to {
            gaps.push((covered_to, bracket.lower));
        }
        covered_to = bracket.upper;
    }
    if covered_to < f64::INFINITY {
        gaps.push((covered_to, f64::INFINITY));
    }

    gaps
}

/// The largest subsidy the brackets can pay for a dependent quantity in `[0, x_max]`
pub fn max_subsidy(brackets: &[Bracket], x_max: f64) -> f64 {
    brackets
        .iter()
        .filter(|bracket| bracket.lower <= x_max)
        .flat_map(|bracket| {
            let upper = bracket.upper.min(x_max);
            [bracket.value(bracket.lower), bracket.value(upper)]
        })
        .fold(0.0, f64::max)
}

/// The largest value the problem admits in a range excluding `upper`.
///
/// Some other bracket or gap always starts at a finite upper end, so the range stops `epsilon`
/// short of it.
fn open_upper(upper: f64, epsilon: f64) -> f64 {
    if upper.is_finite() {
        upper - epsilon
    } else {
        upper
    }
}

/// Add the disjunction fixing a purchase subsidy for a dependent quantity `x`.
///
/// Exactly one branch holds: `x` is zero and nothing is paid; `x` lies in a coverage gap and
/// nothing is paid; or `x` lies in a bracket and the bracket's subsidy is paid. Values within
/// `epsilon` below the upper end of a bracket or gap are not admitted.
///
/// # Arguments
///
/// * `problem` - The problem to add the disjunction to
/// * `name` - Name of the disjunction
/// * `x` - The dependent quantity
/// * `subsidy` - The subsidy variable
/// * `brackets` - Sorted, non-overlapping brackets
/// * `epsilon` - Smallest value of `x` regarded as non-zero
///
/// # Returns
///
/// The branch indicators: zero branch, then gap branches, then bracket branches
pub fn declare_bracket_disjunction(
    problem: &mut Problem,
    name: &str,
    x: &LinExpr,
    subsidy: VarId,
    brackets: &[Bracket],
    epsilon: f64,
) -> Vec<VarId> {
    let zero = (
        "zero".to_string(),
        vec![Constraint::eq(x.clone(), 0.0), Constraint::eq(subsidy, 0.0)],
    );
    let gaps = coverage_gaps(brackets)
        .into_iter()
        .enumerate()
        .map(|(i, (lower, upper))| {
            (
                format!("gap_{i}"),
                vec![
                    Constraint::between(x.clone(), lower.max(epsilon), open_upper(upper, epsilon)),
                    Constraint::eq(subsidy, 0.0),
                ],
            )
        });
    let tiers = brackets.iter().enumerate().map(|(i, bracket)| {
        let lower = bracket.lower.max(epsilon);
        let upper = open_upper(bracket.upper, epsilon);
        (
            format!("bracket_{i}"),
            vec![
                Constraint::between(x.clone(), lower, upper),
                Constraint::eq(subsidy, x.clone() * bracket.coefficient + bracket.constant),
            ],
        )
    });

    problem.add_disjunction(name, std::iter::once(zero).chain(gaps).chain(tiers))
}

/// Add the disjunction for a floor-area subsidy.
///
/// The area is fixed, so the subsidy is known in advance; it is only paid if the component is
/// installed.
pub fn declare_area_disjunction(
    problem: &mut Problem,
    name: &str,
    size: VarId,
    subsidy: VarId,
    amount: f64,
    epsilon: f64,
) -> Vec<VarId> {
    problem.add_disjunction(
        name,
        [
            (
                "not_installed",
                vec![Constraint::eq(size, 0.0), Constraint::eq(subsidy, 0.0)],
            ),
            (
                "installed",
                vec![Constraint::ge(size, epsilon), Constraint::eq(subsidy, amount)],
            ),
        ],
    )
}

/// Add the disjunction paying the smaller of a subsidy entitlement and the remaining investment.
///
/// # Arguments
///
/// * `problem` - The problem to add the disjunction to
/// * `name` - Name of the subsidy
/// * `paid` - The subsidy actually paid
/// * `entitled` - The subsidy the brackets grant
/// * `remaining` - Investment not yet covered by other subsidies
pub fn declare_payment_cap(
    problem: &mut Problem,
    name: &str,
    paid: VarId,
    entitled: VarId,
    remaining: &LinExpr,
) -> Vec<VarId> {
    problem.add_disjunction(
        &format!("{name}_cap"),
        [
            (
                "full",
                vec![
                    Constraint::eq(paid, entitled),
                    Constraint::le(entitled, remaining.clone()),
                ],
            ),
            (
                "capped",
                vec![
                    Constraint::eq(paid, remaining.clone()),
                    Constraint::le(remaining.clone(), entitled),
                ],
            ),
        ],
    )
}

/// Upper bound on the subsidy a rule can pay a component
///
/// # Arguments
///
/// * `rule` - The subsidy rule
/// * `max_size` - Largest size of the component
/// * `max_investment` - Largest investment in the component
/// * `area` - Floor area of the building
pub fn subsidy_cap(rule: &SubsidyRule, max_size: f64, max_investment: f64, area: f64) -> f64 {
    match rule.dependent_var {
        DependentVar::Size => max_subsidy(&rule.brackets, max_size),
        DependentVar::Investment => max_subsidy(&rule.brackets, max_investment),
        DependentVar::Area => evaluate(&rule.brackets, area).max(0.0),
    }
}
