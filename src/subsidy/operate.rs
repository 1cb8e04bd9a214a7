//! Operate subsidies: feed-in tariffs whose rate depends on the installed size.
//!
//! Each bracket's coefficient is the tariff for the part of the size falling in that bracket, so
//! the tariff actually paid is the size-weighted average over the brackets below the size. The
//! payout is that average price times the energy fed in, which is bilinear in the decision
//! variables. In the problem it is approximated by splitting the size range into segments, each
//! paying the lowest average price found in the segment.
use super::Bracket;
use crate::problem::{Constraint, LinExpr, Problem, VarId};

/// A range of sizes paid at one constant tariff
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TariffSegment {
    /// Smallest size in the segment
    pub lower: f64,
    /// Largest size in the segment
    pub upper: f64,
    /// Tariff paid per unit of energy fed in
    pub price: f64,
}

/// The weighted-average tariff for a component of the given size.
///
/// `price * size` is the sum over brackets of the bracket's coefficient times the part of the
/// size which falls in the bracket.
pub fn weighted_average_price(brackets: &[Bracket], size: f64) -> f64 {
    if size <= 0.0 {
        return 0.0;
    }

    let total: f64 = brackets
        .iter()
        .take_while(|bracket| bracket.lower < size)
        .map(|bracket| bracket.coefficient * (size.min(bracket.upper) - bracket.lower))
        .sum();

    total / size
}

/// Split `[0, max_size]` into constant-price segments.
///
/// Each bracket (and each gap between brackets) is split into `segments_per_bracket` equal
/// parts. Each part is paid the lower of the average prices at its two ends, which is its lowest
/// price since the average is monotonic within a part.
pub fn tariff_segments(
    brackets: &[Bracket],
    max_size: f64,
    segments_per_bracket: usize,
    epsilon: f64,
) -> Vec<TariffSegment> {
    if max_size <= 0.0 || segments_per_bracket == 0 {
        return Vec::new();
    }

    let mut intervals = Vec::new();
    let mut covered_to = 0.0;
    for bracket in brackets.iter().filter(|bracket| bracket.lower < max_size) {
        if bracket.lower > covered_to {
            intervals.push((covered_to, bracket.lower));
        }
        covered_to = bracket.upper.min(max_size);
        intervals.push((bracket.lower, covered_to));
    }
    if covered_to < max_size {
        intervals.push((covered_to, max_size));
    }

    intervals
        .into_iter()
        .filter(|(lower, upper)| upper > lower)
        .flat_map(|(lower, upper)| {
            let width = (upper - lower) / segments_per_bracket as f64;
            (0..segments_per_bracket).map(move |i| {
                let start = lower + width * i as f64;
                let end = if i + 1 == segments_per_bracket {
                    upper
                } else {
                    start + width
                };
                (start, end)
            })
        })
        .map(|(lower, upper)| TariffSegment {
            lower,
            upper,
            price: weighted_average_price(brackets, lower.max(epsilon))
                .min(weighted_average_price(brackets, upper)),
        })
        .collect()
}

/// Add the disjunction fixing the payout of an operate subsidy.
///
/// Either the component is not installed and nothing is paid, or its size lies in exactly one
/// segment and the energy fed in is paid at that segment's tariff.
///
/// # Arguments
///
/// * `problem` - The problem to add the disjunction to
/// * `name` - Name of the disjunction
/// * `size` - The component's size
/// * `payout` - The annual payout variable
/// * `energy` - Annual energy fed in, as an expression
/// * `segments` - Constant-price segments covering the component's size range
/// * `epsilon` - Smallest size regarded as installed
pub fn declare_tariff_disjunction(
    problem: &mut Problem,
    name: &str,
    size: VarId,
    payout: VarId,
    energy: &LinExpr,
    segments: &[TariffSegment],
    epsilon: f64,
) -> Vec<VarId> {
    let zero = (
        "zero".to_string(),
        vec![Constraint::eq(size, 0.0), Constraint::eq(payout, 0.0)],
    );
    let branches = segments.iter().enumerate().map(|(i, segment)| {
        (
            format!("segment_{i}"),
            vec![
                Constraint::between(size, segment.lower.max(epsilon), segment.upper),
                Constraint::eq(payout, energy.clone() * segment.price),
            ],
        )
    });

    problem.add_disjunction(name, std::iter::once(zero).chain(branches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Sense;
    use crate::solver::{HighsSolver, Solver};
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn brackets() -> Vec<Bracket> {
        vec![
            Bracket {
                lower: 0.0,
                upper: 10.0,
                coefficient: 0.08,
                constant: 0.0,
            },
            Bracket {
                lower: 10.0,
                upper: 40.0,
                coefficient: 0.07,
                constant: 0.0,
            },
        ]
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(5.0, 0.08)]
    #[case(10.0, 0.08)]
    #[case(20.0, 0.075)]
    #[case(40.0, (0.8 + 2.1) / 40.0)]
    #[case(80.0, (0.8 + 2.1) / 80.0)] // Above the last bracket nothing more is paid
    fn test_weighted_average_price(
        brackets: Vec<Bracket>,
        #[case] size: f64,
        #[case] expected: f64,
    ) {
        assert_approx_eq!(
            f64,
            weighted_average_price(&brackets, size),
            expected,
            epsilon = 1e-12
        );
    }

    #[rstest]
    fn test_tariff_segments(brackets: Vec<Bracket>) {
        let segments = tariff_segments(&brackets, 25.0, 2, 0.01);
        let bounds: Vec<_> = segments.iter().map(|s| (s.lower, s.upper)).collect();
        assert_eq!(bounds, [(0.0, 5.0), (5.0, 10.0), (10.0, 17.5), (17.5, 25.0)]);
        assert_approx_eq!(f64, segments[0].price, 0.08, epsilon = 1e-12);
        assert_approx_eq!(f64, segments[3].price, 1.85 / 25.0, epsilon = 1e-12);
    }

    #[rstest]
    fn test_tariff_segments_with_trailing_gap(brackets: Vec<Bracket>) {
        let segments = tariff_segments(&brackets, 50.0, 1, 0.01);
        assert_eq!(segments.len(), 3);
        assert_eq!((segments[2].lower, segments[2].upper), (40.0, 50.0));
        assert_approx_eq!(f64, segments[2].price, 2.9 / 50.0, epsilon = 1e-12);
        assert!(tariff_segments(&brackets, 0.0, 4, 0.01).is_empty());
    }

    #[rstest]
    #[case(20.0, 1000.0 * 1.85 / 25.0)]
    #[case(10.0, 80.0)]
    #[case(0.0, 0.0)]
    fn test_tariff_disjunction(
        brackets: Vec<Bracket>,
        #[case] size_value: f64,
        #[case] expected: f64,
    ) {
        let mut problem = Problem::new();
        let size = problem.add_continuous("size", 0.0..=40.0);
        let energy = problem.add_continuous("energy", 0.0..=2000.0);
        let payout = problem.add_continuous("payout", 0.0..=200.0);
        let segments = tariff_segments(&brackets, 40.0, 4, 0.01);
        declare_tariff_disjunction(
            &mut problem,
            "feed_in",
            size,
            payout,
            &energy.into(),
            &segments,
            0.01,
        );
        problem.add_constraint(Constraint::eq(size, size_value));
        problem.add_constraint(Constraint::eq(energy, 1000.0));
        problem.set_objective(LinExpr::from(payout) * -1.0, Sense::Minimise);

        let solution = HighsSolver::default().solve(&problem).unwrap();
        assert!(solution.status.is_success());
        assert_approx_eq!(f64, solution.value(payout), expected, epsilon = 1e-4);
    }
}
