//! Reducing a building's time axis to representative periods.
//!
//! The full year is split into periods of equal length (typically days). A clustering picks a
//! few of these periods to stand in for all the others, each with the number of times it occurs.
//! Compiling the clustered building rather than the original shrinks the problem considerably.
use crate::building::Building;
use crate::time_index::TimeIndex;
use anyhow::{Result, ensure};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use log::{info, warn};
use serde::Deserialize;

/// A period of the full time axis chosen to represent others
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct RepresentativePeriod {
    /// The first step of the period on the full time axis
    pub start_hour: usize,
    /// How often the period occurs in the full year
    pub occurrences: f64,
}

/// A set of representative periods of equal length
#[derive(Clone, Debug, PartialEq)]
pub struct TimeCluster {
    period_length: usize,
    periods: Vec<RepresentativePeriod>,
}

impl TimeCluster {
    /// Create a clustering from its representative periods
    pub fn new(period_length: usize, periods: Vec<RepresentativePeriod>) -> Result<Self> {
        ensure!(period_length > 0, "Period length must be greater than zero");
        ensure!(!periods.is_empty(), "No representative periods given");
        for period in &periods {
            ensure!(
                period.occurrences.is_finite() && period.occurrences > 0.0,
                "Period starting at hour {} must occur a positive number of times",
                period.start_hour
            );
        }

        Ok(Self {
            period_length,
            periods,
        })
    }

    /// Create a clustering from an assignment of every period of the year to a representative.
    ///
    /// `assignment[p]` is the index of the period which represents period `p`. The representative
    /// periods appear in order of first use, each occurring as often as it is assigned.
    pub fn from_assignment(period_length: usize, assignment: &[usize]) -> Result<Self> {
        for (period, &representative) in assignment.iter().enumerate() {
            ensure!(
                representative < assignment.len(),
                "Period {period} is assigned to period {representative}, which does not exist"
            );
        }

        let mut counts: IndexMap<usize, usize> = IndexMap::new();
        for &representative in assignment {
            *counts.entry(representative).or_default() += 1;
        }
        let periods = counts
            .into_iter()
            .map(|(representative, count)| RepresentativePeriod {
                start_hour: representative * period_length,
                occurrences: count as f64,
            })
            .collect();

        Self::new(period_length, periods)
    }

    /// Number of steps in each period
    pub fn period_length(&self) -> usize {
        self.period_length
    }

    /// The representative periods
    pub fn periods(&self) -> &[RepresentativePeriod] {
        &self.periods
    }

    /// The steps of the full time axis which are kept, in order
    pub fn hours(&self) -> Vec<usize> {
        self.periods
            .iter()
            .flat_map(|period| period.start_hour..period.start_hour + self.period_length)
            .collect()
    }

    /// The time axis of a building clustered this way
    pub fn time_index(&self) -> Result<TimeIndex> {
        let occurrences: Vec<_> = self.periods.iter().map(|period| period.occurrences).collect();
        TimeIndex::clustered(self.period_length, &occurrences)
    }
}

impl Building {
    /// Create a new building whose profiles only cover the representative periods.
    ///
    /// Annual sums over the new building's time axis are weighted by how often each period
    /// occurs, and storages start again from their initial state at the start of each period.
    pub fn clustered(&self, cluster: &TimeCluster) -> Result<Building> {
        ensure!(
            !self.time.is_clustered(),
            "Building {} has already been clustered",
            self.info.name
        );

        let hours = cluster.hours();
        let profiles = self.profiles.select(&hours)?;
        let time = cluster.time_index()?;

        let represented = time.total_weight() / cluster.period_length() as f64;
        let full_periods = self.profiles.len() as f64 / cluster.period_length() as f64;
        if !approx_eq!(f64, represented, full_periods, epsilon = 1e-6) {
            warn!(
                "Representative periods stand for {represented} periods, but the profiles cover \
                 {full_periods}"
            );
        }
        info!(
            "Clustered building {} from {} to {} steps",
            self.info.name,
            self.time.len(),
            time.len()
        );

        Ok(Building {
            profiles,
            time,
            ..self.clone()
        })
    }
}
