//! Hourly demand and weather profiles of a building.
use crate::carrier::Carrier;
use anyhow::{Result, ensure};
use serde::Deserialize;

/// One row of the profile table
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct ProfileRow {
    /// Space heating and hot water demand (kW)
    #[serde(default)]
    pub heat_demand: f64,
    /// Electricity demand (kW)
    #[serde(default)]
    pub elec_demand: f64,
    /// Cooling demand (kW)
    #[serde(default)]
    pub cool_demand: f64,
    /// Ambient temperature (°C)
    #[serde(default)]
    pub temperature: f64,
    /// Global irradiance on the collector plane (kW/m²)
    #[serde(default)]
    pub irradiance: f64,
}

/// Time series of demand and weather for a building.
///
/// All series have the same length as the building's time axis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Profiles {
    rows: Vec<ProfileRow>,
}

impl Profiles {
    /// Create profiles from per-step rows
    pub fn new(rows: Vec<ProfileRow>) -> Result<Self> {
        for (t, row) in rows.iter().enumerate() {
            ensure!(
                row.heat_demand >= 0.0 && row.elec_demand >= 0.0 && row.cool_demand >= 0.0,
                "Negative demand at step {t}"
            );
            ensure!(
                row.irradiance >= 0.0,
                "Negative irradiance at step {t}"
            );
        }

        Ok(Self { rows })
    }

    /// Number of time steps
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the profiles are empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The demand series for a carrier, if the building has a demand for it
    pub fn demand(&self, carrier: Carrier) -> Option<Vec<f64>> {
        let get: fn(&ProfileRow) -> f64 = match carrier {
            Carrier::Heat => |row| row.heat_demand,
            Carrier::Elec => |row| row.elec_demand,
            Carrier::Cool => |row| row.cool_demand,
            _ => return None,
        };

        Some(self.rows.iter().map(get).collect())
    }

    /// Ambient temperature series
    pub fn temperature(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.temperature).collect()
    }

    /// Irradiance series
    pub fn irradiance(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.irradiance).collect()
    }

    /// Pick out the given steps, in order, as a new set of profiles
    pub fn select(&self, steps: &[usize]) -> Result<Self> {
        let rows = steps
            .iter()
            .map(|&t| {
                self.rows.get(t).copied().ok_or_else(|| {
                    anyhow::anyhow!("Step {t} is outside the profiles ({} steps)", self.len())
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(heat: f64, temperature: f64) -> ProfileRow {
        ProfileRow {
            heat_demand: heat,
            temperature,
            ..ProfileRow::default()
        }
    }

    #[test]
    fn test_demand() {
        let profiles = Profiles::new(vec![row(10.0, 0.0), row(5.0, 2.0)]).unwrap();
        assert_eq!(profiles.demand(Carrier::Heat), Some(vec![10.0, 5.0]));
        assert_eq!(profiles.demand(Carrier::Elec), Some(vec![0.0, 0.0]));
        assert_eq!(profiles.demand(Carrier::Gas), None);
        assert_eq!(profiles.temperature(), [0.0, 2.0]);
    }

    #[test]
    fn test_negative_demand() {
        assert!(Profiles::new(vec![row(-1.0, 0.0)]).is_err());
    }

    #[test]
    fn test_select() {
        let profiles = Profiles::new(vec![row(1.0, 0.0), row(2.0, 0.0), row(3.0, 0.0)]).unwrap();
        let selected = profiles.select(&[2, 0]).unwrap();
        assert_eq!(selected.demand(Carrier::Heat), Some(vec![3.0, 1.0]));
        assert!(profiles.select(&[3]).is_err());
    }
}
