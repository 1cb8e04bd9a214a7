//! Energy carriers which flow between components.
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A type of energy exchanged between components
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    /// Space heating and hot water
    Heat,
    /// Electricity
    Elec,
    /// Cooling
    Cool,
    /// Natural gas
    Gas,
    /// Solid biomass (e.g. wood pellets)
    Biomass,
    /// Hydrogen
    Hydrogen,
    /// Solar irradiance.
    ///
    /// Comes from the environment rather than from another component, so it is never routed
    /// through the flow network.
    Solar,
}

impl Carrier {
    /// Whether this carrier can flow along edges between components
    pub fn is_network_carrier(self) -> bool {
        self != Carrier::Solar
    }

    /// Iterate over the carriers which can flow between components
    pub fn iter_network() -> impl Iterator<Item = Carrier> {
        Carrier::iter().filter(|carrier| carrier.is_network_carrier())
    }
}
