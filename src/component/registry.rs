//! The fixed set of component types and the carriers each can exchange.
use crate::carrier::Carrier;
use strum::{Display, EnumIter, EnumString};

/// The type of a component, which determines its carriers and the constraints it contributes
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
)]
#[strum(ascii_case_insensitive)]
pub enum ComponentType {
    /// Connection to the public electricity grid (purchase and feed-in)
    ElectricalGrid,
    /// Connection to the gas network
    GasGrid,
    /// Delivery of solid biomass
    BiomassSupply,
    /// Connection to a hydrogen network
    HydrogenGrid,
    /// Photovoltaic panels
    PV,
    /// Solar thermal collectors
    SolarThermalCollector,
    /// Resistive electric boiler
    ElectricBoiler,
    /// Gas-fired boiler
    GasBoiler,
    /// Biomass-fired boiler
    BiomassBoiler,
    /// Air-source heat pump
    HeatPump,
    /// Gas-fired combined heat and power unit
    CHP,
    /// Electrolyser producing hydrogen
    Electrolyser,
    /// Heat-driven chiller
    AbsorptionChiller,
    /// Electrically driven chiller
    CompressionChiller,
    /// Hot water tank
    HotWaterStorage,
    /// Electrical battery
    Battery,
    /// Pressurised hydrogen tank
    HydrogenStorage,
    /// The building's heat demand
    HeatConsumption,
    /// The building's electricity demand
    ElectricalConsumption,
    /// The building's cooling demand
    CoolConsumption,
}

/// The broad family a component type belongs to, which selects its constraint set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    /// Connection to an external network: buys (and possibly sells) energy at fixed prices
    Grid,
    /// Turns an environmental resource (irradiance) into energy
    Solar,
    /// Converts its input carrier into its output carriers
    Conversion,
    /// Stores a carrier between time steps
    Storage,
    /// A fixed demand of the building
    Consumption,
}

/// The carriers a component type can take in and give out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Input carriers, in order
    pub inputs: &'static [Carrier],
    /// Output carriers, in order
    pub outputs: &'static [Carrier],
}

impl ComponentType {
    /// The carriers this type of component exchanges
    pub fn capabilities(self) -> Capabilities {
        use Carrier as C;
        let (inputs, outputs): (&[Carrier], &[Carrier]) = match self {
            Self::ElectricalGrid => (&[C::Elec], &[C::Elec]),
            Self::GasGrid => (&[], &[C::Gas]),
            Self::BiomassSupply => (&[], &[C::Biomass]),
            Self::HydrogenGrid => (&[], &[C::Hydrogen]),
            Self::PV => (&[C::Solar], &[C::Elec]),
            Self::SolarThermalCollector => (&[C::Solar], &[C::Heat]),
            Self::ElectricBoiler | Self::HeatPump => (&[C::Elec], &[C::Heat]),
            Self::GasBoiler => (&[C::Gas], &[C::Heat]),
            Self::BiomassBoiler => (&[C::Biomass], &[C::Heat]),
            Self::CHP => (&[C::Gas], &[C::Heat, C::Elec]),
            Self::Electrolyser => (&[C::Elec], &[C::Hydrogen]),
            Self::AbsorptionChiller => (&[C::Heat], &[C::Cool]),
            Self::CompressionChiller => (&[C::Elec], &[C::Cool]),
            Self::HotWaterStorage => (&[C::Heat], &[C::Heat]),
            Self::Battery => (&[C::Elec], &[C::Elec]),
            Self::HydrogenStorage => (&[C::Hydrogen], &[C::Hydrogen]),
            Self::HeatConsumption => (&[C::Heat], &[]),
            Self::ElectricalConsumption => (&[C::Elec], &[]),
            Self::CoolConsumption => (&[C::Cool], &[]),
        };

        Capabilities { inputs, outputs }
    }

    /// The family of this component type
    pub fn kind(self) -> ComponentKind {
        match self {
            Self::ElectricalGrid | Self::GasGrid | Self::BiomassSupply | Self::HydrogenGrid => {
                ComponentKind::Grid
            }
            Self::PV | Self::SolarThermalCollector => ComponentKind::Solar,
            Self::HotWaterStorage | Self::Battery | Self::HydrogenStorage => {
                ComponentKind::Storage
            }
            Self::HeatConsumption | Self::ElectricalConsumption | Self::CoolConsumption => {
                ComponentKind::Consumption
            }
            Self::ElectricBoiler
            | Self::GasBoiler
            | Self::BiomassBoiler
            | Self::HeatPump
            | Self::CHP
            | Self::Electrolyser
            | Self::AbsorptionChiller
            | Self::CompressionChiller => ComponentKind::Conversion,
        }
    }

    /// Whether energy delivered to this component earns feed-in revenue
    pub fn is_feed_in_sink(self) -> bool {
        self == Self::ElectricalGrid
    }
}
