//! Fixtures for tests
use crate::building::{Building, BuildingInfo, EnergyPrices};
use crate::component::{Component, ComponentDefinition, ComponentProperties, ComponentType};
use crate::finance::FinanceParameters;
use crate::graph::AdjacencyMatrix;
use crate::profile::{ProfileRow, Profiles};
use crate::settings::CompileSettings;
use crate::time_index::TimeIndex;
use crate::units::MoneyPerEnergy;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A topology row with sizes between 0 and 100
pub fn component_definition(
    name: &str,
    comp_type: ComponentType,
    cost_model: Option<u8>,
) -> ComponentDefinition {
    ComponentDefinition {
        id: name.into(),
        comp_type,
        model: "default".into(),
        min_size: 0.0,
        max_size: 100.0,
        current_size: 0.0,
        cost_model,
    }
}

/// A component using the linear cost model with a unit cost of 100
pub fn component(name: &str, comp_type: ComponentType) -> Component {
    let props = ComponentProperties {
        only_unit_price: Some(100.0),
        life: Some(20.0),
        ..ComponentProperties::default()
    };
    Component::new(component_definition(name, comp_type, Some(0)), Some(&props)).unwrap()
}

/// Profile rows with the given heat demand, 10 °C and some sunshine
pub fn profile_rows(heat_demand: &[f64]) -> Vec<ProfileRow> {
    heat_demand
        .iter()
        .map(|&heat_demand| ProfileRow {
            heat_demand,
            temperature: 10.0,
            irradiance: 0.5,
            ..ProfileRow::default()
        })
        .collect()
}

/// Everything needed for a [`crate::component::CompileContext`] with the given heat demand
pub fn context_data(
    heat_demand: &[f64],
) -> (TimeIndex, Profiles, FinanceParameters, CompileSettings) {
    (
        TimeIndex::uniform(heat_demand.len()),
        Profiles::new(profile_rows(heat_demand)).unwrap(),
        FinanceParameters::default(),
        CompileSettings::default(),
    )
}

/// A building heated by an electric boiler supplied from the grid
#[fixture]
pub fn building() -> Building {
    let grid = Component::new(
        component_definition("grid", ComponentType::ElectricalGrid, Some(0)),
        Some(&ComponentProperties {
            only_unit_price: Some(0.0),
            life: Some(20.0),
            ..ComponentProperties::default()
        }),
    )
    .unwrap();
    let boiler = Component::new(
        component_definition("boiler", ComponentType::ElectricBoiler, Some(0)),
        Some(&ComponentProperties {
            efficiency: Some(0.98),
            only_unit_price: Some(100.0),
            life: Some(20.0),
            ..ComponentProperties::default()
        }),
    )
    .unwrap();
    let demand = component("demand", ComponentType::HeatConsumption);

    Building::new(
        BuildingInfo {
            name: "house".into(),
            area: 150.0,
            user: "residential".into(),
            building_type: "SFH".into(),
        },
        [grid, boiler, demand]
            .into_iter()
            .map(|component| (component.id.clone(), component))
            .collect(),
        AdjacencyMatrix::default(),
        Profiles::new(profile_rows(&[10.0, 10.0, 0.0])).unwrap(),
        Vec::new(),
        EnergyPrices {
            gas: MoneyPerEnergy(0.08),
            elec: MoneyPerEnergy(0.3),
            ..EnergyPrices::default()
        },
        FinanceParameters::default(),
    )
    .unwrap()
}
