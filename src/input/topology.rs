//! Code for reading the topology table: the components of a building and how they may connect.
use super::input_err_msg;
use super::properties::PropertiesMap;
use crate::component::{Component, ComponentDefinition, ComponentType};
use crate::graph::{Adjacency, AdjacencyMatrix};
use crate::id::ComponentID;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

const TOPOLOGY_FILE_NAME: &str = "topology.csv";

/// Columns which describe a component rather than its connections
const COMPONENT_COLUMNS: [&str; 7] = [
    "comp_name",
    "comp_type",
    "model",
    "min_size",
    "max_size",
    "current_size",
    "cost_model",
];

/// The columns of a topology row describing the component itself
#[derive(Clone, PartialEq, Debug, Deserialize)]
struct TopologyRaw {
    comp_name: String,
    comp_type: String,
    #[serde(default)]
    model: String,
    min_size: Option<f64>,
    max_size: f64,
    current_size: Option<f64>,
    cost_model: Option<u8>,
}

/// A topology row along with its adjacency cells, as `(column name, cell)` pairs
type TopologyRecord = (TopologyRaw, Vec<(String, String)>);

/// Read the components and adjacency matrix of a building.
///
/// A missing topology file gives a building with no components, with a warning.
pub fn read_topology(
    model_dir: &Path,
    properties: &PropertiesMap,
) -> Result<(IndexMap<ComponentID, Component>, AdjacencyMatrix)> {
    let file_path = model_dir.join(TOPOLOGY_FILE_NAME);
    if !file_path.exists() {
        warn!("{} not found; the building has no components", file_path.display());
        return Ok((IndexMap::new(), AdjacencyMatrix::default()));
    }

    let records = read_topology_records(&file_path).with_context(|| input_err_msg(&file_path))?;
    read_topology_from_records(records, properties).with_context(|| input_err_msg(&file_path))
}

/// Split each row of the topology file into its component part and its adjacency cells
fn read_topology_records(file_path: &Path) -> Result<Vec<TopologyRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        let raw: TopologyRaw = record.deserialize(Some(&headers))?;
        let cells = headers
            .iter()
            .zip(record.iter())
            .filter(|(column, _)| !COMPONENT_COLUMNS.contains(column))
            .map(|(column, cell)| (column.to_string(), cell.to_string()))
            .collect();
        records.push((raw, cells));
    }

    Ok(records)
}

fn read_topology_from_records(
    records: Vec<TopologyRecord>,
    properties: &PropertiesMap,
) -> Result<(IndexMap<ComponentID, Component>, AdjacencyMatrix)> {
    let mut components = IndexMap::new();
    let mut all_cells = Vec::new();
    for (raw, cells) in records {
        let Ok(comp_type) = ComponentType::from_str(&raw.comp_type) else {
            warn!(
                "Component {} has unknown type {}; ignoring the topology",
                raw.comp_name, raw.comp_type
            );
            return Ok((IndexMap::new(), AdjacencyMatrix::default()));
        };

        let id = ComponentID::from(raw.comp_name);
        ensure!(
            !components.contains_key(&id),
            "Duplicate component name {id}"
        );
        let def = ComponentDefinition {
            id: id.clone(),
            comp_type,
            model: raw.model,
            min_size: raw.min_size.unwrap_or(0.0),
            max_size: raw.max_size,
            current_size: raw.current_size.unwrap_or(0.0),
            cost_model: raw.cost_model,
        };
        let props = properties.get(&(comp_type, def.model.clone()));
        components.insert(id.clone(), Component::new(def, props)?);
        all_cells.push((id, cells));
    }

    let mut adjacency = AdjacencyMatrix::default();
    for (from, cells) in all_cells {
        for (column, cell) in cells {
            let Some((to, _)) = components.get_key_value(column.as_str()) else {
                warn!("Topology column {column} is not a component; ignoring");
                continue;
            };
            if let Some(entry) = parse_adjacency(&cell) {
                adjacency.set(from.clone(), to.clone(), entry);
            } else {
                warn!("Invalid adjacency entry {cell:?} for {from} -> {to}; ignoring");
            }
        }
    }

    Ok((components, adjacency))
}

/// Parse a cell of the adjacency matrix: empty, zero or non-zero
fn parse_adjacency(cell: &str) -> Option<Adjacency> {
    if cell.is_empty() {
        return Some(Adjacency::Allowed);
    }

    let value: f64 = cell.parse().ok()?;
    Some(if value == 0.0 {
        Adjacency::Forbidden
    } else {
        Adjacency::Connected
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_topology_file(dir_path: &Path, contents: &str) {
        let file_path = dir_path.join(TOPOLOGY_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_parse_adjacency() {
        assert_eq!(parse_adjacency(""), Some(Adjacency::Allowed));
        assert_eq!(parse_adjacency("0"), Some(Adjacency::Forbidden));
        assert_eq!(parse_adjacency("1"), Some(Adjacency::Connected));
        assert_eq!(parse_adjacency("1.0"), Some(Adjacency::Connected));
        assert_eq!(parse_adjacency("yes"), None);
    }

    #[test]
    fn test_read_topology() {
        let dir = tempdir().unwrap();
        create_topology_file(
            dir.path(),
            "comp_name,comp_type,model,min_size,max_size,current_size,cost_model,grid,boiler,demand\n\
             grid,ElectricalGrid,default,0,100,0,0,,1,0\n\
             boiler,ElectricBoiler,default,0,50,5,1,,,1\n\
             demand,HeatConsumption,default,0,100,0,,,,",
        );

        let (components, adjacency) = read_topology(dir.path(), &PropertiesMap::new()).unwrap();
        assert_eq!(
            components.keys().map(ToString::to_string).collect::<Vec<_>>(),
            ["grid", "boiler", "demand"]
        );
        let boiler = &components["boiler"];
        assert_eq!(boiler.comp_type, ComponentType::ElectricBoiler);
        assert_eq!(boiler.max_size, 50.0);
        assert_eq!(boiler.current_size, 5.0);
        // Cost model 1 without properties falls back to cost model 0
        assert_eq!(boiler.cost_model.index(), 0);

        let id = |name: &str| ComponentID::from(name);
        assert_eq!(adjacency.get(&id("grid"), &id("boiler")), Adjacency::Connected);
        assert_eq!(adjacency.get(&id("grid"), &id("demand")), Adjacency::Forbidden);
        assert_eq!(adjacency.get(&id("boiler"), &id("grid")), Adjacency::Allowed);
    }

    #[test]
    fn test_read_topology_unknown_type() {
        let dir = tempdir().unwrap();
        create_topology_file(
            dir.path(),
            "comp_name,comp_type,model,min_size,max_size\n\
             grid,ElectricalGrid,default,0,100\n\
             reactor,FusionReactor,default,0,100",
        );

        let (components, _) = read_topology(dir.path(), &PropertiesMap::new()).unwrap();
        assert!(components.is_empty());
    }

    #[test]
    fn test_read_topology_missing_file() {
        let dir = tempdir().unwrap();
        let (components, _) = read_topology(dir.path(), &PropertiesMap::new()).unwrap();
        assert!(components.is_empty());
    }

    #[test]
    fn test_read_topology_duplicate_name() {
        let records = vec![
            (
                TopologyRaw {
                    comp_name: "pv".into(),
                    comp_type: "PV".into(),
                    model: String::new(),
                    min_size: None,
                    max_size: 10.0,
                    current_size: None,
                    cost_model: None,
                },
                Vec::new(),
            );
            2
        ];
        assert_error!(
            read_topology_from_records(records, &PropertiesMap::new()),
            "Duplicate component name pv"
        );
    }
}
