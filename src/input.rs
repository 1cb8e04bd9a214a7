//! Common routines for handling input data.
use crate::building::{Building, BuildingInfo, EnergyPrices};
use crate::cluster::TimeCluster;
use crate::finance::FinanceParameters;
use anyhow::{Context, Result, ensure};
use log::info;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub mod cluster;
use cluster::read_time_cluster;
pub mod profile;
use profile::read_profiles;
pub mod properties;
use properties::read_component_properties;
pub mod subsidy;
use subsidy::read_subsidies;
pub mod topology;
use topology::read_topology;

const MODEL_FILE_NAME: &str = "model.toml";

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(
    file_path: &Path,
) -> Result<impl Iterator<Item = T> + use<T>> {
    let vec = read_csv_internal(file_path)?;
    ensure!(
        !vec.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file, which may be empty or missing.
///
/// A missing file yields no records.
pub fn read_csv_optional<T: DeserializeOwned>(
    file_path: &Path,
) -> Result<impl Iterator<Item = T> + use<T>> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    Ok(read_csv_internal(file_path)?.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .collect::<Result<_, _>>()
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Options for reducing the time axis, from `model.toml`
#[derive(Debug, Deserialize, PartialEq)]
pub struct ClusteringOptions {
    /// Number of hours in each representative period
    #[serde(default = "default_period_length")]
    pub period_length: usize,
}

fn default_period_length() -> usize {
    24
}

/// The contents of `model.toml`
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelFile {
    /// General information about the building
    pub building: BuildingInfo,
    /// Energy prices
    #[serde(default)]
    pub prices: EnergyPrices,
    /// Parameters for annualising investments
    #[serde(default)]
    pub finance: FinanceParameters,
    /// Options for reducing the time axis
    pub clustering: Option<ClusteringOptions>,
}

impl ModelFile {
    /// Read `model.toml` from the model directory
    pub fn from_path(model_dir: &Path) -> Result<ModelFile> {
        read_toml(&model_dir.join(MODEL_FILE_NAME))
    }
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The building, along with the clustering to apply to it, if any.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<(Building, Option<TimeCluster>)> {
    let model_dir = model_dir.as_ref();
    let model_file = ModelFile::from_path(model_dir)?;

    let properties = read_component_properties(model_dir)?;
    let (components, adjacency) = read_topology(model_dir, &properties)?;
    let subsidies = read_subsidies(model_dir, &model_file.building)?;
    let profiles = read_profiles(model_dir)?;
    let cluster = read_time_cluster(model_dir, model_file.clustering.as_ref())?;

    let building = Building::new(
        model_file.building,
        components,
        adjacency,
        profiles,
        subsidies,
        model_file.prices,
        model_file.finance,
    )
    .with_context(|| input_err_msg(model_dir))?;
    info!(
        "Loaded building {} with {} components, {} subsidy rules and {} steps",
        building.info.name,
        building.components.len(),
        building.subsidies.len(),
        building.time.len()
    );

    Ok((building, cluster))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::MoneyPerEnergy;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: String,
        value: u32,
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> std::path::PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello, 1\nworld,2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".to_string(),
                    value: 1,
                },
                Record {
                    id: "world".to_string(),
                    value: 2,
                }
            ]
        );

        // File with no data (only column headers)
        let file_path = create_csv_file(dir.path(), "id,value\n");
        assert!(read_csv::<Record>(&file_path).is_err());
        assert!(
            read_csv_optional::<Record>(&file_path)
                .unwrap()
                .next()
                .is_none()
        );

        // Missing file
        let file_path = dir.path().join("missing.csv");
        assert!(read_csv::<Record>(&file_path).is_err());
        assert!(
            read_csv_optional::<Record>(&file_path)
                .unwrap()
                .next()
                .is_none()
        );
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(MODEL_FILE_NAME);
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(
                file,
                "[building]\nname = \"house\"\narea = 150.0\n\n[prices]\nelec = 0.3\n\n\
                 [clustering]"
            )
            .unwrap();
        }

        let model_file = ModelFile::from_path(dir.path()).unwrap();
        assert_eq!(model_file.building.name, "house");
        assert_eq!(model_file.building.user, "all");
        assert_eq!(model_file.prices.elec, MoneyPerEnergy(0.3));
        assert_eq!(model_file.prices.gas, MoneyPerEnergy(0.0));
        assert_eq!(model_file.finance, FinanceParameters::default());
        assert_eq!(
            model_file.clustering,
            Some(ClusteringOptions { period_length: 24 })
        );

        // Invalid TOML
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "[building").unwrap();
        }
        assert!(ModelFile::from_path(dir.path()).is_err());
    }
}
