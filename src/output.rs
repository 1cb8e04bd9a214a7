//! The module responsible for writing output data to disk.
use crate::building::{Building, CompiledModel};
use crate::id::ComponentID;
use crate::solver::Solution;
use crate::units::Money;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "ems_opt_results";

/// The output file name for variable values
const VARIABLES_FILE_NAME: &str = "variables.csv";

/// The output file name for per-component results
const COMPONENTS_FILE_NAME: &str = "components.csv";

/// The output file name for the cost summary
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// Get the default output directory for the model in the specified directory
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // The last path component names the model; it must be valid UTF-8
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data
///
/// # Arguments
///
/// * `output_dir` - The output directory to create/overwrite
/// * `allow_overwrite` - Whether to delete and recreate the folder if it is non-empty
///
/// # Returns
///
/// True if the output dir contained existing data that was deleted, false if not, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
             Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir).context("Could not delete folder")?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// A row of the variables file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct VariableRow {
    name: String,
    value: f64,
}

/// A row of the components file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ComponentRow {
    comp_name: ComponentID,
    comp_type: String,
    current_size: f64,
    size: f64,
    invest: Money,
    purchase_subsidy: Money,
    annual_cost: Money,
    operate_subsidy: Money,
}

/// The row of the summary file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SummaryRow {
    status: String,
    objective: Money,
    annual_cost: Money,
    operation_cost: Money,
    total_revenue: Money,
    other_op_cost: Money,
}

/// An object for writing the results of a solved building to file
pub struct DataWriter {
    variables_writer: csv::Writer<File>,
    components_writer: csv::Writer<File>,
    summary_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            variables_writer: new_writer(VARIABLES_FILE_NAME)?,
            components_writer: new_writer(COMPONENTS_FILE_NAME)?,
            summary_writer: new_writer(SUMMARY_FILE_NAME)?,
        })
    }

    /// Write all results of a solve.
    ///
    /// If the solve failed, only the summary (with the solver's status) is written.
    pub fn write_results(
        &mut self,
        building: &Building,
        model: &CompiledModel,
        solution: &Solution,
    ) -> Result<()> {
        self.write_summary(model, solution)?;
        if solution.status.is_success() {
            self.write_variables(model, solution)?;
            self.write_components(building, model, solution)?;
        }

        Ok(())
    }

    /// Write the value of every variable to a CSV file
    pub fn write_variables(&mut self, model: &CompiledModel, solution: &Solution) -> Result<()> {
        for (name, value) in solution.iter_named(&model.problem) {
            let row = VariableRow {
                name: name.to_string(),
                value,
            };
            self.variables_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write sizes and costs of each component to a CSV file
    pub fn write_components(
        &mut self,
        building: &Building,
        model: &CompiledModel,
        solution: &Solution,
    ) -> Result<()> {
        for (id, vars) in &model.components {
            let component = &building.components[id];
            let operate_subsidy = model
                .operate_subsidies
                .get(id)
                .map_or(0.0, |payouts| solution.values(payouts.values()).iter().sum());
            let row = ComponentRow {
                comp_name: id.clone(),
                comp_type: component.comp_type.to_string(),
                current_size: component.current_size,
                size: solution.value(vars.size),
                invest: Money(solution.value(vars.invest)),
                purchase_subsidy: Money(
                    solution
                        .values(vars.purchase_subsidies.values())
                        .iter()
                        .sum(),
                ),
                annual_cost: Money(solution.value(vars.annual_cost)),
                operate_subsidy: Money(operate_subsidy),
            };
            self.components_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the building-level costs and the solver status to a CSV file
    pub fn write_summary(&mut self, model: &CompiledModel, solution: &Solution) -> Result<()> {
        let aggregates = &model.aggregates;
        let row = SummaryRow {
            status: solution.status.to_string(),
            objective: Money(solution.objective_value),
            annual_cost: Money(solution.value(aggregates.annual_cost)),
            operation_cost: Money(solution.value(aggregates.operation_cost)),
            total_revenue: Money(solution.value(aggregates.total_revenue)),
            other_op_cost: Money(solution.value(aggregates.other_op_cost)),
        };
        self.summary_writer.serialize(row)?;

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.variables_writer.flush()?;
        self.components_writer.flush()?;
        self.summary_writer.flush()?;

        Ok(())
    }
}
