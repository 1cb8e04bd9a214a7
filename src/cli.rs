//! The command line interface for the optimiser.
use crate::building::Building;
use crate::cluster::TimeCluster;
use crate::input::load_model;
use crate::log;
use crate::output::{DataWriter, create_output_directory, get_output_dir};
use crate::settings::Settings;
use crate::solver::{HighsSolver, Solver};
use ::log::{error, info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// The command line interface for the optimiser.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the run command
#[derive(Args)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to optimise over every hour even if the model defines representative periods
    #[arg(long)]
    pub no_clustering: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Optimise a building model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
        }
    }
}

/// Parse CLI arguments and start the optimiser
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Apply the model's clustering to the building, unless disabled
fn apply_clustering(
    building: Building,
    cluster: Option<TimeCluster>,
    disabled: bool,
) -> Result<Building> {
    match cluster {
        Some(_) if disabled => {
            info!("Ignoring representative periods; optimising over every hour");
            Ok(building)
        }
        Some(cluster) => building
            .clustered(&cluster)
            .context("Failed to apply representative periods."),
        None => Ok(building),
    }
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load(model_path).context("Failed to load settings.")?
    };

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path)?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(settings.log_level.as_str()), Some(output_path))
        .context("Failed to initialise logging.")?;

    // Load the model to run
    let (building, cluster) = load_model(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let building = apply_clustering(building, cluster, opts.no_clustering)?;
    let model = building
        .compile(&settings.compile)
        .context("Failed to compile model.")?;

    let solver = HighsSolver::new(settings.solver.clone());
    let solution = solver.solve(&model.problem)?;
    if solution.status.is_success() {
        info!(
            "Optimisation complete! Objective value: {}",
            solution.objective_value
        );
    } else {
        error!("Optimisation failed with status: {}", solution.status);
    }

    let mut writer = DataWriter::create(output_path)?;
    writer.write_results(&building, &model, &solution)?;
    writer.flush()?;

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load(model_path).context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(settings.log_level.as_str()), None)
        .context("Failed to initialise logging.")?;

    // Load/validate the model, including compiling it
    let (building, cluster) = load_model(model_path).context("Failed to validate model.")?;
    let building = apply_clustering(building, cluster, false)?;
    let model = building
        .compile(&settings.compile)
        .context("Failed to validate model.")?;
    info!(
        "Model validation successful! ({} variables, {} constraints)",
        model.problem.num_variables(),
        model.problem.num_constraints()
    );

    Ok(())
}
