//! The `gridplan` command line: run or validate a model, and manage examples and settings.
use crate::log;
use crate::model::Model;
use crate::output::metadata::write_metadata;
use crate::output::{create_output_directory, get_output_dir};
use crate::settings::Settings;
use crate::simulation;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
pub mod settings;
use example::ExampleSubcommands;
use settings::SettingsSubcommands;

/// Plan renewable, battery and thermal capacity for a state grid.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Print documentation for every command as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options shared by `run` and `example run`
#[derive(Args, Default)]
pub struct RunOpts {
    /// Write outputs here instead of to gridplan_results/<model name>
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Replace the contents of a non-empty output folder
    #[arg(long)]
    pub overwrite: bool,
    /// Also write the sizing model's inputs to CSV
    #[arg(long)]
    pub debug_model: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full planning pipeline for a model.
    Run {
        /// Folder containing model.toml and the input files it names.
        model_dir: PathBuf,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// List, inspect, extract or run the bundled example models.
    Example {
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Load a model and check its parameters and input files without running it.
    Validate {
        /// Folder containing model.toml and the input files it names.
        model_dir: PathBuf,
    },
    /// Inspect or edit the program settings file.
    Settings {
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

/// Parse command line arguments and dispatch to the chosen command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    match cli.command {
        Some(Commands::Run { model_dir, opts }) => handle_run_command(&model_dir, &opts, None),
        Some(Commands::Example { subcommand }) => subcommand.execute(),
        Some(Commands::Validate { model_dir }) => handle_validate_command(&model_dir, None),
        Some(Commands::Settings { subcommand }) => subcommand.execute(),
        None => {
            // No command given, so show what the options are
            Cli::command()
                .print_long_help()
                .context("Could not print help")?;
            Ok(())
        }
    }
}

/// Use the given settings or else read them from the settings file
fn settings_or_load(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Work out where outputs go and make sure the directory is ready to write to.
///
/// Returns the path and whether existing files in it will be overwritten.
fn prepare_output_dir(
    model_path: &Path,
    output_dir: Option<&Path>,
    allow_overwrite: bool,
) -> Result<(PathBuf, bool)> {
    let output_path = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => get_output_dir(model_path)?,
    };
    let overwriting = create_output_directory(&output_path, allow_overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    Ok((output_path, overwriting))
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = settings_or_load(settings)?.with_overrides(opts.overwrite, opts.debug_model);
    let (output_path, overwriting) =
        prepare_output_dir(model_path, opts.output_dir.as_deref(), settings.overwrite)?;

    log::init(Some(&settings.log_level), Some(&output_path))
        .context("Failed to initialise logging.")?;
    if overwriting {
        warn!("Existing files in {} will be overwritten", output_path.display());
    }

    let model = Model::from_path(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Writing results to {}", output_path.display());

    write_metadata(&output_path, &model).context("Failed to save metadata.")?;
    simulation::run(&model, &output_path, settings.debug_model)?;
    info!("Planning run complete");

    Ok(())
}

/// Handle the `validate` command.
///
/// No log files are written when validating.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = settings_or_load(settings)?;
    log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;

    let model = Model::from_path(model_path).context("Failed to validate model.")?;
    info!(
        "Model is valid: {} demand records, {} thermal generators",
        model.demand.len(),
        model.generators.len()
    );

    Ok(())
}
