use super::CliError;
use anyhow::Context;
use orbvis_core::domain::{ComputeRequest, PlotMode};
use orbvis_core::modules::execute_module;
use std::path::PathBuf;
use tracing::debug;

#[derive(clap::Args)]
pub(super) struct PlotArgs {
    /// Configuration file, JSON or KEY = VALUE text
    #[arg(long, short)]
    config: PathBuf,

    /// Numeric input document (JSON)
    #[arg(long, short)]
    input: PathBuf,

    /// Artifact directory, created when missing [default: current directory]
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// High-symmetry labels in path order, comma separated; overrides LABELS
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    labels: Option<Vec<String>>,
}

pub(super) fn run_plot_command(mode: PlotMode, args: PlotArgs) -> Result<i32, CliError> {
    let output_dir = match args.output_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to resolve the current directory")?,
    };

    let mut request = ComputeRequest::new(mode, args.config, args.input, output_dir);
    if let Some(labels) = args.labels {
        request = request.with_labels(labels);
    }
    debug!(mode = %mode, config = %request.config_path.display(), "running plot command");

    let artifacts = execute_module(&request).map_err(CliError::Compute)?;
    for artifact in &artifacts {
        println!("{}", request.output_dir.join(&artifact.relative_path).display());
    }
    println!("{} completed ({} artifacts).", mode, artifacts.len());
    Ok(0)
}
