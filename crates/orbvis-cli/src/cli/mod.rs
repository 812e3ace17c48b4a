mod commands;

use clap::Parser;
use orbvis_core::domain::{OrbvisError, PlotMode};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

pub fn run_from_env() -> i32 {
    match parse_and_dispatch(std::env::args().collect()) {
        Ok(code) => code,
        Err(error) => {
            let error = error.as_orbvis_error();
            eprintln!("{}", error.diagnostic_line());
            error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_logging(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// `RUST_LOG` applies when no `-v` is given; otherwise each `-v` raises the level.
/// Returns false when a global subscriber was already installed.
fn init_logging(verbose: u8) -> bool {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();
    if !installed {
        debug!(verbose, "tracing subscriber already installed, keeping it");
    }
    installed
}

#[derive(Parser)]
#[command(name = "orbvis", version, about = "Orbital-projected band structure and DOS preparation")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Rebuild the band path and write orbital-projected band data
    Band(commands::PlotArgs),
    /// Sum projected DOS per orbital group and write the curves
    Dos(commands::PlotArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Band(args) => commands::run_plot_command(PlotMode::Band, args),
        CliCommand::Dos(args) => commands::run_plot_command(PlotMode::Dos, args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(OrbvisError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_orbvis_error(&self) -> OrbvisError {
        match self {
            Self::Usage(message) => {
                OrbvisError::input_validation("INPUT.CLI_USAGE", message.clone())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => OrbvisError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
