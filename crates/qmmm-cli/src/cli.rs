use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The QMMM++ Developers",
    version,
    about = "QMMM++ CLI - Inspect QM/MM coupling setups: layer partitioning, backend selection and the per-step MM environment.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify atoms into QM layers and report the backend chosen for each layer.
    Inspect(InspectArgs),
    /// Run one environment update and print QM shifts and the MM point charges.
    Environment(EnvironmentArgs),
}

/// Inputs shared by every subcommand.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Path to the coupling configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path to the system snapshot (box, atoms, virtual sites) in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub system: PathBuf,

    /// Make a QM backend available, overriding the config file.
    /// Can be used multiple times. Example: --backend gamess --backend mopac
    #[arg(short, long = "backend", value_name = "NAME")]
    pub backends: Vec<String>,

    /// Override the electrostatic scale factor applied to MM charges.
    #[arg(long, value_name = "FLOAT")]
    pub scale_factor: Option<f64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S run.integrator=md-vv
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub setup: SetupArgs,
}

/// Arguments for the `environment` subcommand.
#[derive(Args, Debug)]
pub struct EnvironmentArgs {
    #[command(flatten)]
    pub setup: SetupArgs,

    /// Neighbor-search cutoff in nm.
    #[arg(long, required = true, value_name = "NM")]
    pub cutoff: f64,
}
