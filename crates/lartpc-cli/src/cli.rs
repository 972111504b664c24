use crate::utils::parser;
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
    version,
    about = "LArTPC angular scan - fires single particles at a liquid-argon detector from a grid of incidence directions and reports the energy deposited per event.",
    after_help = "Run without any arguments to scan with the default configuration and then open an interactive session.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep the theta/phi grid, firing one event per grid point.
    Scan(ScanArgs),
    /// Fire events from a single direction.
    Fire(FireArgs),
    /// List the materials available to the geometry.
    Materials(MaterialsArgs),
}

/// Where the run configuration comes from, shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to a configuration file in TOML format.
    /// Defaults to config.toml in the per-user configuration directory, if present.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S engine.seed=42
    #[arg(short = 'S', long = "set", global = true, value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
}

/// Overrides common to every command that runs events.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOverrides {
    /// Primary particle species (e.g. mu-, e-, proton).
    #[arg(long, value_name = "NAME")]
    pub particle: Option<String>,

    /// Kinetic energy of the primary; a bare number is read as GeV (e.g. '25', '500 MeV').
    #[arg(short, long, value_name = "QUANTITY", value_parser = parser::energy_gev_arg)]
    pub energy: Option<f64>,

    /// Radius of the launch sphere; a bare number is read as metres (e.g. '1.9', '190 cm').
    #[arg(long, value_name = "QUANTITY", value_parser = parser::length_mm_arg)]
    pub launch_radius: Option<f64>,

    /// Physics list: FTFP_BERT (alias: standard) or ionization-only.
    #[arg(long, value_name = "NAME")]
    pub physics_list: Option<String>,

    /// Seed for the transport engine's random number generator.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// TOML file with additional material definitions.
    #[arg(long, value_name = "PATH")]
    pub materials_file: Option<PathBuf>,
}

/// Arguments for the `scan` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    #[command(flatten)]
    pub run: RunOverrides,

    /// Step of the polar angle grid, in degrees.
    #[arg(long, value_name = "DEG")]
    pub theta_step: Option<f64>,

    /// Step of the azimuth grid, in degrees.
    #[arg(long, value_name = "DEG")]
    pub phi_step: Option<f64>,

    /// Write the per-point results as CSV.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `fire` subcommand.
#[derive(Args, Debug, Clone)]
pub struct FireArgs {
    #[command(flatten)]
    pub run: RunOverrides,

    /// Polar angle from +z, in degrees.
    #[arg(long, default_value_t = 90.0, value_name = "DEG", allow_negative_numbers = true)]
    pub theta: f64,

    /// Azimuth from +x, in degrees.
    #[arg(long, default_value_t = 0.0, value_name = "DEG", allow_negative_numbers = true)]
    pub phi: f64,

    /// Number of events to fire.
    #[arg(
        short = 'n',
        long,
        default_value_t = 1,
        value_name = "INT",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub events: u64,

    /// Write one CSV row per event.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `materials` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct MaterialsArgs {
    /// TOML file with additional material definitions to include in the listing.
    #[arg(long, value_name = "PATH")]
    pub materials_file: Option<PathBuf>,
}
