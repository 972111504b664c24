mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod session;
mod utils;

use crate::cli::{Cli, Commands, ScanArgs};
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    // A bare invocation scans with defaults and then hands over to the session.
    let bare_invocation = std::env::args_os().len() <= 1;
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!("LArTPC angular scan v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let result = match cli.command {
        None => {
            info!("No subcommand given; running the default scan.");
            commands::scan::run(ScanArgs::default(), &cli.config, bare_invocation)
        }
        Some(Commands::Scan(args)) => {
            info!("Dispatching to 'scan' command.");
            commands::scan::run(args, &cli.config, false)
        }
        Some(Commands::Fire(args)) => {
            info!("Dispatching to 'fire' command.");
            commands::fire::run(args, &cli.config).map(|_| ())
        }
        Some(Commands::Materials(args)) => {
            info!("Dispatching to 'materials' command.");
            commands::materials::run(args)
        }
    };

    match &result {
        Ok(()) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }
    result
}
