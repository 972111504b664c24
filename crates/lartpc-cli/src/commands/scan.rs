use crate::cli::{ConfigArgs, ScanArgs};
use crate::config::{GridOverrides, build_config};
use crate::error::{CliError, Result};
use crate::session::Session;
use crate::utils::progress::CliProgressHandler;
use lartpc::engine::config::ScanConfig;
use lartpc::engine::progress::ProgressReporter;
use lartpc::engine::state::ScanResult;
use lartpc::engine::stepping::SteppingEngine;
use lartpc::vis;
use lartpc::workflows::scan::ScanDriver;
use std::io;
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: ScanArgs, config_args: &ConfigArgs, interactive: bool) -> Result<()> {
    let grid = GridOverrides {
        theta_step: args.theta_step,
        phi_step: args.phi_step,
    };
    let app = build_config(config_args, &args.run, grid)?;
    if let Some(path) = &app.config_source {
        info!("Using configuration file {:?}", path);
    }
    let mut config = app.core_config;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut driver = prepare_driver(&mut config, interactive, &reporter)?;

    println!(
        "Scanning {} directions with {} at {} GeV...",
        config.grid.len(),
        config.source.particle,
        config.source.energy_gev
    );
    let result = driver.run_scan(&config.grid, config.source.energy_gev, &reporter)?;
    print_summary(&result);

    if driver.ignored_deposits() > 0 {
        warn!(
            "{} negative or NaN step deposits were ignored.",
            driver.ignored_deposits()
        );
    }

    if let Some(output) = &args.output {
        write_results(&result, output)?;
        println!("Results written to: {}", output.display());
    }

    if interactive {
        info!("Handing control to the interactive session.");
        let mut session = Session::new(driver, config.grid, config.source.energy_gev);
        session.run(io::stdin().lock(), io::stdout())?;
    }
    Ok(())
}

/// Sets up the stepping engine. Interactive runs also record trajectories and open the
/// default scene, so the viewer has tracks to draw.
fn prepare_driver(
    config: &mut ScanConfig,
    interactive: bool,
    reporter: &ProgressReporter,
) -> Result<ScanDriver<SteppingEngine>> {
    if interactive {
        config.engine.record_trajectories = true;
    }
    let engine = SteppingEngine::from_config(&config.engine);
    let mut driver = ScanDriver::setup(engine, config, reporter)?;
    if interactive {
        for command in vis::default_commands() {
            driver.apply_vis(&command)?;
        }
    }
    Ok(driver)
}

pub(crate) fn print_summary(result: &ScanResult) {
    println!(
        "Scan complete: {} grid points, {:.3} keV deposited in total.",
        result.len(),
        result.total_deposited_kev()
    );
    if let Some(max) = result.max_deposit() {
        println!("  Largest deposit: {}", max);
    }
}

pub(crate) fn write_results(result: &ScanResult, path: &Path) -> Result<()> {
    info!("Writing {} records to {:?}", result.len(), path);
    result.save_csv(path).map_err(|e| CliError::Output {
        path: path.to_path_buf(),
        source: e.into(),
    })
}
