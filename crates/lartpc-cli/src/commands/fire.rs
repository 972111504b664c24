use super::scan::write_results;
use crate::cli::{ConfigArgs, FireArgs};
use crate::config::{GridOverrides, build_config};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use lartpc::engine::progress::ProgressReporter;
use lartpc::engine::state::{ScanRecord, ScanResult};
use lartpc::engine::stepping::SteppingEngine;
use lartpc::workflows::scan::ScanDriver;
use tracing::info;

/// Fires `args.events` events from one direction and prints the deposit of each.
pub fn run(args: FireArgs, config_args: &ConfigArgs) -> Result<ScanResult> {
    let app = build_config(config_args, &args.run, GridOverrides::default())?;
    let config = app.core_config;
    let energy_gev = config.source.energy_gev;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let engine = SteppingEngine::from_config(&config.engine);
    let mut driver = ScanDriver::setup(engine, &config, &reporter)?;

    info!(
        theta_deg = args.theta,
        phi_deg = args.phi,
        energy_gev,
        events = args.events,
        "Firing fixed-direction run."
    );
    driver.aim(args.theta, args.phi, energy_gev);
    let reports = driver.beam_on(usize::try_from(args.events).unwrap_or(usize::MAX))?;

    let mut result = ScanResult::new();
    for report in &reports {
        println!("{}", report);
        result.push(ScanRecord {
            theta_deg: args.theta,
            phi_deg: args.phi,
            energy_gev,
            deposited_kev: report.deposited_kev(),
        });
    }

    if let Some(output) = &args.output {
        write_results(&result, output)?;
        println!("Results written to: {}", output.display());
    }
    Ok(result)
}
