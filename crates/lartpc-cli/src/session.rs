use crate::error::{CliError, Result};
use crate::utils::parser::{self, ParseError};
use lartpc::core::units::GEV;
use lartpc::engine::config::AngularGrid;
use lartpc::engine::progress::ProgressReporter;
use lartpc::engine::transport::TransportEngine;
use lartpc::vis::{VisCommand, VisError};
use lartpc::workflows::scan::ScanDriver;
use std::io::{BufRead, Write};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

const PROMPT: &str = "lartpc> ";

const HELP: &str = "\
Commands:
  /run/beamOn N                  fire N events with the current gun settings
  /gun/energy VALUE [UNIT]       set the kinetic energy (GeV when no unit is given)
  /gun/direction THETA PHI       set the incidence direction in degrees
  /scan/run                      repeat the angular scan at the current energy
  /vis/...                       visualization commands (open, viewer/set/viewpointThetaPhi,
                                 drawVolume, scene/add/trajectories, scene/add/hits)
  help                           show this text
  exit | quit                    leave the session
";

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for the list of commands.")]
    Unknown(String),
    #[error("Invalid argument for {command}: {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Quantity(#[from] ParseError),
    #[error(transparent)]
    Vis(#[from] VisError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    BeamOn(u64),
    GunEnergy { energy_gev: f64 },
    GunDirection { theta_deg: f64, phi_deg: f64 },
    ScanRun,
    Vis(VisCommand),
    Help,
    Exit,
}

fn parse_number<T: FromStr>(
    command: &'static str,
    token: Option<&str>,
) -> std::result::Result<T, CommandError> {
    let token = token.ok_or_else(|| CommandError::InvalidArgument {
        command,
        reason: "missing value".into(),
    })?;
    token.parse().map_err(|_| CommandError::InvalidArgument {
        command,
        reason: format!("'{token}' is not a valid number"),
    })
}

impl FromStr for SessionCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let line = line.trim();
        let (path, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match path {
            "/run/beamOn" => {
                let count: u64 = parse_number("/run/beamOn", rest.split_whitespace().next())?;
                if count == 0 {
                    return Err(CommandError::InvalidArgument {
                        command: "/run/beamOn",
                        reason: "event count must be at least 1".into(),
                    });
                }
                Ok(Self::BeamOn(count))
            }
            "/gun/energy" => Ok(Self::GunEnergy {
                energy_gev: parser::parse_energy(rest, GEV)? / GEV,
            }),
            "/gun/direction" => {
                let mut tokens = rest.split_whitespace();
                let theta_deg = parse_number("/gun/direction", tokens.next())?;
                let phi_deg = parse_number("/gun/direction", tokens.next())?;
                Ok(Self::GunDirection { theta_deg, phi_deg })
            }
            "/scan/run" => Ok(Self::ScanRun),
            "help" => Ok(Self::Help),
            "exit" | "quit" => Ok(Self::Exit),
            p if p.starts_with("/vis/") => Ok(Self::Vis(line.parse::<VisCommand>()?)),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Line-oriented control over a configured driver, entered after an interactive scan.
pub struct Session<E: TransportEngine> {
    driver: ScanDriver<E>,
    grid: AngularGrid,
    energy_gev: f64,
    theta_deg: f64,
    phi_deg: f64,
}

impl<E: TransportEngine> Session<E> {
    /// The gun starts on the beam axis (theta 90, phi 0) at `energy_gev`.
    pub fn new(driver: ScanDriver<E>, grid: AngularGrid, energy_gev: f64) -> Self {
        Self {
            driver,
            grid,
            energy_gev,
            theta_deg: 90.0,
            phi_deg: 0.0,
        }
    }

    pub fn driver(&self) -> &ScanDriver<E> {
        &self.driver
    }

    /// Reads commands until `exit`, `quit` or end of input. Bad commands are reported on
    /// `out` and the session continues; engine failures end it.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        writeln!(out, "Interactive session. Type 'help' for commands.")?;
        let mut lines = input.lines();
        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                writeln!(out)?;
                break;
            };
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            debug!(command = trimmed, "Session command.");

            match trimmed.parse::<SessionCommand>() {
                Ok(SessionCommand::Exit) => break,
                Ok(command) => self.execute(command, &mut out)?,
                Err(e) => writeln!(out, "{e}")?,
            }
        }
        info!("Interactive session closed.");
        Ok(())
    }

    fn execute<W: Write>(&mut self, command: SessionCommand, out: &mut W) -> Result<()> {
        match command {
            SessionCommand::BeamOn(count) => {
                self.driver.aim(self.theta_deg, self.phi_deg, self.energy_gev);
                let count = usize::try_from(count).unwrap_or(usize::MAX);
                for report in self.driver.beam_on(count)? {
                    writeln!(out, "{report}")?;
                }
            }
            SessionCommand::GunEnergy { energy_gev } => {
                self.energy_gev = energy_gev;
                writeln!(out, "Gun energy set to {energy_gev} GeV")?;
            }
            SessionCommand::GunDirection { theta_deg, phi_deg } => {
                self.theta_deg = theta_deg;
                self.phi_deg = phi_deg;
                writeln!(
                    out,
                    "Gun direction set to theta = {theta_deg} deg, phi = {phi_deg} deg"
                )?;
            }
            SessionCommand::ScanRun => {
                let reporter = ProgressReporter::new();
                let result = self.driver.run_scan(&self.grid, self.energy_gev, &reporter)?;
                for record in &result {
                    writeln!(out, "{record}")?;
                }
                writeln!(
                    out,
                    "Scan complete: {} grid points, {:.3} keV deposited in total.",
                    result.len(),
                    result.total_deposited_kev()
                )?;
            }
            SessionCommand::Vis(command) => match self.driver.apply_vis(&command) {
                Ok(()) => {
                    if let Some(vis) = self.driver.visualizer() {
                        writeln!(out, "{}", vis.summary())?;
                    }
                }
                Err(e) => writeln!(out, "{}", CliError::from(e))?,
            },
            SessionCommand::Help => write!(out, "{HELP}")?,
            SessionCommand::Exit => {}
        }
        Ok(())
    }
}
