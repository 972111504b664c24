//! # Visualization
//!
//! The optional side channel a scan may drive: toolkit-style `/vis/...` commands are parsed
//! into [`VisCommand`]s and handed to a [`Visualizer`], together with the primary trajectory
//! of every event. Nothing here renders; [`SceneRecorder`] keeps the resulting scene state.

use crate::core::geometry::DetectorGeometry;
use crate::engine::transport::Trajectory;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum VisError {
    #[error("Unknown visualization command '{0}'")]
    UnknownCommand(String),
    #[error("Invalid argument for {command}: {reason}")]
    InvalidArgument {
        command: &'static str,
        reason: String,
    },
    #[error("No viewer is open; issue /vis/open first")]
    NoViewer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VisCommand {
    /// `/vis/open <driver>`
    Open { driver: String },
    /// `/vis/viewer/set/viewpointThetaPhi <theta> <phi> [deg]`
    Viewpoint { theta_deg: f64, phi_deg: f64 },
    /// `/vis/drawVolume`
    DrawVolume,
    /// `/vis/scene/add/trajectories [smooth]`
    AddTrajectories { smooth: bool },
    /// `/vis/scene/add/hits`
    AddHits,
}

const OPEN: &str = "/vis/open";
const VIEWPOINT: &str = "/vis/viewer/set/viewpointThetaPhi";
const DRAW_VOLUME: &str = "/vis/drawVolume";
const ADD_TRAJECTORIES: &str = "/vis/scene/add/trajectories";
const ADD_HITS: &str = "/vis/scene/add/hits";

fn parse_angle(command: &'static str, token: Option<&str>) -> Result<f64, VisError> {
    let token = token.ok_or_else(|| VisError::InvalidArgument {
        command,
        reason: "expected two angles".into(),
    })?;
    token.parse().map_err(|_| VisError::InvalidArgument {
        command,
        reason: format!("'{token}' is not a number"),
    })
}

impl FromStr for VisCommand {
    type Err = VisError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let Some(path) = tokens.next() else {
            return Err(VisError::UnknownCommand(String::new()));
        };
        let args: Vec<&str> = tokens.collect();

        match path {
            OPEN => match args.as_slice() {
                [driver] => Ok(Self::Open {
                    driver: driver.to_string(),
                }),
                _ => Err(VisError::InvalidArgument {
                    command: OPEN,
                    reason: "expected exactly one driver name".into(),
                }),
            },
            VIEWPOINT => {
                if args.len() > 3 || (args.len() == 3 && args[2] != "deg") {
                    return Err(VisError::InvalidArgument {
                        command: VIEWPOINT,
                        reason: "only 'deg' is accepted as the angle unit".into(),
                    });
                }
                Ok(Self::Viewpoint {
                    theta_deg: parse_angle(VIEWPOINT, args.first().copied())?,
                    phi_deg: parse_angle(VIEWPOINT, args.get(1).copied())?,
                })
            }
            DRAW_VOLUME => Ok(Self::DrawVolume),
            ADD_TRAJECTORIES => match args.as_slice() {
                [] => Ok(Self::AddTrajectories { smooth: false }),
                ["smooth"] => Ok(Self::AddTrajectories { smooth: true }),
                other => Err(VisError::InvalidArgument {
                    command: ADD_TRAJECTORIES,
                    reason: format!("unsupported model '{}'", other.join(" ")),
                }),
            },
            ADD_HITS => Ok(Self::AddHits),
            other => Err(VisError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for VisCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { driver } => write!(f, "{OPEN} {driver}"),
            Self::Viewpoint { theta_deg, phi_deg } => {
                write!(f, "{VIEWPOINT} {theta_deg} {phi_deg}")
            }
            Self::DrawVolume => f.write_str(DRAW_VOLUME),
            Self::AddTrajectories { smooth: true } => write!(f, "{ADD_TRAJECTORIES} smooth"),
            Self::AddTrajectories { smooth: false } => f.write_str(ADD_TRAJECTORIES),
            Self::AddHits => f.write_str(ADD_HITS),
        }
    }
}

/// The scene set up for interactive runs: viewer looking down the beam axis, detector drawn,
/// smooth trajectories and hits overlaid.
pub fn default_commands() -> Vec<VisCommand> {
    vec![
        VisCommand::Open {
            driver: "TSGQT".to_string(),
        },
        VisCommand::Viewpoint {
            theta_deg: 90.0,
            phi_deg: 0.0,
        },
        VisCommand::DrawVolume,
        VisCommand::AddTrajectories { smooth: true },
        VisCommand::AddHits,
    ]
}

pub trait Visualizer {
    fn summary(&self) -> String;

    fn apply(
        &mut self,
        command: &VisCommand,
        geometry: Option<&DetectorGeometry>,
    ) -> Result<(), VisError>;

    fn add_trajectory(&mut self, trajectory: &Trajectory);
}

/// Records scene state instead of drawing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneRecorder {
    pub driver: Option<String>,
    pub viewpoint: Option<(f64, f64)>,
    pub volumes: Vec<String>,
    /// `Some(smooth)` once trajectories were added to the scene.
    pub trajectories: Option<bool>,
    pub hits: bool,
    pub trajectory_count: usize,
    pub trajectory_points: usize,
}

impl SceneRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Visualizer for SceneRecorder {
    fn summary(&self) -> String {
        format!(
            "driver = {}, viewpoint = {}, volumes = [{}], trajectories = {} ({} points), hits = {}",
            self.driver.as_deref().unwrap_or("none"),
            self.viewpoint
                .map(|(t, p)| format!("({t}, {p}) deg"))
                .unwrap_or_else(|| "default".to_string()),
            self.volumes.join(", "),
            self.trajectory_count,
            self.trajectory_points,
            if self.hits { "on" } else { "off" },
        )
    }

    fn apply(
        &mut self,
        command: &VisCommand,
        geometry: Option<&DetectorGeometry>,
    ) -> Result<(), VisError> {
        if let VisCommand::Open { driver } = command {
            info!(driver = %driver, "Viewer opened.");
            self.driver = Some(driver.clone());
            return Ok(());
        }
        if self.driver.is_none() {
            return Err(VisError::NoViewer);
        }
        match command {
            VisCommand::Open { .. } => {}
            VisCommand::Viewpoint { theta_deg, phi_deg } => {
                self.viewpoint = Some((*theta_deg, *phi_deg));
            }
            VisCommand::DrawVolume => {
                self.volumes = geometry
                    .map(|g| g.volumes_iter().map(|(_, v)| v.name.clone()).collect())
                    .unwrap_or_default();
            }
            VisCommand::AddTrajectories { smooth } => self.trajectories = Some(*smooth),
            VisCommand::AddHits => self.hits = true,
        }
        debug!(command = %command, "Visualization command applied.");
        Ok(())
    }

    fn add_trajectory(&mut self, trajectory: &Trajectory) {
        if self.driver.is_some() && self.trajectories.is_some() {
            self.trajectory_count += 1;
            self.trajectory_points += trajectory.points.len();
        }
    }
}
