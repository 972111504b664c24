use super::defaults::DefaultsConfig;
use super::file::{FileAngleRange, FileConfig, FileVolumeConfig};
use super::models::AppConfig;
use crate::cli::{ConfigArgs, RunOverrides};
use crate::error::{CliError, Result};
use directories::ProjectDirs;
use lartpc::core::geometry::VolumeSpec;
use lartpc::core::units::{M, MEV, MM};
use lartpc::engine::config::{self as core_config, AngleRange, AngularGrid};
use nalgebra::Vector3;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Grid steps given on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridOverrides {
    pub theta_step: Option<f64>,
    pub phi_step: Option<f64>,
}

/// The explicit `--config` path, or `config.toml` in the per-user configuration directory
/// when that file exists.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    ProjectDirs::from("org", "lartpc", "lartpc")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

pub fn build_config(
    config_args: &ConfigArgs,
    run: &RunOverrides,
    grid: GridOverrides,
) -> Result<AppConfig> {
    let config_source = discover_config_path(config_args.config.as_deref());
    let file_config = match &config_source {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    merge(file_config, config_source, config_args, run, grid)
}

fn merge(
    file_config: FileConfig,
    config_source: Option<PathBuf>,
    config_args: &ConfigArgs,
    run: &RunOverrides,
    grid: GridOverrides,
) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = apply_set_values(file_config, &config_args.set_values)?;

    let geometry_file = file_config.geometry.take().unwrap_or_default();
    let world = volume_spec(
        geometry_file.world.unwrap_or_default(),
        &defaults.world_name,
        &defaults.world_material,
        defaults.world_half_extent_m,
    );
    let detector = volume_spec(
        geometry_file.detector.unwrap_or_default(),
        &defaults.detector_name,
        &defaults.detector_material,
        defaults.detector_half_extent_m,
    );
    let detector_offset = geometry_file
        .detector_offset_m
        .map(|o| Vector3::from(o) * M)
        .unwrap_or_else(Vector3::zeros);

    let source_file = file_config.source.take().unwrap_or_default();
    let particle = run
        .particle
        .clone()
        .or(source_file.particle)
        .unwrap_or(defaults.particle);
    let energy_gev = run
        .energy
        .or(source_file.energy_gev)
        .unwrap_or(defaults.energy_gev);
    let launch_radius = run
        .launch_radius
        .or(source_file.launch_radius_m.map(|r| r * M))
        .unwrap_or(defaults.launch_radius_m * M);

    let scan_file = file_config.scan.take().unwrap_or_default();
    let theta = angle_range(scan_file.theta, defaults.theta, grid.theta_step)?;
    let phi = angle_range(scan_file.phi, defaults.phi, grid.phi_step)?;

    let engine_file = file_config.engine.take().unwrap_or_default();
    let engine = core_config::EngineConfig {
        physics_list: run
            .physics_list
            .clone()
            .or(engine_file.physics_list)
            .unwrap_or(defaults.physics_list),
        seed: run.seed.or(engine_file.seed),
        max_step: engine_file.max_step_mm.unwrap_or(defaults.max_step_mm) * MM,
        tracking_cut: engine_file
            .tracking_cut_mev
            .unwrap_or(defaults.tracking_cut_mev)
            * MEV,
        record_trajectories: engine_file.record_trajectories.unwrap_or(false),
    };

    let materials_path = run.materials_file.clone().or(file_config.materials_file);

    let core_config = core_config::ScanConfigBuilder::new()
        .world(world)
        .detector(detector)
        .detector_offset(detector_offset)
        .particle(&particle)
        .energy_gev(energy_gev)
        .launch_radius(launch_radius)
        .grid(AngularGrid::new(theta, phi))
        .engine(engine)
        .materials_path(materials_path)
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    debug!(?core_config, "Resolved scan configuration.");
    Ok(AppConfig {
        config_source,
        core_config,
    })
}

fn volume_spec(
    file: FileVolumeConfig,
    default_name: &str,
    default_material: &str,
    default_half_extent_m: f64,
) -> VolumeSpec {
    let half_extents = file
        .half_extents_m
        .map(Vector3::from)
        .unwrap_or_else(|| Vector3::repeat(default_half_extent_m))
        * M;
    VolumeSpec::new(
        file.name.as_deref().unwrap_or(default_name),
        half_extents,
        file.material.as_deref().unwrap_or(default_material),
    )
}

fn angle_range(
    file: Option<FileAngleRange>,
    (start, stop, step, inclusive): (f64, f64, f64, bool),
    step_override: Option<f64>,
) -> Result<AngleRange> {
    let file = file.unwrap_or_default();
    AngleRange::new(
        file.start.unwrap_or(start),
        file.stop.unwrap_or(stop),
        step_override.or(file.step).unwrap_or(step),
        file.inclusive.unwrap_or(inclusive),
    )
    .map_err(|e| CliError::Config(e.to_string()))
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();

        match key {
            "materials-file" => config.materials_file = Some(PathBuf::from(value.trim())),
            "geometry.world.material" | "geometry.detector.material" => {
                let geometry = config.geometry.get_or_insert_with(Default::default);
                let volume = if key == "geometry.world.material" {
                    &mut geometry.world
                } else {
                    &mut geometry.detector
                };
                volume.get_or_insert_with(Default::default).material =
                    Some(value.trim().to_string());
            }
            "source.particle" => {
                config.source.get_or_insert_with(Default::default).particle =
                    Some(value.trim().to_string());
            }
            "source.energy-gev" => {
                config.source.get_or_insert_with(Default::default).energy_gev =
                    Some(parse_value(key, value, "float")?);
            }
            "source.launch-radius-m" => {
                config
                    .source
                    .get_or_insert_with(Default::default)
                    .launch_radius_m = Some(parse_value(key, value, "float")?);
            }
            "scan.theta.step" => {
                config
                    .scan
                    .get_or_insert_with(Default::default)
                    .theta
                    .get_or_insert_with(Default::default)
                    .step = Some(parse_value(key, value, "float")?);
            }
            "scan.phi.step" => {
                config
                    .scan
                    .get_or_insert_with(Default::default)
                    .phi
                    .get_or_insert_with(Default::default)
                    .step = Some(parse_value(key, value, "float")?);
            }
            "engine.physics-list" => {
                config
                    .engine
                    .get_or_insert_with(Default::default)
                    .physics_list = Some(value.trim().to_string());
            }
            "engine.seed" => {
                config.engine.get_or_insert_with(Default::default).seed =
                    Some(parse_value(key, value, "integer")?);
            }
            "engine.max-step-mm" => {
                config.engine.get_or_insert_with(Default::default).max_step_mm =
                    Some(parse_value(key, value, "float")?);
            }
            "engine.tracking-cut-mev" => {
                config
                    .engine
                    .get_or_insert_with(Default::default)
                    .tracking_cut_mev = Some(parse_value(key, value, "float")?);
            }
            "engine.record-trajectories" => {
                config
                    .engine
                    .get_or_insert_with(Default::default)
                    .record_trajectories = Some(parse_value(key, value, "boolean")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
