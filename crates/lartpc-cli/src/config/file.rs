use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileVolumeConfig {
    pub name: Option<String>,
    pub material: Option<String>,
    pub half_extents_m: Option<[f64; 3]>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileGeometryConfig {
    pub world: Option<FileVolumeConfig>,
    pub detector: Option<FileVolumeConfig>,
    pub detector_offset_m: Option<[f64; 3]>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSourceConfig {
    pub particle: Option<String>,
    pub energy_gev: Option<f64>,
    pub launch_radius_m: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileAngleRange {
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub step: Option<f64>,
    pub inclusive: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileScanConfig {
    pub theta: Option<FileAngleRange>,
    pub phi: Option<FileAngleRange>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileEngineConfig {
    pub physics_list: Option<String>,
    pub seed: Option<u64>,
    pub max_step_mm: Option<f64>,
    pub tracking_cut_mev: Option<f64>,
    pub record_trajectories: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub geometry: Option<FileGeometryConfig>,
    pub source: Option<FileSourceConfig>,
    pub scan: Option<FileScanConfig>,
    pub engine: Option<FileEngineConfig>,
    pub materials_file: Option<PathBuf>,
}

impl FileConfig {
    /// Reads `path`. A relative `materials-file` is taken relative to the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if let (Some(materials), Some(dir)) = (config.materials_file.as_mut(), path.parent()) {
            if materials.is_relative() {
                *materials = dir.join(&*materials);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn full_file_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.toml");
        fs::write(
            &path,
            r#"
materials-file = "extra.toml"

[geometry]
detector-offset-m = [0.0, 0.0, 0.5]

[geometry.world]
material = "G4_Galactic"
half-extents-m = [3.0, 3.0, 3.0]

[geometry.detector]
name = "TPC"
material = "G4_lAr"

[source]
particle = "e-"
energy-gev = 2.5
launch-radius-m = 2.5

[scan.theta]
start = 0.0
stop = 90.0
step = 45.0
inclusive = true

[engine]
physics-list = "ionization-only"
seed = 42
max-step-mm = 5.0
record-trajectories = true
"#,
        )
        .unwrap();

        let config = FileConfig::from_file(&path).unwrap();
        let geometry = config.geometry.unwrap();
        assert_eq!(geometry.detector_offset_m, Some([0.0, 0.0, 0.5]));
        assert_eq!(
            geometry.world.unwrap().material.as_deref(),
            Some("G4_Galactic")
        );
        assert_eq!(geometry.detector.unwrap().name.as_deref(), Some("TPC"));
        let source = config.source.unwrap();
        assert_eq!(source.particle.as_deref(), Some("e-"));
        assert_eq!(source.energy_gev, Some(2.5));
        let theta = config.scan.unwrap().theta.unwrap();
        assert_eq!(theta.step, Some(45.0));
        let engine = config.engine.unwrap();
        assert_eq!(engine.seed, Some(42));
        assert_eq!(engine.record_trajectories, Some(true));
        assert_eq!(config.materials_file, Some(dir.path().join("extra.toml")));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[source]\nenergy = 3.0\n").unwrap();

        let err = FileConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        let err = FileConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        fs::write(&path, "").unwrap();
        let config = FileConfig::from_file(&path).unwrap();
        assert!(config.geometry.is_none());
        assert!(config.materials_file.is_none());
    }
}
