use crate::core::geometry::VolumeSpec;
use crate::core::units::{GEV, M, MEV, MM};
use nalgebra::Vector3;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

const ANGLE_TOLERANCE: f64 = 1e-9;
const MAX_ANGLES_PER_AXIS: usize = 100_000;

/// An arithmetic progression of angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleRange {
    start: f64,
    stop: f64,
    step: f64,
    inclusive: bool,
}

impl AngleRange {
    /// `start, start + step, …` up to `stop`, which is included only when `inclusive` is set.
    pub fn new(start: f64, stop: f64, step: f64, inclusive: bool) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidParameter {
            name: "angle_range",
            reason,
        };
        if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
            return Err(invalid("bounds and step must be finite".into()));
        }
        if step <= 0.0 {
            return Err(invalid(format!("step must be positive, got {step}")));
        }
        if stop < start {
            return Err(invalid(format!("stop ({stop}) is below start ({start})")));
        }
        let span = (stop - start) / step;
        if !(span.is_finite() && span < MAX_ANGLES_PER_AXIS as f64) {
            return Err(invalid(format!(
                "step {step} yields more than {MAX_ANGLES_PER_AXIS} angles"
            )));
        }
        let range = Self {
            start,
            stop,
            step,
            inclusive,
        };
        if range.len() == 0 {
            return Err(invalid(format!("[{start}, {stop}) contains no angles")));
        }
        Ok(range)
    }

    /// A range holding the single angle `value`.
    pub fn single(value: f64) -> Self {
        Self {
            start: value,
            stop: value,
            step: 1.0,
            inclusive: true,
        }
    }

    pub fn len(&self) -> usize {
        let span = (self.stop - self.start) / self.step;
        let whole = (span + ANGLE_TOLERANCE).floor();
        let lands_on_stop = (span - whole).abs() < ANGLE_TOLERANCE;
        match (self.inclusive, lands_on_stop) {
            (true, _) => whole as usize + 1,
            (false, true) => whole as usize,
            (false, false) => whole as usize + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |i| self.start + i as f64 * self.step)
    }
}

/// The theta × phi grid of a scan. Traversal is theta-major: outer loop theta ascending,
/// inner loop phi ascending.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularGrid {
    pub theta: AngleRange,
    pub phi: AngleRange,
}

impl AngularGrid {
    pub fn new(theta: AngleRange, phi: AngleRange) -> Self {
        Self { theta, phi }
    }

    /// theta ∈ {0, 30, …, 180}, phi ∈ {0, 30, …, 330}: 84 points.
    pub fn standard() -> Self {
        Self {
            theta: AngleRange {
                start: 0.0,
                stop: 180.0,
                step: 30.0,
                inclusive: true,
            },
            phi: AngleRange {
                start: 0.0,
                stop: 360.0,
                step: 30.0,
                inclusive: false,
            },
        }
    }

    pub fn single(theta_deg: f64, phi_deg: f64) -> Self {
        Self {
            theta: AngleRange::single(theta_deg),
            phi: AngleRange::single(phi_deg),
        }
    }

    pub fn len(&self) -> usize {
        self.theta.len().saturating_mul(self.phi.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.theta
            .values()
            .flat_map(move |theta| self.phi.values().map(move |phi| (theta, phi)))
    }
}

impl Default for AngularGrid {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryConfig {
    pub world: VolumeSpec,
    pub detector: VolumeSpec,
    pub detector_offset: Vector3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub particle: String,
    pub energy_gev: f64,
    /// Launch-sphere radius in mm.
    pub launch_radius: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub physics_list: String,
    pub seed: Option<u64>,
    /// Upper bound on a single step, in mm.
    pub max_step: f64,
    /// Kinetic energy (MeV) below which a track is stopped and its energy deposited locally.
    pub tracking_cut: f64,
    pub record_trajectories: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            physics_list: "FTFP_BERT".to_string(),
            seed: None,
            max_step: 10.0 * MM,
            tracking_cut: 1.0 * MEV,
            record_trajectories: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub geometry: GeometryConfig,
    pub source: SourceConfig,
    pub grid: AngularGrid,
    pub engine: EngineConfig,
    pub materials_path: Option<PathBuf>,
}

impl ScanConfig {
    /// World of air 2 m half-extent, centred liquid-argon box of 1 m half-extent, 1 GeV mu-.
    pub fn reference() -> Self {
        Self {
            geometry: GeometryConfig {
                world: VolumeSpec::new("World", Vector3::repeat(2.0 * M), "G4_AIR"),
                detector: VolumeSpec::new("LArBox", Vector3::repeat(1.0 * M), "G4_lAr"),
                detector_offset: Vector3::zeros(),
            },
            source: SourceConfig {
                particle: "mu-".to_string(),
                energy_gev: 1.0,
                launch_radius: 1.9 * M,
            },
            grid: AngularGrid::standard(),
            engine: EngineConfig::default(),
            materials_path: None,
        }
    }

    /// Initial kinetic energy in internal units.
    pub fn energy(&self) -> f64 {
        self.source.energy_gev * GEV
    }
}

#[derive(Default)]
pub struct ScanConfigBuilder {
    world: Option<VolumeSpec>,
    detector: Option<VolumeSpec>,
    detector_offset: Option<Vector3<f64>>,
    particle: Option<String>,
    energy_gev: Option<f64>,
    launch_radius: Option<f64>,
    grid: Option<AngularGrid>,
    engine: Option<EngineConfig>,
    materials_path: Option<PathBuf>,
}

impl ScanConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn world(mut self, spec: VolumeSpec) -> Self {
        self.world = Some(spec);
        self
    }
    pub fn detector(mut self, spec: VolumeSpec) -> Self {
        self.detector = Some(spec);
        self
    }
    pub fn detector_offset(mut self, offset: Vector3<f64>) -> Self {
        self.detector_offset = Some(offset);
        self
    }
    pub fn particle(mut self, name: &str) -> Self {
        self.particle = Some(name.to_string());
        self
    }
    pub fn energy_gev(mut self, energy: f64) -> Self {
        self.energy_gev = Some(energy);
        self
    }
    pub fn launch_radius(mut self, radius: f64) -> Self {
        self.launch_radius = Some(radius);
        self
    }
    pub fn grid(mut self, grid: AngularGrid) -> Self {
        self.grid = Some(grid);
        self
    }
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = Some(engine);
        self
    }
    pub fn materials_path(mut self, path: Option<PathBuf>) -> Self {
        self.materials_path = path;
        self
    }

    pub fn build(self) -> Result<ScanConfig, ConfigError> {
        let energy_gev = self
            .energy_gev
            .ok_or(ConfigError::MissingParameter("energy_gev"))?;
        if !(energy_gev.is_finite() && energy_gev > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "energy_gev",
                reason: format!("must be positive and finite, got {energy_gev}"),
            });
        }

        let engine = self.engine.unwrap_or_default();
        if !(engine.max_step.is_finite() && engine.max_step > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "max_step",
                reason: format!("must be positive and finite, got {}", engine.max_step),
            });
        }
        if !(engine.tracking_cut.is_finite() && engine.tracking_cut >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "tracking_cut",
                reason: format!("must be non-negative, got {}", engine.tracking_cut),
            });
        }

        let geometry = GeometryConfig {
            world: self.world.ok_or(ConfigError::MissingParameter("world"))?,
            detector: self
                .detector
                .ok_or(ConfigError::MissingParameter("detector"))?,
            detector_offset: self.detector_offset.unwrap_or_else(Vector3::zeros),
        };
        let source = SourceConfig {
            particle: self
                .particle
                .ok_or(ConfigError::MissingParameter("particle"))?,
            energy_gev,
            launch_radius: self
                .launch_radius
                .ok_or(ConfigError::MissingParameter("launch_radius"))?,
        };
        Ok(ScanConfig {
            geometry,
            source,
            grid: self.grid.ok_or(ConfigError::MissingParameter("grid"))?,
            engine,
            materials_path: self.materials_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod angle_range {
        use super::*;

        #[test]
        fn inclusive_theta_range_has_seven_values() {
            let range = AngleRange::new(0.0, 180.0, 30.0, true).unwrap();
            let values: Vec<f64> = range.values().collect();
            assert_eq!(values, vec![0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 180.0]);
        }

        #[test]
        fn exclusive_phi_range_stops_before_full_turn() {
            let range = AngleRange::new(0.0, 360.0, 30.0, false).unwrap();
            assert_eq!(range.len(), 12);
            assert_eq!(range.values().last(), Some(330.0));
        }

        #[test]
        fn step_not_dividing_span_keeps_last_value_below_stop() {
            let range = AngleRange::new(0.0, 100.0, 30.0, true).unwrap();
            let values: Vec<f64> = range.values().collect();
            assert_eq!(values, vec![0.0, 30.0, 60.0, 90.0]);
            let exclusive = AngleRange::new(0.0, 100.0, 30.0, false).unwrap();
            assert_eq!(exclusive.len(), 4);
        }

        #[test]
        fn single_value_range_has_one_value() {
            let values: Vec<f64> = AngleRange::single(90.0).values().collect();
            assert_eq!(values, vec![90.0]);
        }

        #[test]
        fn rejects_non_positive_step_and_reversed_bounds() {
            assert!(AngleRange::new(0.0, 180.0, 0.0, true).is_err());
            assert!(AngleRange::new(0.0, 180.0, -30.0, true).is_err());
            assert!(AngleRange::new(180.0, 0.0, 30.0, true).is_err());
        }

        #[test]
        fn rejects_empty_exclusive_range() {
            let result = AngleRange::new(45.0, 45.0, 30.0, false);
            assert!(matches!(
                result,
                Err(ConfigError::InvalidParameter { name: "angle_range", .. })
            ));
        }

        #[test]
        fn rejects_steps_too_fine_to_enumerate() {
            for step in [1e-310, 1e-12, 1e-3] {
                assert!(matches!(
                    AngleRange::new(0.0, 180.0, step, true),
                    Err(ConfigError::InvalidParameter { name: "angle_range", .. })
                ));
            }
            let fine = AngleRange::new(0.0, 180.0, 0.01, true).unwrap();
            assert_eq!(fine.len(), 18_001);
        }
    }

    mod angular_grid {
        use super::*;

        #[test]
        fn standard_grid_has_84_points_in_theta_major_order() {
            let grid = AngularGrid::standard();
            let points: Vec<(f64, f64)> = grid.points().collect();
            assert_eq!(grid.len(), 84);
            assert_eq!(points.len(), 84);
            assert_eq!(points[0], (0.0, 0.0));
            assert_eq!(points[1], (0.0, 30.0));
            assert_eq!(points[11], (0.0, 330.0));
            assert_eq!(points[12], (30.0, 0.0));
            assert_eq!(points[83], (180.0, 330.0));
        }

        #[test]
        fn single_grid_yields_one_point() {
            let points: Vec<_> = AngularGrid::single(90.0, 0.0).points().collect();
            assert_eq!(points, vec![(90.0, 0.0)]);
        }
    }

    mod builder {
        use super::*;

        fn complete() -> ScanConfigBuilder {
            let reference = ScanConfig::reference();
            ScanConfigBuilder::new()
                .world(reference.geometry.world)
                .detector(reference.geometry.detector)
                .particle("mu-")
                .energy_gev(25.0)
                .launch_radius(1.9 * M)
                .grid(AngularGrid::standard())
        }

        #[test]
        fn build_succeeds_with_all_required_parameters() {
            let config = complete().build().unwrap();
            assert_eq!(config.source.energy_gev, 25.0);
            assert_eq!(config.geometry.detector_offset, Vector3::zeros());
            assert_eq!(config.engine, EngineConfig::default());
            assert_eq!(config.energy(), 25.0 * GEV);
        }

        #[test]
        fn build_fails_without_particle() {
            let reference = ScanConfig::reference();
            let result = ScanConfigBuilder::new()
                .world(reference.geometry.world)
                .detector(reference.geometry.detector)
                .energy_gev(1.0)
                .launch_radius(1.9 * M)
                .grid(AngularGrid::standard())
                .build();
            assert_eq!(result.unwrap_err(), ConfigError::MissingParameter("particle"));
        }

        #[test]
        fn build_fails_without_grid() {
            let reference = ScanConfig::reference();
            let result = ScanConfigBuilder::new()
                .world(reference.geometry.world)
                .detector(reference.geometry.detector)
                .particle("mu-")
                .energy_gev(1.0)
                .launch_radius(1.9 * M)
                .build();
            assert_eq!(result.unwrap_err(), ConfigError::MissingParameter("grid"));
        }

        #[test]
        fn build_rejects_non_positive_energy() {
            let result = complete().energy_gev(0.0).build();
            assert!(matches!(
                result,
                Err(ConfigError::InvalidParameter { name: "energy_gev", .. })
            ));
        }

        #[test]
        fn build_rejects_zero_max_step() {
            let engine = EngineConfig {
                max_step: 0.0,
                ..EngineConfig::default()
            };
            let result = complete().engine(engine).build();
            assert!(matches!(
                result,
                Err(ConfigError::InvalidParameter { name: "max_step", .. })
            ));
        }
    }
}
