use super::geometry::DetectorGeometry;
use super::particles::{ParticleDefinition, ParticleTable};
use super::units::{DEG, GEV};
use super::utils::geometry::direction_from_spherical;
use nalgebra::{Point3, Unit, Vector3};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, PartialEq)]
pub enum SourceError {
    #[error(
        "Particle '{0}' is not defined in the particle table (known: {known})",
        known = ParticleTable::names().join(", ")
    )]
    UnknownParticle(String),

    #[error("Launch radius must be positive and finite, got {0} mm")]
    InvalidLaunchRadius(f64),

    #[error(
        "Launch radius {radius} mm must lie outside the detector bounding radius ({min} mm) and inside the world ({max} mm)"
    )]
    LaunchRadiusOutsideWindow { radius: f64, min: f64, max: f64 },
}

/// The primary-particle configuration the transport engine reads at the start of each event.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionParameters {
    pub particle: &'static ParticleDefinition,
    pub position: Point3<f64>,
    pub direction: Unit<Vector3<f64>>,
    /// Kinetic energy in MeV.
    pub kinetic_energy: f64,
}

/// Live handle to the emission parameters; the engine sees every update made through it.
pub type SharedEmission = Rc<RefCell<EmissionParameters>>;

/// Single-particle gun aimed at the origin from a sphere of fixed radius.
///
/// Multiplicity is one primary per event. The species and the radius are fixed at
/// construction; only direction, position and energy change afterwards.
#[derive(Debug, Clone)]
pub struct DirectionalSource {
    launch_radius: f64,
    emission: SharedEmission,
}

impl DirectionalSource {
    /// Creates the source with a placeholder configuration: travelling along +x from
    /// `(-launch_radius, 0, 0)` with `energy` MeV.
    pub fn new(particle: &str, launch_radius: f64, energy: f64) -> Result<Self, SourceError> {
        let particle = ParticleTable::find(particle)
            .ok_or_else(|| SourceError::UnknownParticle(particle.to_string()))?;
        if !(launch_radius.is_finite() && launch_radius > 0.0) {
            return Err(SourceError::InvalidLaunchRadius(launch_radius));
        }
        let emission = EmissionParameters {
            particle,
            position: Point3::new(-launch_radius, 0.0, 0.0),
            direction: Vector3::x_axis(),
            kinetic_energy: energy,
        };
        Ok(Self {
            launch_radius,
            emission: Rc::new(RefCell::new(emission)),
        })
    }

    pub fn launch_radius(&self) -> f64 {
        self.launch_radius
    }

    /// Handle to register with the transport engine.
    pub fn emission(&self) -> SharedEmission {
        Rc::clone(&self.emission)
    }

    pub fn current(&self) -> EmissionParameters {
        self.emission.borrow().clone()
    }

    /// Aims the source for the polar angle `theta_deg`, azimuth `phi_deg` and `energy_gev`.
    ///
    /// Angles are not clamped. The particle starts at `-dir * launch_radius` and travels
    /// along `dir`, through the origin.
    pub fn configure(&self, theta_deg: f64, phi_deg: f64, energy_gev: f64) {
        debug_assert!(energy_gev > 0.0, "emission energy must be positive");
        let direction = direction_from_spherical(theta_deg * DEG, phi_deg * DEG);
        let position = Point3::from(-direction.into_inner() * self.launch_radius);

        let mut emission = self.emission.borrow_mut();
        emission.direction = direction;
        emission.position = position;
        emission.kinetic_energy = energy_gev * GEV;
        trace!(theta_deg, phi_deg, energy_gev, "Source reconfigured.");
    }

    /// Checks that the launch sphere lies outside the detector and inside the world.
    pub fn check_fits(&self, geometry: &DetectorGeometry) -> Result<(), SourceError> {
        let min = geometry.detector_bounding_radius();
        let max = geometry.world_inner_radius();
        if self.launch_radius > min && self.launch_radius < max {
            Ok(())
        } else {
            Err(SourceError::LaunchRadiusOutsideWindow {
                radius: self.launch_radius,
                min,
                max,
            })
        }
    }
}
