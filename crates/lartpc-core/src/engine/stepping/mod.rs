//! A compact transport engine: straight-line steps through the registered boxes with
//! continuous ionization loss and, for the full physics list, multiple scattering.
//!
//! It is a stand-in for a full toolkit and makes no attempt at secondary production.

pub mod physics;

use super::config::EngineConfig;
use super::error::EngineError;
use super::transport::{
    EngineRegistry, EventCallback, EventId, PhysicsList, Registered, Step, SteppingCallback,
    Trajectory, TransportEngine,
};
use crate::core::geometry::DetectorGeometry;
use crate::core::source::SharedEmission;
use crate::core::utils::geometry::deflect;
use nalgebra::Point3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, instrument, trace};

/// How far past a surface a boundary-limited step lands, in mm.
const BOUNDARY_PUSH: f64 = 1.0e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct SteppingConfig {
    pub max_step: f64,
    pub tracking_cut: f64,
    pub energy_loss_spread: f64,
    pub record_trajectories: bool,
    pub seed: Option<u64>,
    /// An event whose primary needs more steps than this is aborted.
    pub max_steps_per_event: usize,
}

impl Default for SteppingConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for SteppingConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_step: config.max_step,
            tracking_cut: config.tracking_cut,
            energy_loss_spread: physics::ENERGY_LOSS_SPREAD,
            record_trajectories: config.record_trajectories,
            seed: config.seed,
            max_steps_per_event: 1_000_000,
        }
    }
}

pub struct SteppingEngine {
    registry: EngineRegistry,
    config: SteppingConfig,
    rng: StdRng,
    next_event: EventId,
    last_trajectory: Option<Trajectory>,
}

impl SteppingEngine {
    pub fn new(config: SteppingConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            registry: EngineRegistry::new(),
            config,
            rng,
            next_event: 0,
            last_trajectory: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(SteppingConfig::from(config))
    }

    pub fn config(&self) -> &SteppingConfig {
        &self.config
    }

    pub fn events_processed(&self) -> u64 {
        self.next_event
    }
}

impl TransportEngine for SteppingEngine {
    fn register_geometry(&mut self, geometry: DetectorGeometry) -> Result<(), EngineError> {
        self.registry.register_geometry(geometry)
    }

    fn register_physics(&mut self, physics: PhysicsList) -> Result<(), EngineError> {
        self.registry.register_physics(physics)
    }

    fn register_emitter(&mut self, emission: SharedEmission) -> Result<(), EngineError> {
        self.registry.register_emitter(emission)
    }

    fn register_stepping_callback(
        &mut self,
        callback: SteppingCallback,
    ) -> Result<(), EngineError> {
        self.registry.register_stepping_callback(callback)
    }

    fn register_event_callbacks(
        &mut self,
        on_begin: EventCallback,
        on_end: EventCallback,
    ) -> Result<(), EngineError> {
        self.registry.register_event_callbacks(on_begin, on_end)
    }

    fn initialize(&mut self) -> Result<(), EngineError> {
        self.registry.initialize()?;
        debug!(
            max_step = self.config.max_step,
            tracking_cut = self.config.tracking_cut,
            seed = ?self.config.seed,
            "Stepping engine ready."
        );
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    fn simulate_event(&mut self, count: usize) -> Result<(), EngineError> {
        for _ in 0..count {
            let event_id = self.next_event;
            let mut view = self.registry.registered()?;
            view.callbacks.begin(event_id);
            let points = track_primary(&mut view, &self.config, &mut self.rng, event_id)?;
            view.callbacks.end(event_id);
            self.next_event += 1;
            if self.config.record_trajectories {
                self.last_trajectory = Some(Trajectory { event_id, points });
            }
        }
        Ok(())
    }

    fn geometry(&self) -> Option<&DetectorGeometry> {
        self.registry.geometry()
    }

    fn last_trajectory(&self) -> Option<&Trajectory> {
        self.last_trajectory.as_ref()
    }
}

/// Transports the primary until it stops or leaves the world, returning the visited
/// points when trajectories are recorded.
fn track_primary(
    view: &mut Registered<'_>,
    config: &SteppingConfig,
    rng: &mut StdRng,
    event_id: EventId,
) -> Result<Vec<Point3<f64>>, EngineError> {
    let geometry = view.geometry;
    let emission = view.emitter.borrow().clone();
    let particle = emission.particle;
    let mut position = emission.position;
    let mut direction = emission.direction;
    let mut energy = emission.kinetic_energy;

    let mut points = Vec::new();
    if config.record_trajectories {
        points.push(position);
    }

    for _ in 0..config.max_steps_per_event {
        let Some(volume_id) = geometry.locate(&position) else {
            return Ok(points);
        };
        let volume = geometry.volume(volume_id).ok_or_else(|| {
            EngineError::Internal("located volume is missing from the geometry".into())
        })?;

        let boundary = geometry.next_boundary(&position, &direction, volume_id);
        let (length, crosses_boundary) = if boundary <= config.max_step {
            (boundary, true)
        } else {
            (config.max_step, false)
        };

        let mean = physics::mean_energy_loss(&volume.material, particle, length);
        let mut deposit =
            physics::sample_energy_loss(mean, config.energy_loss_spread, rng).min(energy);
        energy -= deposit;
        if energy <= config.tracking_cut {
            deposit += energy;
            energy = 0.0;
        }

        let travel = if crosses_boundary {
            length + BOUNDARY_PUSH
        } else {
            length
        };
        let post = position + direction.into_inner() * travel;
        let step = Step {
            event_id,
            volume: volume_id,
            pre_position: position,
            post_position: post,
            energy_deposit: deposit,
            kinetic_energy: energy,
        };
        trace!(volume = %volume.name, length, deposit, energy, "Step.");
        view.callbacks.step(&step);

        position = post;
        if config.record_trajectories {
            points.push(position);
        }
        if energy <= 0.0 {
            return Ok(points);
        }

        if view.physics.has_multiple_scattering() {
            let width = physics::highland_width(&volume.material, particle, energy, length);
            if width > 0.0 {
                let (polar, azimuth) = physics::sample_deflection(width, rng);
                direction = deflect(&direction, polar, azimuth);
            }
        }
    }

    Err(EngineError::EventAborted {
        event_id,
        reason: format!(
            "primary exceeded the limit of {} steps",
            config.max_steps_per_event
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{VolumeSpec, build_geometry};
    use crate::core::materials::MaterialDatabase;
    use crate::core::source::DirectionalSource;
    use crate::core::units::{GEV, M, MEV};
    use nalgebra::Vector3;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn geometry() -> DetectorGeometry {
        build_geometry(
            VolumeSpec::new("World", Vector3::repeat(2.0 * M), "G4_AIR"),
            VolumeSpec::new("LArBox", Vector3::repeat(1.0 * M), "G4_lAr"),
            &MaterialDatabase::new(),
        )
        .unwrap()
    }

    fn quiet_config() -> SteppingConfig {
        SteppingConfig {
            energy_loss_spread: 0.0,
            seed: Some(11),
            ..SteppingConfig::default()
        }
    }

    /// Registers everything, aims along +x and collects every step.
    fn prepared(
        mut engine: SteppingEngine,
        particle: &str,
        energy: f64,
        physics: PhysicsList,
    ) -> (SteppingEngine, Rc<RefCell<Vec<Step>>>, DirectionalSource) {
        let source = DirectionalSource::new(particle, 1.9 * M, energy).unwrap();
        let steps = Rc::new(RefCell::new(Vec::new()));
        let sink = steps.clone();
        engine.register_geometry(geometry()).unwrap();
        engine.register_physics(physics).unwrap();
        engine.register_emitter(source.emission()).unwrap();
        engine
            .register_stepping_callback(Box::new(move |s: &Step| sink.borrow_mut().push(*s)))
            .unwrap();
        engine.initialize().unwrap();
        (engine, steps, source)
    }

    fn total_deposit(steps: &[Step]) -> f64 {
        steps.iter().map(|s| s.energy_deposit).sum()
    }

    #[test]
    fn simulate_before_initialize_fails() {
        let mut engine = SteppingEngine::new(quiet_config());
        assert!(matches!(
            engine.simulate_event(1),
            Err(EngineError::NotInitialized)
        ));
    }

    #[test]
    fn gev_muon_along_x_deposits_ionization_of_two_metres_of_argon() {
        let (mut engine, steps, _) = prepared(
            SteppingEngine::new(quiet_config()),
            "mu-",
            1.0 * GEV,
            PhysicsList::IonizationOnly,
        );
        engine.simulate_event(1).unwrap();

        let steps = steps.borrow();
        let detector = engine.geometry().unwrap().detector();
        let in_argon: f64 = steps
            .iter()
            .filter(|s| s.volume == detector)
            .map(|s| s.energy_deposit)
            .sum();
        assert!((in_argon - 421.0336 * MEV).abs() < 0.01, "argon deposit {in_argon}");
        let total = total_deposit(&steps);
        assert!(total > 421.0 && total < 422.0, "total deposit {total}");
    }

    #[test]
    fn steps_never_exceed_max_step() {
        let config = quiet_config();
        let limit = config.max_step + BOUNDARY_PUSH;
        let (mut engine, steps, _) =
            prepared(SteppingEngine::new(config), "mu-", 1.0 * GEV, PhysicsList::FtfpBert);
        engine.simulate_event(1).unwrap();
        assert!(steps.borrow().iter().all(|s| s.length() <= limit + 1e-9));
    }

    #[test]
    fn stopping_proton_deposits_all_of_its_energy() {
        let (mut engine, steps, _) = prepared(
            SteppingEngine::new(quiet_config()),
            "proton",
            100.0 * MEV,
            PhysicsList::IonizationOnly,
        );
        engine.simulate_event(1).unwrap();
        let steps = steps.borrow();
        assert!((total_deposit(&steps) - 100.0 * MEV).abs() < 1e-9);
        let last = steps.last().unwrap();
        assert_eq!(last.kinetic_energy, 0.0);
        assert_eq!(last.volume, engine.geometry().unwrap().detector());
    }

    #[test]
    fn track_below_tracking_cut_deposits_everything_in_one_step() {
        let (mut engine, steps, _) = prepared(
            SteppingEngine::new(quiet_config()),
            "proton",
            0.5 * MEV,
            PhysicsList::IonizationOnly,
        );
        engine.simulate_event(1).unwrap();
        let steps = steps.borrow();
        assert_eq!(steps.len(), 1);
        assert!((steps[0].energy_deposit - 0.5 * MEV).abs() < 1e-12);
    }

    #[test]
    fn geantino_crosses_without_depositing() {
        let (mut engine, steps, _) = prepared(
            SteppingEngine::new(quiet_config()),
            "geantino",
            1.0 * GEV,
            PhysicsList::FtfpBert,
        );
        engine.simulate_event(1).unwrap();
        let steps = steps.borrow();
        assert!(!steps.is_empty());
        assert_eq!(total_deposit(&steps), 0.0);
        let exit = steps.last().unwrap().post_position;
        assert!(exit.x > 2.0 * M);
        assert!(exit.y.abs() < 1e-9 && exit.z.abs() < 1e-9);
    }

    #[test]
    fn event_callbacks_bracket_the_steps_and_ids_increase() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut engine = SteppingEngine::new(quiet_config());
        let source = DirectionalSource::new("mu-", 1.9 * M, GEV).unwrap();
        let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
        engine.register_geometry(geometry()).unwrap();
        engine.register_physics(PhysicsList::IonizationOnly).unwrap();
        engine.register_emitter(source.emission()).unwrap();
        engine
            .register_stepping_callback(Box::new(move |s: &Step| {
                l1.borrow_mut().push(format!("step {}", s.event_id))
            }))
            .unwrap();
        engine
            .register_event_callbacks(
                Box::new(move |id| l2.borrow_mut().push(format!("begin {id}"))),
                Box::new(move |id| l3.borrow_mut().push(format!("end {id}"))),
            )
            .unwrap();
        engine.initialize().unwrap();
        engine.simulate_event(2).unwrap();

        let log = log.borrow();
        assert_eq!(log.first().unwrap(), "begin 0");
        assert_eq!(log.last().unwrap(), "end 1");
        let end0 = log.iter().position(|l| l == "end 0").unwrap();
        let begin1 = log.iter().position(|l| l == "begin 1").unwrap();
        assert_eq!(begin1, end0 + 1);
        assert!(log[1..end0].iter().all(|l| l == "step 0"));
        assert!(log[begin1 + 1..log.len() - 1].iter().all(|l| l == "step 1"));
        assert_eq!(engine.events_processed(), 2);
    }

    #[test]
    fn emitter_updates_are_seen_by_the_next_event() {
        let (mut engine, steps, source) = prepared(
            SteppingEngine::new(quiet_config()),
            "geantino",
            1.0 * GEV,
            PhysicsList::IonizationOnly,
        );
        source.configure(0.0, 0.0, 1.0);
        engine.simulate_event(1).unwrap();
        let steps = steps.borrow();
        let first = steps.first().unwrap();
        assert!((first.pre_position.z + 1.9 * M).abs() < 1e-9);
        assert!(steps.last().unwrap().post_position.z > 2.0 * M);
    }

    #[test]
    fn same_seed_reproduces_the_same_event() {
        let run = || {
            let config = SteppingConfig {
                seed: Some(2024),
                ..SteppingConfig::default()
            };
            let (mut engine, steps, _) =
                prepared(SteppingEngine::new(config), "mu-", 1.0 * GEV, PhysicsList::FtfpBert);
            engine.simulate_event(1).unwrap();
            steps.take()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn multiple_scattering_bends_the_track() {
        let config = SteppingConfig {
            record_trajectories: true,
            ..quiet_config()
        };
        let (mut engine, _, _) =
            prepared(SteppingEngine::new(config), "mu-", 1.0 * GEV, PhysicsList::FtfpBert);
        engine.simulate_event(1).unwrap();
        let trajectory = engine.last_trajectory().unwrap();
        let last = trajectory.points.last().unwrap();
        assert!(last.y.abs() + last.z.abs() > 1e-6);
    }

    #[test]
    fn recorded_trajectory_starts_at_the_launch_point() {
        let config = SteppingConfig {
            record_trajectories: true,
            ..quiet_config()
        };
        let (mut engine, steps, _) = prepared(
            SteppingEngine::new(config),
            "mu-",
            1.0 * GEV,
            PhysicsList::IonizationOnly,
        );
        engine.simulate_event(1).unwrap();
        let trajectory = engine.last_trajectory().unwrap();
        assert_eq!(trajectory.event_id, 0);
        assert_eq!(trajectory.points[0], Point3::new(-1.9 * M, 0.0, 0.0));
        assert_eq!(trajectory.points.len(), steps.borrow().len() + 1);
    }

    #[test]
    fn trajectories_are_not_kept_unless_requested() {
        let (mut engine, _, _) = prepared(
            SteppingEngine::new(quiet_config()),
            "mu-",
            1.0 * GEV,
            PhysicsList::IonizationOnly,
        );
        engine.simulate_event(1).unwrap();
        assert!(engine.last_trajectory().is_none());
    }

    #[test]
    fn runaway_event_is_aborted() {
        let config = SteppingConfig {
            max_steps_per_event: 3,
            ..quiet_config()
        };
        let (mut engine, _, _) = prepared(
            SteppingEngine::new(config),
            "mu-",
            1.0 * GEV,
            PhysicsList::IonizationOnly,
        );
        let err = engine.simulate_event(1).unwrap_err();
        assert!(matches!(err, EngineError::EventAborted { event_id: 0, .. }));
    }
}
