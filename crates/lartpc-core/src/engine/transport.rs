use super::error::EngineError;
use crate::core::geometry::{DetectorGeometry, VolumeId};
use crate::core::source::SharedEmission;
use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub type EventId = u64;

/// One transport step as seen by the stepping callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub event_id: EventId,
    /// Volume the step was taken in.
    pub volume: VolumeId,
    pub pre_position: Point3<f64>,
    pub post_position: Point3<f64>,
    /// Energy deposited along the step, in MeV.
    pub energy_deposit: f64,
    /// Kinetic energy left after the step, in MeV.
    pub kinetic_energy: f64,
}

impl Step {
    pub fn length(&self) -> f64 {
        (self.post_position - self.pre_position).norm()
    }
}

pub type SteppingCallback = Box<dyn FnMut(&Step)>;
pub type EventCallback = Box<dyn FnMut(EventId)>;

/// Pre-built physics bundles. Selected by name; not configurable beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsList {
    /// Standard hadronic + electromagnetic: ionization and multiple scattering.
    FtfpBert,
    /// Continuous ionization loss only; tracks go straight.
    IonizationOnly,
}

impl PhysicsList {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FtfpBert => "FTFP_BERT",
            Self::IonizationOnly => "ionization-only",
        }
    }

    pub fn has_multiple_scattering(&self) -> bool {
        matches!(self, Self::FtfpBert)
    }
}

impl FromStr for PhysicsList {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FTFP_BERT" | "standard" => Ok(Self::FtfpBert),
            "ionization-only" => Ok(Self::IonizationOnly),
            other => Err(EngineError::UnknownPhysicsList(other.to_string())),
        }
    }
}

impl fmt::Display for PhysicsList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Positions visited by the primary during one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub event_id: EventId,
    pub points: Vec<Point3<f64>>,
}

/// The contract a particle-transport engine offers the scan driver.
///
/// All `register_*` calls happen once, before [`initialize`](Self::initialize).
/// [`simulate_event`](Self::simulate_event) blocks until every requested event has run and
/// every callback for it has returned. Callbacks fire in order: begin-of-event, each step,
/// end-of-event.
pub trait TransportEngine {
    fn register_geometry(&mut self, geometry: DetectorGeometry) -> Result<(), EngineError>;

    fn register_physics(&mut self, physics: PhysicsList) -> Result<(), EngineError>;

    /// The engine keeps the handle and reads it at the start of every event.
    fn register_emitter(&mut self, emission: SharedEmission) -> Result<(), EngineError>;

    fn register_stepping_callback(&mut self, callback: SteppingCallback) -> Result<(), EngineError>;

    fn register_event_callbacks(
        &mut self,
        on_begin: EventCallback,
        on_end: EventCallback,
    ) -> Result<(), EngineError>;

    fn initialize(&mut self) -> Result<(), EngineError>;

    fn simulate_event(&mut self, count: usize) -> Result<(), EngineError>;

    fn geometry(&self) -> Option<&DetectorGeometry>;

    /// Trajectory of the most recent event's primary, if the engine records them.
    fn last_trajectory(&self) -> Option<&Trajectory> {
        None
    }
}

/// Callbacks registered with an engine, invoked in delivery order.
#[derive(Default)]
pub struct EventCallbacks {
    stepping: Option<SteppingCallback>,
    on_begin: Option<EventCallback>,
    on_end: Option<EventCallback>,
}

impl EventCallbacks {
    pub fn begin(&mut self, event_id: EventId) {
        if let Some(cb) = self.on_begin.as_mut() {
            cb(event_id);
        }
    }

    pub fn step(&mut self, step: &Step) {
        if let Some(cb) = self.stepping.as_mut() {
            cb(step);
        }
    }

    pub fn end(&mut self, event_id: EventId) {
        if let Some(cb) = self.on_end.as_mut() {
            cb(event_id);
        }
    }
}

/// The registration bookkeeping every engine shares: one slot per registration and the
/// before/after-initialization rules.
#[derive(Default)]
pub struct EngineRegistry {
    geometry: Option<DetectorGeometry>,
    physics: Option<PhysicsList>,
    emitter: Option<SharedEmission>,
    callbacks: EventCallbacks,
    initialized: bool,
}

/// Borrowed view of a fully initialized registry.
pub struct Registered<'a> {
    pub geometry: &'a DetectorGeometry,
    pub physics: PhysicsList,
    pub emitter: &'a SharedEmission,
    pub callbacks: &'a mut EventCallbacks,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self, what: &'static str) -> Result<(), EngineError> {
        if self.initialized {
            Err(EngineError::AlreadyInitialized(what))
        } else {
            Ok(())
        }
    }

    pub fn register_geometry(&mut self, geometry: DetectorGeometry) -> Result<(), EngineError> {
        self.ensure_open("geometry")?;
        debug!(volumes = geometry.volumes_iter().count(), "Geometry registered.");
        self.geometry = Some(geometry);
        Ok(())
    }

    pub fn register_physics(&mut self, physics: PhysicsList) -> Result<(), EngineError> {
        self.ensure_open("physics list")?;
        debug!(physics = %physics, "Physics list registered.");
        self.physics = Some(physics);
        Ok(())
    }

    pub fn register_emitter(&mut self, emission: SharedEmission) -> Result<(), EngineError> {
        self.ensure_open("emitter")?;
        debug!(particle = emission.borrow().particle.name, "Emitter registered.");
        self.emitter = Some(emission);
        Ok(())
    }

    pub fn register_stepping_callback(
        &mut self,
        callback: SteppingCallback,
    ) -> Result<(), EngineError> {
        self.ensure_open("stepping callback")?;
        self.callbacks.stepping = Some(callback);
        Ok(())
    }

    pub fn register_event_callbacks(
        &mut self,
        on_begin: EventCallback,
        on_end: EventCallback,
    ) -> Result<(), EngineError> {
        self.ensure_open("event callbacks")?;
        self.callbacks.on_begin = Some(on_begin);
        self.callbacks.on_end = Some(on_end);
        Ok(())
    }

    pub fn initialize(&mut self) -> Result<(), EngineError> {
        self.ensure_open("a second initialization")?;
        if self.geometry.is_none() {
            return Err(EngineError::MissingRegistration("geometry"));
        }
        if self.physics.is_none() {
            return Err(EngineError::MissingRegistration("physics list"));
        }
        if self.emitter.is_none() {
            return Err(EngineError::MissingRegistration("emitter"));
        }
        self.initialized = true;
        debug!("Transport engine initialized.");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn geometry(&self) -> Option<&DetectorGeometry> {
        self.geometry.as_ref()
    }

    pub fn registered(&mut self) -> Result<Registered<'_>, EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        match (&self.geometry, self.physics, &self.emitter) {
            (Some(geometry), Some(physics), Some(emitter)) => Ok(Registered {
                geometry,
                physics,
                emitter,
                callbacks: &mut self.callbacks,
            }),
            _ => Err(EngineError::Internal(
                "initialized engine is missing a registration".into(),
            )),
        }
    }
}
