//! A scriptable engine for driver tests: no physics, fixed per-event deposits.

use super::error::EngineError;
use super::transport::{
    EngineRegistry, EventCallback, PhysicsList, Step, SteppingCallback, Trajectory,
    TransportEngine,
};
use crate::core::geometry::DetectorGeometry;
use crate::core::source::{EmissionParameters, SharedEmission};

#[derive(Default)]
pub struct ScriptedEngine {
    pub(crate) registry: EngineRegistry,
    /// Deposits delivered as individual steps in every event.
    pub deposits: Vec<f64>,
    /// Zero-based index of the `simulate_event` call that aborts.
    pub fail_on_call: Option<usize>,
    /// Skip the end-of-event callback.
    pub drop_end_of_event: bool,
    pub record_trajectories: bool,
    /// Emission parameters as read at the start of every event, in order.
    pub fired: Vec<EmissionParameters>,
    pub simulate_calls: usize,
    pub(crate) last_trajectory: Option<Trajectory>,
}

impl ScriptedEngine {
    pub fn with_deposits(deposits: &[f64]) -> Self {
        Self {
            deposits: deposits.to_vec(),
            ..Self::default()
        }
    }
}

impl TransportEngine for ScriptedEngine {
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
        self.registry.initialize()
    }

    fn simulate_event(&mut self, count: usize) -> Result<(), EngineError> {
        let call = self.simulate_calls;
        self.simulate_calls += 1;
        let mut view = self.registry.registered()?;
        for _ in 0..count {
            let event_id = self.fired.len() as u64;
            let emission = view.emitter.borrow().clone();
            if self.fail_on_call == Some(call) {
                return Err(EngineError::EventAborted {
                    event_id,
                    reason: "scripted failure".into(),
                });
            }
            view.callbacks.begin(event_id);
            for &deposit in &self.deposits {
                view.callbacks.step(&Step {
                    event_id,
                    volume: view.geometry.detector(),
                    pre_position: emission.position,
                    post_position: emission.position,
                    energy_deposit: deposit,
                    kinetic_energy: emission.kinetic_energy,
                });
            }
            if !self.drop_end_of_event {
                view.callbacks.end(event_id);
            }
            if self.record_trajectories {
                self.last_trajectory = Some(Trajectory {
                    event_id,
                    points: vec![emission.position, nalgebra::Point3::origin()],
                });
            }
            self.fired.push(emission);
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
