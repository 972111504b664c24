use crate::core::geometry::GeometryBuilder;
use crate::core::materials::MaterialDatabase;
use crate::core::source::DirectionalSource;
use crate::engine::accumulator::{DepositionAccumulator, SharedAccumulator};
use crate::engine::config::{AngularGrid, ScanConfig};
use crate::engine::error::EngineError;
use crate::engine::hooks::{EventHooks, EventReport};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{ScanRecord, ScanResult};
use crate::engine::transport::{PhysicsList, Step, TransportEngine};
use crate::vis::{SceneRecorder, VisCommand, VisError, Visualizer};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, instrument};

/// Owns a configured transport engine together with the source and deposition hooks
/// registered with it.
///
/// Events run strictly one after another: every engine call blocks until the event's
/// end-of-event hook has fired.
pub struct ScanDriver<E: TransportEngine> {
    engine: E,
    source: DirectionalSource,
    accumulator: SharedAccumulator,
    hooks: Rc<RefCell<EventHooks>>,
    visualizer: Option<Box<dyn Visualizer>>,
    energy_gev: f64,
}

impl<E: TransportEngine> ScanDriver<E> {
    /// Builds the geometry and source from `config`, registers everything with `engine`
    /// and initializes it. Any failure here happens before a single event runs.
    #[instrument(skip_all, name = "scan_setup")]
    pub fn setup(
        mut engine: E,
        config: &ScanConfig,
        reporter: &ProgressReporter,
    ) -> Result<Self, EngineError> {
        reporter.report(Progress::PhaseStart {
            name: "Preparation",
        });
        info!("Building detector geometry and configuring the transport engine.");

        let materials = match &config.materials_path {
            Some(path) => MaterialDatabase::load(path)?,
            None => MaterialDatabase::new(),
        };
        let geometry = GeometryBuilder::new()
            .world(config.geometry.world.clone())
            .detector(config.geometry.detector.clone())
            .detector_offset(config.geometry.detector_offset)
            .build(&materials)?;

        let source = DirectionalSource::new(
            &config.source.particle,
            config.source.launch_radius,
            config.energy(),
        )?;
        source.check_fits(&geometry)?;
        let physics: PhysicsList = config.engine.physics_list.parse()?;

        let accumulator = DepositionAccumulator::shared();
        let hooks = Rc::new(RefCell::new(EventHooks::new(Rc::clone(&accumulator))));

        engine.register_geometry(geometry)?;
        engine.register_physics(physics)?;
        engine.register_emitter(source.emission())?;

        let step_sink = Rc::clone(&accumulator);
        engine.register_stepping_callback(Box::new(move |step: &Step| {
            step_sink.borrow_mut().accumulate(step.energy_deposit);
        }))?;
        let on_begin = Rc::clone(&hooks);
        let on_end = Rc::clone(&hooks);
        engine.register_event_callbacks(
            Box::new(move |event_id| on_begin.borrow_mut().begin(event_id)),
            Box::new(move |event_id| {
                on_end.borrow_mut().end(event_id);
            }),
        )?;
        engine.initialize()?;

        debug!(
            particle = %config.source.particle,
            launch_radius = config.source.launch_radius,
            physics = %physics,
            "Scan driver ready."
        );
        reporter.report(Progress::PhaseFinish);

        Ok(Self {
            engine,
            source,
            accumulator,
            hooks,
            visualizer: None,
            energy_gev: config.source.energy_gev,
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn source(&self) -> &DirectionalSource {
        &self.source
    }

    /// Energy (GeV) from the configuration.
    pub fn energy_gev(&self) -> f64 {
        self.energy_gev
    }

    /// Negative or NaN step deposits the accumulator has dropped so far.
    pub fn ignored_deposits(&self) -> u64 {
        self.accumulator.borrow().ignored_deposits()
    }

    pub fn attach_visualizer(&mut self, visualizer: Box<dyn Visualizer>) {
        self.visualizer = Some(visualizer);
    }

    pub fn visualizer(&self) -> Option<&dyn Visualizer> {
        self.visualizer.as_deref()
    }

    /// Forwards a command to the attached visualizer. `/vis/open` attaches a
    /// [`SceneRecorder`] when none is attached yet.
    pub fn apply_vis(&mut self, command: &VisCommand) -> Result<(), VisError> {
        if self.visualizer.is_none() {
            if !matches!(command, VisCommand::Open { .. }) {
                return Err(VisError::NoViewer);
            }
            self.visualizer = Some(Box::new(SceneRecorder::new()));
        }
        match self.visualizer.as_mut() {
            Some(vis) => vis.apply(command, self.engine.geometry()),
            None => Err(VisError::NoViewer),
        }
    }

    /// Points the source for the next events without running any.
    pub fn aim(&self, theta_deg: f64, phi_deg: f64, energy_gev: f64) {
        self.source.configure(theta_deg, phi_deg, energy_gev);
    }

    /// Runs `count` events with the current source configuration and returns their reports.
    pub fn beam_on(&mut self, count: usize) -> Result<Vec<EventReport>, EngineError> {
        let mut reports = Vec::new();
        for _ in 0..count {
            reports.extend(self.simulate_one()?);
        }
        if reports.len() != count {
            return Err(EngineError::MissingEventReport {
                expected: count,
                received: reports.len(),
            });
        }
        Ok(reports)
    }

    /// Fires one event at a single grid point and returns its record.
    pub fn fire(
        &mut self,
        theta_deg: f64,
        phi_deg: f64,
        energy_gev: f64,
    ) -> Result<ScanRecord, EngineError> {
        self.aim(theta_deg, phi_deg, energy_gev);
        let reports = self.simulate_one()?;
        let report = match reports.as_slice() {
            [report] => *report,
            other => {
                return Err(EngineError::MissingEventReport {
                    expected: 1,
                    received: other.len(),
                });
            }
        };
        let record = ScanRecord {
            theta_deg,
            phi_deg,
            energy_gev,
            deposited_kev: report.deposited_kev(),
        };
        info!(
            theta_deg,
            phi_deg,
            energy_gev,
            deposited_kev = record.deposited_kev,
            "{}",
            record
        );
        Ok(record)
    }

    /// Fires one event per grid point, theta-major, stopping at the first failure.
    #[instrument(
        skip_all,
        name = "angular_scan",
        fields(points = grid.len(), energy_gev = energy_gev)
    )]
    pub fn run_scan(
        &mut self,
        grid: &AngularGrid,
        energy_gev: f64,
        reporter: &ProgressReporter,
    ) -> Result<ScanResult, EngineError> {
        reporter.report(Progress::ScanStart {
            total_points: grid.len() as u64,
        });
        info!("Starting angular scan over {} grid points.", grid.len());

        let mut result = ScanResult::new();
        for (theta_deg, phi_deg) in grid.points() {
            let record = self.fire(theta_deg, phi_deg, energy_gev)?;
            reporter.report(Progress::PointComplete(record));
            result.push(record);
        }

        reporter.report(Progress::ScanFinish);
        info!(
            points = result.len(),
            total_deposited_kev = result.total_deposited_kev(),
            "Angular scan complete."
        );
        Ok(result)
    }

    fn simulate_one(&mut self) -> Result<Vec<EventReport>, EngineError> {
        self.engine.simulate_event(1)?;
        if let (Some(vis), Some(trajectory)) =
            (self.visualizer.as_mut(), self.engine.last_trajectory())
        {
            vis.add_trajectory(trajectory);
        }
        Ok(self.hooks.borrow_mut().take_reports())
    }
}

/// Sets up `engine` from `config` and scans the configured grid at the configured energy.
#[instrument(skip_all, name = "scan_workflow")]
pub fn run<E: TransportEngine>(
    engine: E,
    config: &ScanConfig,
    reporter: &ProgressReporter,
) -> Result<ScanResult, EngineError> {
    let mut driver = ScanDriver::setup(engine, config, reporter)?;
    driver.run_scan(&config.grid, config.source.energy_gev, reporter)
}
