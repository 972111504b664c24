use super::accumulator::{SequencingError, SharedAccumulator};
use crate::core::units::KEV;
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Idle,
    Open(u64),
    Closed(u64),
}

/// What the end-of-event hook observed for one event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventReport {
    pub event_id: u64,
    /// Deposited energy in MeV.
    pub deposited_energy: f64,
}

impl EventReport {
    pub fn deposited_kev(&self) -> f64 {
        self.deposited_energy / KEV
    }
}

impl fmt::Display for EventReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total energy deposited in event: {:.3} keV",
            self.deposited_kev()
        )
    }
}

/// Begin/end-of-event handlers: reset the accumulator when an event opens, read and
/// report it when the event closes.
///
/// The hooks only respond to the engine; they never start or skip events.
#[derive(Debug)]
pub struct EventHooks {
    accumulator: SharedAccumulator,
    phase: EventPhase,
    reports: Vec<EventReport>,
}

impl EventHooks {
    pub fn new(accumulator: SharedAccumulator) -> Self {
        Self {
            accumulator,
            phase: EventPhase::Idle,
            reports: Vec::new(),
        }
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn try_begin(&mut self, event_id: u64) -> Result<(), SequencingError> {
        if let EventPhase::Open(open) = self.phase {
            return Err(SequencingError::BeginWhileOpen { event_id, open });
        }
        self.accumulator.borrow_mut().reset();
        self.phase = EventPhase::Open(event_id);
        Ok(())
    }

    pub fn begin(&mut self, event_id: u64) {
        if let Err(e) = self.try_begin(event_id) {
            panic!("{e}");
        }
    }

    pub fn try_end(&mut self, event_id: u64) -> Result<EventReport, SequencingError> {
        if self.phase != EventPhase::Open(event_id) {
            return Err(SequencingError::EndWithoutBegin { event_id });
        }
        let deposited_energy = self.accumulator.borrow_mut().try_seal()?;
        let report = EventReport {
            event_id,
            deposited_energy,
        };
        info!(event_id, "{}", report);
        self.phase = EventPhase::Closed(event_id);
        self.reports.push(report);
        Ok(report)
    }

    pub fn end(&mut self, event_id: u64) -> EventReport {
        match self.try_end(event_id) {
            Ok(report) => report,
            Err(e) => panic!("{e}"),
        }
    }

    /// Reports produced since the last call, oldest first.
    pub fn take_reports(&mut self) -> Vec<EventReport> {
        std::mem::take(&mut self.reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accumulator::DepositionAccumulator;

    fn hooks() -> (EventHooks, SharedAccumulator) {
        let acc = DepositionAccumulator::shared();
        (EventHooks::new(acc.clone()), acc)
    }

    #[test]
    fn begin_resets_and_end_reports_accumulated_energy() {
        let (mut hooks, acc) = hooks();
        hooks.begin(0);
        assert_eq!(hooks.phase(), EventPhase::Open(0));
        acc.borrow_mut().accumulate(0.5);
        acc.borrow_mut().accumulate(0.25);
        let report = hooks.end(0);
        assert_eq!(hooks.phase(), EventPhase::Closed(0));
        assert_eq!(report.deposited_energy, 0.75);
        assert!((report.deposited_kev() - 750.0).abs() < 1e-9);
    }

    #[test]
    fn each_event_starts_from_zero() {
        let (mut hooks, acc) = hooks();
        hooks.begin(0);
        acc.borrow_mut().accumulate(3.0);
        hooks.end(0);
        hooks.begin(1);
        let report = hooks.end(1);
        assert_eq!(report.deposited_energy, 0.0);
        let reports = hooks.take_reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].event_id, 0);
        assert!(hooks.take_reports().is_empty());
    }

    #[test]
    fn report_line_uses_kev() {
        let report = EventReport {
            event_id: 0,
            deposited_energy: 1.5,
        };
        assert_eq!(
            report.to_string(),
            "Total energy deposited in event: 1500.000 keV"
        );
    }

    #[test]
    fn begin_while_open_is_rejected() {
        let (mut hooks, _) = hooks();
        hooks.begin(4);
        assert_eq!(
            hooks.try_begin(5),
            Err(SequencingError::BeginWhileOpen {
                event_id: 5,
                open: 4
            })
        );
    }

    #[test]
    fn end_without_begin_is_rejected() {
        let (mut hooks, _) = hooks();
        assert_eq!(
            hooks.try_end(0),
            Err(SequencingError::EndWithoutBegin { event_id: 0 })
        );
        hooks.begin(0);
        assert!(hooks.try_end(1).is_err());
    }

    #[test]
    #[should_panic(expected = "without a matching begin-of-event")]
    fn end_twice_panics() {
        let (mut hooks, _) = hooks();
        hooks.begin(0);
        hooks.end(0);
        hooks.end(0);
    }
}
