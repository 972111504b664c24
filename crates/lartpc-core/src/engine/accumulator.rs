use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::warn;

/// A violation of the per-event call order. Always a wiring bug in the caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SequencingError {
    #[error("energy deposit recorded before the accumulator was reset for the event")]
    AccumulateBeforeReset,
    #[error("accumulated energy read before the accumulator was reset for the event")]
    ReadBeforeReset,
    #[error("begin-of-event for event {event_id} delivered while event {open} is still open")]
    BeginWhileOpen { event_id: u64, open: u64 },
    #[error("end-of-event for event {event_id} delivered without a matching begin-of-event")]
    EndWithoutBegin { event_id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    Collecting,
    Sealed,
}

/// Sum of the energy deposited during the currently open event, in MeV.
///
/// Per event the calls must arrive as `reset`, any number of `accumulate`, then `read`.
/// The plain methods panic on a violation; the `try_` forms return the [`SequencingError`].
#[derive(Debug, Default)]
pub struct DepositionAccumulator {
    total: f64,
    phase: Phase,
    ignored: u64,
}

pub type SharedAccumulator = Rc<RefCell<DepositionAccumulator>>;

impl DepositionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedAccumulator {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn reset(&mut self) {
        self.total = 0.0;
        self.phase = Phase::Collecting;
    }

    pub fn try_accumulate(&mut self, delta: f64) -> Result<(), SequencingError> {
        if self.phase != Phase::Collecting {
            return Err(SequencingError::AccumulateBeforeReset);
        }
        if delta > 0.0 {
            self.total += delta;
        } else if delta < 0.0 || delta.is_nan() {
            self.ignored += 1;
            warn!(delta, "Ignoring invalid energy deposit.");
        }
        Ok(())
    }

    pub fn accumulate(&mut self, delta: f64) {
        if let Err(e) = self.try_accumulate(delta) {
            panic!("{e}");
        }
    }

    pub fn try_read(&self) -> Result<f64, SequencingError> {
        match self.phase {
            Phase::Idle => Err(SequencingError::ReadBeforeReset),
            Phase::Collecting | Phase::Sealed => Ok(self.total),
        }
    }

    pub fn read(&self) -> f64 {
        match self.try_read() {
            Ok(total) => total,
            Err(e) => panic!("{e}"),
        }
    }

    /// Reads the total and closes the event: further deposits need a new `reset`.
    pub fn try_seal(&mut self) -> Result<f64, SequencingError> {
        if self.phase != Phase::Collecting {
            return Err(SequencingError::ReadBeforeReset);
        }
        self.phase = Phase::Sealed;
        Ok(self.total)
    }

    /// Number of negative or NaN deposits dropped since construction.
    pub fn ignored_deposits(&self) -> u64 {
        self.ignored
    }
}
