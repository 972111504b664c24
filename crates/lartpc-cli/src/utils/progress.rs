use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use lartpc::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Renders scan progress on stderr: a spinner for preparation phases, a bar for the
/// grid sweep. Each completed grid point is also printed to stdout.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// A handler that tracks state without drawing anything.
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::spinner_style())
            .with_message("Initializing...");
        pb.set_draw_target(target);
        pb.disable_steady_tick();
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = self.pb.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut pb) = pb.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    pb.reset();
                    pb.set_length(0);
                    pb.set_style(Self::spinner_style());
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    pb.set_message(name);
                }
                Progress::PhaseFinish => {
                    pb.disable_steady_tick();
                    pb.finish_with_message("✓ Done");
                }
                Progress::ScanStart { total_points } => {
                    pb.disable_steady_tick();
                    pb.reset();
                    pb.set_length(total_points);
                    pb.set_position(0);
                    pb.set_style(Self::bar_style());
                    pb.set_message("Angular scan");
                }
                Progress::PointComplete(record) => {
                    pb.suspend(|| println!("{}", record));
                    pb.inc(1);
                    pb.set_message(format!(
                        "θ={:>5.1} φ={:>5.1}",
                        record.theta_deg, record.phi_deg
                    ));
                }
                Progress::ScanFinish => {
                    let len = pb.length().unwrap_or(0);
                    if pb.position() < len {
                        pb.set_position(len);
                    }
                    pb.finish_with_message("Angular scan");
                }
            }
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<20} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lartpc::engine::state::ScanRecord;

    fn record(theta_deg: f64, phi_deg: f64) -> ScanRecord {
        ScanRecord {
            theta_deg,
            phi_deg,
            energy_gev: 1.0,
            deposited_kev: 100.0,
        }
    }

    #[test]
    fn handler_starts_finished_and_empty() {
        let handler = CliProgressHandler::hidden();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn scan_events_drive_the_bar() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Preparation",
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), "Preparation");
            assert!(!pb.is_finished());
        }
        callback(Progress::PhaseFinish);
        assert_eq!(handler.pb.lock().unwrap().message(), "✓ Done");

        callback(Progress::ScanStart { total_points: 84 });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.length(), Some(84));
            assert_eq!(pb.position(), 0);
        }

        callback(Progress::PointComplete(record(0.0, 30.0)));
        callback(Progress::PointComplete(record(0.0, 60.0)));
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.position(), 2);
            assert!(pb.message().contains("60.0"));
        }

        callback(Progress::ScanFinish);
        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.position(), 84);
    }

    #[test]
    fn callback_can_move_to_another_thread() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        std::thread::spawn(move || {
            callback(Progress::ScanStart { total_points: 1 });
            callback(Progress::PointComplete(record(90.0, 0.0)));
            callback(Progress::ScanFinish);
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.position(), 1);
    }
}
