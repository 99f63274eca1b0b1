use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use ltmd::engine::progress::{Progress, ProgressCallback};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

/// Wall-clock time of one finished engine phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTiming {
    pub name: &'static str,
    pub elapsed: Duration,
}

struct DisplayState {
    bar: ProgressBar,
    current: Option<(&'static str, Instant)>,
    finished: Vec<PhaseTiming>,
}

impl DisplayState {
    fn start_phase(&mut self, name: &'static str) {
        self.bar.reset();
        self.bar.set_length(0);
        self.bar.set_style(spinner_style());
        self.bar.set_prefix(name);
        self.bar.set_message(name);
        self.bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        self.current = Some((name, Instant::now()));
    }

    fn finish_phase(&mut self) {
        self.bar.disable_steady_tick();
        let Some((name, started)) = self.current.take() else {
            self.bar.finish_and_clear();
            return;
        };
        let elapsed = started.elapsed();
        self.bar
            .finish_with_message(format!("✓ {} ({:.2}s)", name, elapsed.as_secs_f64()));
        self.finished.push(PhaseTiming { name, elapsed });
    }

    /// Block loops and finite-difference columns report as counted tasks.
    fn start_task(&mut self, total_steps: u64) {
        self.bar.disable_steady_tick();
        self.bar.reset();
        self.bar.set_length(total_steps);
        self.bar.set_position(0);
        self.bar.set_style(bar_style());
    }

    fn finish_task(&mut self) {
        if let Some(length) = self.bar.length() {
            self.bar.set_position(length);
        }
        self.bar.finish();
    }
}

/// Drives one stderr line from engine progress events and records how long
/// each phase of the run took.
#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<DisplayState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Tracks phases without drawing anything.
    #[cfg(test)]
    fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), target).with_style(spinner_style());
        bar.finish_and_clear();
        Self {
            state: Arc::new(Mutex::new(DisplayState {
                bar,
                current: None,
                finished: Vec::new(),
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = Arc::clone(&self.state);
        Box::new(move |event: Progress| {
            let Ok(mut state) = state.lock() else {
                warn!("Progress display mutex was poisoned; dropping event.");
                return;
            };
            match event {
                Progress::PhaseStart { name } => state.start_phase(name),
                Progress::PhaseFinish => state.finish_phase(),
                Progress::TaskStart { total_steps } => state.start_task(total_steps),
                Progress::TaskIncrement => state.bar.inc(1),
                Progress::TaskFinish => state.finish_task(),
                Progress::Message(text) => state.bar.println(format!("  {}", text)),
            }
        })
    }

    /// Phases finished so far, in the order the engine ran them.
    pub fn phase_timings(&self) -> Vec<PhaseTiming> {
        self.state
            .lock()
            .map(|state| state.finished.clone())
            .unwrap_or_default()
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:<24} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn bar_snapshot(handler: &CliProgressHandler) -> (Option<u64>, u64, bool, String) {
        let state = handler.state.lock().unwrap();
        (
            state.bar.length(),
            state.bar.position(),
            state.bar.is_finished(),
            state.bar.message(),
        )
    }

    #[test]
    fn new_handler_has_no_phases() {
        let handler = CliProgressHandler::hidden();
        let (length, _, finished, _) = bar_snapshot(&handler);
        assert_eq!(length, Some(0));
        assert!(finished);
        assert!(handler.phase_timings().is_empty());
    }

    #[test]
    fn block_loop_is_counted_inside_its_phase() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Block Diagonalization",
        });
        callback(Progress::TaskStart { total_steps: 8 });
        callback(Progress::TaskIncrement);
        callback(Progress::TaskIncrement);
        let (length, position, finished, _) = bar_snapshot(&handler);
        assert_eq!((length, position, finished), (Some(8), 2, false));

        callback(Progress::TaskFinish);
        let (_, position, finished, _) = bar_snapshot(&handler);
        assert_eq!((position, finished), (8, true));

        callback(Progress::PhaseFinish);
        let (_, _, _, message) = bar_snapshot(&handler);
        assert!(message.starts_with("✓ Block Diagonalization ("));
        let timings = handler.phase_timings();
        assert_eq!(timings.len(), 1);
        assert_eq!(timings[0].name, "Block Diagonalization");
    }

    #[test]
    fn phase_timings_follow_engine_order() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();
        for name in ["Preparation", "Block Diagonalization", "Inner Matrix"] {
            callback(Progress::PhaseStart { name });
            callback(Progress::PhaseFinish);
        }
        callback(Progress::PhaseFinish);

        let names: Vec<_> = handler.phase_timings().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Preparation", "Block Diagonalization", "Inner Matrix"]);
    }

    #[test]
    fn callback_can_report_from_another_thread() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart {
                name: "Reduced Diagonalization",
            });
            callback(Progress::PhaseFinish);
        })
        .join()
        .unwrap();

        assert_eq!(handler.phase_timings()[0].name, "Reduced Diagonalization");
    }
}
