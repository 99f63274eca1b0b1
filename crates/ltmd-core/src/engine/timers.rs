use std::time::{Duration, Instant};

/// Accumulating wall-clock stopwatch.
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    elapsed: Duration,
    started: Option<Instant>,
}

impl Stopwatch {
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Total accumulated time, including the current run if one is active.
    pub fn elapsed(&self) -> Duration {
        self.elapsed + self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.started = None;
    }
}

/// Hessian-construction and rediagonalization time accumulated across calls.
#[derive(Debug, Clone, Default)]
pub struct EngineTimers {
    pub hessian: Stopwatch,
    pub rediagonalization: Stopwatch,
}

impl EngineTimers {
    pub fn reset(&mut self) {
        self.hessian.reset();
        self.rediagonalization.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn stopwatch_accumulates_across_runs() {
        let mut watch = Stopwatch::default();
        watch.start();
        sleep(Duration::from_millis(2));
        watch.stop();
        let first = watch.elapsed();
        watch.start();
        assert!(watch.is_running());
        sleep(Duration::from_millis(2));
        watch.stop();
        assert!(watch.elapsed() > first);
        assert!(!watch.is_running());
    }

    #[test]
    fn reset_clears_accumulated_time() {
        let mut timers = EngineTimers::default();
        timers.hessian.start();
        sleep(Duration::from_millis(1));
        timers.hessian.stop();
        timers.reset();
        assert_eq!(timers.hessian.elapsed(), Duration::ZERO);
    }
}
