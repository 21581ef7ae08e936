use std::time::{Duration, Instant};

use tracing::info;

/// Wall-clock timings of pipeline stages.
/// Durations of repeated stages (one per trajectory file) are accumulated.
pub struct PerfStats {
    /// Stage name and accumulated duration, in order of first record
    stages: Vec<(&'static str, Duration)>,
}

impl PerfStats {
    pub fn new() -> Self {
        PerfStats { stages: Vec::new() }
    }

    /// Adds elapsed time to the stage
    pub fn record(&mut self, stage: &'static str, elapsed: Duration) {
        match self.stages.iter_mut().find(|(name, _)| *name == stage) {
            Some((_, total)) => *total += elapsed,
            None => self.stages.push((stage, elapsed)),
        }
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|(_, total)| *total).sum()
    }

    pub fn log_summary(&self) {
        let summary = self
            .stages
            .iter()
            .map(|(name, total)| format!("{}={:.2}ms", name, total.as_secs_f64() * 1000.0))
            .collect::<Vec<String>>()
            .join(", ");
        info!("[PerfStats] {} | total={:.2}ms", summary, self.total().as_secs_f64() * 1000.0);
    }
}

/// Simple timer measuring elapsed duration since start
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Timer { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
