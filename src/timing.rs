//! Stage timing for the build log.

use std::time::{Duration, Instant};

/// Measures one pipeline stage.
pub struct Timer {
    stage: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Print the elapsed time for the stage.
    pub fn finish(self) {
        let secs = self.elapsed().as_secs_f64();
        if secs >= 60.0 {
            println!("  [{:.1}m] {}", secs / 60.0, self.stage);
        } else {
            println!("  [{:.1}s] {}", secs, self.stage);
        }
    }
}
